// Path: crates/gateway/src/metrics.rs
//! Prometheus instrumentation, local to the gateway.

use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_histogram_vec, register_int_counter_vec, HistogramVec,
    IntCounterVec,
};
use std::sync::Once;

static SEEDER_REQ_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static SEEDER_REQ_LATENCY: OnceCell<HistogramVec> = OnceCell::new();
static SEEDER_BYTES_OUT: OnceCell<IntCounterVec> = OnceCell::new();

static INSTALL: Once = Once::new();

/// Registers the gateway metrics; safe to call more than once.
pub fn install_metrics() {
    INSTALL.call_once(install);
}

fn install() {
    let _ = SEEDER_REQ_TOTAL.set(
        register_int_counter_vec!(
            "dasboot_seeder_requests_total",
            "Total HTTP requests handled by the seeder",
            &["method", "path", "status"]
        )
        .expect("register_int_counter_vec"),
    );
    let _ = SEEDER_REQ_LATENCY.set(
        register_histogram_vec!(
            "dasboot_seeder_request_duration_seconds",
            "Latency of seeder HTTP requests (seconds)",
            &["method", "path", "status"],
            exponential_buckets(0.001, 2.0, 15).expect("buckets")
        )
        .expect("register_histogram_vec"),
    );
    let _ = SEEDER_BYTES_OUT.set(
        register_int_counter_vec!(
            "dasboot_seeder_response_bytes_total",
            "Total response bytes written, by path",
            &["path"]
        )
        .expect("register_int_counter_vec"),
    );
}

pub(crate) fn observe(method: &str, path: &str, status: u16, elapsed_secs: f64, bytes: u64) {
    let status = status.to_string();
    if let Some(total) = SEEDER_REQ_TOTAL.get() {
        total.with_label_values(&[method, path, &status]).inc();
    }
    if let Some(latency) = SEEDER_REQ_LATENCY.get() {
        latency
            .with_label_values(&[method, path, &status])
            .observe(elapsed_secs);
    }
    if let Some(out) = SEEDER_BYTES_OUT.get() {
        out.with_label_values(&[path]).inc_by(bytes);
    }
}
