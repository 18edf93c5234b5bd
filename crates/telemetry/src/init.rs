// Path: crates/telemetry/src/init.rs
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Dependency targets that flood the log at `info` under normal bring-up
/// traffic: every ONIE download crosses a TLS handshake and an HTTP parse.
const QUIET_TARGETS: &[&str] = &["rustls", "hyper", "h2", "tower_http"];

/// Installs the global subscriber for a seeder process.
///
/// Events go to stderr as flattened JSON lines. `RUST_LOG` overrides the
/// default `info` level; without it, the targets in [`QUIET_TARGETS`] are
/// clamped to `warn`. The `service` name is emitted once at startup so the
/// fleet's log pipeline can tell seeder instances apart.
pub fn init_tracing(service: &str) -> Result<(), anyhow::Error> {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var_os("RUST_LOG").is_none() {
        for target in QUIET_TARGETS {
            filter = filter.add_directive(format!("{target}=warn").parse()?);
        }
    }

    let json_layer = fmt::layer()
        .json()
        .flatten_event(true)
        .with_writer(std::io::stderr);

    // try_init also installs the log-crate bridge for dependencies that
    // have not moved to tracing.
    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .try_init()?;
    tracing::info!(target: "telemetry", service, "logging initialized");
    Ok(())
}
