// Path: crates/node/src/seeder.rs
//! Seeder assembly and run loop.

use crate::artifacts::DirArtifactProvider;
use crate::topology::StaticTopology;
use anyhow::{anyhow, Context, Result};
use dasboot_api::registration::RegistrationBackend;
use dasboot_embedded_config::signer::pem_bundle_to_der;
use dasboot_embedded_config::ConfigSigner;
use dasboot_gateway::{insecure_router, secure_router, GatewayState, InstallerBundle};
use dasboot_registration::{CaSigner, LocalCaBackend, RegistrationProcessor};
use dasboot_server::{dynll, serve_plain, serve_tls, HttpTimeouts, ServerSet, TlsConfigHandle};
use dasboot_types::config::{GenericServerConfig, SeederConfig};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Graceful-shutdown budget once a signal arrives.
const STOP_DEADLINE: Duration = Duration::from_secs(30);

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

fn first_cert_der(path: &Path) -> Result<Vec<u8>> {
    let pems = pem_bundle_to_der(&read_text(path)?)
        .map_err(|e| anyhow!("{}: {e}", path.display()))?;
    pems.into_iter()
        .next()
        .ok_or_else(|| anyhow!("{} holds no certificates", path.display()))
}

fn tls_handle_for(generic: &GenericServerConfig) -> Result<Option<Arc<TlsConfigHandle>>> {
    let (Some(key_path), Some(cert_path)) = (&generic.key_path, &generic.cert_path) else {
        return Ok(None);
    };
    let key = read_text(key_path)?;
    let cert = read_text(cert_path)?;
    let client_ca = generic
        .client_ca_path
        .as_deref()
        .map(read_text)
        .transpose()?;
    let handle = TlsConfigHandle::new(
        key.as_bytes(),
        cert.as_bytes(),
        client_ca.as_deref().map(str::as_bytes),
    )?;
    Ok(Some(Arc::new(handle)))
}

async fn bind(addr: std::net::SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))
}

/// Assembles every component from the configuration and runs the listener
/// set until a signal or a fatal engine error.
pub async fn run(config: SeederConfig) -> Result<()> {
    config.validate()?;

    let signer = Arc::new(ConfigSigner::from_pem(
        &read_text(&config.embedded_config_generator.key_path)?,
        &read_text(&config.embedded_config_generator.cert_path)?,
    )?);

    let settings = &config.installer_settings;
    let bundle = InstallerBundle {
        server_ca_der: first_cert_der(&settings.server_ca_path)?,
        config_ca_der: first_cert_der(&settings.config_signature_ca_path)?,
        secure_base_url: format!(
            "https://{}:{}",
            settings.secure_server_name, settings.secure_server_port
        ),
        dns_servers: settings.dns_servers.clone(),
        ntp_servers: settings.ntp_servers.clone(),
        syslog_servers: settings.syslog_servers.clone(),
    };

    let topology = Arc::new(StaticTopology::load(&config.topology.path)?);
    let artifacts = Arc::new(DirArtifactProvider::new(config.artifacts.directory.clone()));

    let registry = config
        .registry_settings
        .as_ref()
        .and_then(|r| r.cert_path.as_deref().zip(r.key_path.as_deref()))
        .ok_or_else(|| {
            anyhow!("registry_settings.cert_path and key_path are required to mint device certificates")
        })?;
    let ca = CaSigner::from_pem(&read_text(registry.0)?, &read_text(registry.1)?)?;
    let backend: Arc<dyn RegistrationBackend> = Arc::new(LocalCaBackend::new(ca));
    let processor = RegistrationProcessor::new(
        backend,
        Duration::from_secs(config.registration.refresh_interval_secs),
    );

    let state = Arc::new(GatewayState {
        artifacts,
        topology: topology.clone(),
        processor: processor.clone(),
        signer,
        bundle,
    });

    let mut set = ServerSet::new();
    let timeouts = HttpTimeouts::default();

    {
        let rx = set.shutdown_rx();
        let processor = processor.clone();
        set.spawn("registration-refresh", async move {
            processor.run(rx).await;
            Ok(())
        });
    }

    if let Some(metrics_addr) = config.telemetry.metrics_address {
        let rx = set.shutdown_rx();
        set.spawn("telemetry", async move {
            dasboot_telemetry::http::run_server(metrics_addr, rx).await;
            Ok(())
        });
    }

    if let Some(generic) = &config.insecure_server.generic {
        let tls = tls_handle_for(generic)?;
        for addr in &generic.addresses {
            let listener = bind(*addr).await?;
            let router = insecure_router(state.clone());
            match &tls {
                Some(tls) => set.spawn(
                    format!("insecure-tls {addr}"),
                    serve_tls(listener, tls.clone(), router, timeouts, set.shutdown_rx()),
                ),
                None => set.spawn(
                    format!("insecure {addr}"),
                    serve_plain(listener, router, set.shutdown_rx()),
                ),
            }
        }
    }

    if let Some(dynll_cfg) = &config.insecure_server.dyn_ll {
        let bindings = dynll::discover(topology.as_ref(), dynll_cfg).await?;
        for addr in bindings {
            let listener = bind(addr).await?;
            set.spawn(
                format!("dynll {addr}"),
                serve_plain(listener, insecure_router(state.clone()), set.shutdown_rx()),
            );
        }
    }

    let secure_tls = tls_handle_for(&config.secure_server)?
        .ok_or_else(|| anyhow!("secure_server requires key_path and cert_path"))?;
    for addr in &config.secure_server.addresses {
        let listener = bind(*addr).await?;
        set.spawn(
            format!("secure {addr}"),
            serve_tls(
                listener,
                secure_tls.clone(),
                secure_router(state.clone()),
                timeouts,
                set.shutdown_rx(),
            ),
        );
    }

    info!(target: "seeder", engines = set.len(), "seeder up");

    let signalled = tokio::select! {
        _ = shutdown_signal() => true,
        _ = set.done() => false,
    };
    if signalled {
        info!(target: "seeder", "shutdown signal received");
        set.stop(STOP_DEADLINE).await;
    }

    if set.errors().is_empty() {
        info!(target: "seeder", "seeder stopped");
        Ok(())
    } else {
        Err(anyhow!("{} engine(s) failed", set.errors().len()))
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!(target: "seeder", error = %e, "cannot install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}
