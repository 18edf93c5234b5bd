// Path: crates/server/src/control.rs
//! Lifecycle of the seeder's HTTP engines.

use dasboot_types::ServerError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Graceful shutdowns never wait longer than this, whatever the caller asks.
const MAX_STOP: Duration = Duration::from_secs(30);

/// Owns every HTTP engine of the process and their shared shutdown signal.
///
/// Engines are spawned with [`ServerSet::spawn`], observed with
/// [`ServerSet::done`] and torn down with [`ServerSet::stop`]. Each engine
/// contributes at most one error; the expected graceful-close sentinel is
/// filtered out.
pub struct ServerSet {
    shutdown_tx: watch::Sender<bool>,
    engines: JoinSet<(String, Result<(), ServerError>)>,
    errors: Vec<ServerError>,
}

impl ServerSet {
    /// An empty set with a fresh shutdown channel.
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shutdown_tx,
            engines: JoinSet::new(),
            errors: Vec::new(),
        }
    }

    /// The shutdown signal engines should select on.
    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Spawns a named engine.
    pub fn spawn<F>(&mut self, name: impl Into<String>, engine: F)
    where
        F: Future<Output = Result<(), ServerError>> + Send + 'static,
    {
        let name = name.into();
        self.engines.spawn(async move {
            let result = engine.await;
            (name, result)
        });
    }

    /// Number of engines still running.
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    /// Whether no engines are running.
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Waits until every engine has exited, collecting errors.
    pub async fn done(&mut self) {
        while let Some(joined) = self.engines.join_next().await {
            match joined {
                Ok((name, Ok(()))) => {
                    info!(target: "server", engine = %name, "engine exited");
                }
                Ok((name, Err(e))) => {
                    if is_expected_close(&e) {
                        info!(target: "server", engine = %name, "engine closed");
                    } else {
                        error!(target: "server", engine = %name, error = %e, "engine failed");
                        self.errors.push(e);
                    }
                }
                Err(join_err) if join_err.is_cancelled() => {
                    warn!(target: "server", "engine force-closed");
                }
                Err(join_err) => {
                    error!(target: "server", error = %join_err, "engine panicked");
                    self.errors.push(ServerError::Engine {
                        name: "unknown".to_string(),
                        reason: join_err.to_string(),
                    });
                }
            }
        }
    }

    /// Signals graceful shutdown and waits for every engine, force-closing
    /// whatever is still running when the deadline (capped at 30s) elapses.
    pub async fn stop(&mut self, deadline: Duration) {
        let deadline = deadline.min(MAX_STOP);
        let _ = self.shutdown_tx.send(true);
        if tokio::time::timeout(deadline, self.done()).await.is_err() {
            warn!(target: "server", "graceful shutdown deadline elapsed; force-closing engines");
            self.engines.abort_all();
            self.done().await;
        }
    }

    /// Errors collected so far, one per failed engine.
    pub fn errors(&self) -> &[ServerError] {
        &self.errors
    }
}

impl Default for ServerSet {
    fn default() -> Self {
        Self::new()
    }
}

/// The "server closed" sentinel every HTTP stack emits on a graceful stop
/// is not an error worth reporting.
fn is_expected_close(e: &ServerError) -> bool {
    match e {
        ServerError::Engine { reason, .. } => {
            let reason = reason.to_ascii_lowercase();
            reason.contains("server closed") || reason.contains("connection closed")
        }
        _ => false,
    }
}
