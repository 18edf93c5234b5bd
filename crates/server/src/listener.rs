// Path: crates/server/src/listener.rs
//! Plain and TLS accept loops serving an axum router.

use crate::timeouts::{HttpTimeouts, TimedStream};
use crate::tls::TlsConfigHandle;
use axum::{Extension, Router};
use dasboot_api::identity::{ClientIdentity, ConnScheme, PeerAddr};
use dasboot_types::ServerError;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};
use x509_parser::prelude::{FromDer, X509Certificate};

/// Serves a router over plain HTTP until the shutdown signal fires.
pub async fn serve_plain(
    listener: TcpListener,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    let addr = local_addr(&listener)?;
    info!(target: "server", addr = %addr, "http listener up");
    axum::serve(
        listener,
        router
            .layer(Extension(ConnScheme::Http))
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = shutdown.changed().await;
        info!(target: "server", addr = %addr, "http listener shutting down");
    })
    .await
    .map_err(|e| ServerError::Engine {
        name: format!("http {addr}"),
        reason: e.to_string(),
    })
}

/// Serves a router over TLS until the shutdown signal fires.
///
/// Every accepted connection captures the current TLS config snapshot, so a
/// reload affects the next handshake, never one in flight. The verified
/// peer certificate's CommonName (when a certificate was presented) rides
/// into the router as a [`ClientIdentity`] extension.
pub async fn serve_tls(
    listener: TcpListener,
    tls: Arc<TlsConfigHandle>,
    router: Router,
    timeouts: HttpTimeouts,
    shutdown: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    let addr = local_addr(&listener)?;
    info!(target: "server", addr = %addr, "https listener up");
    let mut accept_shutdown = shutdown.clone();
    loop {
        tokio::select! {
            _ = accept_shutdown.changed() => {
                info!(target: "server", addr = %addr, "https listener shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, remote) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(target: "server", addr = %addr, error = %e, "accept failed");
                        continue;
                    }
                };
                let acceptor = TlsAcceptor::from(tls.snapshot());
                let router = router.clone();
                let conn_shutdown = shutdown.clone();
                tokio::spawn(async move {
                    serve_tls_connection(
                        acceptor,
                        stream,
                        remote,
                        router,
                        timeouts,
                        conn_shutdown,
                    )
                    .await;
                });
            }
        }
    }
}

async fn serve_tls_connection(
    acceptor: TlsAcceptor,
    stream: TcpStream,
    remote: SocketAddr,
    router: Router,
    timeouts: HttpTimeouts,
    mut shutdown: watch::Receiver<bool>,
) {
    let tls_stream = match acceptor.accept(stream).await {
        Ok(s) => s,
        Err(e) => {
            debug!(target: "server", remote = %remote, error = %e, "TLS handshake failed");
            return;
        }
    };

    let identity = {
        let (_, conn) = tls_stream.get_ref();
        conn.peer_certificates()
            .and_then(|certs| certs.first())
            .map(|der| ClientIdentity {
                common_name: peer_common_name(der.as_ref()),
            })
    };

    let mut router = router
        .layer(Extension(PeerAddr(remote)))
        .layer(Extension(ConnScheme::Https));
    if let Some(identity) = identity {
        router = router.layer(Extension(identity));
    }
    let service = TowerToHyperService::new(router);
    let io = TokioIo::new(TimedStream::new(tls_stream, timeouts));

    let mut builder = hyper::server::conn::http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .header_read_timeout(timeouts.read_header);
    let mut conn = std::pin::pin!(builder.serve_connection(io, service));

    tokio::select! {
        res = conn.as_mut() => {
            if let Err(e) = res {
                // Write failures mid-stream are expected with flaky ONIE
                // downloaders; the response headers are long committed.
                debug!(target: "server", remote = %remote, error = %e, "connection ended with error");
            }
        }
        _ = shutdown.changed() => {
            conn.as_mut().graceful_shutdown();
            let _ = conn.as_mut().await;
        }
    }
}

/// Subject CommonName of a DER certificate; empty when absent or unparseable.
fn peer_common_name(der: &[u8]) -> String {
    match X509Certificate::from_der(der) {
        Ok((_, cert)) => cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .unwrap_or_default()
            .to_string(),
        Err(e) => {
            warn!(target: "server", error = %e, "cannot parse verified peer certificate");
            String::new()
        }
    }
}

fn local_addr(listener: &TcpListener) -> Result<SocketAddr, ServerError> {
    listener.local_addr().map_err(|e| ServerError::Bind {
        addr: "unknown".to_string(),
        reason: e.to_string(),
    })
}
