use hyper::upgrade::OnUpgrade;
use hyper::{Body, Request, Response, StatusCode};
use std::time::Duration;
use tokio::io::{copy, AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::WicketError;

/// The dial is the only bounded step in the tunnel lifecycle; after
/// establishment the relay runs until each source ends on its own.
const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Opaque duplex relay for CONNECT requests.
///
/// The success status line must reach the client before the connection is
/// taken over; hyper completes the upgrade only after the response is
/// written, so any later failure can only be logged, never reported through
/// the protocol.
#[derive(Clone, Default)]
pub struct TunnelEngine;

impl TunnelEngine {
    pub fn new() -> Self {
        Self
    }

    /// Handle a CONNECT request: dial the target, answer 200, then relay
    /// bytes in both directions until each side ends
    pub async fn serve(&self, mut req: Request<Body>) -> Response<Body> {
        let target = match req.uri().authority() {
            Some(authority) => authority.to_string(),
            None => {
                warn!("CONNECT request without authority: {}", req.uri());
                return status_response(StatusCode::BAD_REQUEST, "CONNECT target missing");
            }
        };

        // the upgrade handle must exist before anything irreversible happens
        let on_upgrade = match req.extensions_mut().remove::<OnUpgrade>() {
            Some(on_upgrade) => on_upgrade,
            None => {
                let err = WicketError::hijack_unsupported("connection cannot be upgraded");
                warn!("{}", err);
                return status_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string());
            }
        };

        let upstream = match timeout(DIAL_TIMEOUT, TcpStream::connect(&target)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                let err = WicketError::dial(&target, e.to_string());
                warn!("{}", err);
                return status_response(StatusCode::SERVICE_UNAVAILABLE, &err.to_string());
            }
            Err(_) => {
                let err = WicketError::timeout(DIAL_TIMEOUT, format!("dial {}", target));
                warn!("{}", err);
                return status_response(StatusCode::SERVICE_UNAVAILABLE, &err.to_string());
            }
        };

        info!("tunnel established to {}", target);

        tokio::spawn(async move {
            let upgraded = match on_upgrade.await {
                Ok(upgraded) => upgraded,
                Err(e) => {
                    // response already sent; log only
                    warn!("upgrade failed for {}: {}", target, e);
                    return;
                }
            };

            let (client_read, client_write) = tokio::io::split(upgraded);
            let (upstream_read, upstream_write) = upstream.into_split();

            // two independent relay tasks; neither termination forces the
            // other, so a silently stalled peer holds its direction open
            tokio::spawn(relay(client_read, upstream_write, "client->upstream"));
            tokio::spawn(relay(upstream_read, client_write, "upstream->client"));
        });

        Response::builder()
            .status(StatusCode::OK)
            .body(Body::empty())
            .unwrap_or_else(|_| Response::new(Body::empty()))
    }
}

/// Copy one direction until EOF or error, then close both ends held by this
/// task: the writer is shut down and the reader dropped
async fn relay<R, W>(mut src: R, mut dst: W, direction: &'static str)
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    match copy(&mut src, &mut dst).await {
        Ok(bytes) => debug!("{} relay done, {} bytes", direction, bytes),
        Err(e) => debug!("{} relay ended: {}", direction, e),
    }
    if let Err(e) = dst.shutdown().await {
        debug!("{} shutdown: {}", direction, e);
    }
    drop(src);
}

fn status_response(status: StatusCode, body: &str) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}
