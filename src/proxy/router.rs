use chrono::Utc;
use hyper::{Body, Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use tracing::{debug, info};
use uuid::Uuid;

use crate::blocklist::BlockListGuard;
use crate::logger::AccessLogger;

use super::console::Console;
use super::fetcher::CachingFetcher;
use super::tunnel::TunnelEngine;

/// Top-level request dispatcher.
///
/// Order per request: CONNECT goes through the block-list guard and then the
/// tunnel; the console path goes to the management console; everything else
/// goes through the guard and then the caching fetcher. Blocked requests get
/// 401 with no body and never reach the network.
#[derive(Clone)]
pub struct RequestRouter {
    guard: BlockListGuard,
    fetcher: CachingFetcher,
    tunnel: TunnelEngine,
    console: Console,
    console_path: String,
    access_logger: AccessLogger,
}

impl RequestRouter {
    pub fn new(
        guard: BlockListGuard,
        fetcher: CachingFetcher,
        tunnel: TunnelEngine,
        console: Console,
        console_path: String,
        access_logger: AccessLogger,
    ) -> Self {
        Self {
            guard,
            fetcher,
            tunnel,
            console,
            console_path,
            access_logger,
        }
    }

    /// Handle one inbound request. Never fails; every outcome is a
    /// response.
    pub async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, Infallible> {
        let request_id = Uuid::new_v4();
        let start_time = Utc::now();

        let client_ip = req
            .extensions()
            .get::<SocketAddr>()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let method = req.method().clone();
        let target = match req.uri().authority() {
            Some(authority) if method == Method::CONNECT => authority.to_string(),
            _ => req.uri().to_string(),
        };

        debug!("request {} {} {}", request_id, method, target);

        let (route, response) = self.dispatch(req).await;

        let duration_ms = (Utc::now() - start_time).num_milliseconds();
        debug!(
            "request {} completed with status {} via {} in {}ms",
            request_id,
            response.status(),
            route,
            duration_ms
        );

        self.access_logger
            .log_request(
                request_id,
                &client_ip,
                method.as_str(),
                &target,
                route,
                response.status(),
                duration_ms,
                None,
            )
            .await;

        Ok(response)
    }

    async fn dispatch(&self, req: Request<Body>) -> (&'static str, Response<Body>) {
        if req.method() == Method::CONNECT {
            let candidate = req
                .uri()
                .authority()
                .map(|authority| authority.to_string())
                .unwrap_or_else(|| req.uri().to_string());

            if self.guard.is_blocked(&candidate).await {
                info!("CONNECT target {} is blocked", candidate);
                return ("blocked", unauthorized());
            }

            return ("tunnel", self.tunnel.serve(req).await);
        }

        if req.uri().path() == self.console_path {
            return ("console", self.console.handle(req).await);
        }

        let candidate = req.uri().to_string();
        if self.guard.is_blocked(&candidate).await {
            info!("URL {} is blocked", candidate);
            return ("blocked", unauthorized());
        }

        ("cache", self.fetcher.handle(req).await)
    }
}

/// 401 with no body, as served for blocked targets
fn unauthorized() -> Response<Body> {
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .body(Body::empty())
        .unwrap_or_else(|_| Response::new(Body::empty()))
}
