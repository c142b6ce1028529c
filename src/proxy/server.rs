use anyhow::Result;
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info};

use crate::blocklist::{BlockListGuard, FileBlockStore};
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::logger::AccessLogger;

use super::console::Console;
use super::fetcher::CachingFetcher;
use super::router::RequestRouter;
use super::tunnel::TunnelEngine;
use super::upstream::HttpUpstream;

/// Proxy server: owns the wired component graph and the accept loop.
///
/// One task serves each inbound connection; CONNECT upgrades are handled by
/// hyper after the router's 200 response is written.
pub struct ProxyServer {
    config: Config,
    router: Arc<RequestRouter>,
}

impl ProxyServer {
    /// Wire the component graph from configuration
    pub fn new(config: Config, access_logger: AccessLogger) -> Self {
        let guard = BlockListGuard::new(Arc::new(FileBlockStore::new(&config.blocklist)));
        let cache = ResponseCache::new(config.cache.clone());
        let upstream = Arc::new(HttpUpstream::new(config.http_client.as_ref()));
        let fetcher = CachingFetcher::new(cache, upstream);
        let console = Console::new(guard.clone());

        let router = Arc::new(RequestRouter::new(
            guard,
            fetcher,
            TunnelEngine::new(),
            console,
            config.server.console_path.clone(),
            access_logger,
        ));

        Self { config, router }
    }

    /// The wired router (shared handle)
    pub fn router(&self) -> Arc<RequestRouter> {
        Arc::clone(&self.router)
    }

    /// Bind the configured address and serve until the process is stopped
    pub async fn run(self) -> Result<()> {
        info!(
            "Starting {} proxy server on {}",
            self.config.server.protocol, self.config.server.bind
        );

        let router = self.router;
        let make_service = make_service_fn(move |conn: &AddrStream| {
            let router = Arc::clone(&router);
            let remote = conn.remote_addr();
            async move {
                Ok::<_, Infallible>(service_fn(move |mut req| {
                    let router = Arc::clone(&router);
                    // attach remote addr to request extensions
                    req.extensions_mut().insert(remote);
                    async move { router.handle(req).await }
                }))
            }
        });

        let server = Server::bind(&self.config.server.bind).serve(make_service);

        if let Err(e) = server.await {
            error!("proxy server error: {}", e);
            return Err(e.into());
        }

        Ok(())
    }
}
