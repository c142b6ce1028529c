use async_trait::async_trait;
use hyper::client::HttpConnector;
use hyper::{Body, Client, Request, Response};
use hyper_rustls::HttpsConnectorBuilder;
use std::time::Duration;

use crate::config::HttpClientConfig;
use crate::error::{WicketError, WicketResult};

/// One complete request/response exchange with an upstream server.
///
/// This is the single round-trip primitive shared by the first fetch and the
/// revalidation fetch; there is no retry or backoff, so a failure is
/// terminal for the request that triggered it.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn round_trip(&self, req: Request<Body>) -> WicketResult<Response<Body>>;
}

/// Pooled hyper client for upstream round trips (HTTP/HTTPS via rustls).
///
/// One owned instance is constructed at wiring time and shared by handle;
/// requests reuse pooled connections.
pub struct HttpUpstream {
    client: Client<hyper_rustls::HttpsConnector<HttpConnector>, Body>,
    request_timeout: Duration,
}

impl HttpUpstream {
    /// Build an upstream client from optional pool configuration
    pub fn new(config: Option<&HttpClientConfig>) -> Self {
        let default_config = HttpClientConfig::default();
        let config = config.unwrap_or(&default_config);

        // Base TCP connector; absolute-form URIs arrive from proxy clients
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_nodelay(true);

        let https = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder()
            .pool_idle_timeout(config.get_pool_idle_timeout())
            .pool_max_idle_per_host(config.get_pool_max_idle_per_host())
            .build::<_, Body>(https);

        Self {
            client,
            request_timeout: config.get_request_timeout(),
        }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn round_trip(&self, mut req: Request<Body>) -> WicketResult<Response<Body>> {
        strip_hop_by_hop_headers(req.headers_mut());

        let target = req.uri().to_string();
        let fut = self.client.request(req);
        match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(WicketError::dial(target, e.to_string())),
            Err(_) => Err(WicketError::timeout(self.request_timeout, format!("round trip to {}", target))),
        }
    }
}

/// Strip hop-by-hop headers as per RFC 7230 before forwarding upstream
fn strip_hop_by_hop_headers(headers: &mut hyper::HeaderMap) {
    const HOP_BY_HOP: [&str; 8] = [
        "connection",
        "keep-alive",
        "proxy-authenticate",
        "proxy-authorization",
        "te",
        "trailers",
        "transfer-encoding",
        "upgrade",
    ];
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}
