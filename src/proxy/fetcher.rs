use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use hyper::header::{CACHE_CONTROL, EXPIRES};
use hyper::{Body, HeaderMap, Request, Response, StatusCode};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{copy_headers, parse_response, serialize_response, ParsedResponse, ResponseCache};
use crate::error::{WicketError, WicketResult};

use super::upstream::Upstream;

/// Freshness of a cached response, recomputed from its own `Expires` header
/// on every read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freshness {
    /// No `Expires` header; treated as perpetually fresh
    NoExpires,
    /// `Expires` could not be parsed; fail-safe fresh, log only
    Unparsable,
    /// `Expires` lies in the future
    Fresh,
    /// `Expires` lies in the past; the entry must be revalidated
    Stale,
}

/// Cache-aware fetch path for plain HTTP requests.
///
/// Per request: look the URI up in the cache, serve a fresh hit directly,
/// revalidate a stale hit by fetching again and overwriting, and fetch and
/// store on a miss. All upstream traffic goes through one injected
/// round-trip primitive with no retry.
#[derive(Clone)]
pub struct CachingFetcher {
    cache: ResponseCache,
    upstream: Arc<dyn Upstream>,
}

impl CachingFetcher {
    /// Create a fetcher over a cache handle and an upstream transport
    pub fn new(cache: ResponseCache, upstream: Arc<dyn Upstream>) -> Self {
        Self { cache, upstream }
    }

    /// Handle a plain HTTP request end to end. Transport failures surface
    /// as 503 with the error text as body; cache trouble never reaches the
    /// client.
    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let uri = req.uri().to_string();

        let cached = match self.cache.lookup(&uri).await {
            Some(bytes) => bytes,
            None => {
                debug!("cache miss for {}", uri);
                return self.fetch_and_store(req, &uri, false).await;
            }
        };

        let parsed = match parse_response(&cached) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("cached entry for {} unusable, bypassing cache: {}", uri, e);
                return self.fetch_direct(req).await;
            }
        };

        match freshness(&parsed.headers) {
            Freshness::NoExpires => {
                debug!("serving {} from cache (no Expires header)", uri);
                self.serve_parsed(parsed, req).await
            }
            Freshness::Unparsable => {
                // logged by freshness(); fail-safe fresh
                self.serve_parsed(parsed, req).await
            }
            Freshness::Fresh => {
                debug!("serving {} from cache (not expired)", uri);
                self.serve_parsed(parsed, req).await
            }
            Freshness::Stale => {
                info!("cache entry for {} is expired, revalidating", uri);
                self.fetch_and_store(req, &uri, true).await
            }
        }
    }

    /// Serve a parsed cache entry; on a rebuild failure fall back to a
    /// direct fetch rather than surfacing a cache error
    async fn serve_parsed(&self, parsed: ParsedResponse, req: Request<Body>) -> Response<Body> {
        match parsed.into_response() {
            Ok(response) => response,
            Err(e) => {
                warn!("cannot rebuild cached response, bypassing cache: {}", e);
                self.fetch_direct(req).await
            }
        }
    }

    /// Fetch from upstream and stream the response through without touching
    /// the cache
    async fn fetch_direct(&self, req: Request<Body>) -> Response<Body> {
        match self.upstream.round_trip(req).await {
            Ok(response) => response,
            Err(e) => unavailable(&e),
        }
    }

    /// Fetch from upstream, store the response if cacheable, and serve it.
    /// `revalidate` selects the overwrite path that replaces a stale entry;
    /// the default path is insert-if-absent.
    async fn fetch_and_store(
        &self,
        req: Request<Body>,
        uri: &str,
        revalidate: bool,
    ) -> Response<Body> {
        let response = match self.upstream.round_trip(req).await {
            Ok(response) => response,
            Err(e) => {
                warn!("upstream fetch for {} failed: {}", uri, e);
                return unavailable(&e);
            }
        };

        if has_no_cache_directive(response.headers()) {
            debug!("response for {} carries no-cache, passing through", uri);
            return response;
        }

        let (parts, body) = response.into_parts();
        let body_bytes = match hyper::body::to_bytes(body).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    "cannot buffer response for {}, serving without caching: {}",
                    uri,
                    WicketError::serialization(e.to_string())
                );
                return Response::from_parts(parts, Body::empty());
            }
        };

        let serialized = Bytes::from(serialize_response(parts.status, &parts.headers, &body_bytes));
        if revalidate {
            self.cache.overwrite(uri, serialized).await;
        } else {
            self.cache.insert(uri, serialized).await;
        }

        rebuild_response(parts.status, &parts.headers, body_bytes)
    }
}

/// Rebuild a buffered response, copying headers additively and keeping the
/// upstream status unchanged
fn rebuild_response(status: StatusCode, headers: &HeaderMap, body: Bytes) -> Response<Body> {
    let mut response = match Response::builder().status(status).body(Body::from(body)) {
        Ok(response) => response,
        Err(e) => {
            warn!("failed to rebuild response: {}", e);
            return unavailable(&WicketError::internal(e.to_string()));
        }
    };
    copy_headers(response.headers_mut(), headers);
    response
}

/// 503 with the transport error message as body
fn unavailable(err: &WicketError) -> Response<Body> {
    Response::builder()
        .status(StatusCode::SERVICE_UNAVAILABLE)
        .body(Body::from(err.to_string()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

/// Whether the response forbids storing
fn has_no_cache_directive(headers: &HeaderMap) -> bool {
    headers
        .get(CACHE_CONTROL)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().eq_ignore_ascii_case("no-cache"))
        .unwrap_or(false)
}

/// Compute freshness from the stored response's `Expires` header
fn freshness(headers: &HeaderMap) -> Freshness {
    let value = match headers.get(EXPIRES) {
        Some(value) => value,
        None => return Freshness::NoExpires,
    };

    let value = match value.to_str() {
        Ok(value) => value,
        Err(e) => {
            warn!("{}", WicketError::date_parse("<opaque>", e.to_string()));
            return Freshness::Unparsable;
        }
    };

    match parse_http_date(value) {
        Ok(expires) if expires <= Utc::now() => Freshness::Stale,
        Ok(_) => Freshness::Fresh,
        Err(e) => {
            warn!("{}", e);
            Freshness::Unparsable
        }
    }
}

/// Parse an HTTP date in any of its three accepted formats: IMF-fixdate
/// (RFC 1123), RFC 850, and asctime
fn parse_http_date(value: &str) -> WicketResult<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%A, %d-%b-%y %H:%M:%S GMT") {
        return Ok(parsed.and_utc());
    }

    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%a %b %e %H:%M:%S %Y") {
        return Ok(parsed.and_utc());
    }

    Err(WicketError::date_parse(value, "not an HTTP date"))
}
