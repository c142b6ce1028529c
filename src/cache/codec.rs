//! Wire codec for cached responses.
//!
//! A cached value is the response dumped verbatim: HTTP/1.1 status line,
//! header lines in map order (multi-valued headers emitted once per value),
//! a blank line, then the raw body. Parsing is the strict inverse; a value
//! that does not parse back is a serialization error the caller treats as a
//! cache bypass, never as a client-facing failure.

use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{Body, HeaderMap, Response, StatusCode};

use crate::error::{WicketError, WicketResult};

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// A cached response parsed back into structured form
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ParsedResponse {
    /// Rebuild a live response. Headers are copied additively so
    /// multi-valued headers keep every value.
    pub fn into_response(self) -> WicketResult<Response<Body>> {
        let mut response = Response::builder()
            .status(self.status)
            .body(Body::from(self.body))?;
        copy_headers(response.headers_mut(), &self.headers);
        Ok(response)
    }
}

/// Copy headers additively, preserving per-key value order and multiplicity.
/// Values are appended, never merged or replaced.
pub fn copy_headers(dst: &mut HeaderMap, src: &HeaderMap) {
    for (name, value) in src.iter() {
        dst.append(name.clone(), value.clone());
    }
}

/// Serialize a response head and body to storable wire bytes
pub fn serialize_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 256);

    out.extend_from_slice(b"HTTP/1.1 ");
    out.extend_from_slice(status.as_str().as_bytes());
    if let Some(reason) = status.canonical_reason() {
        out.push(b' ');
        out.extend_from_slice(reason.as_bytes());
    }
    out.extend_from_slice(b"\r\n");

    for (name, value) in headers.iter() {
        out.extend_from_slice(name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }

    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out
}

/// Parse stored wire bytes back into a structured response
pub fn parse_response(bytes: &[u8]) -> WicketResult<ParsedResponse> {
    let head_end = find_head_terminator(bytes)
        .ok_or_else(|| WicketError::serialization("missing head terminator"))?;

    let head = std::str::from_utf8(&bytes[..head_end])
        .map_err(|e| WicketError::serialization(format!("head is not UTF-8: {}", e)))?;
    let body = Bytes::copy_from_slice(&bytes[head_end + HEAD_TERMINATOR.len()..]);

    let mut lines = head.split("\r\n");
    let status_line = lines
        .next()
        .ok_or_else(|| WicketError::serialization("empty head"))?;
    let status = parse_status_line(status_line)?;

    let mut headers = HeaderMap::new();
    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| WicketError::serialization(format!("malformed header line {:?}", line)))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| WicketError::serialization(format!("bad header name: {}", e)))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|e| WicketError::serialization(format!("bad header value: {}", e)))?;
        headers.append(name, value);
    }

    Ok(ParsedResponse {
        status,
        headers,
        body,
    })
}

fn find_head_terminator(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(HEAD_TERMINATOR.len())
        .position(|window| window == HEAD_TERMINATOR)
}

fn parse_status_line(line: &str) -> WicketResult<StatusCode> {
    let mut parts = line.splitn(3, ' ');
    let version = parts
        .next()
        .ok_or_else(|| WicketError::serialization("missing HTTP version"))?;
    if !version.starts_with("HTTP/") {
        return Err(WicketError::serialization(format!(
            "malformed status line {:?}",
            line
        )));
    }

    let code = parts
        .next()
        .ok_or_else(|| WicketError::serialization("missing status code"))?;
    let code: u16 = code
        .parse()
        .map_err(|e| WicketError::serialization(format!("bad status code {:?}: {}", code, e)))?;

    StatusCode::from_u16(code)
        .map_err(|e| WicketError::serialization(format!("invalid status code {}: {}", code, e)))
}
