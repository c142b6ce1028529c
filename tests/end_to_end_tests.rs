use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wicket::config::{BlockListConfig, CacheConfig, Config, LoggingConfig, ServerConfig};
use wicket::logger::AccessLogger;
use wicket::proxy::ProxyServer;

/// Start a live proxy on an auto-assigned port, returning its address
async fn start_proxy(dir: &TempDir) -> SocketAddr {
    let config = Config {
        server: ServerConfig {
            bind: "127.0.0.1:0".parse().unwrap(),
            protocol: "http".to_string(),
            console_path: "/console".to_string(),
        },
        blocklist: BlockListConfig {
            path: dir.path().join("block"),
        },
        cache: CacheConfig {
            enabled: true,
            metrics_enabled: true,
        },
        http_client: None,
        logging: LoggingConfig {
            enabled: false,
            file: None,
            retention_days: None,
        },
    };

    let access_logger = AccessLogger::new(config.logging.clone());
    let server = ProxyServer::new(config, access_logger);
    let router = server.router();

    let make_service = make_service_fn(move |conn: &AddrStream| {
        let router = Arc::clone(&router);
        let remote = conn.remote_addr();
        async move {
            Ok::<_, Infallible>(service_fn(move |mut req| {
                let router = Arc::clone(&router);
                req.extensions_mut().insert(remote);
                async move { router.handle(req).await }
            }))
        }
    });

    let hyper_server = Server::bind(&"127.0.0.1:0".parse().unwrap()).serve(make_service);
    let addr = hyper_server.local_addr();
    tokio::spawn(hyper_server);
    addr
}

/// Issue one GET through the proxy over a raw socket and return
/// (status, head, body)
async fn proxy_get(proxy: SocketAddr, url: &str) -> (u16, String, Vec<u8>) {
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    let host = url
        .trim_start_matches("http://")
        .split('/')
        .next()
        .unwrap()
        .to_string();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        url, host
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();

    let head_end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response head terminator");
    let head = String::from_utf8_lossy(&raw[..head_end]).to_string();
    let body = raw[head_end + 4..].to_vec();

    let status: u16 = head
        .split_whitespace()
        .nth(1)
        .expect("status code")
        .parse()
        .unwrap();
    (status, head, body)
}

/// Open a CONNECT tunnel through the proxy; returns the stream positioned
/// after the response head, plus the status code
async fn proxy_connect(proxy: SocketAddr, target: &str) -> (TcpStream, u16, Vec<u8>) {
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    let request = format!("CONNECT {} HTTP/1.1\r\nHost: {}\r\n\r\n", target, target);
    stream.write_all(request.as_bytes()).await.unwrap();

    // read incrementally until the head terminator
    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];
    let head_end = loop {
        let n = stream.read(&mut buf).await.unwrap();
        if n == 0 {
            break raw.windows(4).position(|w| w == b"\r\n\r\n").unwrap_or(raw.len());
        }
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&raw[..head_end]).to_string();
    let status: u16 = head
        .split_whitespace()
        .nth(1)
        .expect("status code")
        .parse()
        .unwrap();
    let leftover = raw[(head_end + 4).min(raw.len())..].to_vec();
    (stream, status, leftover)
}

/// Read one HTTP response (head plus content-length body) from a stream
/// that may stay open afterwards
async fn read_http_response(stream: &mut TcpStream) -> (u16, String, Vec<u8>) {
    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];
    let head_end = loop {
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed before response head completed");
        raw.extend_from_slice(&buf[..n]);
    };

    let head = String::from_utf8_lossy(&raw[..head_end]).to_string();
    let status: u16 = head
        .split_whitespace()
        .nth(1)
        .expect("status code")
        .parse()
        .unwrap();

    let content_length: usize = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse().ok())?
        })
        .unwrap_or(0);

    let mut body = raw[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed before response body completed");
        body.extend_from_slice(&buf[..n]);
    }
    (status, head, body)
}

#[tokio::test]
async fn test_second_get_served_from_cache() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cached"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello from backend"))
        .expect(1) // exactly one upstream round trip for two proxied GETs
        .mount(&backend)
        .await;

    let dir = TempDir::new().unwrap();
    let proxy = start_proxy(&dir).await;
    let url = format!("{}/cached", backend.uri());

    let (status, _, body) = proxy_get(proxy, &url).await;
    assert_eq!(status, 200);
    assert_eq!(body, b"hello from backend");

    let (status, _, body) = proxy_get(proxy, &url).await;
    assert_eq!(status, 200);
    assert_eq!(body, b"hello from backend");
}

#[tokio::test]
async fn test_expired_entry_revalidated_once() {
    let backend = MockServer::start().await;
    let past = (chrono::Utc::now() - chrono::Duration::hours(1)).to_rfc2822();

    Mock::given(method("GET"))
        .and(path("/stale"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("old content")
                .insert_header("expires", past.as_str()),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/stale"))
        .respond_with(ResponseTemplate::new(200).set_body_string("new content"))
        .expect(1)
        .mount(&backend)
        .await;

    let dir = TempDir::new().unwrap();
    let proxy = start_proxy(&dir).await;
    let url = format!("{}/stale", backend.uri());

    let (_, _, body) = proxy_get(proxy, &url).await;
    assert_eq!(body, b"old content");

    // stale entry: exactly one revalidation fetch replaces the cached bytes
    let (_, _, body) = proxy_get(proxy, &url).await;
    assert_eq!(body, b"new content");

    // the revalidated entry has no Expires and is now perpetually fresh
    let (_, _, body) = proxy_get(proxy, &url).await;
    assert_eq!(body, b"new content");
}

#[tokio::test]
async fn test_multi_valued_headers_preserved_through_cache() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cookies"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("with cookies")
                .append_header("set-cookie", "a=1")
                .append_header("set-cookie", "b=2"),
        )
        .expect(1)
        .mount(&backend)
        .await;

    let dir = TempDir::new().unwrap();
    let proxy = start_proxy(&dir).await;
    let url = format!("{}/cookies", backend.uri());

    let (_, head, _) = proxy_get(proxy, &url).await;
    assert_eq!(head.to_lowercase().matches("set-cookie:").count(), 2);

    // served from cache with both values intact
    let (_, head, _) = proxy_get(proxy, &url).await;
    assert_eq!(head.to_lowercase().matches("set-cookie:").count(), 2);
}

#[tokio::test]
async fn test_no_cache_response_fetched_every_time() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/volatile"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("always fresh")
                .insert_header("cache-control", "no-cache"),
        )
        .expect(2)
        .mount(&backend)
        .await;

    let dir = TempDir::new().unwrap();
    let proxy = start_proxy(&dir).await;
    let url = format!("{}/volatile", backend.uri());

    proxy_get(proxy, &url).await;
    let (status, _, body) = proxy_get(proxy, &url).await;
    assert_eq!(status, 200);
    assert_eq!(body, b"always fresh");
}

#[tokio::test]
async fn test_blocked_host_gets_401_and_no_upstream_call() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("should never be seen"))
        .expect(0)
        .mount(&backend)
        .await;

    let dir = TempDir::new().unwrap();
    let host = backend.uri().trim_start_matches("http://").to_string();
    tokio::fs::write(dir.path().join("block"), format!("{}\n", host))
        .await
        .unwrap();

    let proxy = start_proxy(&dir).await;
    let url = format!("{}/blocked", backend.uri());

    let (status, _, body) = proxy_get(proxy, &url).await;
    assert_eq!(status, 401);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_console_append_blocks_next_request() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("page"))
        .expect(1)
        .mount(&backend)
        .await;

    let dir = TempDir::new().unwrap();
    let proxy = start_proxy(&dir).await;
    let url = format!("{}/page", backend.uri());

    let (status, _, _) = proxy_get(proxy, &url).await;
    assert_eq!(status, 200);

    // block the backend through the console
    let host = backend.uri().trim_start_matches("http://").to_string();
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    let form = format!("URL={}", host);
    let request = format!(
        "POST /console HTTP/1.1\r\nHost: proxy\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        form.len(),
        form
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    assert!(String::from_utf8_lossy(&raw).contains("200"));

    // the appended entry takes effect on the very next check
    let (status, _, _) = proxy_get(proxy, &url).await;
    assert_eq!(status, 401);
}

/// Target that greets first, then echoes everything back
async fn start_greeting_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                socket.write_all(b"greetings").await.ok();
                let mut buf = [0u8; 1024];
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if socket.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });
    addr
}

#[tokio::test]
async fn test_connect_tunnel_duplex_fidelity() {
    let target = start_greeting_echo_server().await;
    let dir = TempDir::new().unwrap();
    let proxy = start_proxy(&dir).await;

    let (mut stream, status, mut received) =
        proxy_connect(proxy, &target.to_string()).await;
    assert_eq!(status, 200);

    // upstream->client direction: the target speaks first
    while received.len() < b"greetings".len() {
        let mut buf = [0u8; 64];
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "tunnel closed before greeting arrived");
        received.extend_from_slice(&buf[..n]);
    }
    assert_eq!(&received, b"greetings");

    // client->upstream direction: echoed bytes come back verbatim
    stream.write_all(b"opaque tunnel payload").await.unwrap();
    let mut echoed = vec![0u8; b"opaque tunnel payload".len()];
    stream.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"opaque tunnel payload");

    // a second exchange over the same tunnel still works
    stream.write_all(b"more bytes").await.unwrap();
    let mut echoed = vec![0u8; b"more bytes".len()];
    stream.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"more bytes");
}

#[tokio::test]
async fn test_connect_dial_failure_returns_503_with_reason() {
    // grab a port that nothing listens on
    let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = dead.local_addr().unwrap();
    drop(dead);

    let dir = TempDir::new().unwrap();
    let proxy = start_proxy(&dir).await;

    let mut stream = TcpStream::connect(proxy).await.unwrap();
    let request = format!(
        "CONNECT {} HTTP/1.1\r\nHost: {}\r\n\r\n",
        dead_addr, dead_addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let (status, _, body) = read_http_response(&mut stream).await;
    assert_eq!(status, 503);
    let body = String::from_utf8_lossy(&body);
    assert!(body.contains("dial"), "body was: {}", body);
}

#[tokio::test]
async fn test_blocked_connect_never_dials() {
    let dir = TempDir::new().unwrap();
    tokio::fs::write(dir.path().join("block"), "forbidden.example.com\n")
        .await
        .unwrap();
    let proxy = start_proxy(&dir).await;

    let mut stream = TcpStream::connect(proxy).await.unwrap();
    stream
        .write_all(
            b"CONNECT forbidden.example.com:443 HTTP/1.1\r\nHost: forbidden.example.com:443\r\n\r\n",
        )
        .await
        .unwrap();

    let (status, _, body) = read_http_response(&mut stream).await;
    assert_eq!(status, 401);
    assert!(body.is_empty());
}
