use hyper::{Body, Method, Request, Response, StatusCode};
use tracing::{info, warn};

use crate::blocklist::BlockListGuard;

/// Management console: shows the current block list and accepts new
/// entries.
///
/// GET renders the list plus the requested URL; POST reads a `URL` form
/// field and appends it through the guard (blank submissions are ignored).
/// Console failures are never fatal to the proxy.
#[derive(Clone)]
pub struct Console {
    guard: BlockListGuard,
}

impl Console {
    pub fn new(guard: BlockListGuard) -> Self {
        Self { guard }
    }

    /// Handle a console request
    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        info!("console requested");

        match *req.method() {
            Method::POST => self.handle_submit(req).await,
            _ => {
                let requested = req.uri().to_string();
                self.render(Some(&requested)).await
            }
        }
    }

    /// Append the submitted URL, then re-render the page
    async fn handle_submit(&self, req: Request<Body>) -> Response<Body> {
        let body = match hyper::body::to_bytes(req.into_body()).await {
            Ok(body) => body,
            Err(e) => {
                warn!("cannot read console form body: {}", e);
                return self.render(None).await;
            }
        };

        let submitted = url::form_urlencoded::parse(&body)
            .find(|(key, _)| key == "URL")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();

        if let Err(e) = self.guard.append(&submitted).await {
            warn!("error adding URL to block list: {}", e);
        }

        self.render(None).await
    }

    /// Render the console page; an unreadable list renders as empty
    async fn render(&self, requested_url: Option<&str>) -> Response<Body> {
        let entries = match self.guard.entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("cannot read block list for console: {}", e);
                Vec::new()
            }
        };

        let mut list = String::new();
        for entry in &entries {
            list.push_str(&format!("      <li>{}</li>\n", escape_html(entry)));
        }

        let requested = requested_url
            .map(|url| format!("    <p>Requested: {}</p>\n", escape_html(url)))
            .unwrap_or_default();

        let page = format!(
            "<!DOCTYPE html>\n<html>\n  <head><title>wicket console</title></head>\n  <body>\n    <h1>Proxy management console</h1>\n{requested}    <form method=\"POST\">\n      <label>Block URL: <input type=\"text\" name=\"URL\"></label>\n      <input type=\"submit\" value=\"Block\">\n    </form>\n    <h2>Blocked entries</h2>\n    <ul>\n{list}    </ul>\n  </body>\n</html>\n"
        );

        Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "text/html; charset=utf-8")
            .body(Body::from(page))
            .unwrap_or_else(|_| Response::new(Body::empty()))
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocklist::{BlockListGuard, FileBlockStore};
    use crate::config::BlockListConfig;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn console_in(dir: &TempDir) -> Console {
        let config = BlockListConfig {
            path: dir.path().join("block"),
        };
        Console::new(BlockListGuard::new(Arc::new(FileBlockStore::new(&config))))
    }

    #[tokio::test]
    async fn test_get_renders_requested_url_and_entries() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("block"), "ads.example.com\n")
            .await
            .unwrap();
        let console = console_in(&dir);

        let req = Request::builder()
            .method(Method::GET)
            .uri("/console")
            .body(Body::empty())
            .unwrap();
        let response = console.handle(req).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let page = String::from_utf8(body.to_vec()).unwrap();
        assert!(page.contains("Requested: /console"));
        assert!(page.contains("<li>ads.example.com</li>"));
    }

    #[tokio::test]
    async fn test_post_appends_entry() {
        let dir = TempDir::new().unwrap();
        let console = console_in(&dir);

        let req = Request::builder()
            .method(Method::POST)
            .uri("/console")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("URL=tracker.example.net"))
            .unwrap();
        console.handle(req).await;

        let stored = tokio::fs::read_to_string(dir.path().join("block"))
            .await
            .unwrap();
        assert_eq!(stored, "tracker.example.net\n");
    }

    #[tokio::test]
    async fn test_post_blank_submission_ignored() {
        let dir = TempDir::new().unwrap();
        let console = console_in(&dir);

        let req = Request::builder()
            .method(Method::POST)
            .uri("/console")
            .body(Body::from("URL=++"))
            .unwrap();
        let response = console.handle(req).await;
        assert_eq!(response.status(), StatusCode::OK);

        // nothing written: blank submissions never create the file
        assert!(!dir.path().join("block").exists());
    }

    #[tokio::test]
    async fn test_percent_encoded_submission_decoded() {
        let dir = TempDir::new().unwrap();
        let console = console_in(&dir);

        let req = Request::builder()
            .method(Method::POST)
            .uri("/console")
            .body(Body::from("URL=http%3A%2F%2Fads.example.com%2F"))
            .unwrap();
        console.handle(req).await;

        let stored = tokio::fs::read_to_string(dir.path().join("block"))
            .await
            .unwrap();
        assert_eq!(stored, "http://ads.example.com/\n");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<script>\"&'"),
            "&lt;script&gt;&quot;&amp;&#39;"
        );
    }
}
