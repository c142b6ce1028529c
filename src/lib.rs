//! # Wicket - a caching forward proxy with a block list
//!
//! Wicket is a forward HTTP/HTTPS proxy written in Rust. It relays
//! encrypted traffic transparently via CONNECT tunneling, caches plaintext
//! HTTP responses keyed by request URI with `Expires`-based revalidation,
//! and enforces a persisted block list over requested hosts, managed
//! through a small HTML console.
//!
//! ## Core behavior
//!
//! - **CONNECT tunneling**: dial with a bounded timeout, answer 200, then
//!   relay bytes opaquely in both directions until each side ends
//! - **Response caching**: insert-if-absent on first fetch, overwrite on
//!   revalidation, freshness recomputed from the stored `Expires` header
//! - **Block list**: newline-delimited file read fresh on every check;
//!   appends are visible on the next request
//!
//! ## Usage
//!
//! ```rust,no_run
//! use wicket::{config::Config, logger::AccessLogger, proxy::ProxyServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config/config.toml").await?;
//!     let access_logger = AccessLogger::new(config.logging.clone());
//!     access_logger.initialize().await?;
//!     let server = ProxyServer::new(config, access_logger);
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod blocklist;
pub mod cache;
pub mod config;
pub mod error;
pub mod logger;
pub mod proxy;

// Re-export commonly used types
pub use blocklist::{BlockListGuard, BlockStore, FileBlockStore};
pub use cache::{ResponseCache, StoreOutcome};
pub use error::{WicketError, WicketResult};
pub use proxy::{CachingFetcher, ProxyServer, RequestRouter, TunnelEngine};
