//! Proxy request handling: routing, caching fetch, CONNECT tunneling, the
//! management console and the server accept loop.

pub mod console;
pub mod fetcher;
pub mod router;
pub mod server;
pub mod tunnel;
pub mod upstream;

pub use console::Console;
pub use fetcher::CachingFetcher;
pub use router::RequestRouter;
pub use server::ProxyServer;
pub use tunnel::TunnelEngine;
pub use upstream::{HttpUpstream, Upstream};
