use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};

mod blocklist;
mod cache;
mod config;
mod error;
mod logger;
mod proxy;

use config::Config;
use logger::AccessLogger;
use proxy::ProxyServer;

#[derive(Parser)]
#[command(name = "wicket")]
#[command(about = "A caching forward HTTP/HTTPS proxy with a block list")]
struct Args {
    #[arg(short, long, default_value = "config/config.toml")]
    config: String,

    /// Override the configured listening address
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Override the configured protocol label (http or https)
    #[arg(short, long)]
    proto: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("wicket={}", level))
        .init();

    info!("Starting wicket proxy");

    // Load configuration; CLI flags override the file, and an invalid
    // protocol label refuses startup
    let mut config = Config::from_file(&args.config).await?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(proto) = args.proto {
        config.server.protocol = proto;
    }
    config.validate()?;

    // Set up access logging
    let access_logger = AccessLogger::new(config.logging.clone());
    access_logger.initialize().await?;

    let proxy_server = ProxyServer::new(config, access_logger);

    // Setup graceful shutdown
    let shutdown_signal = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        warn!("Received CTRL+C, shutting down...");
    };

    tokio::select! {
        result = proxy_server.run() => {
            if let Err(e) = result {
                tracing::error!("proxy server error: {}", e);
            }
        }
        _ = shutdown_signal => {
            info!("Shutdown signal received");
        }
    }

    info!("wicket shutdown complete");
    Ok(())
}
