use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bookshelf::books::BookStore;
use bookshelf::config::{BookshelfConfig, LoggingConfig};
use bookshelf::http::{AppState, HttpServer, RequestGate};
use bookshelf::ratelimit::{
    spawn_sweeper, ClientKeyResolver, ForwardedForResolver, PeerAddrResolver, RateLimiter,
};

/// Command line arguments. Flags override values from the config file and
/// environment.
#[derive(Parser, Debug)]
#[command(name = "bookshelf", version, about = "Library catalog API with per-client rate limiting")]
struct Args {
    /// Path to a configuration file (YAML, TOML or JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Requests admitted per client per window
    #[arg(long)]
    quota: Option<u32>,

    /// Rate limit window in seconds
    #[arg(long)]
    window_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = BookshelfConfig::load(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.server.http_addr = addr;
    }
    if let Some(quota) = args.quota {
        config.rate_limit.quota = Some(quota);
    }
    if let Some(window_secs) = args.window_secs {
        config.rate_limit.window_secs = window_secs;
    }

    init_tracing(&config.logging);

    info!("Starting Bookshelf");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    config.validate()?;
    info!(http_addr = %config.server.http_addr, "Configuration loaded");

    let rate_limiter = Arc::new(RateLimiter::from_config(&config.rate_limit)?);
    info!(
        quota = rate_limiter.quota(),
        window = ?rate_limiter.window(),
        "Rate limiter initialized"
    );

    let resolver: Arc<dyn ClientKeyResolver> = if config.rate_limit.trust_forwarded_headers {
        Arc::new(ForwardedForResolver)
    } else {
        Arc::new(PeerAddrResolver)
    };

    let books = Arc::new(BookStore::new());
    books.seed();
    info!(books = books.len(), "Catalog seeded");

    let sweeper = spawn_sweeper(Arc::clone(&rate_limiter), config.rate_limit.sweep_interval());

    let state = AppState::new(books, RequestGate::new(rate_limiter, resolver));
    HttpServer::new(config.server.http_addr, state)
        .serve_with_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Bookshelf stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
