//! Configuration management for Bookshelf.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{BookshelfError, Result};

/// Prefix for environment overrides, e.g. `BOOKSHELF__RATE_LIMIT__QUOTA=5`.
const ENV_PREFIX: &str = "BOOKSHELF";

/// Main configuration for the Bookshelf service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookshelfConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests admitted per client per window. There is no default: a
    /// deployment has to say what it wants.
    #[serde(default)]
    pub quota: Option<u32>,

    /// Length of the rolling window in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// How often idle clients are dropped from the limiter, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Key clients by `X-Forwarded-For` / `X-Real-IP` instead of the peer address
    #[serde(default)]
    pub trust_forwarded_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            quota: None,
            window_secs: default_window_secs(),
            sweep_interval_secs: default_sweep_interval(),
            trust_forwarded_headers: false,
        }
    }
}

fn default_window_secs() -> u64 {
    60
}

fn default_sweep_interval() -> u64 {
    60
}

impl RateLimitConfig {
    /// Rolling window as a `Duration`.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Sweep interval as a `Duration`.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl BookshelfConfig {
    /// Load configuration from an optional file, layered under environment
    /// variables prefixed with `BOOKSHELF__`.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let config: BookshelfConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Reject configurations the service cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.quota.is_none() {
            return Err(BookshelfError::Config(
                "rate_limit.quota must be set explicitly".to_string(),
            ));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(BookshelfError::Config(
                "rate_limit.window_secs must be greater than zero".to_string(),
            ));
        }
        if self.rate_limit.sweep_interval_secs == 0 {
            return Err(BookshelfError::Config(
                "rate_limit.sweep_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
