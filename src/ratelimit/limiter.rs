//! Core rate limiter implementation.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info, trace, warn};

use super::window::History;
use crate::config::RateLimitConfig;
use crate::error::{BookshelfError, Result};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request was admitted and recorded.
    Admitted {
        /// Admissions left in the current window after this one
        remaining: u32,
    },
    /// The client has used its quota; nothing was recorded.
    Rejected {
        /// How long until the oldest recorded admission leaves the window
        retry_after: Duration,
    },
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted { .. })
    }

    /// Convert into a `Result`, mapping rejection to
    /// [`BookshelfError::RateLimitExceeded`].
    pub fn into_result(self) -> Result<u32> {
        match self {
            Decision::Admitted { remaining } => Ok(remaining),
            Decision::Rejected { retry_after } => {
                Err(BookshelfError::RateLimitExceeded { retry_after })
            }
        }
    }
}

/// Per-client sliding-window rate limiter.
///
/// Each client's admission history lives in a sharded map. An admission
/// check holds the write guard for that client's shard for its whole
/// prune/count/record sequence, so two concurrent checks for the same client
/// can never both see room under the quota. Checks for clients on other
/// shards proceed in parallel.
pub struct RateLimiter {
    /// Admission histories indexed by client key
    clients: DashMap<String, History>,
    /// Maximum admissions per client per window
    quota: u32,
    /// Length of the rolling window
    window: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter.
    ///
    /// Fails if `window` is zero. A quota of zero is accepted and rejects
    /// every request.
    pub fn new(quota: u32, window: Duration) -> Result<Self> {
        if window.is_zero() {
            return Err(BookshelfError::Config(
                "rate limit window must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            clients: DashMap::new(),
            quota,
            window,
        })
    }

    /// Create a rate limiter from configuration.
    pub fn from_config(config: &RateLimitConfig) -> Result<Self> {
        let quota = config.quota.ok_or_else(|| {
            BookshelfError::Config("rate_limit.quota must be set explicitly".to_string())
        })?;
        Self::new(quota, config.window())
    }

    /// Decide whether to admit a request from `key` at `now`, recording it
    /// if admitted.
    ///
    /// Stale entries are pruned first. A rejected request leaves the history
    /// as pruned and adds nothing to it.
    pub fn check_and_record(&self, key: &str, now: Instant) -> Decision {
        let mut history = self.clients.entry(key.to_string()).or_default();

        history.prune(now, self.window);
        let count = history.len();

        if count >= self.quota as usize {
            let retry_after = history.time_until_slot(now, self.window);
            drop(history);

            warn!(
                client = %key,
                count,
                quota = self.quota,
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );
            return Decision::Rejected { retry_after };
        }

        history.record(now);
        let remaining = self.quota - (count as u32 + 1);
        drop(history);

        trace!(client = %key, remaining, "Request admitted");
        Decision::Admitted { remaining }
    }

    /// Clear every client's history.
    ///
    /// Intended for administrative use and test isolation.
    pub fn reset(&self) {
        info!(clients = self.clients.len(), "Resetting rate limiter");
        self.clients.clear();
    }

    /// Prune every history and drop clients left with nothing on record.
    ///
    /// Returns the number of clients dropped.
    pub fn sweep_idle(&self, now: Instant) -> usize {
        let window = self.window;
        let mut dropped = 0;

        self.clients.retain(|_, history| {
            history.prune(now, window);
            if history.is_empty() {
                dropped += 1;
                false
            } else {
                true
            }
        });

        debug!(dropped, remaining = self.clients.len(), "Swept idle clients");
        dropped
    }

    /// Maximum admissions per client per window.
    pub fn quota(&self) -> u32 {
        self.quota
    }

    /// Length of the rolling window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of clients currently tracked.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Number of admissions on record for `key`, as of its last check.
    ///
    /// Returns `None` if the client has never been seen.
    pub fn history_len(&self, key: &str) -> Option<usize> {
        self.clients.get(key).map(|h| h.len())
    }
}
