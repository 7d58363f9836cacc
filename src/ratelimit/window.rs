//! Per-client request history for sliding-window rate limiting.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Admission times for a single client, oldest first.
///
/// Entries are appended in call order and pruned by age, so the front of the
/// queue is always the oldest admission still on record.
#[derive(Debug, Clone, Default)]
pub struct History {
    admitted: VecDeque<Instant>,
}

impl History {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry at least `window` old relative to `now`.
    ///
    /// The window is half-open, `(now - window, now]`: an entry exactly
    /// `window` old is expired. Pruning filters by age rather than trimming
    /// the front, so out-of-order timestamps are still handled.
    pub fn prune(&mut self, now: Instant, window: Duration) {
        self.admitted
            .retain(|&t| now.saturating_duration_since(t) < window);
    }

    /// Record an admission at `now`.
    pub fn record(&mut self, now: Instant) {
        self.admitted.push_back(now);
    }

    /// Number of admissions on record.
    pub fn len(&self) -> usize {
        self.admitted.len()
    }

    /// Whether the history holds no admissions.
    pub fn is_empty(&self) -> bool {
        self.admitted.is_empty()
    }

    /// Time until the oldest entry leaves the window.
    ///
    /// Returns the full window when there is nothing on record.
    pub fn time_until_slot(&self, now: Instant, window: Duration) -> Duration {
        match self.admitted.iter().min() {
            Some(&oldest) => window.saturating_sub(now.saturating_duration_since(oldest)),
            None => window,
        }
    }
}
