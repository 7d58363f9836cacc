//! Background removal of idle clients.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::limiter::RateLimiter;

/// Spawn a task that drops idle clients from `limiter` every `every`.
///
/// Active clients are self-bounding; this only reclaims keys for clients
/// that stopped sending requests.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval = ?every, "Idle client sweeper started");

        loop {
            ticker.tick().await;
            let dropped = limiter.sweep_idle(Instant::now());
            if dropped > 0 {
                debug!(dropped, "Dropped idle clients");
            }
        }
    })
}
