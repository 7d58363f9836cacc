//! Rate limiting logic and state management.

mod key;
mod limiter;
mod sweeper;
mod window;

pub use key::{ClientKey, ClientKeyResolver, ForwardedForResolver, PeerAddrResolver, UNKNOWN_CLIENT};
pub use limiter::{Decision, RateLimiter};
pub use sweeper::spawn_sweeper;
pub use window::History;
