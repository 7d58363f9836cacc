//! Admission control applied in front of every route.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::ratelimit::{ClientKeyResolver, RateLimiter};

/// Header carrying the configured quota on admitted responses.
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
/// Header carrying the admissions left in the window on admitted responses.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Resolves the caller and consults the rate limiter before a request is
/// dispatched. Holds no state of its own.
#[derive(Clone)]
pub struct RequestGate {
    limiter: Arc<RateLimiter>,
    resolver: Arc<dyn ClientKeyResolver>,
}

impl RequestGate {
    pub fn new(limiter: Arc<RateLimiter>, resolver: Arc<dyn ClientKeyResolver>) -> Self {
        Self { limiter, resolver }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

/// Middleware entry point: reject with 429 or pass the request through.
pub async fn enforce(State(gate): State<RequestGate>, request: Request, next: Next) -> Response {
    let key = gate.resolver.resolve(&request);

    let remaining = match gate
        .limiter
        .check_and_record(key.as_str(), Instant::now())
        .into_result()
    {
        Ok(remaining) => remaining,
        Err(err) => {
            debug!(client = %key, path = %request.uri().path(), "Request rejected");
            return err.into_response();
        }
    };

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(LIMIT_HEADER, HeaderValue::from(gate.limiter.quota()));
    headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));
    response
}
