//! Client identity for quota tracking.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};

/// Key used when nothing about the request identifies the caller.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// A key that identifies a caller for rate limiting purposes.
///
/// Never empty: resolvers fall back to [`UNKNOWN_CLIENT`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    /// Create a key from any non-empty identifier.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let id = id.trim();
        if id.is_empty() {
            Self(UNKNOWN_CLIENT.to_string())
        } else {
            Self(id.to_string())
        }
    }

    /// The fallback key.
    pub fn unknown() -> Self {
        Self(UNKNOWN_CLIENT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps an inbound request to the client it should be counted against.
pub trait ClientKeyResolver: Send + Sync {
    /// Resolve the client key for a request.
    fn resolve(&self, request: &Request) -> ClientKey;
}

/// Keys clients by the IP of the connected peer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerAddrResolver;

impl ClientKeyResolver for PeerAddrResolver {
    fn resolve(&self, request: &Request) -> ClientKey {
        peer_ip(request)
            .map(ClientKey::new)
            .unwrap_or_else(ClientKey::unknown)
    }
}

/// Keys clients by `X-Forwarded-For`, then `X-Real-IP`, then the peer IP.
///
/// Only safe behind a proxy that overwrites these headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardedForResolver;

impl ClientKeyResolver for ForwardedForResolver {
    fn resolve(&self, request: &Request) -> ClientKey {
        let headers = request.headers();

        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
            })
            .map(ClientKey::new)
            .or_else(|| peer_ip(request).map(ClientKey::new))
            .unwrap_or_else(ClientKey::unknown)
    }
}

fn peer_ip(request: &Request) -> Option<String> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}
