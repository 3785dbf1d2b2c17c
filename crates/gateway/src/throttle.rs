use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::debug;

use crate::error::ApiError;
use crate::server::AppState;

const MAX_TRACKED_CLIENTS: usize = 10_000;

/// Allows each client address at most one request per `min_interval`.
pub struct ClientThrottle {
    limiter: Option<DefaultKeyedRateLimiter<IpAddr>>,
}

impl ClientThrottle {
    /// A zero interval disables throttling.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            limiter: Quota::with_period(min_interval).map(RateLimiter::keyed),
        }
    }

    /// Records the request and reports whether it may proceed.
    pub fn check(&self, client: IpAddr) -> bool {
        let Some(limiter) = &self.limiter else {
            return true;
        };

        let allowed = limiter.check_key(&client).is_ok();
        if limiter.len() > MAX_TRACKED_CLIENTS {
            limiter.retain_recent();
        }
        allowed
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.as_ref().map_or(0, |limiter| limiter.len())
    }
}

/// Middleware: rejects requests from clients that call too often.
/// Requests without a known peer address pass through.
pub async fn throttle(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(ConnectInfo(addr)) = peer {
        if !state.throttle.check(addr.ip()) {
            debug!("Throttled request from {}", addr);
            return ApiError::rate_limited().into_response();
        }
    }
    next.run(request).await
}
