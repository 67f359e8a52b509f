use std::collections::HashMap;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::warn;

use crate::{config::RateQuota, error::AuthError, state::AppState};

#[derive(Debug)]
struct RequestWindow {
    timestamps: Vec<OffsetDateTime>,
}

impl RequestWindow {
    fn new() -> Self {
        Self {
            timestamps: Vec::new(),
        }
    }

    fn cleanup_old_requests(&mut self, window: time::Duration) {
        let cutoff = OffsetDateTime::now_utc() - window;
        self.timestamps.retain(|ts| *ts > cutoff);
    }

    fn add_request(&mut self) {
        self.timestamps.push(OffsetDateTime::now_utc());
    }

    fn request_count(&self) -> usize {
        self.timestamps.len()
    }
}

/// Sliding-window request counter, one window per client key.
///
/// Counts live only in this process; a restart forgets them.
pub struct RateLimiter {
    windows: RwLock<HashMap<String, RequestWindow>>,
    quota: RateQuota,
}

impl RateLimiter {
    pub fn new(quota: RateQuota) -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            quota,
        }
    }

    /// Record a request for `key` and say whether it fit into the quota.
    pub async fn check_rate_limit(&self, key: &str) -> bool {
        let mut windows = self.windows.write().await;
        let window = windows
            .entry(key.to_string())
            .or_insert_with(RequestWindow::new);

        window.cleanup_old_requests(self.quota.window);

        if window.request_count() < self.quota.limit as usize {
            window.add_request();
            true
        } else {
            false
        }
    }

    /// Drop windows with no recent activity so idle clients do not
    /// accumulate forever.
    pub async fn cleanup(&self) {
        let mut windows = self.windows.write().await;
        windows.retain(|_, window| {
            window.cleanup_old_requests(self.quota.window);
            !window.timestamps.is_empty()
        });
    }
}

fn client_key(request: &Request) -> String {
    // Behind a proxy the peer address is the proxy itself; prefer the
    // first hop recorded in x-forwarded-for.
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware for the credential endpoints. Requests over quota get a 429
/// before any password work happens.
pub async fn throttle(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let key = client_key(&request);
    if !state.limiter.check_rate_limit(&key).await {
        warn!(client = %key, "rate limit exceeded");
        return Err(AuthError::RateLimited);
    }
    Ok(next.run(request).await)
}
