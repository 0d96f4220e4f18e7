//! Per-client fixed-window request limiting.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::ApiError;

pub const DEFAULT_MAX_REQUESTS: u32 = 100;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10 * 60);

const RATELIMIT_LIMIT: &str = "ratelimit-limit";
const RATELIMIT_REMAINING: &str = "ratelimit-remaining";
const RATELIMIT_RESET: &str = "ratelimit-reset";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per client within one window
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32, reset: Duration },
    Limited { reset: Duration },
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Counts requests per client address in fixed windows
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    clients: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count one request from `client` at `now`
    pub async fn check(&self, client: IpAddr, now: Instant) -> RateDecision {
        let mut clients = self.clients.lock().await;
        let window = clients.entry(client).or_insert(Window { started: now, count: 0 });

        if now.duration_since(window.started) >= self.config.window {
            window.started = now;
            window.count = 0;
        }

        let reset = self
            .config
            .window
            .saturating_sub(now.duration_since(window.started));

        if window.count >= self.config.max_requests {
            return RateDecision::Limited { reset };
        }

        window.count += 1;
        RateDecision::Allowed {
            remaining: self.config.max_requests - window.count,
            reset,
        }
    }

    /// Drop windows that have fully elapsed, returning how many went
    pub async fn prune(&self, now: Instant) -> usize {
        let mut clients = self.clients.lock().await;
        let before = clients.len();
        let window = self.config.window;
        clients.retain(|_, w| now.duration_since(w.started) < window);
        let pruned = before - clients.len();
        if pruned > 0 {
            debug!("Pruned {} expired rate-limit windows", pruned);
        }
        pruned
    }

    fn limited_message(&self) -> String {
        let minutes = (self.config.window.as_secs() / 60).max(1);
        format!(
            "Too many requests from this IP, please try again after {} minutes.",
            minutes
        )
    }
}

/// Middleware applying [`RateLimiter`] to every request
pub async fn rate_limit(State(limiter): State<Arc<RateLimiter>>, request: Request, next: Next) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    let limit = limiter.config().max_requests;
    match limiter.check(client, Instant::now()).await {
        RateDecision::Allowed { remaining, reset } => {
            let mut response = next.run(request).await;
            set_headers(&mut response, limit, remaining, reset);
            response
        }
        RateDecision::Limited { reset } => {
            warn!("Rate limit exceeded for {}", client);
            let mut response = ApiError::TooManyRequests(limiter.limited_message()).into_response();
            set_headers(&mut response, limit, 0, reset);
            response
        }
    }
}

fn set_headers(response: &mut Response, limit: u32, remaining: u32, reset: Duration) {
    let headers = response.headers_mut();
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(RATELIMIT_RESET, HeaderValue::from(reset.as_secs().max(1)));
}
