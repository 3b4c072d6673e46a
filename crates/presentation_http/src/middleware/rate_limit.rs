//! Rate limiting middleware
//!
//! Token bucket per client IP. A bucket holds one minute's budget and
//! refills continuously, so bursts up to the budget are allowed.

use std::{
    collections::HashMap,
    future::Future,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request},
    response::{IntoResponse, Response},
};
use infrastructure::ServerConfig;
use tokio::{sync::RwLock, task::JoinHandle};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::error::ApiError;

/// Rate limiter configuration
#[derive(Clone, Debug)]
pub struct RateLimiterConfig {
    /// Maximum requests per minute per client
    pub requests_per_minute: u32,
    /// Enable rate limiting
    pub enabled: bool,
    /// Peers whose `X-Forwarded-For` header is believed
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            enabled: true,
            trusted_proxies: Vec::new(),
        }
    }
}

impl From<&ServerConfig> for RateLimiterConfig {
    fn from(server: &ServerConfig) -> Self {
        Self {
            requests_per_minute: server.rate_limit_rpm,
            enabled: server.rate_limit_enabled,
            trusted_proxies: server.trusted_proxies.clone(),
        }
    }
}

/// Token bucket entry for a single IP
#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(max_tokens: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_update: Instant::now(),
        }
    }

    /// Refill, then take one token if available
    fn try_consume(&mut self, tokens_per_second: f64, max_tokens: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = elapsed
            .mul_add(tokens_per_second, self.tokens)
            .min(max_tokens);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whole seconds until one token is available again
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn seconds_until_token(&self, tokens_per_second: f64) -> u64 {
        let missing = (1.0 - self.tokens).max(0.0);
        ((missing / tokens_per_second).ceil() as u64).max(1)
    }
}

/// Shared rate limiter state
#[derive(Debug)]
pub struct RateLimiterState {
    buckets: RwLock<HashMap<IpAddr, TokenBucket>>,
    tokens_per_second: f64,
    max_tokens: f64,
}

impl RateLimiterState {
    /// Create a new rate limiter state
    #[must_use]
    pub fn new(requests_per_minute: u32) -> Self {
        let max_tokens = f64::from(requests_per_minute);
        Self {
            buckets: RwLock::new(HashMap::new()),
            tokens_per_second: max_tokens / 60.0,
            max_tokens,
        }
    }

    /// Take one request from `ip`'s budget
    ///
    /// # Errors
    ///
    /// Returns the number of seconds to wait when the budget is exhausted.
    #[allow(clippy::significant_drop_tightening)]
    pub async fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let mut buckets = self.buckets.write().await;

        let bucket = buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::new(self.max_tokens));

        if bucket.try_consume(self.tokens_per_second, self.max_tokens) {
            Ok(())
        } else {
            Err(bucket.seconds_until_token(self.tokens_per_second))
        }
    }

    /// Drop entries idle for longer than `older_than`; returns how many
    pub async fn cleanup(&self, older_than: Duration) -> usize {
        let mut buckets = self.buckets.write().await;
        let cutoff = Instant::now()
            .checked_sub(older_than)
            .unwrap_or_else(Instant::now);

        let before = buckets.len();
        buckets.retain(|_, bucket| bucket.last_update > cutoff);
        before - buckets.len()
    }

    /// Number of tracked clients
    pub async fn tracked_clients(&self) -> usize {
        self.buckets.read().await.len()
    }
}

/// Periodically sweep idle buckets so the map does not grow without bound
///
/// `interval` must be non-zero.
pub fn spawn_cleanup_task(
    state: Arc<RateLimiterState>,
    interval: Duration,
    max_age: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = state.cleanup(max_age).await;
            if removed > 0 {
                let remaining = state.tracked_clients().await;
                debug!(removed, remaining, "Swept idle rate limiter entries");
            }
        }
    })
}

/// Layer that applies rate limiting
#[derive(Clone, Debug)]
pub struct RateLimiterLayer {
    state: Arc<RateLimiterState>,
    enabled: bool,
    trusted_proxies: Arc<[IpAddr]>,
    excluded_paths: Vec<String>,
}

impl RateLimiterLayer {
    /// Create a new rate limiter layer
    #[must_use]
    pub fn new(config: &RateLimiterConfig) -> Self {
        Self {
            state: Arc::new(RateLimiterState::new(config.requests_per_minute)),
            enabled: config.enabled,
            trusted_proxies: config.trusted_proxies.clone().into(),
            excluded_paths: vec!["/health".to_string(), "/ready".to_string()],
        }
    }

    /// Shared state, for the cleanup task
    #[must_use]
    pub fn state(&self) -> Arc<RateLimiterState> {
        Arc::clone(&self.state)
    }
}

impl<S> Layer<S> for RateLimiterLayer {
    type Service = RateLimiter<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimiter {
            inner,
            state: Arc::clone(&self.state),
            enabled: self.enabled,
            trusted_proxies: Arc::clone(&self.trusted_proxies),
            excluded_paths: self.excluded_paths.clone(),
        }
    }
}

/// Middleware service for rate limiting
#[derive(Clone, Debug)]
pub struct RateLimiter<S> {
    inner: S,
    state: Arc<RateLimiterState>,
    enabled: bool,
    trusted_proxies: Arc<[IpAddr]>,
    excluded_paths: Vec<String>,
}

impl<S> Service<Request> for RateLimiter<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let enabled = self.enabled;
        let state = Arc::clone(&self.state);
        let excluded = self
            .excluded_paths
            .iter()
            .any(|p| req.uri().path().starts_with(p.as_str()));
        let client_ip = client_ip(&req, &self.trusted_proxies);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if !enabled || excluded {
                return inner.call(req).await;
            }

            match state.check(client_ip).await {
                Ok(()) => inner.call(req).await,
                Err(retry_after_secs) => {
                    warn!(%client_ip, retry_after_secs, "Rate limit exceeded");
                    Ok(ApiError::RateLimited { retry_after_secs }.into_response())
                },
            }
        })
    }
}

/// Client address: the connection peer, or the first `X-Forwarded-For`
/// hop when the peer is a trusted proxy
fn client_ip(req: &Request, trusted_proxies: &[IpAddr]) -> IpAddr {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if peer.is_some_and(|p| trusted_proxies.contains(&p)) {
        let forwarded = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|ip| ip.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
    }

    peer.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

#[cfg(test)]
mod tests {
    use axum::{Router, body::Body, http::StatusCode, routing::get};
    use tower::ServiceExt;

    use super::*;

    async fn test_handler() -> &'static str {
        "ok"
    }

    fn create_test_router(config: &RateLimiterConfig) -> Router {
        Router::new()
            .route("/test", get(test_handler))
            .route("/health", get(test_handler))
            .layer(RateLimiterLayer::new(config))
    }

    fn limited(rpm: u32) -> RateLimiterConfig {
        RateLimiterConfig {
            requests_per_minute: rpm,
            ..RateLimiterConfig::default()
        }
    }

    fn request(uri: &str, peer: Option<[u8; 4]>, forwarded: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(forwarded) = forwarded {
            builder = builder.header("x-forwarded-for", forwarded);
        }
        let mut req = builder.body(Body::empty()).unwrap();
        if let Some(peer) = peer {
            req.extensions_mut()
                .insert(ConnectInfo(SocketAddr::from((peer, 40000))));
        }
        req
    }

    async fn status(app: &Router, req: Request) -> StatusCode {
        app.clone().oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn rate_limit_disabled_passes_all_requests() {
        let app = create_test_router(&RateLimiterConfig {
            enabled: false,
            ..limited(1)
        });

        for _ in 0..10 {
            assert_eq!(status(&app, request("/test", None, None)).await, StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn rate_limit_blocks_after_budget() {
        let app = create_test_router(&limited(2));

        assert_eq!(status(&app, request("/test", None, None)).await, StatusCode::OK);
        assert_eq!(status(&app, request("/test", None, None)).await, StatusCode::OK);

        let response = app.clone().oneshot(request("/test", None, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
    }

    #[tokio::test]
    async fn health_endpoint_excluded_from_rate_limit() {
        let app = create_test_router(&limited(1));

        for _ in 0..5 {
            assert_eq!(status(&app, request("/health", None, None)).await, StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn clients_have_separate_budgets() {
        let app = create_test_router(&limited(1));

        let first = Some([192, 168, 0, 10]);
        let second = Some([192, 168, 0, 11]);
        assert_eq!(status(&app, request("/test", first, None)).await, StatusCode::OK);
        assert_eq!(
            status(&app, request("/test", first, None)).await,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(status(&app, request("/test", second, None)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn forwarded_for_ignored_from_untrusted_peer() {
        let app = create_test_router(&limited(1));
        let peer = Some([203, 0, 113, 5]);

        assert_eq!(
            status(&app, request("/test", peer, Some("198.51.100.1"))).await,
            StatusCode::OK
        );
        // A spoofed header does not buy a fresh budget
        assert_eq!(
            status(&app, request("/test", peer, Some("198.51.100.2"))).await,
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[tokio::test]
    async fn forwarded_for_honoured_from_trusted_proxy() {
        let app = create_test_router(&RateLimiterConfig {
            trusted_proxies: vec!["10.0.0.1".parse().unwrap()],
            ..limited(1)
        });
        let proxy = Some([10, 0, 0, 1]);

        assert_eq!(
            status(&app, request("/test", proxy, Some("198.51.100.1, 10.0.0.1"))).await,
            StatusCode::OK
        );
        assert_eq!(
            status(&app, request("/test", proxy, Some("198.51.100.2"))).await,
            StatusCode::OK
        );
        assert_eq!(
            status(&app, request("/test", proxy, Some("198.51.100.1"))).await,
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn token_bucket_refills_over_time() {
        let mut bucket = TokenBucket::new(1.0);

        assert!(bucket.try_consume(1.0, 1.0));
        assert!(!bucket.try_consume(1.0, 1.0));
        assert_eq!(bucket.seconds_until_token(1.0), 1);

        bucket.last_update = Instant::now()
            .checked_sub(Duration::from_secs(2))
            .expect("Time subtraction should succeed");

        assert!(bucket.try_consume(1.0, 1.0));
    }

    #[test]
    fn retry_after_reflects_refill_rate() {
        let bucket = TokenBucket {
            tokens: 0.0,
            last_update: Instant::now(),
        };
        // 6 requests per minute
        assert_eq!(bucket.seconds_until_token(0.1), 10);
    }

    #[tokio::test]
    async fn cleanup_removes_idle_entries() {
        let state = RateLimiterState::new(60);
        let fresh: IpAddr = "192.168.1.1".parse().unwrap();
        let idle: IpAddr = "192.168.1.2".parse().unwrap();

        state.check(fresh).await.unwrap();
        state.buckets.write().await.insert(
            idle,
            TokenBucket {
                tokens: 60.0,
                last_update: Instant::now()
                    .checked_sub(Duration::from_secs(1200))
                    .expect("Time subtraction should succeed"),
            },
        );
        assert_eq!(state.tracked_clients().await, 2);

        assert_eq!(state.cleanup(Duration::from_secs(600)).await, 1);
        assert_eq!(state.tracked_clients().await, 1);
        assert!(state.buckets.read().await.contains_key(&fresh));
    }

    #[test]
    fn config_from_server() {
        let server = ServerConfig {
            rate_limit_rpm: 30,
            trusted_proxies: vec!["10.0.0.1".parse().unwrap()],
            ..ServerConfig::default()
        };
        let config = RateLimiterConfig::from(&server);
        assert!(config.enabled);
        assert_eq!(config.requests_per_minute, 30);
        assert_eq!(config.trusted_proxies.len(), 1);
    }
}
