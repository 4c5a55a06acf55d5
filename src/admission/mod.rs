//! Per-client admission control for the upload endpoint.
//!
//! A sliding-window log keyed by client IP: each client may start at most
//! `limit` uploads within any `window`. Rejected attempts are not recorded,
//! so a client that keeps hammering the endpoint is admitted again as soon
//! as its oldest accepted attempt ages out.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::RateLimitConfig;
use crate::server::error::ApiError;

/// Sliding-window rate limiter shared across all connections.
pub struct RateLimiter {
    clients: DashMap<IpAddr, VecDeque<Instant>>,
    limit: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            clients: DashMap::new(),
            limit: limit as usize,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests, config.window())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether `client` may start another upload at `now`.
    ///
    /// The entry lock serializes concurrent attempts from the same client,
    /// so two racing requests can never both take the last slot.
    pub fn admit(&self, client: IpAddr, now: Instant) -> bool {
        let mut attempts = self.clients.entry(client).or_default();
        prune(&mut attempts, now, self.window);

        if attempts.len() >= self.limit {
            return false;
        }

        attempts.push_back(now);
        true
    }

    /// Drop clients with no attempt left inside the window.
    ///
    /// Returns the number of clients removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let before = self.clients.len();
        self.clients.retain(|_, attempts| {
            prune(attempts, now, self.window);
            !attempts.is_empty()
        });
        before.saturating_sub(self.clients.len())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

fn prune(attempts: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = attempts.front() {
        if now.saturating_duration_since(*oldest) >= window {
            attempts.pop_front();
        } else {
            break;
        }
    }
}

/// Periodically evict idle clients until `cancel` fires.
pub fn spawn_sweeper(
    limiter: Arc<RateLimiter>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = limiter.evict_idle(Instant::now());
                    if evicted > 0 {
                        tracing::debug!(
                            evicted,
                            tracked = limiter.tracked_clients(),
                            "Evicted idle rate-limit entries"
                        );
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
    })
}

/// Middleware that rejects uploads over the per-client budget with 429.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = addr.ip();

    if limiter.admit(client, Instant::now()) {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, "Upload rate limit exceeded");
        ApiError::RateLimited {
            retry_after: limiter.window(),
        }
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn admits_up_to_limit() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let now = Instant::now();
        for _ in 0..5 {
            assert!(limiter.admit(ip(1), now));
        }
        assert!(!limiter.admit(ip(1), now));
    }

    #[test]
    fn clients_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.admit(ip(1), now));
        assert!(!limiter.admit(ip(1), now));
        assert!(limiter.admit(ip(2), now));
    }

    #[test]
    fn window_slides() {
        let window = Duration::from_secs(60);
        let limiter = RateLimiter::new(2, window);
        let start = Instant::now();

        assert!(limiter.admit(ip(1), start));
        assert!(limiter.admit(ip(1), start + Duration::from_secs(30)));
        assert!(!limiter.admit(ip(1), start + Duration::from_secs(59)));

        // First attempt is exactly one window old and no longer counts
        assert!(limiter.admit(ip(1), start + window));
        assert!(!limiter.admit(ip(1), start + Duration::from_secs(61)));
    }

    #[test]
    fn rejected_attempts_are_not_recorded() {
        let window = Duration::from_secs(10);
        let limiter = RateLimiter::new(1, window);
        let start = Instant::now();

        assert!(limiter.admit(ip(1), start));
        for s in 1..10 {
            assert!(!limiter.admit(ip(1), start + Duration::from_secs(s)));
        }
        assert!(limiter.admit(ip(1), start + window));
    }

    #[test]
    fn evicts_only_idle_clients() {
        let window = Duration::from_secs(60);
        let limiter = RateLimiter::new(5, window);
        let start = Instant::now();

        limiter.admit(ip(1), start);
        limiter.admit(ip(2), start + Duration::from_secs(30));
        assert_eq!(limiter.tracked_clients(), 2);

        let evicted = limiter.evict_idle(start + Duration::from_secs(70));
        assert_eq!(evicted, 1);
        assert_eq!(limiter.tracked_clients(), 1);

        // Evicted client starts with a fresh budget
        assert!(limiter.admit(ip(1), start + Duration::from_secs(70)));
    }

    #[test]
    fn concurrent_attempts_never_exceed_limit() {
        let limiter = Arc::new(RateLimiter::new(5, Duration::from_secs(60)));
        let now = Instant::now();

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || limiter.admit(ip(7), now))
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 5);
    }

    #[tokio::test]
    async fn sweeper_stops_on_cancel() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::from_millis(10)));
        let cancel = CancellationToken::new();
        let handle = spawn_sweeper(limiter.clone(), Duration::from_millis(20), cancel.clone());

        limiter.admit(ip(1), Instant::now());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(limiter.tracked_clients(), 0);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
