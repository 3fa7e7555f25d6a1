//! Per-IP rate limiting for the open verification endpoints
//!
//! Fixed-window counters in Redis (INCR + EXPIRE, one window key per client
//! and period). When Redis is unavailable the limiter falls back to an
//! in-process window, and fails open if that is unusable too: the
//! verification flow has its own per-email backoff, so an unavailable
//! limiter degrades to that slower protection instead of blocking sign-ups.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::RateLimitConfig;
use crate::error::AppError;
use crate::middleware::client_ip::client_ip;

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

#[derive(Debug, Clone, Copy)]
struct FallbackWindow {
    window: u64,
    count: u64,
}

/// Fixed-window limiter keyed by client IP
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    redis: Option<ConnectionManager>,
    fallback: Arc<Mutex<HashMap<String, FallbackWindow>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, redis: Option<ConnectionManager>) -> Self {
        Self {
            config,
            redis,
            fallback: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check and count one request for `key`.
    pub async fn check(&self, key: &str) -> RateLimitDecision {
        if !self.config.enabled || self.config.window_secs == 0 {
            return RateLimitDecision::Allowed;
        }

        if let Some(conn) = &self.redis {
            match self.check_redis(conn.clone(), key).await {
                Ok(decision) => return decision,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Rate-limit backend unavailable, using in-process window"
                    );
                    counter!("patio_rate_limit_backend_errors_total").increment(1);
                }
            }
        }

        self.check_fallback(key)
    }

    async fn check_redis(
        &self,
        mut conn: ConnectionManager,
        key: &str,
    ) -> Result<RateLimitDecision, redis::RedisError> {
        let now = epoch_secs();
        let window = now / self.config.window_secs;
        let redis_key = format!("ratelimit:{}:{}", key, window);

        let count: u64 = conn.incr(&redis_key, 1u64).await?;
        if count == 1 {
            // Window keys expire on their own; +1 covers clock-edge slack.
            let _: () = conn
                .expire(&redis_key, self.config.window_secs as i64 + 1)
                .await?;
        }

        Ok(self.decide(count, now))
    }

    fn check_fallback(&self, key: &str) -> RateLimitDecision {
        let now = epoch_secs();
        let window = now / self.config.window_secs;

        let mut map = match self.fallback.lock() {
            Ok(map) => map,
            Err(_) => return RateLimitDecision::Allowed,
        };

        // Drop stale windows so the map stays bounded.
        map.retain(|_, state| state.window == window);

        let state = map
            .entry(key.to_string())
            .or_insert(FallbackWindow { window, count: 0 });
        state.count += 1;

        self.decide(state.count, now)
    }

    fn decide(&self, count: u64, now: u64) -> RateLimitDecision {
        if count > self.config.max_requests {
            RateLimitDecision::Limited {
                retry_after_secs: self.config.window_secs - (now % self.config.window_secs),
            }
        } else {
            RateLimitDecision::Allowed
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Rate-limit middleware; keys on the derived client IP.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_ip(request.headers()).unwrap_or_else(|| "unknown".to_string());

    match limiter.check(&key).await {
        RateLimitDecision::Allowed => next.run(request).await,
        RateLimitDecision::Limited { retry_after_secs } => {
            let path = request.uri().path().to_string();
            tracing::warn!(path = %path, client = %key, "Request rate-limited");
            counter!("patio_rate_limit_throttled_total", "path" => path).increment(1);
            AppError::TooManyRequests {
                seconds_until_next_attempt: retry_after_secs,
            }
            .into_response()
        }
    }
}
