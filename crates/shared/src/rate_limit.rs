//! Fixed-window request rate limiting
//!
//! Counts requests per key (the API keys it by client IP) inside a fixed
//! window. The counter lives either in process memory or in Redis; callers
//! only see [`RateLimiter::check`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use redis::{aio::ConnectionManager, AsyncCommands};
use tokio::sync::Mutex;

/// Upper bound on tracked keys for the in-memory backend.
/// Past this, expired windows are purged before a new key is inserted.
const MAX_TRACKED_KEYS: usize = 10_000;

/// Redis key prefix for rate limit counters
const REDIS_KEY_PREFIX: &str = "magshelf:ratelimit:";

/// Ceiling and window, injected from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

/// Outcome of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    count: u32,
}

#[derive(Clone)]
enum Backend {
    InMemory(Arc<Mutex<HashMap<String, Window>>>),
    Redis(ConnectionManager),
}

/// Rate limiter shared by all request tasks
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    backend: Backend,
}

impl RateLimiter {
    /// Counters held in this process
    pub fn new_in_memory(config: RateLimitConfig) -> Self {
        Self {
            config,
            backend: Backend::InMemory(Arc::new(Mutex::new(HashMap::new()))),
        }
    }

    /// Counters held in Redis, shared by every replica pointing at the same server
    pub async fn new_redis(redis_url: &str, config: RateLimitConfig) -> Result<Self, RateLimitError> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self {
            config,
            backend: Backend::Redis(manager),
        })
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Count one request for `key` and decide whether it may proceed
    pub async fn check(&self, key: &str) -> Result<RateLimitDecision, RateLimitError> {
        match &self.backend {
            Backend::InMemory(_) => Ok(self.check_at(key, Instant::now()).await),
            Backend::Redis(manager) => self.check_redis(manager.clone(), key).await,
        }
    }

    /// In-memory check against an explicit clock reading
    pub(crate) async fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let Backend::InMemory(windows) = &self.backend else {
            return RateLimitDecision::Allowed {
                remaining: self.config.max_requests,
            };
        };

        let mut windows = windows.lock().await;

        if windows.len() >= MAX_TRACKED_KEYS && !windows.contains_key(key) {
            let window = self.config.window;
            windows.retain(|_, w| now.saturating_duration_since(w.started_at) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(entry.started_at);
        if elapsed >= self.config.window {
            entry.started_at = now;
            entry.count = 0;
        }

        entry.count = entry.count.saturating_add(1);
        decide(
            entry.count,
            self.config.max_requests,
            self.config
                .window
                .saturating_sub(now.saturating_duration_since(entry.started_at)),
        )
    }

    async fn check_redis(
        &self,
        mut con: ConnectionManager,
        key: &str,
    ) -> Result<RateLimitDecision, RateLimitError> {
        let redis_key = format!("{}{}", REDIS_KEY_PREFIX, key);
        let window_secs = self.config.window.as_secs().max(1);

        let (count, ttl): (u32, i64) = redis::pipe()
            .atomic()
            .incr(&redis_key, 1)
            .ttl(&redis_key)
            .query_async(&mut con)
            .await?;

        // A counter without a TTL would never reset. Any request that sees
        // one (first hit, or an earlier EXPIRE that never landed) sets it.
        let window = redis_window(ttl, window_secs);
        if window.needs_expire {
            con.expire::<_, ()>(&redis_key, window_secs as i64).await?;
        }

        Ok(decide(
            count,
            self.config.max_requests,
            Duration::from_secs(window.remaining_secs),
        ))
    }

    /// Drop windows that have fully elapsed (in-memory backend only)
    pub async fn purge_expired(&self) -> usize {
        let Backend::InMemory(windows) = &self.backend else {
            return 0;
        };

        let now = Instant::now();
        let window = self.config.window;
        let mut windows = windows.lock().await;
        let before = windows.len();
        windows.retain(|_, w| now.saturating_duration_since(w.started_at) < window);
        before - windows.len()
    }

    /// Number of keys currently tracked in memory
    pub async fn tracked_keys(&self) -> usize {
        match &self.backend {
            Backend::InMemory(windows) => windows.lock().await.len(),
            Backend::Redis(_) => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RedisWindow {
    remaining_secs: u64,
    needs_expire: bool,
}

/// Interpret the `TTL` reply read alongside `INCR`.
/// `-1` means the key has no expiry, `-2` that it vanished in between.
fn redis_window(ttl: i64, window_secs: u64) -> RedisWindow {
    if ttl >= 0 {
        RedisWindow {
            remaining_secs: ttl as u64,
            needs_expire: false,
        }
    } else {
        RedisWindow {
            remaining_secs: window_secs,
            needs_expire: true,
        }
    }
}

fn decide(count: u32, max_requests: u32, retry_after: Duration) -> RateLimitDecision {
    if count > max_requests {
        RateLimitDecision::Limited {
            retry_after: retry_after.max(Duration::from_secs(1)),
        }
    } else {
        RateLimitDecision::Allowed {
            remaining: max_requests - count,
        }
    }
}
