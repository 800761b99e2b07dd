//! Fixed-window admission gate
//!
//! Each route class has its own `(window, max, message)` policy. Counters are
//! keyed by `(route class, client IP)`. A window opens on the first request
//! for a key and closes exactly `window` later; windows do not slide, so a
//! burst straddling a boundary may admit up to `2 × max` requests.
//!
//! Per-class maxima can be overridden via environment variables:
//! - `RATE_LIMIT_GENERAL_MAX` (default: 100 per 15 minutes)
//! - `RATE_LIMIT_CHAT_MAX` (default: 30 per minute)
//! - `RATE_LIMIT_LEAD_MAX` (default: 10 per hour)
//! - `RATE_LIMIT_CONFIG_MAX` (default: 20 per hour)

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;

/// Route classes with independently configured quotas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    General,
    Chat,
    LeadSubmission,
    ConfigUpdate,
}

impl RouteClass {
    pub const ALL: [RouteClass; 4] = [
        RouteClass::General,
        RouteClass::Chat,
        RouteClass::LeadSubmission,
        RouteClass::ConfigUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::General => "general",
            RouteClass::Chat => "chat",
            RouteClass::LeadSubmission => "lead",
            RouteClass::ConfigUpdate => "config",
        }
    }

    /// Environment variable overriding this class's `max`
    pub fn max_env_var(&self) -> &'static str {
        match self {
            RouteClass::General => "RATE_LIMIT_GENERAL_MAX",
            RouteClass::Chat => "RATE_LIMIT_CHAT_MAX",
            RouteClass::LeadSubmission => "RATE_LIMIT_LEAD_MAX",
            RouteClass::ConfigUpdate => "RATE_LIMIT_CONFIG_MAX",
        }
    }

    pub fn default_policy(&self) -> RateLimitPolicy {
        match self {
            RouteClass::General => RateLimitPolicy::new(
                Duration::from_secs(15 * 60),
                100,
                "Too many requests from this IP, please try again later.",
            ),
            RouteClass::Chat => RateLimitPolicy::new(
                Duration::from_secs(60),
                30,
                "Too many chat requests, please slow down.",
            ),
            RouteClass::LeadSubmission => RateLimitPolicy::new(
                Duration::from_secs(60 * 60),
                10,
                "Too many lead submissions, please try again later.",
            ),
            RouteClass::ConfigUpdate => RateLimitPolicy::new(
                Duration::from_secs(60 * 60),
                20,
                "Too many configuration updates, please try again later.",
            ),
        }
    }
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quota for one route class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub max_requests: u32,
    /// Body of the 429 response
    pub message: String,
}

impl RateLimitPolicy {
    pub fn new(window: Duration, max_requests: u32, message: impl Into<String>) -> Self {
        Self {
            window,
            max_requests,
            message: message.into(),
        }
    }

    /// Same policy with a different maximum
    pub fn with_max(mut self, max_requests: u32) -> Self {
        self.max_requests = max_requests;
        self
    }
}

/// Result of counting one request against a window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window closes
    pub reset_after: Duration,
    pub window: Duration,
}

impl RateLimitDecision {
    /// Decision used when the counter backend cannot be reached
    pub fn fail_open(policy: &RateLimitPolicy) -> Self {
        Self {
            allowed: true,
            limit: policy.max_requests,
            remaining: policy.max_requests,
            reset_after: policy.window,
            window: policy.window,
        }
    }

    /// Seconds until reset, rounded up
    pub fn reset_after_secs(&self) -> u64 {
        let secs = self.reset_after.as_secs();
        if self.reset_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for RateLimitError {
    fn from(err: redis::RedisError) -> Self {
        RateLimitError::Backend(err.to_string())
    }
}

/// Counter storage for the admission gate.
///
/// `hit` must be atomic per key: two concurrent hits on one key can never
/// both observe the same pre-increment count.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn hit(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, RateLimitError>;

    /// Drop windows that have closed
    async fn cleanup(&self) {}
}

#[derive(Debug, Clone, Copy)]
struct FixedWindow {
    count: u32,
    started_at: Instant,
}

/// Process-local counters.
///
/// Uses the map's per-entry lock for compare-and-increment, so unrelated
/// clients never contend on a global lock.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    windows: DashMap<String, FixedWindow>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a request observed at `now`
    pub fn hit_at(&self, key: &str, policy: &RateLimitPolicy, now: Instant) -> RateLimitDecision {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(FixedWindow {
                count: 0,
                started_at: now,
            });

        // Window closes exactly at started_at + window
        if now.saturating_duration_since(entry.started_at) >= policy.window {
            entry.count = 0;
            entry.started_at = now;
        }

        let allowed = entry.count < policy.max_requests;
        if allowed {
            entry.count += 1;
        }

        let elapsed = now.saturating_duration_since(entry.started_at);
        RateLimitDecision {
            allowed,
            limit: policy.max_requests,
            remaining: policy.max_requests.saturating_sub(entry.count),
            reset_after: policy.window.saturating_sub(elapsed),
            window: policy.window,
        }
    }

    /// Drop windows older than `max_window` as of `now`
    pub fn cleanup_at(&self, max_window: Duration, now: Instant) {
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started_at) < max_window);
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Longest window of the built-in policies
const LONGEST_DEFAULT_WINDOW: Duration = Duration::from_secs(60 * 60);

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn hit(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, RateLimitError> {
        Ok(self.hit_at(key, policy, Instant::now()))
    }

    async fn cleanup(&self) {
        self.cleanup_at(LONGEST_DEFAULT_WINDOW, Instant::now());
    }
}

/// Lua compare-and-increment: only increments while below max, sets the
/// window expiry on the first hit so the window never moves afterwards.
const FIXED_WINDOW_SCRIPT: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
local max = tonumber(ARGV[1])
if current >= max then
  return {0, current, redis.call('PTTL', KEYS[1])}
end
current = redis.call('INCR', KEYS[1])
if current == 1 then
  redis.call('PEXPIRE', KEYS[1], ARGV[2])
end
return {1, current, redis.call('PTTL', KEYS[1])}
"#;

/// Counters shared across server processes, same window semantics as
/// [`MemoryRateLimitStore`]
#[derive(Clone)]
pub struct RedisRateLimitStore {
    conn: ConnectionManager,
    script: Arc<redis::Script>,
}

impl RedisRateLimitStore {
    pub async fn connect(redis_url: &str) -> Result<Self, RateLimitError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            script: Arc::new(redis::Script::new(FIXED_WINDOW_SCRIPT)),
        })
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn hit(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, RateLimitError> {
        let mut conn = self.conn.clone();
        let window_ms = policy.window.as_millis() as u64;

        let (allowed, count, pttl): (i64, i64, i64) = self
            .script
            .key(format!("ratelimit:{}", key))
            .arg(policy.max_requests)
            .arg(window_ms)
            .invoke_async(&mut conn)
            .await?;

        // PTTL is negative when the key has no expiry; treat as a full window
        let reset_ms = if pttl < 0 { window_ms } else { pttl as u64 };
        let count = u32::try_from(count.max(0)).unwrap_or(u32::MAX);

        Ok(RateLimitDecision {
            allowed: allowed == 1,
            limit: policy.max_requests,
            remaining: policy.max_requests.saturating_sub(count),
            reset_after: Duration::from_millis(reset_ms),
            window: policy.window,
        })
    }
}

/// Admission gate: one policy per route class over a shared counter store
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    general: RateLimitPolicy,
    chat: RateLimitPolicy,
    lead: RateLimitPolicy,
    config: RateLimitPolicy,
}

impl RateLimiter {
    /// Gate with the built-in policies over process-local counters
    pub fn new_in_memory() -> Self {
        Self::with_store(Arc::new(MemoryRateLimitStore::new()))
    }

    pub fn with_store(store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            store,
            general: RouteClass::General.default_policy(),
            chat: RouteClass::Chat.default_policy(),
            lead: RouteClass::LeadSubmission.default_policy(),
            config: RouteClass::ConfigUpdate.default_policy(),
        }
    }

    /// Replace the policy for one class
    pub fn with_policy(mut self, class: RouteClass, policy: RateLimitPolicy) -> Self {
        match class {
            RouteClass::General => self.general = policy,
            RouteClass::Chat => self.chat = policy,
            RouteClass::LeadSubmission => self.lead = policy,
            RouteClass::ConfigUpdate => self.config = policy,
        }
        self
    }

    pub fn policy(&self, class: RouteClass) -> &RateLimitPolicy {
        match class {
            RouteClass::General => &self.general,
            RouteClass::Chat => &self.chat,
            RouteClass::LeadSubmission => &self.lead,
            RouteClass::ConfigUpdate => &self.config,
        }
    }

    /// Count one request from `client_ip` against `class`.
    ///
    /// A backend failure admits the request.
    pub async fn check(&self, class: RouteClass, client_ip: &str) -> RateLimitDecision {
        let policy = self.policy(class);
        let key = format!("{}:{}", class.as_str(), client_ip);

        match self.store.hit(&key, policy).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(
                    route_class = %class,
                    client_ip = %client_ip,
                    error = %e,
                    "Rate limit backend failed, admitting request"
                );
                RateLimitDecision::fail_open(policy)
            }
        }
    }

    /// Clean up closed windows
    pub async fn cleanup(&self) {
        self.store.cleanup().await;
    }
}
