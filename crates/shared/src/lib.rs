//! widgetgate shared types and utilities
//!
//! Types, the domain normalizer and the admission-gate engine shared by the
//! API server and the embeddable widget client.

pub mod db;
pub mod domain;
pub mod error;
pub mod rate_limit;
pub mod types;

pub use domain::normalize_domain;
pub use error::{StoreError, StoreResult};
pub use rate_limit::{
    MemoryRateLimitStore, RateLimitDecision, RateLimitError, RateLimitPolicy, RateLimitStore,
    RateLimiter, RedisRateLimitStore, RouteClass,
};
pub use types::*;
