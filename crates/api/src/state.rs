//! Application state shared by every handler

use std::sync::Arc;
use std::time::Duration;

use widgetgate_shared::{
    MemoryRateLimitStore, RateLimitStore, RateLimiter, RouteClass,
};

use crate::{
    chat::{CannedChatBackend, ChatBackend},
    config::Config,
    routing::TenantResolver,
    security::OriginPolicy,
    store::{EventStore, LeadStore, MemoryEventStore, MemoryLeadStore, MemoryTenantStore, TenantStore},
    websocket::WebSocketState,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub resolver: TenantResolver,
    pub events: Arc<dyn EventStore>,
    pub leads: Arc<dyn LeadStore>,
    pub rate_limiter: RateLimiter,
    pub chat: Arc<dyn ChatBackend>,
    pub ws_state: WebSocketState,
    pub origins: OriginPolicy,
}

impl AppState {
    pub fn new(
        config: Config,
        tenants: Arc<dyn TenantStore>,
        events: Arc<dyn EventStore>,
        leads: Arc<dyn LeadStore>,
        rate_limit_store: Arc<dyn RateLimitStore>,
    ) -> Self {
        let resolver = TenantResolver::new(
            config.domain_project_map.clone(),
            tenants,
            Duration::from_millis(config.tenant_lookup_timeout_ms),
        );
        let rate_limiter = rate_limiter_for(&config, rate_limit_store);
        let chat: Arc<dyn ChatBackend> =
            Arc::new(CannedChatBackend::new(config.chat_fallback_reply.clone()));
        let origins = OriginPolicy::new(&config.allowed_origins);

        Self {
            config: Arc::new(config),
            resolver,
            events,
            leads,
            rate_limiter,
            chat,
            ws_state: WebSocketState::new(),
            origins,
        }
    }

    /// Process-local stores and counters
    pub fn in_memory(config: Config) -> Self {
        Self::new(
            config,
            Arc::new(MemoryTenantStore::new()),
            Arc::new(MemoryEventStore::new()),
            Arc::new(MemoryLeadStore::new()),
            Arc::new(MemoryRateLimitStore::new()),
        )
    }

    /// Swap the chat backend
    pub fn with_chat_backend(mut self, chat: Arc<dyn ChatBackend>) -> Self {
        self.chat = chat;
        self
    }
}

/// Default policies with the configured per-class maximums applied
fn rate_limiter_for(config: &Config, store: Arc<dyn RateLimitStore>) -> RateLimiter {
    let mut limiter = RateLimiter::with_store(store);
    for class in RouteClass::ALL {
        if let Some(max) = config.rate_limit_overrides.get(&class) {
            let policy = class.default_policy().with_max(*max);
            tracing::info!(route_class = %class, max_requests = *max, "Rate limit override applied");
            limiter = limiter.with_policy(class, policy);
        }
    }
    limiter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_overrides_applied() {
        let mut config = Config::default();
        config.rate_limit_overrides.insert(RouteClass::Chat, 5);

        let state = AppState::in_memory(config);
        assert_eq!(state.rate_limiter.policy(RouteClass::Chat).max_requests, 5);
        assert_eq!(
            state.rate_limiter.policy(RouteClass::General).max_requests,
            100
        );
    }
}
