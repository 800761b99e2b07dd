//! API routes

pub mod chat;
pub mod events;
pub mod health;
pub mod leads;
pub mod widget_config;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderMap,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use widgetgate_shared::RouteClass;

use crate::{
    security::{
        admission_middleware, cors_layer, reject_disallowed_origin, security_headers_middleware,
        Admission,
    },
    state::AppState,
    websocket::ws_handler,
};

/// Extract client IP address from request headers.
/// Checks common proxy headers in order of preference.
pub fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("cf-connecting-ip") // Cloudflare
        .or_else(|| headers.get("x-real-ip"))
        .or_else(|| headers.get("x-forwarded-for"))
        .and_then(|h| h.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Create all routes
pub fn create_router(state: AppState) -> Router {
    let trust_proxy = state.config.trust_proxy;
    let gate = |class: RouteClass| {
        middleware::from_fn_with_state(
            Admission::new(state.rate_limiter.clone(), class, trust_proxy),
            admission_middleware,
        )
    };

    // Root routes: unlimited
    let root_routes = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route(
            "/.well-known/appspecific/com.chrome.devtools.json",
            get(health::devtools_manifest),
        )
        .route("/ws", get(ws_handler));

    // API routes: every request counts against the general quota, some
    // against a narrower class as well
    let api_routes = Router::new()
        .route(
            "/widget-config/domain/:domain",
            get(widget_config::resolve_domain),
        )
        .route("/widget-config/:project_id", get(widget_config::get_config))
        .route(
            "/widget-config/:project_id",
            post(widget_config::update_config).route_layer(gate(RouteClass::ConfigUpdate)),
        )
        .route(
            "/events",
            get(events::event_summary).post(events::record_event),
        )
        .route(
            "/leads",
            post(leads::submit_lead).route_layer(gate(RouteClass::LeadSubmission)),
        )
        .route(
            "/chat",
            post(chat::chat).route_layer(gate(RouteClass::Chat)),
        )
        .layer(gate(RouteClass::General));

    Router::new()
        .merge(root_routes)
        .nest("/api", api_routes)
        .fallback(health::not_found)
        .layer(DefaultBodyLimit::max(state.config.max_request_body_bytes))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors_layer(state.origins.clone()))
        // Outermost so disallowed preflights are refused too
        .layer(middleware::from_fn_with_state(
            state.origins.clone(),
            reject_disallowed_origin,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_client_ip_prefers_cloudflare() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.1, 10.0.0.1".parse().unwrap());
        assert_eq!(extract_client_ip(&headers).as_deref(), Some("203.0.113.1"));

        headers.insert("cf-connecting-ip", "198.51.100.7".parse().unwrap());
        assert_eq!(extract_client_ip(&headers).as_deref(), Some("198.51.100.7"));

        assert_eq!(extract_client_ip(&HeaderMap::new()), None);
    }
}
