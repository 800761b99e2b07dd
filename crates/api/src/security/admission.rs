//! Admission gate middleware
//!
//! Counts each request against its route class per client IP and rejects
//! with 429 once the class quota for the current window is spent.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use widgetgate_shared::{RateLimitDecision, RateLimiter, RouteClass};

use crate::{error::ApiError, routes::extract_client_ip};

const RATELIMIT_POLICY: HeaderName = HeaderName::from_static("ratelimit-policy");
const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// State for one route class's gate
#[derive(Clone)]
pub struct Admission {
    limiter: RateLimiter,
    class: RouteClass,
    trust_proxy: bool,
}

impl Admission {
    pub fn new(limiter: RateLimiter, class: RouteClass, trust_proxy: bool) -> Self {
        Self {
            limiter,
            class,
            trust_proxy,
        }
    }
}

/// Client address used as the counter key.
///
/// Proxy headers are honored only when the deployment sits behind a trusted
/// proxy; otherwise the transport peer address is used.
pub fn client_ip(request: &Request<Body>, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(ip) = extract_client_ip(request.headers()) {
            return ip;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limit middleware, one instance per route class
pub async fn admission_middleware(
    State(admission): State<Admission>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(&request, admission.trust_proxy);
    let decision = admission.limiter.check(admission.class, &ip).await;

    if !decision.allowed {
        let message = admission.limiter.policy(admission.class).message.clone();
        tracing::warn!(
            route_class = %admission.class,
            client_ip = %ip,
            path = %request.uri().path(),
            "Rate limit exceeded"
        );

        let mut response = ApiError::TooManyRequests(message).into_response();
        let headers = response.headers_mut();
        set_rate_limit_headers(headers, &decision);
        headers.insert(
            axum::http::header::RETRY_AFTER,
            HeaderValue::from(decision.reset_after_secs()),
        );
        return response;
    }

    let mut response = next.run(request).await;

    // A narrower class further in already reported its own quota
    if !response.headers().contains_key(RATELIMIT_LIMIT) {
        set_rate_limit_headers(response.headers_mut(), &decision);
    }

    response
}

/// Standard `RateLimit-*` headers. Legacy `X-RateLimit-*` headers are never sent.
fn set_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    if let Ok(policy) =
        HeaderValue::from_str(&format!("{};w={}", decision.limit, decision.window.as_secs()))
    {
        headers.insert(RATELIMIT_POLICY, policy);
    }
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(RATELIMIT_RESET, HeaderValue::from(decision.reset_after_secs()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Router};
    use std::time::Duration;
    use tower::ServiceExt;
    use widgetgate_shared::RateLimitPolicy;

    fn app(limiter: RateLimiter, class: RouteClass) -> Router {
        Router::new()
            .route("/", post(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                Admission::new(limiter, class, false),
                admission_middleware,
            ))
    }

    fn request_from(ip: [u8; 4]) -> Request<Body> {
        let mut request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
        request
    }

    #[tokio::test]
    async fn test_max_plus_one_yields_single_429() {
        let limiter = RateLimiter::new_in_memory().with_policy(
            RouteClass::Chat,
            RateLimitPolicy::new(Duration::from_secs(60), 3, "Too many chat requests"),
        );
        let app = app(limiter, RouteClass::Chat);

        for i in 0..3 {
            let response = app.clone().oneshot(request_from([10, 0, 0, 1])).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "request {}", i + 1);
            assert_eq!(
                response.headers().get("ratelimit-remaining").unwrap(),
                &(2 - i).to_string()
            );
            assert_eq!(response.headers().get("ratelimit-policy").unwrap(), "3;w=60");
            assert!(response.headers().get("x-ratelimit-limit").is_none());
        }

        let response = app.clone().oneshot(request_from([10, 0, 0, 1])).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().get("retry-after").is_some());
        assert_eq!(response.headers().get("ratelimit-remaining").unwrap(), "0");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Too many chat requests");

        // Another client is unaffected
        let response = app.oneshot(request_from([10, 0, 0, 2])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_client_ip_ignores_proxy_headers_unless_trusted() {
        let mut request = Request::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 5], 5000))));

        assert_eq!(client_ip(&request, false), "192.168.1.5");
        assert_eq!(client_ip(&request, true), "203.0.113.9");
    }

    #[test]
    fn test_client_ip_without_connect_info() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(client_ip(&request, false), "unknown");
    }
}
