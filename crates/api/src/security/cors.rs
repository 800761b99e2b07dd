//! Origin expansion and CORS enforcement
//!
//! Configured origins may hold `*` (allow everything) or port wildcards such
//! as `http://localhost:*`. A trailing wildcard expands to the well-known
//! development ports; loopback origins are always accepted under both spellings.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use url::Url;

use crate::error::ApiError;

/// Ports a wildcard origin expands to
pub const DEV_PORTS: [u16; 7] = [3000, 5173, 5501, 5000, 5001, 8080, 8081];

const LOOPBACK_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Origins accepted for local development regardless of configuration
const ALWAYS_ALLOWED_PREFIXES: [&str; 2] = ["http://localhost:", "http://127.0.0.1:"];

/// Expand configured origins into the set a CORS check accepts.
///
/// Every configured entry is kept verbatim, including entries that fail to
/// parse. Expansion is idempotent.
pub fn expand_allowed_origins(origins: &[String]) -> HashSet<String> {
    if origins.iter().any(|o| o == "*") {
        return HashSet::from(["*".to_string()]);
    }

    let mut expanded: HashSet<String> = origins.iter().cloned().collect();

    for origin in origins {
        if origin.contains('*') {
            let Some(prefix) = wildcard_prefix(origin) else {
                continue;
            };
            for port in DEV_PORTS {
                let candidate = format!("{}{}", prefix, port);
                insert_loopback_siblings(&mut expanded, &candidate);
                expanded.insert(candidate);
            }
        } else {
            insert_loopback_siblings(&mut expanded, origin);
        }
    }

    expanded
}

/// Literal prefix of a trailing-wildcard pattern such as `http://localhost:*`.
/// Patterns with any other `*` are not expanded and only kept verbatim.
fn wildcard_prefix(origin: &str) -> Option<&str> {
    origin
        .strip_suffix('*')
        .filter(|prefix| !prefix.is_empty() && !prefix.contains('*'))
}

/// Loopback origins are accepted under both `localhost` and `127.0.0.1`
fn insert_loopback_siblings(expanded: &mut HashSet<String>, origin: &str) {
    let Ok(url) = Url::parse(origin) else {
        return;
    };
    let Some(host) = url.host_str() else {
        return;
    };

    if LOOPBACK_HOSTS.contains(&host) {
        let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
        for loopback in LOOPBACK_HOSTS {
            expanded.insert(format!("{}://{}{}", url.scheme(), loopback, port));
        }
    }
}

/// Accept-set built once at startup
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Arc<HashSet<String>>,
}

impl OriginPolicy {
    pub fn new(configured: &[String]) -> Self {
        let allowed = expand_allowed_origins(configured);
        tracing::info!(origins = allowed.len(), "CORS origins expanded");
        Self {
            allowed: Arc::new(allowed),
        }
    }

    pub fn allows_any(&self) -> bool {
        self.allowed.contains("*")
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        ALWAYS_ALLOWED_PREFIXES
            .iter()
            .any(|prefix| origin.starts_with(prefix))
            || self.allows_any()
            || self.allowed.contains(origin)
    }

    pub fn origins(&self) -> &HashSet<String> {
        &self.allowed
    }
}

/// CORS layer mirroring accepted origins, with credentials
pub fn cors_layer(policy: OriginPolicy) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts| {
                origin
                    .to_str()
                    .map(|o| policy.is_allowed(o))
                    .unwrap_or(false)
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_TYPE])
}

/// Reject requests whose Origin is not accepted, preflight included.
/// Requests without an Origin header pass.
pub async fn reject_disallowed_origin(
    State(policy): State<OriginPolicy>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        let allowed = origin
            .to_str()
            .map(|o| policy.is_allowed(o))
            .unwrap_or(false);
        if !allowed {
            tracing::warn!(origin = ?origin, path = %request.uri().path(), "Origin rejected");
            return ApiError::OriginNotAllowed.into_response();
        }
    }

    next.run(request).await
}
