//! Application configuration

use std::collections::HashMap;
use std::env;

use widgetgate_shared::{normalize_domain, RouteClass};

/// Where tenant, event and lead records live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataStoreKind {
    /// Process-local maps, for local development and tests
    Memory,
    Postgres,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,
    pub production: bool,
    pub max_request_body_bytes: usize,
    pub trust_proxy: bool,

    // Persistence
    pub data_store: DataStoreKind,
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // Admission
    pub redis_url: Option<String>,
    pub allowed_origins: Vec<String>,
    pub rate_limit_overrides: HashMap<RouteClass, u32>,

    // Tenant resolution
    /// Normalized domain -> project id
    pub domain_project_map: HashMap<String, String>,
    pub tenant_lookup_timeout_ms: u64,

    // Chat
    pub chat_fallback_reply: String,

    // Logging
    pub log_json: bool,
}

/// Reply used when no conversational backend is wired in
pub const DEFAULT_CHAT_FALLBACK_REPLY: &str =
    "Thanks for reaching out! An agent will get back to you shortly.";

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".to_string(),
            production: false,
            max_request_body_bytes: 10 * 1024 * 1024,
            trust_proxy: false,
            data_store: DataStoreKind::Memory,
            database_url: None,
            database_max_connections: 10,
            redis_url: None,
            allowed_origins: vec!["http://localhost:*".to_string()],
            rate_limit_overrides: HashMap::new(),
            domain_project_map: HashMap::new(),
            tenant_lookup_timeout_ms: 3000,
            chat_fallback_reply: DEFAULT_CHAT_FALLBACK_REPLY.to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let data_store = match env::var("DATA_STORE")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" | "file" => DataStoreKind::Memory,
            "postgres" | "postgresql" => DataStoreKind::Postgres,
            other => {
                return Err(ConfigError::Invalid(
                    "DATA_STORE",
                    format!("unknown store '{}', expected memory or postgres", other),
                ))
            }
        };

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        if data_store == DataStoreKind::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let tenant_lookup_timeout_ms = match env::var("TENANT_LOOKUP_TIMEOUT_MS") {
            Ok(raw) => {
                let ms: u64 = raw.trim().parse().map_err(|_| {
                    ConfigError::Invalid("TENANT_LOOKUP_TIMEOUT_MS", format!("not a number: {}", raw))
                })?;
                // Lookups sit on the request path: keep them in single-digit seconds
                if ms == 0 || ms >= 10_000 {
                    return Err(ConfigError::Invalid(
                        "TENANT_LOOKUP_TIMEOUT_MS",
                        "must be between 1 and 9999".to_string(),
                    ));
                }
                ms
            }
            Err(_) => defaults.tenant_lookup_timeout_ms,
        };

        let mut rate_limit_overrides = HashMap::new();
        for class in RouteClass::ALL {
            if let Some(max) = env::var(class.max_env_var())
                .ok()
                .and_then(|v| v.trim().parse::<u32>().ok())
            {
                rate_limit_overrides.insert(class, max);
            }
        }

        Ok(Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            production: env::var("APP_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
            max_request_body_bytes: env::var("MAX_REQUEST_BODY_BYTES")
                .unwrap_or_else(|_| "10485760".to_string())
                .parse()
                .unwrap_or(defaults.max_request_body_bytes),
            trust_proxy: env::var("TRUST_PROXY")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),

            // Persistence
            data_store,
            database_url,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),

            // Admission
            redis_url: env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.allowed_origins),
            rate_limit_overrides,

            // Tenant resolution
            domain_project_map: env::var("DOMAIN_PROJECT_MAP")
                .map(|v| parse_domain_map(&v))
                .unwrap_or_default(),
            tenant_lookup_timeout_ms,

            // Chat
            chat_fallback_reply: env::var("CHAT_FALLBACK_REPLY")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.chat_fallback_reply),

            // Logging
            log_json: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}

/// Split a comma-separated list, dropping blanks
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parse `domain=projectId` pairs. Domains are normalized so the static map
/// matches the same keys the resolver looks up.
fn parse_domain_map(raw: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for pair in parse_list(raw) {
        let Some((domain, project_id)) = pair.split_once('=') else {
            tracing::warn!(entry = %pair, "Ignoring malformed DOMAIN_PROJECT_MAP entry");
            continue;
        };
        let project_id = project_id.trim();
        match normalize_domain(domain) {
            Some(domain) if !project_id.is_empty() => {
                map.insert(domain, project_id.to_string());
            }
            _ => tracing::warn!(entry = %pair, "Ignoring empty DOMAIN_PROJECT_MAP entry"),
        }
    }
    map
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
