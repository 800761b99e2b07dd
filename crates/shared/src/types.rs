//! Common types used across widgetgate

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::normalize_domain;

// =============================================================================
// Tenant configuration
// =============================================================================

/// Free-form listing metadata detected on (or configured for) a tenant's pages
pub type PropertyInfo = Map<String, Value>;

/// Brand color served when a tenant has never been configured
pub const DEFAULT_PRIMARY_COLOR: &str = "#6158ff";

/// Greeting served when a tenant has never been configured
pub const DEFAULT_WELCOME_MESSAGE: &str = "Hi there 👋\nHow can I help you today?";

/// Delay before the widget opens itself
pub const DEFAULT_AUTO_OPEN_DELAY_MS: u64 = 4000;

fn default_primary_color() -> String {
    DEFAULT_PRIMARY_COLOR.to_string()
}

fn default_welcome_message() -> String {
    DEFAULT_WELCOME_MESSAGE.to_string()
}

fn default_auto_open_delay_ms() -> u64 {
    DEFAULT_AUTO_OPEN_DELAY_MS
}

/// Stored widget configuration for one tenant (project)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRecord {
    pub project_id: String,
    /// Normalized domains this tenant is served on
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default = "default_primary_color")]
    pub primary_color: String,
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
    #[serde(default = "default_auto_open_delay_ms")]
    pub auto_open_delay_ms: u64,
    #[serde(default)]
    pub property_info: PropertyInfo,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<OffsetDateTime>,
}

impl TenantRecord {
    /// The documented default record served whenever a tenant is unknown or unreadable
    pub fn default_for(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            domains: Vec::new(),
            agent_name: None,
            primary_color: default_primary_color(),
            welcome_message: default_welcome_message(),
            auto_open_delay_ms: DEFAULT_AUTO_OPEN_DELAY_MS,
            property_info: PropertyInfo::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Merge a partial update into this record.
    ///
    /// Only fields present in `update` are touched. `property_info` and
    /// `domains` replace the stored value wholesale.
    pub fn apply(&mut self, update: &TenantConfigUpdate) {
        if let Some(agent_name) = &update.agent_name {
            self.agent_name = Some(agent_name.clone());
        }
        if let Some(color) = &update.primary_color {
            self.primary_color = color.clone();
        }
        if let Some(message) = &update.welcome_message {
            self.welcome_message = message.clone();
        }
        if let Some(delay) = update.auto_open_delay_ms {
            self.auto_open_delay_ms = delay;
        }
        if let Some(info) = &update.property_info {
            self.property_info = info.clone();
        }
        if let Some(domains) = &update.domains {
            self.domains = normalize_domains(domains);
        }
    }
}

/// Partial update accepted by the config write path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantConfigUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_open_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_info: Option<PropertyInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<String>>,
}

impl TenantConfigUpdate {
    /// Update carrying only detected page metadata
    pub fn property_info(info: PropertyInfo) -> Self {
        Self {
            property_info: Some(info),
            ..Default::default()
        }
    }

    /// True when no field would change the stored record
    pub fn is_empty(&self) -> bool {
        self.agent_name.is_none()
            && self.primary_color.is_none()
            && self.welcome_message.is_none()
            && self.auto_open_delay_ms.is_none()
            && self.property_info.is_none()
            && self.domains.is_none()
    }

    /// Domains in the form they are persisted and matched in
    pub fn normalized_domains(&self) -> Option<Vec<String>> {
        self.domains.as_deref().map(normalize_domains)
    }
}

/// Normalize, drop empties and dedupe while keeping first-seen order
pub fn normalize_domains(domains: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(domains.len());
    for domain in domains.iter().filter_map(|d| normalize_domain(d)) {
        if !out.contains(&domain) {
            out.push(domain);
        }
    }
    out
}

// =============================================================================
// Tenant resolution
// =============================================================================

/// Which step of the resolution chain produced a project id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Pinned in deployment configuration
    StaticMap,
    /// Found in the persisted tenant records
    Database,
    /// Nothing matched, the domain itself is the project id
    AutoDetected,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::StaticMap => "static_map",
            ResolutionSource::Database => "database",
            ResolutionSource::AutoDetected => "auto_detected",
        }
    }
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving a normalized domain to a tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub project_id: String,
    pub domain: String,
    pub source: ResolutionSource,
}

// =============================================================================
// Events
// =============================================================================

/// Widget analytics event as submitted by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microsite: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
}

/// Persisted event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microsite: Option<String>,
    #[serde(default)]
    pub payload: Map<String, Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl EventRecord {
    pub fn from_new(event: NewEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event.event_type,
            project_id: event.project_id,
            microsite: event.microsite,
            payload: event.payload.unwrap_or_default(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Aggregate counts over all recorded events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub total: u64,
    pub by_type: BTreeMap<String, u64>,
    pub by_project: BTreeMap<String, u64>,
}

impl EventSummary {
    pub fn add(&mut self, event_type: &str, project_id: &str, count: u64) {
        self.total += count;
        *self.by_type.entry(event_type.to_string()).or_default() += count;
        *self.by_project.entry(project_id.to_string()).or_default() += count;
    }
}

// =============================================================================
// Leads
// =============================================================================

/// A lead submission. The document is kept opaque; only the routing keys
/// are lifted out of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    pub microsite: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub document: Value,
}

/// Stored lead acknowledgement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    pub id: Uuid,
    pub microsite: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub document: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl LeadRecord {
    pub fn from_new(lead: NewLead) -> Self {
        Self {
            id: Uuid::new_v4(),
            microsite: lead.microsite,
            project_id: lead.project_id,
            document: lead.document,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
