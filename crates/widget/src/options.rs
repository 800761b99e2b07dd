//! Embed options and their precedence rules
//!
//! A widget picks up settings from three places: options passed by the
//! embedding code, `data-*` attributes on the script tag, and defaults baked
//! in at build time. Earlier sources win.

use std::collections::HashMap;

use crate::theme::PartialTheme;

/// API used when nothing else is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:4000";

/// Placeholder project id that means "not configured"
pub const UNSET_PROJECT_ID: &str = "default";

/// Options supplied by the embedding code
#[derive(Debug, Clone, Default)]
pub struct WidgetOptions {
    pub api_base_url: Option<String>,
    pub project_id: Option<String>,
    pub microsite: Option<String>,
    pub theme: Option<PartialTheme>,
    /// Host element to mount into; a fresh one is created when absent
    pub target: Option<String>,
}

/// Settings read from the embedding script tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedAttributes {
    pub api_base_url: Option<String>,
    pub project: Option<String>,
    pub project_id: Option<String>,
    pub microsite: Option<String>,
    pub auto_init: Option<String>,
}

impl EmbedAttributes {
    /// Parse from a tag's attribute map (`data-project`, `data-microsite`, ...)
    pub fn from_attributes(attributes: &HashMap<String, String>) -> Self {
        let get = |name: &str| attributes.get(name).cloned();
        Self {
            api_base_url: get("data-api-base-url"),
            project: get("data-project"),
            project_id: get("data-project-id"),
            microsite: get("data-microsite"),
            auto_init: get("data-auto-init"),
        }
    }

    /// Only an explicit `data-auto-init="false"` opts out
    pub fn should_auto_init(&self) -> bool {
        self.auto_init.as_deref() != Some("false")
    }
}

/// Defaults compiled into the widget
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildDefaults {
    pub api_base_url: Option<String>,
    pub project_id: Option<String>,
}

impl BuildDefaults {
    /// Read `WIDGET_API_BASE_URL` and `WIDGET_DEFAULT_PROJECT_ID` at compile time
    pub fn from_build_env() -> Self {
        Self {
            api_base_url: option_env!("WIDGET_API_BASE_URL").map(str::to_string),
            project_id: option_env!("WIDGET_DEFAULT_PROJECT_ID").map(str::to_string),
        }
    }
}

fn present(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn configured_project(value: Option<&String>) -> Option<String> {
    present(value).filter(|v| v != UNSET_PROJECT_ID)
}

/// options > attribute > build default > [`DEFAULT_API_BASE_URL`]
pub fn resolve_api_base_url(
    options: &WidgetOptions,
    attributes: &EmbedAttributes,
    defaults: &BuildDefaults,
) -> String {
    present(options.api_base_url.as_ref())
        .or_else(|| present(attributes.api_base_url.as_ref()))
        .or_else(|| present(defaults.api_base_url.as_ref()))
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// options > attribute > page host
pub fn resolve_microsite(
    options: &WidgetOptions,
    attributes: &EmbedAttributes,
    page_host: &str,
) -> String {
    present(options.microsite.as_ref())
        .or_else(|| present(attributes.microsite.as_ref()))
        .unwrap_or_else(|| page_host.to_string())
}

/// Project id known without asking the server, if any.
///
/// options > `data-project` > `data-project-id` > build default. `"default"`
/// counts as unset at every level.
pub fn configured_project_id(
    options: &WidgetOptions,
    attributes: &EmbedAttributes,
    defaults: &BuildDefaults,
) -> Option<String> {
    configured_project(options.project_id.as_ref())
        .or_else(|| configured_project(attributes.project.as_ref()))
        .or_else(|| configured_project(attributes.project_id.as_ref()))
        .or_else(|| configured_project(defaults.project_id.as_ref()))
}
