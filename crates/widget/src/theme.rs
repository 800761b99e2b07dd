//! Widget appearance and the merge of its sources

use serde::{Deserialize, Serialize};
use widgetgate_shared::{
    PropertyInfo, DEFAULT_AUTO_OPEN_DELAY_MS, DEFAULT_PRIMARY_COLOR, DEFAULT_WELCOME_MESSAGE,
};

/// Theme fields that may or may not be set. Used both for caller overrides
/// and for the tenant config served by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialTheme {
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub welcome_message: Option<String>,
    #[serde(default)]
    pub auto_open_delay_ms: Option<u64>,
    #[serde(default)]
    pub property_info: Option<PropertyInfo>,
}

/// Fully resolved theme handed to the chat UI
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetTheme {
    pub agent_name: Option<String>,
    pub primary_color: String,
    pub welcome_message: String,
    pub auto_open_delay_ms: u64,
    pub property_info: PropertyInfo,
}

impl WidgetTheme {
    /// Caller overrides > detected page property > remote config > defaults.
    ///
    /// Property info is only taken from a source when non-empty.
    pub fn merge(
        overrides: &PartialTheme,
        detected: Option<&PropertyInfo>,
        remote: &PartialTheme,
    ) -> Self {
        let non_empty = |info: Option<&PropertyInfo>| info.filter(|i| !i.is_empty()).cloned();

        Self {
            agent_name: overrides
                .agent_name
                .clone()
                .or_else(|| remote.agent_name.clone()),
            primary_color: overrides
                .primary_color
                .clone()
                .or_else(|| remote.primary_color.clone())
                .unwrap_or_else(|| DEFAULT_PRIMARY_COLOR.to_string()),
            welcome_message: overrides
                .welcome_message
                .clone()
                .or_else(|| remote.welcome_message.clone())
                .unwrap_or_else(|| DEFAULT_WELCOME_MESSAGE.to_string()),
            auto_open_delay_ms: overrides
                .auto_open_delay_ms
                .or(remote.auto_open_delay_ms)
                .unwrap_or(DEFAULT_AUTO_OPEN_DELAY_MS),
            property_info: non_empty(overrides.property_info.as_ref())
                .or_else(|| non_empty(detected))
                .or_else(|| non_empty(remote.property_info.as_ref()))
                .unwrap_or_default(),
        }
    }
}

impl Default for WidgetTheme {
    fn default() -> Self {
        Self::merge(&PartialTheme::default(), None, &PartialTheme::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info(value: serde_json::Value) -> PropertyInfo {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_defaults_when_everything_is_empty() {
        let theme = WidgetTheme::default();
        assert_eq!(theme.primary_color, DEFAULT_PRIMARY_COLOR);
        assert_eq!(theme.welcome_message, DEFAULT_WELCOME_MESSAGE);
        assert_eq!(theme.auto_open_delay_ms, DEFAULT_AUTO_OPEN_DELAY_MS);
        assert!(theme.property_info.is_empty());
        assert_eq!(theme.agent_name, None);
    }

    #[test]
    fn test_merge_precedence() {
        let remote = PartialTheme {
            agent_name: Some("Remote".to_string()),
            primary_color: Some("#000000".to_string()),
            welcome_message: Some("Hello from the server".to_string()),
            property_info: Some(info(json!({"projectName": "Stored"}))),
            ..Default::default()
        };
        let overrides = PartialTheme {
            primary_color: Some("#ffffff".to_string()),
            ..Default::default()
        };
        let detected = info(json!({"projectName": "On Page"}));

        let theme = WidgetTheme::merge(&overrides, Some(&detected), &remote);
        assert_eq!(theme.primary_color, "#ffffff");
        assert_eq!(theme.agent_name.as_deref(), Some("Remote"));
        assert_eq!(theme.welcome_message, "Hello from the server");
        assert_eq!(theme.auto_open_delay_ms, DEFAULT_AUTO_OPEN_DELAY_MS);
        assert_eq!(theme.property_info["projectName"], "On Page");

        // Empty detection does not hide the stored property
        let theme = WidgetTheme::merge(&overrides, Some(&PropertyInfo::new()), &remote);
        assert_eq!(theme.property_info["projectName"], "Stored");

        let overrides = PartialTheme {
            property_info: Some(info(json!({"projectName": "Pinned"}))),
            ..Default::default()
        };
        let theme = WidgetTheme::merge(&overrides, Some(&detected), &remote);
        assert_eq!(theme.property_info["projectName"], "Pinned");
    }

    #[test]
    fn test_remote_config_parses_full_record() {
        let remote: PartialTheme = serde_json::from_value(json!({
            "projectId": "5796",
            "domains": ["lodha.com"],
            "primaryColor": "#123456",
            "autoOpenDelayMs": 9000,
            "propertyInfo": {}
        }))
        .unwrap();
        assert_eq!(remote.primary_color.as_deref(), Some("#123456"));
        assert_eq!(remote.auto_open_delay_ms, Some(9000));
        assert_eq!(remote.agent_name, None);
    }
}
