//! Request body validation
//!
//! Each validator takes the raw JSON body, trims and sanitizes string
//! fields, and either returns the typed input or a 400 listing every
//! rejected field.

use serde_json::{Map, Value};
use widgetgate_shared::{NewEvent, NewLead, TenantConfigUpdate};

use crate::chat::ChatRequest;
use crate::error::{ApiError, ApiResult, FieldError};

/// Longest string kept after sanitizing
const SANITIZED_MAX_CHARS: usize = 10_000;

const MAX_AUTO_OPEN_DELAY_MS: u64 = 600_000;
const MAX_DOMAINS: usize = 50;
const MAX_DOMAIN_CHARS: usize = 253;

pub const BHK_TYPES: &[&str] = &[
    "1 Bhk",
    "1 BHK",
    "2 Bhk",
    "2 BHK",
    "3 Bhk",
    "3 BHK",
    "4 Bhk",
    "4 BHK",
    "Duplex",
    "Just Browsing",
    "Other",
    "Yet to decide",
];

/// Trim, drop angle brackets and cap the length
pub fn sanitize_string(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .take(SANITIZED_MAX_CHARS)
        .collect()
}

/// `#` followed by exactly six hex digits
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Optional `+`, then digits, spaces, parentheses and hyphens
fn is_phone(value: &str) -> bool {
    let digits = value.strip_prefix('+').unwrap_or(value);
    !digits.is_empty()
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '(' | ')' | '-'))
}

/// Collects field errors while reading a JSON object
struct Checker<'a> {
    body: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> Checker<'a> {
    fn new(body: &'a Value) -> ApiResult<Self> {
        match body.as_object() {
            Some(body) => Ok(Self {
                body,
                errors: Vec::new(),
            }),
            None => Err(ApiError::BadRequest(
                "Request body must be a JSON object".to_string(),
            )),
        }
    }

    fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Trimmed string, None when absent or null
    fn string(&mut self, field: &str) -> Option<String> {
        match self.body.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(_) => {
                self.reject(field, format!("{} must be a string", field));
                None
            }
        }
    }

    fn required(&mut self, field: &str, max_chars: usize) -> Option<String> {
        let reported = self.errors.len();
        match self.string(field) {
            Some(s) if !s.is_empty() => self.within(field, s, max_chars),
            // Wrong type, already reported
            _ if self.errors.len() > reported => None,
            _ => {
                self.reject(field, format!("{} is required", field));
                None
            }
        }
    }

    fn optional(&mut self, field: &str, max_chars: usize) -> Option<String> {
        let value = self.string(field)?;
        self.within(field, value, max_chars)
    }

    fn within(&mut self, field: &str, value: String, max_chars: usize) -> Option<String> {
        if value.chars().count() > max_chars {
            self.reject(
                field,
                format!("{} must be at most {} characters", field, max_chars),
            );
            return None;
        }
        Some(value)
    }

    fn object(&mut self, field: &str) -> Option<Map<String, Value>> {
        match self.body.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map.clone()),
            Some(_) => {
                self.reject(field, format!("{} must be an object", field));
                None
            }
        }
    }

    fn array(&mut self, field: &str) -> Option<Vec<Value>> {
        match self.body.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(items.clone()),
            Some(_) => {
                self.reject(field, format!("{} must be an array", field));
                None
            }
        }
    }

    fn finish(self) -> ApiResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

/// `POST /api/widget-config/{projectId}`
pub fn validate_widget_config(body: &Value) -> ApiResult<TenantConfigUpdate> {
    let mut c = Checker::new(body)?;

    let agent_name = c.optional("agentName", 100).map(|s| sanitize_string(&s));

    let primary_color = c.string("primaryColor");
    if let Some(color) = &primary_color {
        if !is_hex_color(color) {
            c.reject("primaryColor", "primaryColor must be a valid hex color");
        }
    }

    let welcome_message = c
        .optional("welcomeMessage", 1000)
        .map(|s| sanitize_string(&s));

    let auto_open_delay_ms = match c.body.get("autoOpenDelayMs") {
        None | Some(Value::Null) => None,
        Some(v) => match v.as_u64() {
            Some(ms) if ms <= MAX_AUTO_OPEN_DELAY_MS => Some(ms),
            _ => {
                c.reject(
                    "autoOpenDelayMs",
                    format!(
                        "autoOpenDelayMs must be an integer between 0 and {}",
                        MAX_AUTO_OPEN_DELAY_MS
                    ),
                );
                None
            }
        },
    };

    let property_info = c.object("propertyInfo");

    let domains = match c.array("domains") {
        Some(items) if items.len() > MAX_DOMAINS => {
            c.reject(
                "domains",
                format!("domains must have at most {} entries", MAX_DOMAINS),
            );
            None
        }
        Some(items) => {
            let mut domains = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(d) if d.trim().chars().count() <= MAX_DOMAIN_CHARS => {
                        domains.push(d.trim().to_string())
                    }
                    _ => {
                        c.reject(
                            "domains",
                            format!(
                                "domains must be strings of at most {} characters",
                                MAX_DOMAIN_CHARS
                            ),
                        );
                        break;
                    }
                }
            }
            Some(domains)
        }
        None => None,
    };

    c.finish()?;

    Ok(TenantConfigUpdate {
        agent_name,
        primary_color,
        welcome_message,
        auto_open_delay_ms,
        property_info,
        domains,
    })
}

/// `POST /api/events`
pub fn validate_event(body: &Value) -> ApiResult<NewEvent> {
    let mut c = Checker::new(body)?;

    let event_type = c.required("type", 50);
    let project_id = c.required("projectId", 100);
    let microsite = c.optional("microsite", 200).filter(|s| !s.is_empty());
    let payload = c.object("payload");

    c.finish()?;

    match (event_type, project_id) {
        (Some(event_type), Some(project_id)) => Ok(NewEvent {
            event_type,
            project_id,
            microsite,
            payload,
        }),
        _ => Err(ApiError::Internal),
    }
}

/// `POST /api/chat`
pub fn validate_chat(body: &Value) -> ApiResult<ChatRequest> {
    let mut c = Checker::new(body)?;

    let message = c
        .required("message", 5000)
        .map(|s| sanitize_string(&s));
    let project_id = c.required("projectId", 100);
    let conversation = c.array("conversation").unwrap_or_default();
    let microsite = c.optional("microsite", 200).filter(|s| !s.is_empty());

    c.finish()?;

    match (message, project_id) {
        (Some(message), Some(project_id)) => Ok(ChatRequest {
            message,
            project_id,
            microsite,
            conversation,
        }),
        _ => Err(ApiError::Internal),
    }
}

/// `POST /api/leads`. The lead itself is stored as an opaque document with
/// the validated fields written back in their trimmed form.
pub fn validate_lead(body: &Value) -> ApiResult<NewLead> {
    let mut c = Checker::new(body)?;

    let phone = c.optional("phone", 20);
    if let Some(phone) = &phone {
        if phone.chars().count() < 10 {
            c.reject("phone", "Phone must be between 10 and 20 characters");
        } else if !is_phone(phone) {
            c.reject(
                "phone",
                "Phone must contain only digits, spaces, hyphens, parentheses, and optional +",
            );
        }
    }

    let bhk_type = c.required("bhkType", 50);
    if let Some(bhk) = &bhk_type {
        if !BHK_TYPES.contains(&bhk.as_str()) {
            c.reject("bhkType", "Invalid bhkType");
        }
    }

    let microsite = c.required("microsite", 200);
    let _ = c.object("metadata");
    let _ = c.array("conversation");
    let project_id = c.optional("projectId", 100).filter(|s| !s.is_empty());

    let mut document = c.body.clone();
    c.finish()?;

    let Some(microsite) = microsite else {
        return Err(ApiError::Internal);
    };

    if let Some(phone) = phone {
        document.insert("phone".to_string(), Value::String(phone));
    }
    if let Some(bhk_type) = bhk_type {
        document.insert("bhkType".to_string(), Value::String(bhk_type));
    }
    document.insert("microsite".to_string(), Value::String(microsite.clone()));

    Ok(NewLead {
        microsite,
        project_id,
        document: Value::Object(document),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(err: ApiError) -> Vec<String> {
        match err {
            ApiError::Validation(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_sanitize_string() {
        assert_eq!(sanitize_string("  <b>Riya</b> "), "bRiya/b");
        assert_eq!(sanitize_string(&"a".repeat(20_000)).len(), 10_000);
    }

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#6158ff"));
        assert!(is_hex_color("#ABCDEF"));
        assert!(!is_hex_color("6158ff"));
        assert!(!is_hex_color("#6158f"));
        assert!(!is_hex_color("#6158fg"));
        assert!(!is_hex_color("#6158ffa"));
    }

    #[test]
    fn test_widget_config_accepts_partial_update() {
        let update = validate_widget_config(&json!({
            "agentName": "  Riya <script> ",
            "primaryColor": "#000000",
            "propertyInfo": {"projectName": "Skyline"}
        }))
        .unwrap();

        assert_eq!(update.agent_name.as_deref(), Some("Riya script"));
        assert_eq!(update.primary_color.as_deref(), Some("#000000"));
        assert!(update.property_info.is_some());
        assert!(update.welcome_message.is_none());
    }

    #[test]
    fn test_widget_config_rejects_bad_fields() {
        let err = validate_widget_config(&json!({
            "agentName": "x".repeat(101),
            "primaryColor": "red",
            "propertyInfo": "not an object",
            "autoOpenDelayMs": 700000,
        }))
        .unwrap_err();

        let fields = fields(err);
        assert!(fields.contains(&"agentName".to_string()));
        assert!(fields.contains(&"primaryColor".to_string()));
        assert!(fields.contains(&"propertyInfo".to_string()));
        assert!(fields.contains(&"autoOpenDelayMs".to_string()));
    }

    #[test]
    fn test_widget_config_domains_limits() {
        let too_many: Vec<String> = (0..51).map(|i| format!("d{}.com", i)).collect();
        assert!(validate_widget_config(&json!({ "domains": too_many })).is_err());

        let update = validate_widget_config(&json!({ "domains": [" Lodha.com "] })).unwrap();
        assert_eq!(update.domains, Some(vec!["Lodha.com".to_string()]));
    }

    #[test]
    fn test_event_requires_type_and_project() {
        let fields = fields(validate_event(&json!({ "payload": [] })).unwrap_err());
        assert_eq!(fields, vec!["type", "projectId", "payload"]);

        let event = validate_event(&json!({
            "type": " widget_open ",
            "projectId": "5796",
            "microsite": "lodha.com",
            "payload": {"page": "/"}
        }))
        .unwrap();
        assert_eq!(event.event_type, "widget_open");
        assert_eq!(event.microsite.as_deref(), Some("lodha.com"));
    }

    #[test]
    fn test_event_length_limits() {
        let fields = fields(
            validate_event(&json!({ "type": "t".repeat(51), "projectId": "p" })).unwrap_err(),
        );
        assert_eq!(fields, vec!["type"]);
    }

    #[test]
    fn test_chat_validation() {
        let chat = validate_chat(&json!({
            "message": "Is parking included?",
            "projectId": "5796",
            "conversation": [{"role": "user", "text": "hi"}]
        }))
        .unwrap();
        assert_eq!(chat.conversation.len(), 1);

        let fields = fields(
            validate_chat(&json!({ "message": "   ", "projectId": "5796", "conversation": {} }))
                .unwrap_err(),
        );
        assert_eq!(fields, vec!["message", "conversation"]);
    }

    #[test]
    fn test_lead_validation() {
        let lead = validate_lead(&json!({
            "bhkType": "2 BHK",
            "microsite": " lodha.com ",
            "phone": "+91 98765-43210",
            "metadata": {"visitor": {"name": "A"}}
        }))
        .unwrap();
        assert_eq!(lead.microsite, "lodha.com");
        assert_eq!(lead.document["microsite"], "lodha.com");
        assert_eq!(lead.document["metadata"]["visitor"]["name"], "A");

        let fields = fields(
            validate_lead(&json!({ "bhkType": "5 BHK", "phone": "12ab", "metadata": 3 }))
                .unwrap_err(),
        );
        assert_eq!(fields, vec!["phone", "bhkType", "microsite", "metadata"]);
    }

    #[test]
    fn test_non_object_body_is_bad_request() {
        assert!(matches!(
            validate_event(&json!([1, 2])),
            Err(ApiError::BadRequest(_))
        ));
    }
}
