//! Fire-and-forget analytics events

use serde_json::{Map, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::task::JoinHandle;
use widgetgate_shared::NewEvent;

use crate::client::WidgetClient;

/// Posts widget events to `/api/events` for one mounted instance
#[derive(Clone)]
pub struct EventDispatcher {
    client: WidgetClient,
    project_id: String,
    microsite: String,
}

impl EventDispatcher {
    pub fn new(client: WidgetClient, project_id: String, microsite: String) -> Self {
        Self {
            client,
            project_id,
            microsite,
        }
    }

    /// Build the event body: `extra` plus an `at` timestamp
    pub fn event(&self, event_type: &str, extra: Map<String, Value>) -> NewEvent {
        let mut payload = extra;
        let at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        payload.insert("at".to_string(), Value::String(at));

        NewEvent {
            event_type: event_type.to_string(),
            project_id: self.project_id.clone(),
            microsite: Some(self.microsite.clone()),
            payload: Some(payload),
        }
    }

    /// Send in the background. Failures are logged and otherwise ignored.
    pub fn dispatch(&self, event_type: &str, extra: Map<String, Value>) -> JoinHandle<()> {
        let event = self.event(event_type, extra);
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.post_event(&event).await {
                tracing::warn!(
                    event_type = %event.event_type,
                    project_id = %event.project_id,
                    error = %e,
                    "Failed to dispatch widget event"
                );
            }
        })
    }
}
