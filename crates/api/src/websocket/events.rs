//! WebSocket event types and serialization
//!
//! Client-to-server and server-to-client events, tagged by `type`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use widgetgate_shared::{EventRecord, LeadRecord};

// =============================================================================
// Client-to-Server Events
// =============================================================================

/// Events sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Heartbeat ping to keep connection alive
    Ping,

    /// Join a microsite room
    Join { microsite: String },

    /// Leave a microsite room
    Leave { microsite: String },
}

// =============================================================================
// Server-to-Client Events
// =============================================================================

/// Events sent from server to client
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Connection acknowledged
    Connected { session_id: Uuid },

    /// A widget event was recorded for the room's microsite
    EventRecorded { event: EventRecord },

    /// A lead was submitted from the room's microsite
    LeadCreated { lead: LeadRecord },

    /// Heartbeat response
    Pong,

    /// Error message
    Error { message: String },
}

impl ServerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::EventRecorded { .. } => "event_recorded",
            ServerEvent::LeadCreated { .. } => "lead_created",
            ServerEvent::Pong => "pong",
            ServerEvent::Error { .. } => "error",
        }
    }
}
