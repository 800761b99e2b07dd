//! One dashboard socket and the microsites it watches

use dashmap::DashSet;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::ServerEvent;

/// Outbound half of a socket. The writer task drains the channel.
#[derive(Debug)]
pub struct Connection {
    pub session_id: Uuid,
    sender: mpsc::UnboundedSender<ServerEvent>,
    /// Rooms joined, so disconnect only visits these
    microsites: DashSet<String>,
}

impl Connection {
    pub fn new(sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            sender,
            microsites: DashSet::new(),
        }
    }

    /// False once the socket's writer is gone
    pub fn send(&self, event: ServerEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    pub(super) fn track(&self, microsite: &str) -> bool {
        self.microsites.insert(microsite.to_string())
    }

    pub(super) fn untrack(&self, microsite: &str) -> bool {
        self.microsites.remove(microsite).is_some()
    }

    pub fn is_in(&self, microsite: &str) -> bool {
        self.microsites.contains(microsite)
    }

    pub fn microsites(&self) -> Vec<String> {
        self.microsites.iter().map(|m| m.key().clone()).collect()
    }
}
