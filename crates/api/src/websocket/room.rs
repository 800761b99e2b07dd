//! Microsite rooms
//!
//! A room exists while at least one connection watches its microsite.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use super::connection::Connection;
use super::events::ServerEvent;

type Members = HashMap<Uuid, Arc<Connection>>;

#[derive(Default)]
pub struct RoomManager {
    rooms: DashMap<String, Members>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, microsite: &str, conn: &Arc<Connection>) {
        let room_size = {
            let mut members = self.rooms.entry(microsite.to_string()).or_default();
            members.insert(conn.session_id, Arc::clone(conn));
            members.len()
        };
        if conn.track(microsite) {
            tracing::debug!(
                microsite = %microsite,
                session_id = %conn.session_id,
                room_size,
                "Joined microsite room"
            );
        }
    }

    pub fn leave(&self, microsite: &str, conn: &Connection) {
        conn.untrack(microsite);
        if let Some(mut members) = self.rooms.get_mut(microsite) {
            members.remove(&conn.session_id);
        }
        self.rooms
            .remove_if(microsite, |_, members| members.is_empty());
    }

    /// Drop `conn` from every room it joined
    pub fn remove_connection(&self, conn: &Connection) {
        for microsite in conn.microsites() {
            self.leave(&microsite, conn);
        }
    }

    /// Send to every member of the room, returning how many accepted it
    pub fn broadcast(&self, microsite: &str, event: &ServerEvent) -> usize {
        // Snapshot so no shard lock is held while sending
        let members: Vec<Arc<Connection>> = match self.rooms.get(microsite) {
            Some(members) => members.values().cloned().collect(),
            None => return 0,
        };

        let delivered = members
            .iter()
            .filter(|conn| conn.send(event.clone()))
            .count();
        tracing::debug!(
            microsite = %microsite,
            event_type = event.kind(),
            delivered,
            closed = members.len() - delivered,
            "Broadcast to microsite room"
        );
        delivered
    }

    pub fn room_size(&self, microsite: &str) -> usize {
        self.rooms.get(microsite).map(|m| m.len()).unwrap_or(0)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
