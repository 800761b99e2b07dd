//! Live sockets and their rooms, shared by every handler

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::connection::Connection;
use super::events::ServerEvent;
use super::room::RoomManager;

#[derive(Clone, Default)]
pub struct WebSocketState {
    connections: Arc<DashMap<Uuid, Arc<Connection>>>,
    pub rooms: Arc<RoomManager>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebSocketStats {
    pub active_connections: usize,
    pub active_rooms: usize,
}

impl WebSocketState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, sender: mpsc::UnboundedSender<ServerEvent>) -> Arc<Connection> {
        let conn = Arc::new(Connection::new(sender));
        self.connections.insert(conn.session_id, Arc::clone(&conn));
        tracing::info!(
            session_id = %conn.session_id,
            active_connections = self.connections.len(),
            "WebSocket connected"
        );
        conn
    }

    pub fn unregister(&self, conn: &Connection) {
        if self.connections.remove(&conn.session_id).is_some() {
            self.rooms.remove_connection(conn);
            tracing::info!(
                session_id = %conn.session_id,
                active_connections = self.connections.len(),
                "WebSocket disconnected"
            );
        }
    }

    /// Push `event` to everyone watching `microsite`. No microsite, no room.
    pub fn notify(&self, microsite: Option<&str>, event: ServerEvent) -> usize {
        match microsite.map(str::trim).filter(|m| !m.is_empty()) {
            Some(microsite) => self.rooms.broadcast(microsite, &event),
            None => 0,
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn stats(&self) -> WebSocketStats {
        WebSocketStats {
            active_connections: self.connection_count(),
            active_rooms: self.rooms.room_count(),
        }
    }
}
