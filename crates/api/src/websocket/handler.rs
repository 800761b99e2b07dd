//! `GET /ws` upgrade and per-socket loop
//!
//! Sockets are anonymous. `?microsite=` joins that room on connect; clients
//! can join and leave further rooms with `join`/`leave` messages.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::StreamExt, SinkExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::state::AppState;

use super::{
    connection::Connection,
    events::{ClientEvent, ServerEvent},
    state::WebSocketState,
};

const MAX_MICROSITE_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    microsite: Option<String>,
}

fn valid_microsite(raw: &str) -> Option<&str> {
    let microsite = raw.trim();
    (!microsite.is_empty() && microsite.chars().count() <= MAX_MICROSITE_CHARS)
        .then_some(microsite)
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
    Query(params): Query<WebSocketQuery>,
) -> Response {
    let microsite = params
        .microsite
        .as_deref()
        .and_then(valid_microsite)
        .map(str::to_string);
    tracing::debug!(microsite = ?microsite, "WebSocket upgrade requested");

    ws.on_upgrade(move |socket| handle_socket(socket, microsite, app_state.ws_state))
}

async fn handle_socket(socket: WebSocket, microsite: Option<String>, ws_state: WebSocketState) {
    let (mut outbound, mut inbound) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let conn = ws_state.register(tx);
    conn.send(ServerEvent::Connected {
        session_id: conn.session_id,
    });
    if let Some(microsite) = &microsite {
        ws_state.rooms.join(microsite, &conn);
    }

    // Writer: serialize queued events onto the socket
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, event_type = event.kind(), "Failed to serialize WebSocket event");
                    continue;
                }
            };
            if outbound.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = inbound.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => handle_client_event(event, &conn, &ws_state),
                Err(e) => {
                    tracing::debug!(session_id = %conn.session_id, error = %e, "Unparseable client event");
                    conn.send(ServerEvent::Error {
                        message: "Invalid event format".to_string(),
                    });
                }
            },
            Message::Close(_) => break,
            // Ping/pong frames are answered by axum; binary is not part of the protocol
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }

    ws_state.unregister(&conn);
    writer.abort();
}

fn handle_client_event(event: ClientEvent, conn: &Arc<Connection>, ws_state: &WebSocketState) {
    match event {
        ClientEvent::Ping => {
            conn.send(ServerEvent::Pong);
        }
        ClientEvent::Join { microsite } => match valid_microsite(&microsite) {
            Some(microsite) => ws_state.rooms.join(microsite, conn),
            None => {
                conn.send(ServerEvent::Error {
                    message: "Invalid microsite".to_string(),
                });
            }
        },
        ClientEvent::Leave { microsite } => ws_state.rooms.leave(microsite.trim(), conn),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(microsite: &str) -> ClientEvent {
        ClientEvent::Join {
            microsite: microsite.to_string(),
        }
    }

    #[test]
    fn test_ping_gets_pong() {
        let state = WebSocketState::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = state.register(tx);

        handle_client_event(ClientEvent::Ping, &conn, &state);
        assert!(matches!(rx.try_recv(), Ok(ServerEvent::Pong)));
    }

    #[test]
    fn test_join_and_leave_rooms() {
        let state = WebSocketState::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = state.register(tx);

        handle_client_event(join(" lodha.com "), &conn, &state);
        assert_eq!(state.rooms.room_size("lodha.com"), 1);
        assert!(conn.is_in("lodha.com"));

        handle_client_event(
            ClientEvent::Leave {
                microsite: "lodha.com".to_string(),
            },
            &conn,
            &state,
        );
        assert_eq!(state.rooms.room_size("lodha.com"), 0);
        assert!(!conn.is_in("lodha.com"));

        handle_client_event(join("  "), &conn, &state);
        assert!(matches!(rx.try_recv(), Ok(ServerEvent::Error { .. })));

        handle_client_event(join(&"a".repeat(MAX_MICROSITE_CHARS + 1)), &conn, &state);
        assert!(matches!(rx.try_recv(), Ok(ServerEvent::Error { .. })));
        assert_eq!(state.rooms.room_count(), 0);
    }
}
