//! Real-time microsite feed
//!
//! Dashboards watching a microsite receive recorded widget events and new
//! leads as they happen.

pub mod connection;
pub mod events;
pub mod handler;
pub mod room;
pub mod state;

pub use events::ServerEvent;
pub use handler::ws_handler;
pub use state::WebSocketState;
