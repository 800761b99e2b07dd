//! Widgetgate API Library
//!
//! HTTP surface for the chat widget: CORS and rate-limit admission, tenant
//! resolution, widget configuration, events, leads and chat.

pub mod chat;
pub mod config;
pub mod error;
pub mod routes;
pub mod routing;
pub mod security;
pub mod state;
pub mod store;
pub mod validation;
pub mod websocket;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use routing::TenantResolver;
pub use state::AppState;
