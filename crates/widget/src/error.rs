//! Widget client errors

use thiserror::Error;

/// Failure talking to the widgetgate API
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned status {0}")]
    Status(u16),
}

/// The host surface refused to attach or render the widget
#[derive(Debug, Error)]
#[error("Render failed: {0}")]
pub struct RenderError(pub String);

/// Why a bootstrap did not produce a mounted widget.
///
/// Backend outages are never surfaced here: they degrade to defaults.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The instance was torn down while bootstrap was in flight
    #[error("Bootstrap cancelled")]
    Cancelled,

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
