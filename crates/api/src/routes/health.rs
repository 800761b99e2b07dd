//! Health check endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{error::ApiError, state::AppState, websocket::state::WebSocketStats};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store: String,
    pub websocket: WebSocketStats,
}

/// Service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Widget API is running. See /health for a simple check or /api/widget-config/:projectId for widget config.",
    }))
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store_status = match state.resolver.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::warn!(error = %e, "Health check: tenant store unreachable");
            "unhealthy"
        }
    };

    let overall_status = if store_status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        overall_status,
        Json(HealthResponse {
            status: if overall_status == StatusCode::OK {
                "ok".to_string()
            } else {
                "degraded".to_string()
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            store: store_status.to_string(),
            websocket: state.ws_state.stats(),
        }),
    )
}

/// Liveness probe (just returns 200 if the server is running)
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe: the tenant store must answer
pub async fn readiness(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.resolver.ping().await.map_err(|e| {
        tracing::warn!(error = %e, "Readiness check failed");
        ApiError::ServiceUnavailable
    })?;
    Ok(StatusCode::OK)
}

/// JSON 404 for anything no route matched
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Chrome devtools probes this path on every page load
pub async fn devtools_manifest() -> Json<Value> {
    Json(json!({}))
}
