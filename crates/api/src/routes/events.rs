//! Widget analytics events

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use widgetgate_shared::EventSummary;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    validation::validate_event,
    websocket::ServerEvent,
};

/// `POST /api/events`
pub async fn record_event(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(body) = payload?;
    let event = validate_event(&body)?;
    let record = state
        .events
        .record(event)
        .await
        .map_err(|e| ApiError::Store("record event", e))?;

    tracing::debug!(
        event_type = %record.event_type,
        project_id = %record.project_id,
        "Event recorded"
    );

    state
        .ws_state
        .notify(
            record.microsite.as_deref(),
            ServerEvent::EventRecorded {
                event: record.clone(),
            },
        );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Event recorded", "event": record })),
    ))
}

/// `GET /api/events`
pub async fn event_summary(State(state): State<AppState>) -> ApiResult<Json<EventSummary>> {
    state
        .events
        .summary()
        .await
        .map(Json)
        .map_err(|e| ApiError::Store("fetch events summary", e))
}
