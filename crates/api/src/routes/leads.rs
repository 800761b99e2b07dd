//! Lead submission

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    validation::validate_lead,
    websocket::ServerEvent,
};

/// `POST /api/leads`
pub async fn submit_lead(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(body) = payload?;
    let lead = validate_lead(&body)?;
    let record = state
        .leads
        .submit(lead)
        .await
        .map_err(|e| ApiError::Store("submit lead", e))?;

    tracing::info!(lead_id = %record.id, microsite = %record.microsite, "Lead submitted");

    state
        .ws_state
        .notify(
            Some(&record.microsite),
            ServerEvent::LeadCreated {
                lead: record.clone(),
            },
        );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Lead submitted", "lead": record })),
    ))
}
