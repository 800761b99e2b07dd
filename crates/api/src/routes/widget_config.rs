//! Widget configuration and domain resolution routes

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::Value;
use widgetgate_shared::{ResolutionResult, TenantRecord};

use crate::{
    error::{ApiError, ApiResult, FieldError},
    state::AppState,
    validation::validate_widget_config,
};

const MAX_PROJECT_ID_CHARS: usize = 100;

/// `GET /api/widget-config/domain/:domain`
pub async fn resolve_domain(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> ApiResult<Json<ResolutionResult>> {
    state
        .resolver
        .resolve_raw(&domain)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::BadRequest("Invalid domain".to_string()))
}

/// `GET /api/widget-config/:project_id`. Always answers; unknown projects
/// and store outages get the default record.
pub async fn get_config(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Json<TenantRecord> {
    Json(state.resolver.get_tenant_config(&project_id).await)
}

/// `POST /api/widget-config/:project_id`
pub async fn update_config(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<TenantRecord>> {
    let Json(body) = payload?;
    let project_id = project_id.trim();
    if project_id.is_empty() || project_id.chars().count() > MAX_PROJECT_ID_CHARS {
        return Err(ApiError::Validation(vec![FieldError::new(
            "projectId",
            format!("projectId must be between 1 and {} characters", MAX_PROJECT_ID_CHARS),
        )]));
    }

    let update = validate_widget_config(&body)?;
    let record = state
        .resolver
        .upsert_tenant_config(project_id, &update)
        .await
        .map_err(|e| ApiError::Store("update widget config", e))?;

    Ok(Json(record))
}
