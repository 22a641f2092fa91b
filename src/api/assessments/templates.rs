use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::AssessmentTemplate;
use crate::repositories;
use crate::schemas::template::{TemplateCreate, TemplateListQuery, TemplateResponse, TemplateUpdate};
use crate::services::slot_layout;

fn to_response(template: AssessmentTemplate) -> TemplateResponse {
    TemplateResponse {
        id: template.id,
        university_id: template.university_id,
        name: template.name,
        exam_type: template.exam_type,
        max_marks: template.max_marks,
        config: template.config.0,
        created_at: format_primitive(template.created_at),
        updated_at: format_primitive(template.updated_at),
    }
}

/// Stored configs must parse as explicit template sections.
fn check_sections(config: &serde_json::Value) -> Result<(), ApiError> {
    slot_layout::parse_template(config).map(|_| ()).map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub(super) async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<TemplateListQuery>,
) -> Result<Json<Vec<TemplateResponse>>, ApiError> {
    let university_id = query
        .university_id
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::BadRequest("university_id is required".to_string()))?;

    let templates = repositories::templates::list_for_university(state.db(), &university_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list templates"))?;

    Ok(Json(templates.into_iter().map(to_response).collect()))
}

pub(super) async fn create_template(
    State(state): State<AppState>,
    Json(payload): Json<TemplateCreate>,
) -> Result<(StatusCode, Json<TemplateResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    check_sections(&payload.config)?;

    let template = repositories::templates::create(
        state.db(),
        repositories::templates::CreateTemplate {
            id: &Uuid::new_v4().to_string(),
            university_id: payload.university_id.trim(),
            name: payload.name.trim(),
            exam_type: payload.exam_type.as_deref(),
            max_marks: payload.max_marks,
            config: payload.config,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create template"))?;

    tracing::info!(template_id = %template.id, university_id = %template.university_id, "template created");

    Ok((StatusCode::CREATED, Json(to_response(template))))
}

pub(super) async fn update_template(
    Path(template_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<TemplateUpdate>,
) -> Result<Json<TemplateResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if let Some(config) = &payload.config {
        check_sections(config)?;
    }

    let template = repositories::templates::update(
        state.db(),
        &template_id,
        repositories::templates::UpdateTemplate {
            name: payload.name.as_deref().map(str::trim),
            exam_type: payload.exam_type.as_deref(),
            max_marks: payload.max_marks,
            config: payload.config,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update template"))?
    .ok_or_else(|| ApiError::NotFound("Template not found".to_string()))?;

    Ok(Json(to_response(template)))
}

pub(super) async fn delete_template(
    Path(template_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::templates::delete(state.db(), &template_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete template"))?;

    if !deleted {
        return Err(ApiError::NotFound("Template not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
