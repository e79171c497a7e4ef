//! Template handlers
//!
//! CRUD, status workflow, version history, preview and validation for
//! templates, plus export to SharePoint and announcement in Teams.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::app::{AnnounceRequest, ExportRequest, ExportResult, Preview, SavedTemplate};
use crate::auth::require_write;
use crate::domain::entities::{
    NewTemplate, Page, Principal, Template, TemplateChanges, TemplateFilter, TemplateId,
    TemplateStatus, TemplateVersion,
};
use crate::domain::ports::GraphChatMessage;
use crate::error::AppError;
use crate::sanitizer::SanitizeReport;
use crate::AppState;

// ============================================================================
// Request Types
// ============================================================================

/// Request to move a template through its workflow
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: TemplateStatus,
}

/// Values for merge tokens; keys without a value fall back to sample values
#[derive(Debug, Default, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub values: HashMap<String, String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /templates
pub async fn list_templates(
    State(state): State<AppState>,
    Query(filter): Query<TemplateFilter>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<Template>>, AppError> {
    Ok(Json(state.template_service.list(&filter, page).await?))
}

/// GET /templates/:id
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<TemplateId>,
) -> Result<Json<Template>, AppError> {
    Ok(Json(state.template_service.get(&id).await?))
}

/// POST /templates
///
/// Content is sanitized before it is stored; the response carries the warnings.
pub async fn create_template(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<NewTemplate>,
) -> Result<(StatusCode, Json<SavedTemplate>), AppError> {
    require_write(&principal)?;
    let saved = state
        .template_service
        .create(request, principal.actor_id())
        .await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// PATCH /templates/:id
pub async fn update_template(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<TemplateId>,
    Json(changes): Json<TemplateChanges>,
) -> Result<Json<SavedTemplate>, AppError> {
    require_write(&principal)?;
    Ok(Json(
        state
            .template_service
            .update(&id, changes, principal.actor_id())
            .await?,
    ))
}

/// DELETE /templates/:id
pub async fn delete_template(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<TemplateId>,
) -> Result<StatusCode, AppError> {
    require_write(&principal)?;
    state
        .template_service
        .delete(&id, principal.actor_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /templates/:id/status
pub async fn set_template_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<TemplateId>,
    Json(request): Json<SetStatusRequest>,
) -> Result<Json<Template>, AppError> {
    require_write(&principal)?;
    Ok(Json(
        state
            .template_service
            .set_status(&id, request.status, principal.actor_id())
            .await?,
    ))
}

/// GET /templates/:id/versions
pub async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<TemplateId>,
) -> Result<Json<Vec<TemplateVersion>>, AppError> {
    Ok(Json(state.template_service.list_versions(&id).await?))
}

/// GET /templates/:id/versions/:number
pub async fn get_version(
    State(state): State<AppState>,
    Path((id, number)): Path<(TemplateId, i32)>,
) -> Result<Json<TemplateVersion>, AppError> {
    Ok(Json(state.template_service.get_version(&id, number).await?))
}

/// POST /templates/:id/versions/:number/restore
///
/// Writes a new version carrying the old content.
pub async fn restore_version(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, number)): Path<(TemplateId, i32)>,
) -> Result<Json<Template>, AppError> {
    require_write(&principal)?;
    Ok(Json(
        state
            .template_service
            .restore_version(&id, number, principal.actor_id())
            .await?,
    ))
}

/// POST /templates/:id/preview
pub async fn preview_template(
    State(state): State<AppState>,
    Path(id): Path<TemplateId>,
    request: Option<Json<PreviewRequest>>,
) -> Result<Json<Preview>, AppError> {
    let values = request.map(|Json(r)| r.values).unwrap_or_default();
    Ok(Json(state.template_service.preview(&id, values).await?))
}

/// GET /templates/:id/validate
pub async fn validate_template(
    State(state): State<AppState>,
    Path(id): Path<TemplateId>,
) -> Result<Json<SanitizeReport>, AppError> {
    Ok(Json(state.template_service.validate(&id).await?))
}

/// POST /templates/:id/export
///
/// Uploads `<slug>.html` into a SharePoint document library folder.
pub async fn export_template(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<TemplateId>,
    Json(request): Json<ExportRequest>,
) -> Result<Json<ExportResult>, AppError> {
    require_write(&principal)?;
    Ok(Json(
        state
            .integration_service
            .export_template(&id, request, principal.actor_id())
            .await?,
    ))
}

/// POST /templates/:id/announce
pub async fn announce_template(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<TemplateId>,
    Json(request): Json<AnnounceRequest>,
) -> Result<Json<GraphChatMessage>, AppError> {
    require_write(&principal)?;
    Ok(Json(
        state
            .integration_service
            .announce_template(&id, request, principal.actor_id())
            .await?,
    ))
}
