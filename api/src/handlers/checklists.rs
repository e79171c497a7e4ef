//! Checklist handlers
//!
//! Checklist responses carry a `progress` summary computed from their items.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::app::ChecklistView;
use crate::auth::require_write;
use crate::domain::entities::{
    ChecklistChanges, ChecklistId, ChecklistItem, ChecklistItemChanges, ChecklistItemId,
    NewChecklist, NewChecklistItem, OfficeId, Page, Principal,
};
use crate::error::AppError;
use crate::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ChecklistQuery {
    pub office_id: Option<OfficeId>,
}

/// Mark an item done (the default) or reopen it
#[derive(Debug, Deserialize)]
pub struct CompleteItemRequest {
    #[serde(default = "default_completed")]
    pub completed: bool,
}

fn default_completed() -> bool {
    true
}

// ============================================================================
// Checklists
// ============================================================================

/// GET /checklists
pub async fn list_checklists(
    State(state): State<AppState>,
    Query(query): Query<ChecklistQuery>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<ChecklistView>>, AppError> {
    Ok(Json(
        state.checklist_service.list(query.office_id, page).await?,
    ))
}

/// GET /checklists/:id
pub async fn get_checklist(
    State(state): State<AppState>,
    Path(id): Path<ChecklistId>,
) -> Result<Json<ChecklistView>, AppError> {
    Ok(Json(state.checklist_service.get(&id).await?))
}

/// POST /checklists
pub async fn create_checklist(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<NewChecklist>,
) -> Result<(StatusCode, Json<ChecklistView>), AppError> {
    require_write(&principal)?;
    let checklist = state
        .checklist_service
        .create(request, principal.actor_id())
        .await?;
    Ok((StatusCode::CREATED, Json(checklist)))
}

/// PATCH /checklists/:id
pub async fn update_checklist(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<ChecklistId>,
    Json(changes): Json<ChecklistChanges>,
) -> Result<Json<ChecklistView>, AppError> {
    require_write(&principal)?;
    Ok(Json(
        state
            .checklist_service
            .update(&id, changes, principal.actor_id())
            .await?,
    ))
}

/// DELETE /checklists/:id
pub async fn delete_checklist(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<ChecklistId>,
) -> Result<StatusCode, AppError> {
    require_write(&principal)?;
    state
        .checklist_service
        .delete(&id, principal.actor_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Items
// ============================================================================

/// POST /checklists/:id/items
///
/// The item is appended after the current last position.
pub async fn add_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<ChecklistId>,
    Json(request): Json<NewChecklistItem>,
) -> Result<(StatusCode, Json<ChecklistItem>), AppError> {
    require_write(&principal)?;
    let item = state
        .checklist_service
        .add_item(&id, request, principal.actor_id())
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PATCH /checklists/:id/items/:item_id
pub async fn update_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, item_id)): Path<(ChecklistId, ChecklistItemId)>,
    Json(changes): Json<ChecklistItemChanges>,
) -> Result<Json<ChecklistItem>, AppError> {
    require_write(&principal)?;
    Ok(Json(
        state
            .checklist_service
            .update_item(&id, &item_id, changes, principal.actor_id())
            .await?,
    ))
}

/// DELETE /checklists/:id/items/:item_id
pub async fn delete_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, item_id)): Path<(ChecklistId, ChecklistItemId)>,
) -> Result<StatusCode, AppError> {
    require_write(&principal)?;
    state
        .checklist_service
        .delete_item(&id, &item_id, principal.actor_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /checklists/:id/items/:item_id/complete
pub async fn complete_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, item_id)): Path<(ChecklistId, ChecklistItemId)>,
    request: Option<Json<CompleteItemRequest>>,
) -> Result<Json<ChecklistItem>, AppError> {
    require_write(&principal)?;
    let completed = request.map_or(true, |Json(r)| r.completed);
    Ok(Json(
        state
            .checklist_service
            .complete_item(&id, &item_id, completed, principal.actor_id())
            .await?,
    ))
}
