//! Content library handlers
//!
//! Merge fields, code patterns and layout partials. Snippets and partial
//! content are sanitized on write and the warnings are returned.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::app::Saved;
use crate::auth::require_write;
use crate::domain::entities::{
    CodePattern, CodePatternChanges, CodePatternId, LayoutPartial, LayoutPartialChanges,
    LayoutPartialId, MergeField, MergeFieldChanges, MergeFieldId, NewCodePattern,
    NewLayoutPartial, NewMergeField, Page, Principal,
};
use crate::error::AppError;
use crate::AppState;

// ============================================================================
// Merge Fields
// ============================================================================

/// GET /merge-fields
pub async fn list_merge_fields(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<MergeField>>, AppError> {
    Ok(Json(state.library_service.list_merge_fields(page).await?))
}

/// GET /merge-fields/:id
pub async fn get_merge_field(
    State(state): State<AppState>,
    Path(id): Path<MergeFieldId>,
) -> Result<Json<MergeField>, AppError> {
    Ok(Json(state.library_service.get_merge_field(&id).await?))
}

/// POST /merge-fields
pub async fn create_merge_field(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<NewMergeField>,
) -> Result<(StatusCode, Json<MergeField>), AppError> {
    require_write(&principal)?;
    let field = state
        .library_service
        .create_merge_field(request, principal.actor_id())
        .await?;
    Ok((StatusCode::CREATED, Json(field)))
}

/// PATCH /merge-fields/:id
///
/// The key is immutable; templates reference it.
pub async fn update_merge_field(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<MergeFieldId>,
    Json(changes): Json<MergeFieldChanges>,
) -> Result<Json<MergeField>, AppError> {
    require_write(&principal)?;
    Ok(Json(
        state
            .library_service
            .update_merge_field(&id, changes, principal.actor_id())
            .await?,
    ))
}

/// DELETE /merge-fields/:id
pub async fn delete_merge_field(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<MergeFieldId>,
) -> Result<StatusCode, AppError> {
    require_write(&principal)?;
    state
        .library_service
        .delete_merge_field(&id, principal.actor_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Code Patterns
// ============================================================================

/// GET /code-patterns
pub async fn list_code_patterns(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<CodePattern>>, AppError> {
    Ok(Json(state.library_service.list_code_patterns(page).await?))
}

/// GET /code-patterns/:id
pub async fn get_code_pattern(
    State(state): State<AppState>,
    Path(id): Path<CodePatternId>,
) -> Result<Json<CodePattern>, AppError> {
    Ok(Json(state.library_service.get_code_pattern(&id).await?))
}

/// POST /code-patterns
pub async fn create_code_pattern(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<NewCodePattern>,
) -> Result<(StatusCode, Json<Saved<CodePattern>>), AppError> {
    require_write(&principal)?;
    let saved = state
        .library_service
        .create_code_pattern(request, principal.actor_id())
        .await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// PATCH /code-patterns/:id
pub async fn update_code_pattern(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<CodePatternId>,
    Json(changes): Json<CodePatternChanges>,
) -> Result<Json<Saved<CodePattern>>, AppError> {
    require_write(&principal)?;
    Ok(Json(
        state
            .library_service
            .update_code_pattern(&id, changes, principal.actor_id())
            .await?,
    ))
}

/// DELETE /code-patterns/:id
pub async fn delete_code_pattern(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<CodePatternId>,
) -> Result<StatusCode, AppError> {
    require_write(&principal)?;
    state
        .library_service
        .delete_code_pattern(&id, principal.actor_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Layout Partials
// ============================================================================

/// GET /layout-partials
pub async fn list_partials(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<LayoutPartial>>, AppError> {
    Ok(Json(state.library_service.list_partials(page).await?))
}

/// GET /layout-partials/:id
pub async fn get_partial(
    State(state): State<AppState>,
    Path(id): Path<LayoutPartialId>,
) -> Result<Json<LayoutPartial>, AppError> {
    Ok(Json(state.library_service.get_partial(&id).await?))
}

/// POST /layout-partials
pub async fn create_partial(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<NewLayoutPartial>,
) -> Result<(StatusCode, Json<Saved<LayoutPartial>>), AppError> {
    require_write(&principal)?;
    let saved = state
        .library_service
        .create_partial(request, principal.actor_id())
        .await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// PATCH /layout-partials/:id
pub async fn update_partial(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<LayoutPartialId>,
    Json(changes): Json<LayoutPartialChanges>,
) -> Result<Json<Saved<LayoutPartial>>, AppError> {
    require_write(&principal)?;
    Ok(Json(
        state
            .library_service
            .update_partial(&id, changes, principal.actor_id())
            .await?,
    ))
}

/// DELETE /layout-partials/:id
pub async fn delete_partial(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<LayoutPartialId>,
) -> Result<StatusCode, AppError> {
    require_write(&principal)?;
    state
        .library_service
        .delete_partial(&id, principal.actor_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
