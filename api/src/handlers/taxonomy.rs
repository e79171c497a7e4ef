//! Tag and category handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::auth::require_write;
use crate::domain::entities::{
    Category, CategoryChanges, CategoryId, NewCategory, NewTag, Page, Principal, Tag, TagChanges,
    TagId,
};
use crate::error::AppError;
use crate::AppState;

// ============================================================================
// Tags
// ============================================================================

/// GET /tags
///
/// Each tag carries the number of templates using it.
pub async fn list_tags(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<Tag>>, AppError> {
    Ok(Json(state.taxonomy_service.list_tags(page).await?))
}

/// GET /tags/:id
pub async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<TagId>,
) -> Result<Json<Tag>, AppError> {
    Ok(Json(state.taxonomy_service.get_tag(&id).await?))
}

/// POST /tags
pub async fn create_tag(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<NewTag>,
) -> Result<(StatusCode, Json<Tag>), AppError> {
    require_write(&principal)?;
    let tag = state
        .taxonomy_service
        .create_tag(request, principal.actor_id())
        .await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// PATCH /tags/:id
pub async fn update_tag(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<TagId>,
    Json(changes): Json<TagChanges>,
) -> Result<Json<Tag>, AppError> {
    require_write(&principal)?;
    Ok(Json(
        state
            .taxonomy_service
            .update_tag(&id, changes, principal.actor_id())
            .await?,
    ))
}

/// DELETE /tags/:id
pub async fn delete_tag(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<TagId>,
) -> Result<StatusCode, AppError> {
    require_write(&principal)?;
    state
        .taxonomy_service
        .delete_tag(&id, principal.actor_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Categories
// ============================================================================

/// GET /categories
pub async fn list_categories(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.taxonomy_service.list_categories(page).await?))
}

/// GET /categories/:id
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(state.taxonomy_service.get_category(&id).await?))
}

/// POST /categories
pub async fn create_category(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    require_write(&principal)?;
    let category = state
        .taxonomy_service
        .create_category(request, principal.actor_id())
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PATCH /categories/:id
///
/// Moving a category under one of its own descendants is rejected.
pub async fn update_category(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<CategoryId>,
    Json(changes): Json<CategoryChanges>,
) -> Result<Json<Category>, AppError> {
    require_write(&principal)?;
    Ok(Json(
        state
            .taxonomy_service
            .update_category(&id, changes, principal.actor_id())
            .await?,
    ))
}

/// DELETE /categories/:id
pub async fn delete_category(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode, AppError> {
    require_write(&principal)?;
    state
        .taxonomy_service
        .delete_category(&id, principal.actor_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
