//! Company asset handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::auth::require_write;
use crate::domain::entities::{
    AssetChanges, AssetFilter, AssetId, CompanyAsset, NewAsset, Page, Principal,
};
use crate::error::AppError;
use crate::AppState;

/// GET /assets
pub async fn list_assets(
    State(state): State<AppState>,
    Query(filter): Query<AssetFilter>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<CompanyAsset>>, AppError> {
    Ok(Json(state.asset_service.list(&filter, page).await?))
}

/// GET /assets/:id
pub async fn get_asset(
    State(state): State<AppState>,
    Path(id): Path<AssetId>,
) -> Result<Json<CompanyAsset>, AppError> {
    Ok(Json(state.asset_service.get(&id).await?))
}

/// POST /assets
pub async fn create_asset(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<NewAsset>,
) -> Result<(StatusCode, Json<CompanyAsset>), AppError> {
    require_write(&principal)?;
    let asset = state
        .asset_service
        .create(request, principal.actor_id())
        .await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

/// PATCH /assets/:id
pub async fn update_asset(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<AssetId>,
    Json(changes): Json<AssetChanges>,
) -> Result<Json<CompanyAsset>, AppError> {
    require_write(&principal)?;
    Ok(Json(
        state
            .asset_service
            .update(&id, changes, principal.actor_id())
            .await?,
    ))
}

/// DELETE /assets/:id
pub async fn delete_asset(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<AssetId>,
) -> Result<StatusCode, AppError> {
    require_write(&principal)?;
    state
        .asset_service
        .delete(&id, principal.actor_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
