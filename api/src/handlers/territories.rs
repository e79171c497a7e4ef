//! Territory and postal code handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::app::{AssignPostalCodes, PostalCodeLookup};
use crate::auth::require_write;
use crate::domain::entities::{
    NewTerritory, Page, Principal, Territory, TerritoryChanges, TerritoryId,
};
use crate::error::AppError;
use crate::AppState;

/// GET /territories
pub async fn list_territories(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<Territory>>, AppError> {
    Ok(Json(state.territory_service.list(page).await?))
}

/// GET /territories/:id
pub async fn get_territory(
    State(state): State<AppState>,
    Path(id): Path<TerritoryId>,
) -> Result<Json<Territory>, AppError> {
    Ok(Json(state.territory_service.get(&id).await?))
}

/// POST /territories
pub async fn create_territory(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<NewTerritory>,
) -> Result<(StatusCode, Json<Territory>), AppError> {
    require_write(&principal)?;
    let territory = state
        .territory_service
        .create(request, principal.actor_id())
        .await?;
    Ok((StatusCode::CREATED, Json(territory)))
}

/// PATCH /territories/:id
pub async fn update_territory(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<TerritoryId>,
    Json(changes): Json<TerritoryChanges>,
) -> Result<Json<Territory>, AppError> {
    require_write(&principal)?;
    Ok(Json(
        state
            .territory_service
            .update(&id, changes, principal.actor_id())
            .await?,
    ))
}

/// DELETE /territories/:id
///
/// Its postal codes are released, not deleted.
pub async fn delete_territory(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<TerritoryId>,
) -> Result<StatusCode, AppError> {
    require_write(&principal)?;
    state
        .territory_service
        .delete(&id, principal.actor_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /territories/:id/postal-codes
///
/// Codes owned by another territory are a 409 unless `force` is set.
pub async fn assign_postal_codes(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<TerritoryId>,
    Json(request): Json<AssignPostalCodes>,
) -> Result<Json<Territory>, AppError> {
    require_write(&principal)?;
    Ok(Json(
        state
            .territory_service
            .assign_postal_codes(&id, request, principal.actor_id())
            .await?,
    ))
}

/// DELETE /territories/:id/postal-codes/:code
pub async fn remove_postal_code(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, code)): Path<(TerritoryId, String)>,
) -> Result<StatusCode, AppError> {
    require_write(&principal)?;
    state
        .territory_service
        .remove_postal_code(&id, &code, principal.actor_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /postal-codes/:code
pub async fn lookup_postal_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<PostalCodeLookup>, AppError> {
    Ok(Json(state.territory_service.lookup(&code).await?))
}
