//! External listing handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::app::ListingImport;
use crate::auth::require_write;
use crate::domain::entities::{
    ExternalListing, ImportSummary, ListingChanges, ListingFilter, ListingId, NewListing, Page,
    Principal,
};
use crate::error::AppError;
use crate::AppState;

/// GET /listings
pub async fn list_listings(
    State(state): State<AppState>,
    Query(filter): Query<ListingFilter>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<ExternalListing>>, AppError> {
    Ok(Json(state.listing_service.list(&filter, page).await?))
}

/// GET /listings/:id
pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<ListingId>,
) -> Result<Json<ExternalListing>, AppError> {
    Ok(Json(state.listing_service.get(&id).await?))
}

/// POST /listings
pub async fn create_listing(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<NewListing>,
) -> Result<(StatusCode, Json<ExternalListing>), AppError> {
    require_write(&principal)?;
    let listing = state
        .listing_service
        .create(request, principal.actor_id())
        .await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

/// PATCH /listings/:id
pub async fn update_listing(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<ListingId>,
    Json(changes): Json<ListingChanges>,
) -> Result<Json<ExternalListing>, AppError> {
    require_write(&principal)?;
    Ok(Json(
        state
            .listing_service
            .update(&id, changes, principal.actor_id())
            .await?,
    ))
}

/// DELETE /listings/:id
pub async fn delete_listing(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<ListingId>,
) -> Result<StatusCode, AppError> {
    require_write(&principal)?;
    state
        .listing_service
        .delete(&id, principal.actor_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /listings/import
///
/// Upserts a batch by `(source, external_id)`. The batch is validated as a
/// whole; nothing is written if any listing is invalid.
pub async fn import_listings(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<ListingImport>,
) -> Result<Json<ImportSummary>, AppError> {
    require_write(&principal)?;
    Ok(Json(
        state
            .listing_service
            .import(request, principal.actor_id())
            .await?,
    ))
}
