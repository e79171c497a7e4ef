//! Microsoft Graph browsing handlers
//!
//! Every endpoint answers 503 while Graph credentials are not configured.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::app::SiteQuery;
use crate::domain::ports::{GraphChannel, GraphDriveItem, GraphSite, GraphTeam};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DriveQuery {
    /// Folder path inside the default document library; root when absent
    #[serde(default)]
    pub folder: String,
}

/// GET /integrations/teams
pub async fn list_teams(State(state): State<AppState>) -> Result<Json<Vec<GraphTeam>>, AppError> {
    Ok(Json(state.integration_service.list_teams().await?))
}

/// GET /integrations/teams/:team_id/channels
pub async fn list_channels(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> Result<Json<Vec<GraphChannel>>, AppError> {
    Ok(Json(state.integration_service.list_channels(&team_id).await?))
}

/// GET /integrations/sites?search=... or ?hostname=...&path=...
pub async fn find_sites(
    State(state): State<AppState>,
    Query(query): Query<SiteQuery>,
) -> Result<Json<Vec<GraphSite>>, AppError> {
    Ok(Json(state.integration_service.find_sites(&query).await?))
}

/// GET /integrations/sites/:site_id/drive?folder=...
pub async fn list_drive(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
    Query(query): Query<DriveQuery>,
) -> Result<Json<Vec<GraphDriveItem>>, AppError> {
    Ok(Json(
        state
            .integration_service
            .list_drive(&site_id, &query.folder)
            .await?,
    ))
}
