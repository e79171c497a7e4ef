//! Audit log handlers

use axum::{
    extract::{Query, State},
    Json,
};

use crate::domain::entities::{AuditFilter, AuditLog, Page};
use crate::error::AppError;
use crate::AppState;

/// GET /audit-logs
///
/// Newest first; filter by `entity_type` and/or `entity_id`.
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(filter): Query<AuditFilter>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<AuditLog>>, AppError> {
    Ok(Json(state.audit_service.list(&filter, page).await?))
}
