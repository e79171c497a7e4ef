//! Office and employee handlers
//!
//! Offices are editable by editors; employees, their roles and their API
//! keys are managed by admins only.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::app::IssuedApiKey;
use crate::auth::{require_admin, require_write};
use crate::domain::entities::{
    Employee, EmployeeChanges, EmployeeFilter, EmployeeId, NewEmployee, NewOffice, Office,
    OfficeChanges, OfficeId, Page, Principal, SystemRole,
};
use crate::error::AppError;
use crate::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct OfficeQuery {
    pub active: Option<bool>,
}

/// Request to replace an employee's role set
#[derive(Debug, Deserialize)]
pub struct SetRolesRequest {
    pub roles: Vec<SystemRole>,
}

// ============================================================================
// Offices
// ============================================================================

/// GET /offices
pub async fn list_offices(
    State(state): State<AppState>,
    Query(query): Query<OfficeQuery>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<Office>>, AppError> {
    Ok(Json(state.office_service.list(query.active, page).await?))
}

/// GET /offices/:id
pub async fn get_office(
    State(state): State<AppState>,
    Path(id): Path<OfficeId>,
) -> Result<Json<Office>, AppError> {
    Ok(Json(state.office_service.get(&id).await?))
}

/// POST /offices
pub async fn create_office(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<NewOffice>,
) -> Result<(StatusCode, Json<Office>), AppError> {
    require_write(&principal)?;
    let office = state
        .office_service
        .create(request, principal.actor_id())
        .await?;
    Ok((StatusCode::CREATED, Json(office)))
}

/// PATCH /offices/:id
pub async fn update_office(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<OfficeId>,
    Json(changes): Json<OfficeChanges>,
) -> Result<Json<Office>, AppError> {
    require_write(&principal)?;
    Ok(Json(
        state
            .office_service
            .update(&id, changes, principal.actor_id())
            .await?,
    ))
}

/// DELETE /offices/:id
///
/// Refused with 409 while employees still belong to the office.
pub async fn delete_office(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<OfficeId>,
) -> Result<StatusCode, AppError> {
    require_write(&principal)?;
    state
        .office_service
        .delete(&id, principal.actor_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Employees
// ============================================================================

/// GET /employees
pub async fn list_employees(
    State(state): State<AppState>,
    Query(filter): Query<EmployeeFilter>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<Employee>>, AppError> {
    Ok(Json(state.employee_service.list(&filter, page).await?))
}

/// GET /employees/:id
pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<EmployeeId>,
) -> Result<Json<Employee>, AppError> {
    Ok(Json(state.employee_service.get(&id).await?))
}

/// POST /employees
pub async fn create_employee(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<NewEmployee>,
) -> Result<(StatusCode, Json<Employee>), AppError> {
    require_admin(&principal)?;
    let employee = state
        .employee_service
        .create(request, principal.actor_id())
        .await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

/// PATCH /employees/:id
pub async fn update_employee(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<EmployeeId>,
    Json(changes): Json<EmployeeChanges>,
) -> Result<Json<Employee>, AppError> {
    require_admin(&principal)?;
    Ok(Json(
        state
            .employee_service
            .update(&id, changes, principal.actor_id())
            .await?,
    ))
}

/// DELETE /employees/:id
pub async fn delete_employee(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<EmployeeId>,
) -> Result<StatusCode, AppError> {
    require_admin(&principal)?;
    state
        .employee_service
        .delete(&id, principal.actor_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /employees/:id/roles
pub async fn set_employee_roles(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<EmployeeId>,
    Json(request): Json<SetRolesRequest>,
) -> Result<Json<Employee>, AppError> {
    require_admin(&principal)?;
    Ok(Json(
        state
            .employee_service
            .set_roles(&id, &request.roles, principal.actor_id())
            .await?,
    ))
}

/// POST /employees/:id/api-key
///
/// Returns the new key once. Any previous key stops working.
pub async fn issue_api_key(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<EmployeeId>,
) -> Result<(StatusCode, Json<IssuedApiKey>), AppError> {
    require_admin(&principal)?;
    let issued = state
        .employee_service
        .issue_api_key(&id, principal.actor_id())
        .await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// DELETE /employees/:id/api-key
pub async fn revoke_api_key(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<EmployeeId>,
) -> Result<StatusCode, AppError> {
    require_admin(&principal)?;
    state
        .employee_service
        .revoke_api_key(&id, principal.actor_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_request_rejects_unknown_role() {
        let request: SetRolesRequest =
            serde_json::from_str(r#"{"roles": ["admin", "viewer"]}"#).unwrap();
        assert_eq!(request.roles, vec![SystemRole::Admin, SystemRole::Viewer]);

        assert!(serde_json::from_str::<SetRolesRequest>(r#"{"roles": ["owner"]}"#).is_err());
    }

    #[test]
    fn office_query_parses_flag() {
        let uri: axum::http::Uri = "/offices?active=true&limit=5".parse().unwrap();
        let Query(query) = Query::<OfficeQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.active, Some(true));
        let Query(page) = Query::<Page>::try_from_uri(&uri).unwrap();
        assert_eq!(page.limit, 5);

        let uri: axum::http::Uri = "/offices".parse().unwrap();
        let Query(query) = Query::<OfficeQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.active, None);
    }
}
