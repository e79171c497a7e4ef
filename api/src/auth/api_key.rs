//! API key authentication middleware

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};

use crate::domain::entities::Principal;
use crate::error::AppError;
use crate::AppState;

/// Extract the API key from the Authorization header
fn extract_api_key(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/// Authentication middleware
///
/// Resolves the bearer key to a [`Principal`] and injects it into request
/// extensions. The configured bootstrap key authenticates as the system
/// administrator; any other key must belong to an active employee.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let api_key = extract_api_key(&request).ok_or(AppError::Unauthorized)?;

    let principal = if is_bootstrap_key(state.config.admin_api_key.as_deref(), api_key) {
        Principal::System
    } else {
        let employee = state
            .employee_service
            .authenticate(api_key)
            .await?
            .ok_or(AppError::Unauthorized)?;
        tracing::debug!(employee_id = %employee.id, "Request authenticated");
        Principal::Employee(employee)
    };

    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

fn is_bootstrap_key(configured: Option<&str>, presented: &str) -> bool {
    configured.is_some_and(|key| key == presented)
}

/// Editors and admins may change content
pub fn require_write(principal: &Principal) -> Result<(), AppError> {
    if principal.can_write() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Employee, role and key management
pub fn require_admin(principal: &Principal) -> Result<(), AppError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::SystemRole;
    use crate::test_utils::test_employee;

    fn request_with(header: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/templates");
        if let Some(value) = header {
            builder = builder.header("Authorization", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn employee_with(roles: &[SystemRole]) -> Principal {
        let mut employee = test_employee("dana@example.com");
        employee.roles = roles.to_vec();
        Principal::Employee(employee)
    }

    #[test]
    fn extracts_bearer_key() {
        assert_eq!(extract_api_key(&request_with(Some("Bearer dh-abc"))), Some("dh-abc"));
        assert_eq!(extract_api_key(&request_with(Some("Basic dh-abc"))), None);
        assert_eq!(extract_api_key(&request_with(Some("Bearer   "))), None);
        assert_eq!(extract_api_key(&request_with(None)), None);
    }

    #[test]
    fn bootstrap_key_must_be_configured() {
        assert!(is_bootstrap_key(Some("root"), "root"));
        assert!(!is_bootstrap_key(Some("root"), "other"));
        assert!(!is_bootstrap_key(None, "root"));
    }

    #[test]
    fn viewers_cannot_write() {
        let viewer = employee_with(&[SystemRole::Viewer]);
        assert!(matches!(require_write(&viewer), Err(AppError::Forbidden)));
        assert!(matches!(require_admin(&viewer), Err(AppError::Forbidden)));
    }

    #[test]
    fn editors_write_but_do_not_administer() {
        let editor = employee_with(&[SystemRole::Editor]);
        assert!(require_write(&editor).is_ok());
        assert!(matches!(require_admin(&editor), Err(AppError::Forbidden)));
    }

    #[test]
    fn admins_and_system_may_do_everything() {
        for principal in [employee_with(&[SystemRole::Admin]), Principal::System] {
            assert!(require_write(&principal).is_ok());
            assert!(require_admin(&principal).is_ok());
        }
    }
}
