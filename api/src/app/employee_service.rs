//! Employee service
//!
//! Employee records, system roles and per-employee API keys.

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use super::audit_service::AuditService;
use crate::domain::entities::employee::{dedup_roles, normalize_email};
use crate::domain::entities::{
    optional_text, required_text, AuditAction, Employee, EmployeeChanges, EmployeeFilter,
    EmployeeId, NewEmployee, OfficeId, Page, SystemRole,
};
use crate::domain::ports::{AuditLogRepository, EmployeeRepository, OfficeRepository};
use crate::error::{AppError, DomainError};

const ENTITY: &str = "employee";

/// A freshly issued key, returned exactly once
#[derive(Debug, Serialize)]
pub struct IssuedApiKey {
    pub employee_id: EmployeeId,
    pub api_key: String,
}

/// Service for managing employees
pub struct EmployeeService<E, O, A>
where
    E: EmployeeRepository,
    O: OfficeRepository,
    A: AuditLogRepository,
{
    employees: Arc<E>,
    offices: Arc<O>,
    audit: AuditService<A>,
}

impl<E, O, A> EmployeeService<E, O, A>
where
    E: EmployeeRepository,
    O: OfficeRepository,
    A: AuditLogRepository,
{
    pub fn new(employees: Arc<E>, offices: Arc<O>, audit: AuditService<A>) -> Self {
        Self {
            employees,
            offices,
            audit,
        }
    }

    pub async fn list(
        &self,
        filter: &EmployeeFilter,
        page: Page,
    ) -> Result<Vec<Employee>, AppError> {
        Ok(self.employees.list(filter, page.clamped()).await?)
    }

    pub async fn get(&self, id: &EmployeeId) -> Result<Employee, AppError> {
        self.employees
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Employee {}", id)))
    }

    /// Resolve an API key to an active employee
    pub async fn authenticate(&self, api_key: &str) -> Result<Option<Employee>, AppError> {
        let hash = hash_api_key(api_key);
        Ok(self.employees.find_by_api_key_hash(&hash).await?)
    }

    pub async fn create(
        &self,
        new: NewEmployee,
        actor: Option<EmployeeId>,
    ) -> Result<Employee, AppError> {
        let first_name =
            required_text("First name", &new.first_name, 100).map_err(DomainError::Validation)?;
        let last_name =
            required_text("Last name", &new.last_name, 100).map_err(DomainError::Validation)?;
        let email = normalize_email(&new.email).map_err(DomainError::Validation)?;
        let roles = dedup_roles(&new.roles);
        if roles.is_empty() {
            return Err(
                DomainError::Validation("An employee needs at least one role".to_string()).into(),
            );
        }

        if let Some(office_id) = new.office_id {
            self.ensure_office_exists(&office_id).await?;
        }
        self.ensure_email_free(&email, None).await?;

        let employee = self
            .employees
            .create(&NewEmployee {
                office_id: new.office_id,
                first_name,
                last_name,
                email,
                title: optional_text(new.title.as_deref()),
                phone: optional_text(new.phone.as_deref()),
                is_active: new.is_active,
                roles,
            })
            .await?;

        tracing::info!(employee_id = %employee.id, email = %employee.email, "Employee created");
        self.audit
            .record(
                ENTITY,
                employee.id.0,
                AuditAction::Create,
                actor,
                json!({ "email": employee.email, "roles": employee.roles }),
            )
            .await;

        Ok(employee)
    }

    pub async fn update(
        &self,
        id: &EmployeeId,
        mut changes: EmployeeChanges,
        actor: Option<EmployeeId>,
    ) -> Result<Employee, AppError> {
        self.get(id).await?;

        if let Some(first) = &changes.first_name {
            changes.first_name =
                Some(required_text("First name", first, 100).map_err(DomainError::Validation)?);
        }
        if let Some(last) = &changes.last_name {
            changes.last_name =
                Some(required_text("Last name", last, 100).map_err(DomainError::Validation)?);
        }
        if let Some(email) = &changes.email {
            let email = normalize_email(email).map_err(DomainError::Validation)?;
            self.ensure_email_free(&email, Some(id)).await?;
            changes.email = Some(email);
        }
        if let Some(Some(office_id)) = changes.office_id {
            self.ensure_office_exists(&office_id).await?;
        }
        changes.title = changes.title.map(|t| optional_text(t.as_deref()));
        changes.phone = changes.phone.map(|p| optional_text(p.as_deref()));

        let employee = self.employees.update(id, &changes).await?;

        self.audit
            .record(
                ENTITY,
                id.0,
                AuditAction::Update,
                actor,
                json!({ "email": employee.email, "is_active": employee.is_active }),
            )
            .await;

        Ok(employee)
    }

    pub async fn delete(&self, id: &EmployeeId, actor: Option<EmployeeId>) -> Result<(), AppError> {
        let employee = self.get(id).await?;
        self.employees.delete(id).await?;

        tracing::info!(employee_id = %id, "Employee deleted");
        self.audit
            .record(
                ENTITY,
                id.0,
                AuditAction::Delete,
                actor,
                json!({ "email": employee.email }),
            )
            .await;

        Ok(())
    }

    /// Replace the employee's roles
    pub async fn set_roles(
        &self,
        id: &EmployeeId,
        roles: &[SystemRole],
        actor: Option<EmployeeId>,
    ) -> Result<Employee, AppError> {
        let before = self.get(id).await?;

        let roles = dedup_roles(roles);
        if roles.is_empty() {
            return Err(
                DomainError::Validation("An employee needs at least one role".to_string()).into(),
            );
        }

        let employee = self.employees.set_roles(id, &roles).await?;

        tracing::info!(employee_id = %id, roles = ?employee.roles, "Employee roles replaced");
        self.audit
            .record(
                ENTITY,
                id.0,
                AuditAction::Update,
                actor,
                json!({ "roles": { "from": before.roles, "to": employee.roles } }),
            )
            .await;

        Ok(employee)
    }

    /// Issue a new API key, replacing any previous one
    pub async fn issue_api_key(
        &self,
        id: &EmployeeId,
        actor: Option<EmployeeId>,
    ) -> Result<IssuedApiKey, AppError> {
        let employee = self.get(id).await?;
        if !employee.is_active {
            return Err(DomainError::Conflict(format!(
                "Employee {} is inactive and cannot receive an API key",
                id
            ))
            .into());
        }

        let api_key = generate_api_key();
        self.employees
            .set_api_key_hash(id, Some(&hash_api_key(&api_key)))
            .await?;

        tracing::info!(employee_id = %id, "API key issued");
        self.audit
            .record(
                ENTITY,
                id.0,
                AuditAction::Update,
                actor,
                json!({ "api_key": "issued", "replaced": employee.has_api_key }),
            )
            .await;

        Ok(IssuedApiKey {
            employee_id: *id,
            api_key,
        })
    }

    pub async fn revoke_api_key(
        &self,
        id: &EmployeeId,
        actor: Option<EmployeeId>,
    ) -> Result<(), AppError> {
        let employee = self.get(id).await?;
        if !employee.has_api_key {
            return Err(AppError::NotFound(format!("API key for employee {}", id)));
        }

        self.employees.set_api_key_hash(id, None).await?;

        tracing::info!(employee_id = %id, "API key revoked");
        self.audit
            .record(
                ENTITY,
                id.0,
                AuditAction::Update,
                actor,
                json!({ "api_key": "revoked" }),
            )
            .await;

        Ok(())
    }

    async fn ensure_office_exists(&self, office_id: &OfficeId) -> Result<(), AppError> {
        if self.offices.find_by_id(office_id).await?.is_none() {
            return Err(
                DomainError::Validation(format!("Office {} does not exist", office_id)).into(),
            );
        }
        Ok(())
    }

    async fn ensure_email_free(
        &self,
        email: &str,
        except: Option<&EmployeeId>,
    ) -> Result<(), AppError> {
        if let Some(other) = self.employees.find_by_email(email).await? {
            if except != Some(&other.id) {
                return Err(DomainError::AlreadyExists(format!(
                    "Employee with email '{}' already exists",
                    email
                ))
                .into());
            }
        }
        Ok(())
    }
}

/// Generate a random API key
fn generate_api_key() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    format!("dh-{}", hex::encode(bytes))
}

/// Hash an API key using SHA-256
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}
