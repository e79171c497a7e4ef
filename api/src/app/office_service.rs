//! Office service

use std::sync::Arc;

use serde_json::json;

use super::audit_service::AuditService;
use crate::domain::entities::employee::normalize_email;
use crate::domain::entities::office::normalize_office_code;
use crate::domain::entities::{
    optional_text, required_text, AuditAction, EmployeeFilter, EmployeeId, NewOffice, Office,
    OfficeChanges, OfficeId, Page,
};
use crate::domain::ports::{AuditLogRepository, EmployeeRepository, OfficeRepository};
use crate::error::{AppError, DomainError};

/// Service for managing franchise offices
pub struct OfficeService<O, E, A>
where
    O: OfficeRepository,
    E: EmployeeRepository,
    A: AuditLogRepository,
{
    offices: Arc<O>,
    employees: Arc<E>,
    audit: AuditService<A>,
}

impl<O, E, A> OfficeService<O, E, A>
where
    O: OfficeRepository,
    E: EmployeeRepository,
    A: AuditLogRepository,
{
    pub fn new(offices: Arc<O>, employees: Arc<E>, audit: AuditService<A>) -> Self {
        Self {
            offices,
            employees,
            audit,
        }
    }

    pub async fn list(&self, active: Option<bool>, page: Page) -> Result<Vec<Office>, AppError> {
        Ok(self.offices.list(active, page.clamped()).await?)
    }

    pub async fn get(&self, id: &OfficeId) -> Result<Office, AppError> {
        self.offices
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Office {}", id)))
    }

    pub async fn create(
        &self,
        new: NewOffice,
        actor: Option<EmployeeId>,
    ) -> Result<Office, AppError> {
        let name = required_text("Name", &new.name, 200).map_err(DomainError::Validation)?;
        let code = normalize_office_code(&new.code).map_err(DomainError::Validation)?;
        let email = optional_text(new.email.as_deref())
            .map(|e| normalize_email(&e))
            .transpose()
            .map_err(DomainError::Validation)?;

        if self.offices.find_by_code(&code).await?.is_some() {
            return Err(DomainError::AlreadyExists(format!(
                "Office with code '{}' already exists",
                code
            ))
            .into());
        }

        let office = self
            .offices
            .create(&NewOffice {
                name,
                code,
                street: optional_text(new.street.as_deref()),
                city: optional_text(new.city.as_deref()),
                state: optional_text(new.state.as_deref()),
                postal_code: optional_text(new.postal_code.as_deref()),
                phone: optional_text(new.phone.as_deref()),
                email,
                is_active: new.is_active,
            })
            .await?;

        tracing::info!(office_id = %office.id, code = %office.code, "Office created");
        self.audit
            .record(
                "office",
                office.id.0,
                AuditAction::Create,
                actor,
                json!({ "code": office.code, "name": office.name }),
            )
            .await;

        Ok(office)
    }

    pub async fn update(
        &self,
        id: &OfficeId,
        mut changes: OfficeChanges,
        actor: Option<EmployeeId>,
    ) -> Result<Office, AppError> {
        self.get(id).await?;

        if let Some(name) = &changes.name {
            changes.name =
                Some(required_text("Name", name, 200).map_err(DomainError::Validation)?);
        }
        if let Some(code) = &changes.code {
            let code = normalize_office_code(code).map_err(DomainError::Validation)?;
            if let Some(other) = self.offices.find_by_code(&code).await? {
                if other.id != *id {
                    return Err(DomainError::AlreadyExists(format!(
                        "Office with code '{}' already exists",
                        code
                    ))
                    .into());
                }
            }
            changes.code = Some(code);
        }
        if let Some(email) = changes.email.take() {
            changes.email = Some(
                optional_text(email.as_deref())
                    .map(|e| normalize_email(&e))
                    .transpose()
                    .map_err(DomainError::Validation)?,
            );
        }
        for field in [
            &mut changes.street,
            &mut changes.city,
            &mut changes.state,
            &mut changes.postal_code,
            &mut changes.phone,
        ] {
            if let Some(value) = field.take() {
                *field = Some(optional_text(value.as_deref()));
            }
        }

        let office = self.offices.update(id, &changes).await?;

        self.audit
            .record(
                "office",
                id.0,
                AuditAction::Update,
                actor,
                json!({ "code": office.code, "is_active": office.is_active }),
            )
            .await;

        Ok(office)
    }

    /// Delete an office no employee belongs to
    pub async fn delete(&self, id: &OfficeId, actor: Option<EmployeeId>) -> Result<(), AppError> {
        let office = self.get(id).await?;

        let employees = self
            .employees
            .count(&EmployeeFilter::for_office(*id))
            .await?;
        if employees > 0 {
            return Err(DomainError::Conflict(format!(
                "Office '{}' still has {} employees",
                office.code, employees
            ))
            .into());
        }

        self.offices.delete(id).await?;

        tracing::info!(office_id = %id, "Office deleted");
        self.audit
            .record(
                "office",
                id.0,
                AuditAction::Delete,
                actor,
                json!({ "code": office.code }),
            )
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        test_employee, test_office, InMemoryAuditLogRepository, InMemoryEmployeeRepository,
        InMemoryOfficeRepository,
    };

    type Service =
        OfficeService<InMemoryOfficeRepository, InMemoryEmployeeRepository, InMemoryAuditLogRepository>;

    fn service(offices: InMemoryOfficeRepository, employees: InMemoryEmployeeRepository) -> Service {
        OfficeService::new(
            Arc::new(offices),
            Arc::new(employees),
            AuditService::new(Arc::new(InMemoryAuditLogRepository::new())),
        )
    }

    fn new_office(code: &str) -> NewOffice {
        NewOffice {
            name: "Dallas North".to_string(),
            code: code.to_string(),
            street: Some(" 100 Main St ".to_string()),
            city: Some("".to_string()),
            state: None,
            postal_code: None,
            phone: None,
            email: Some(" Dallas@Example.com ".to_string()),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn create_normalizes_fields() {
        let service = service(InMemoryOfficeRepository::new(), InMemoryEmployeeRepository::new());

        let office = service.create(new_office(" dal-n "), None).await.unwrap();
        assert_eq!(office.code, "DAL-N");
        assert_eq!(office.street.as_deref(), Some("100 Main St"));
        assert_eq!(office.city, None);
        assert_eq!(office.email.as_deref(), Some("dallas@example.com"));
    }

    #[tokio::test]
    async fn create_rejects_duplicate_code() {
        let service = service(
            InMemoryOfficeRepository::new().with_office(test_office("DAL")),
            InMemoryEmployeeRepository::new(),
        );

        let err = service.create(new_office("dal"), None).await.unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn create_rejects_bad_email() {
        let service = service(InMemoryOfficeRepository::new(), InMemoryEmployeeRepository::new());
        let mut new = new_office("DAL");
        new.email = Some("front desk".to_string());

        let err = service.create(new, None).await.unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn update_can_deactivate_and_clear_phone() {
        let mut office = test_office("DAL");
        office.phone = Some("555-0100".to_string());
        let service = service(
            InMemoryOfficeRepository::new().with_office(office.clone()),
            InMemoryEmployeeRepository::new(),
        );

        let updated = service
            .update(
                &office.id,
                OfficeChanges {
                    phone: Some(None),
                    is_active: Some(false),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert!(!updated.is_active);
        assert_eq!(updated.phone, None);
    }

    #[tokio::test]
    async fn delete_with_employees_conflicts() {
        let office = test_office("DAL");
        let mut employee = test_employee("dana@example.com");
        employee.office_id = Some(office.id);
        let service = service(
            InMemoryOfficeRepository::new().with_office(office.clone()),
            InMemoryEmployeeRepository::new().with_employee(employee),
        );

        let err = service.delete(&office.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn delete_empty_office() {
        let office = test_office("DAL");
        let service = service(
            InMemoryOfficeRepository::new().with_office(office.clone()),
            InMemoryEmployeeRepository::new(),
        );

        service.delete(&office.id, None).await.unwrap();
        assert!(matches!(
            service.get(&office.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
