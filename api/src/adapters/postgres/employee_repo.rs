//! PostgreSQL adapter for EmployeeRepository

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::domain::entities::{
    Employee, EmployeeChanges, EmployeeFilter, EmployeeId, NewEmployee, OfficeId, Page,
    SystemRole,
};
use crate::domain::ports::EmployeeRepository;
use crate::entity::{employee_roles, employees};
use crate::error::DomainError;

/// PostgreSQL implementation of EmployeeRepository
pub struct PostgresEmployeeRepository {
    db: DatabaseConnection,
}

impl PostgresEmployeeRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn filtered(filter: &EmployeeFilter) -> Select<employees::Entity> {
    let mut query = employees::Entity::find();
    if let Some(office_id) = filter.office_id {
        query = query.filter(employees::Column::OfficeId.eq(office_id.0));
    }
    if let Some(active) = filter.active {
        query = query.filter(employees::Column::IsActive.eq(active));
    }
    query
}

/// Load role sets and build domain employees
async fn with_roles<C: ConnectionTrait>(
    db: &C,
    models: Vec<employees::Model>,
) -> Result<Vec<Employee>, DomainError> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let mut roles: HashMap<Uuid, Vec<SystemRole>> = HashMap::new();
    for row in employee_roles::Entity::find()
        .filter(employee_roles::Column::EmployeeId.is_in(ids))
        .all(db)
        .await?
    {
        if let Ok(role) = row.role.parse() {
            roles.entry(row.employee_id).or_default().push(role);
        }
    }

    Ok(models
        .into_iter()
        .map(|m| {
            let mut employee_roles = roles.remove(&m.id).unwrap_or_default();
            employee_roles.sort_by_key(|r| SystemRole::ALL.iter().position(|x| x == r));
            to_employee(m, employee_roles)
        })
        .collect())
}

async fn with_role<C: ConnectionTrait>(
    db: &C,
    model: employees::Model,
) -> Result<Employee, DomainError> {
    with_roles(db, vec![model])
        .await?
        .pop()
        .ok_or_else(|| DomainError::Internal("Employee vanished while loading".to_string()))
}

async fn replace_roles<C: ConnectionTrait>(
    db: &C,
    employee_id: Uuid,
    roles: &[SystemRole],
) -> Result<(), DomainError> {
    employee_roles::Entity::delete_many()
        .filter(employee_roles::Column::EmployeeId.eq(employee_id))
        .exec(db)
        .await?;

    if roles.is_empty() {
        return Ok(());
    }

    employee_roles::Entity::insert_many(roles.iter().map(|role| employee_roles::ActiveModel {
        employee_id: Set(employee_id),
        role: Set(role.to_string()),
    }))
    .exec_without_returning(db)
    .await?;

    Ok(())
}

#[async_trait]
impl EmployeeRepository for PostgresEmployeeRepository {
    async fn list(
        &self,
        filter: &EmployeeFilter,
        page: Page,
    ) -> Result<Vec<Employee>, DomainError> {
        let models = filtered(filter)
            .order_by_asc(employees::Column::LastName)
            .order_by_asc(employees::Column::FirstName)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await?;

        with_roles(&self.db, models).await
    }

    async fn count(&self, filter: &EmployeeFilter) -> Result<u64, DomainError> {
        Ok(filtered(filter).count(&self.db).await?)
    }

    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, DomainError> {
        match employees::Entity::find_by_id(id.0).one(&self.db).await? {
            Some(model) => Ok(Some(with_role(&self.db, model).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, DomainError> {
        let result = employees::Entity::find()
            .filter(employees::Column::Email.eq(email))
            .one(&self.db)
            .await?;

        match result {
            Some(model) => Ok(Some(with_role(&self.db, model).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_api_key_hash(&self, hash: &str) -> Result<Option<Employee>, DomainError> {
        let result = employees::Entity::find()
            .filter(employees::Column::ApiKeyHash.eq(hash))
            .filter(employees::Column::IsActive.eq(true))
            .one(&self.db)
            .await?;

        match result {
            Some(model) => Ok(Some(with_role(&self.db, model).await?)),
            None => Ok(None),
        }
    }

    async fn create(&self, employee: &NewEmployee) -> Result<Employee, DomainError> {
        let id = Uuid::new_v4();
        let now = Utc::now().fixed_offset();
        let txn = self.db.begin().await?;

        let model = employees::ActiveModel {
            id: Set(id),
            office_id: Set(employee.office_id.map(|id| id.0)),
            first_name: Set(employee.first_name.clone()),
            last_name: Set(employee.last_name.clone()),
            email: Set(employee.email.clone()),
            title: Set(employee.title.clone()),
            phone: Set(employee.phone.clone()),
            is_active: Set(employee.is_active),
            api_key_hash: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        replace_roles(&txn, id, &employee.roles).await?;
        let created = with_role(&txn, model).await?;
        txn.commit().await?;

        Ok(created)
    }

    async fn update(
        &self,
        id: &EmployeeId,
        changes: &EmployeeChanges,
    ) -> Result<Employee, DomainError> {
        let existing = employees::Entity::find_by_id(id.0)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Employee {}", id)))?;

        let mut active = existing.into_active_model();
        if let Some(office_id) = changes.office_id {
            active.office_id = Set(office_id.map(|id| id.0));
        }
        if let Some(first_name) = &changes.first_name {
            active.first_name = Set(first_name.clone());
        }
        if let Some(last_name) = &changes.last_name {
            active.last_name = Set(last_name.clone());
        }
        if let Some(email) = &changes.email {
            active.email = Set(email.clone());
        }
        if let Some(title) = &changes.title {
            active.title = Set(title.clone());
        }
        if let Some(phone) = &changes.phone {
            active.phone = Set(phone.clone());
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        let model = active.update(&self.db).await?;
        with_role(&self.db, model).await
    }

    async fn set_roles(
        &self,
        id: &EmployeeId,
        roles: &[SystemRole],
    ) -> Result<Employee, DomainError> {
        let txn = self.db.begin().await?;

        let existing = employees::Entity::find_by_id(id.0)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Employee {}", id)))?;

        replace_roles(&txn, id.0, roles).await?;

        let mut active = existing.into_active_model();
        active.updated_at = Set(Utc::now().fixed_offset());
        let model = active.update(&txn).await?;

        let updated = with_role(&txn, model).await?;
        txn.commit().await?;

        Ok(updated)
    }

    async fn set_api_key_hash(
        &self,
        id: &EmployeeId,
        hash: Option<&str>,
    ) -> Result<(), DomainError> {
        let existing = employees::Entity::find_by_id(id.0)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Employee {}", id)))?;

        let mut active = existing.into_active_model();
        active.api_key_hash = Set(hash.map(str::to_string));
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&self.db).await?;

        Ok(())
    }

    async fn delete(&self, id: &EmployeeId) -> Result<(), DomainError> {
        let result = employees::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            Err(DomainError::NotFound(format!("Employee {}", id)))
        } else {
            Ok(())
        }
    }
}

fn to_employee(model: employees::Model, roles: Vec<SystemRole>) -> Employee {
    Employee {
        id: EmployeeId(model.id),
        office_id: model.office_id.map(OfficeId),
        first_name: model.first_name,
        last_name: model.last_name,
        email: model.email,
        title: model.title,
        phone: model.phone,
        is_active: model.is_active,
        roles,
        has_api_key: model.api_key_hash.is_some(),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
