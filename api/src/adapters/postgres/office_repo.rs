//! PostgreSQL adapter for OfficeRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::domain::entities::{NewOffice, Office, OfficeChanges, OfficeId, Page};
use crate::domain::ports::OfficeRepository;
use crate::entity::offices;
use crate::error::DomainError;

/// PostgreSQL implementation of OfficeRepository
pub struct PostgresOfficeRepository {
    db: DatabaseConnection,
}

impl PostgresOfficeRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OfficeRepository for PostgresOfficeRepository {
    async fn list(&self, active: Option<bool>, page: Page) -> Result<Vec<Office>, DomainError> {
        let mut query = offices::Entity::find();
        if let Some(active) = active {
            query = query.filter(offices::Column::IsActive.eq(active));
        }

        let results = query
            .order_by_asc(offices::Column::Name)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_by_id(&self, id: &OfficeId) -> Result<Option<Office>, DomainError> {
        let result = offices::Entity::find_by_id(id.0).one(&self.db).await?;
        Ok(result.map(|m| m.into()))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Office>, DomainError> {
        let result = offices::Entity::find()
            .filter(offices::Column::Code.eq(code))
            .one(&self.db)
            .await?;

        Ok(result.map(|m| m.into()))
    }

    async fn create(&self, office: &NewOffice) -> Result<Office, DomainError> {
        let now = Utc::now().fixed_offset();

        let model = offices::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(office.name.clone()),
            code: Set(office.code.clone()),
            street: Set(office.street.clone()),
            city: Set(office.city.clone()),
            state: Set(office.state.clone()),
            postal_code: Set(office.postal_code.clone()),
            phone: Set(office.phone.clone()),
            email: Set(office.email.clone()),
            is_active: Set(office.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok(model.into())
    }

    async fn update(
        &self,
        id: &OfficeId,
        changes: &OfficeChanges,
    ) -> Result<Office, DomainError> {
        let existing = offices::Entity::find_by_id(id.0)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Office {}", id)))?;

        let mut active = existing.into_active_model();
        if let Some(name) = &changes.name {
            active.name = Set(name.clone());
        }
        if let Some(code) = &changes.code {
            active.code = Set(code.clone());
        }
        if let Some(street) = &changes.street {
            active.street = Set(street.clone());
        }
        if let Some(city) = &changes.city {
            active.city = Set(city.clone());
        }
        if let Some(state) = &changes.state {
            active.state = Set(state.clone());
        }
        if let Some(postal_code) = &changes.postal_code {
            active.postal_code = Set(postal_code.clone());
        }
        if let Some(phone) = &changes.phone {
            active.phone = Set(phone.clone());
        }
        if let Some(email) = &changes.email {
            active.email = Set(email.clone());
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        Ok(active.update(&self.db).await?.into())
    }

    async fn delete(&self, id: &OfficeId) -> Result<(), DomainError> {
        let result = offices::Entity::delete_by_id(id.0).exec(&self.db).await?;

        if result.rows_affected == 0 {
            Err(DomainError::NotFound(format!("Office {}", id)))
        } else {
            Ok(())
        }
    }
}

/// Convert SeaORM model to domain entity
impl From<offices::Model> for Office {
    fn from(model: offices::Model) -> Self {
        Office {
            id: OfficeId(model.id),
            name: model.name,
            code: model.code,
            street: model.street,
            city: model.city,
            state: model.state,
            postal_code: model.postal_code,
            phone: model.phone,
            email: model.email,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
