//! PostgreSQL adapter for MergeFieldRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::domain::entities::{
    MergeField, MergeFieldChanges, MergeFieldId, MergeFieldType, NewMergeField, Page,
};
use crate::domain::ports::MergeFieldRepository;
use crate::entity::merge_fields;
use crate::error::DomainError;

/// PostgreSQL implementation of MergeFieldRepository
pub struct PostgresMergeFieldRepository {
    db: DatabaseConnection,
}

impl PostgresMergeFieldRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MergeFieldRepository for PostgresMergeFieldRepository {
    async fn list(&self, page: Page) -> Result<Vec<MergeField>, DomainError> {
        let results = merge_fields::Entity::find()
            .order_by_asc(merge_fields::Column::Key)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn all(&self) -> Result<Vec<MergeField>, DomainError> {
        let results = merge_fields::Entity::find()
            .order_by_asc(merge_fields::Column::Key)
            .all(&self.db)
            .await?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_by_id(&self, id: &MergeFieldId) -> Result<Option<MergeField>, DomainError> {
        let result = merge_fields::Entity::find_by_id(id.0).one(&self.db).await?;
        Ok(result.map(|m| m.into()))
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<MergeField>, DomainError> {
        let result = merge_fields::Entity::find()
            .filter(merge_fields::Column::Key.eq(key))
            .one(&self.db)
            .await?;

        Ok(result.map(|m| m.into()))
    }

    async fn create(&self, field: &NewMergeField) -> Result<MergeField, DomainError> {
        let now = Utc::now().fixed_offset();

        let model = merge_fields::ActiveModel {
            id: Set(Uuid::new_v4()),
            key: Set(field.key.clone()),
            label: Set(field.label.clone()),
            description: Set(field.description.clone()),
            sample_value: Set(field.sample_value.clone()),
            data_type: Set(field.data_type.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok(model.into())
    }

    async fn update(
        &self,
        id: &MergeFieldId,
        changes: &MergeFieldChanges,
    ) -> Result<MergeField, DomainError> {
        let existing = merge_fields::Entity::find_by_id(id.0)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Merge field {}", id)))?;

        let mut active = existing.into_active_model();
        if let Some(label) = &changes.label {
            active.label = Set(label.clone());
        }
        if let Some(description) = &changes.description {
            active.description = Set(description.clone());
        }
        if let Some(sample_value) = &changes.sample_value {
            active.sample_value = Set(sample_value.clone());
        }
        if let Some(data_type) = changes.data_type {
            active.data_type = Set(data_type.to_string());
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        Ok(active.update(&self.db).await?.into())
    }

    async fn delete(&self, id: &MergeFieldId) -> Result<(), DomainError> {
        let result = merge_fields::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            Err(DomainError::NotFound(format!("Merge field {}", id)))
        } else {
            Ok(())
        }
    }
}

/// Convert SeaORM model to domain entity
impl From<merge_fields::Model> for MergeField {
    fn from(model: merge_fields::Model) -> Self {
        MergeField {
            id: MergeFieldId(model.id),
            key: model.key,
            label: model.label,
            description: model.description,
            sample_value: model.sample_value,
            data_type: model.data_type.parse().unwrap_or(MergeFieldType::Text),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
