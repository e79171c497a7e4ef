//! PostgreSQL adapter for LayoutPartialRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::domain::entities::{
    LayoutPartial, LayoutPartialChanges, LayoutPartialId, NewLayoutPartial, Page, PartialKind,
};
use crate::domain::ports::LayoutPartialRepository;
use crate::entity::layout_partials;
use crate::error::DomainError;

/// PostgreSQL implementation of LayoutPartialRepository
pub struct PostgresLayoutPartialRepository {
    db: DatabaseConnection,
}

impl PostgresLayoutPartialRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LayoutPartialRepository for PostgresLayoutPartialRepository {
    async fn list(&self, page: Page) -> Result<Vec<LayoutPartial>, DomainError> {
        let results = layout_partials::Entity::find()
            .order_by_asc(layout_partials::Column::Name)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn all(&self) -> Result<Vec<LayoutPartial>, DomainError> {
        let results = layout_partials::Entity::find()
            .order_by_asc(layout_partials::Column::Name)
            .all(&self.db)
            .await?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_by_id(
        &self,
        id: &LayoutPartialId,
    ) -> Result<Option<LayoutPartial>, DomainError> {
        let result = layout_partials::Entity::find_by_id(id.0)
            .one(&self.db)
            .await?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<LayoutPartial>, DomainError> {
        let result = layout_partials::Entity::find()
            .filter(layout_partials::Column::Name.eq(name))
            .one(&self.db)
            .await?;

        Ok(result.map(|m| m.into()))
    }

    async fn create(&self, partial: &NewLayoutPartial) -> Result<LayoutPartial, DomainError> {
        let now = Utc::now().fixed_offset();

        let model = layout_partials::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(partial.name.clone()),
            kind: Set(partial.kind.to_string()),
            content: Set(partial.content.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok(model.into())
    }

    async fn update(
        &self,
        id: &LayoutPartialId,
        changes: &LayoutPartialChanges,
    ) -> Result<LayoutPartial, DomainError> {
        let existing = layout_partials::Entity::find_by_id(id.0)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Layout partial {}", id)))?;

        let mut active = existing.into_active_model();
        if let Some(name) = &changes.name {
            active.name = Set(name.clone());
        }
        if let Some(kind) = changes.kind {
            active.kind = Set(kind.to_string());
        }
        if let Some(content) = &changes.content {
            active.content = Set(content.clone());
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        Ok(active.update(&self.db).await?.into())
    }

    async fn delete(&self, id: &LayoutPartialId) -> Result<(), DomainError> {
        let result = layout_partials::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            Err(DomainError::NotFound(format!("Layout partial {}", id)))
        } else {
            Ok(())
        }
    }
}

/// Convert SeaORM model to domain entity
impl From<layout_partials::Model> for LayoutPartial {
    fn from(model: layout_partials::Model) -> Self {
        LayoutPartial {
            id: LayoutPartialId(model.id),
            name: model.name,
            kind: model.kind.parse().unwrap_or(PartialKind::Block),
            content: model.content,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
