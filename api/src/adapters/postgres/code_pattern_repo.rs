//! PostgreSQL adapter for CodePatternRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::domain::entities::{
    CodePattern, CodePatternChanges, CodePatternId, NewCodePattern, Page,
};
use crate::domain::ports::CodePatternRepository;
use crate::entity::code_patterns;
use crate::error::DomainError;

/// PostgreSQL implementation of CodePatternRepository
pub struct PostgresCodePatternRepository {
    db: DatabaseConnection,
}

impl PostgresCodePatternRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CodePatternRepository for PostgresCodePatternRepository {
    async fn list(&self, page: Page) -> Result<Vec<CodePattern>, DomainError> {
        let results = code_patterns::Entity::find()
            .order_by_asc(code_patterns::Column::Name)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_by_id(&self, id: &CodePatternId) -> Result<Option<CodePattern>, DomainError> {
        let result = code_patterns::Entity::find_by_id(id.0).one(&self.db).await?;
        Ok(result.map(|m| m.into()))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CodePattern>, DomainError> {
        let result = code_patterns::Entity::find()
            .filter(code_patterns::Column::Name.eq(name))
            .one(&self.db)
            .await?;

        Ok(result.map(|m| m.into()))
    }

    async fn create(&self, pattern: &NewCodePattern) -> Result<CodePattern, DomainError> {
        let now = Utc::now().fixed_offset();

        let model = code_patterns::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(pattern.name.clone()),
            description: Set(pattern.description.clone()),
            snippet: Set(pattern.snippet.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok(model.into())
    }

    async fn update(
        &self,
        id: &CodePatternId,
        changes: &CodePatternChanges,
    ) -> Result<CodePattern, DomainError> {
        let existing = code_patterns::Entity::find_by_id(id.0)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Code pattern {}", id)))?;

        let mut active = existing.into_active_model();
        if let Some(name) = &changes.name {
            active.name = Set(name.clone());
        }
        if let Some(description) = &changes.description {
            active.description = Set(description.clone());
        }
        if let Some(snippet) = &changes.snippet {
            active.snippet = Set(snippet.clone());
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        Ok(active.update(&self.db).await?.into())
    }

    async fn delete(&self, id: &CodePatternId) -> Result<(), DomainError> {
        let result = code_patterns::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            Err(DomainError::NotFound(format!("Code pattern {}", id)))
        } else {
            Ok(())
        }
    }
}

/// Convert SeaORM model to domain entity
impl From<code_patterns::Model> for CodePattern {
    fn from(model: code_patterns::Model) -> Self {
        CodePattern {
            id: CodePatternId(model.id),
            name: model.name,
            description: model.description,
            snippet: model.snippet,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
