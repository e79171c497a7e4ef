//! PostgreSQL adapter for CategoryRepository

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::domain::entities::{Category, CategoryChanges, CategoryId, NewCategory, Page};
use crate::domain::ports::CategoryRepository;
use crate::entity::categories;
use crate::error::DomainError;

/// PostgreSQL implementation of CategoryRepository
pub struct PostgresCategoryRepository {
    db: DatabaseConnection,
}

impl PostgresCategoryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn list(&self, page: Page) -> Result<Vec<Category>, DomainError> {
        let results = categories::Entity::find()
            .order_by_asc(categories::Column::SortOrder)
            .order_by_asc(categories::Column::Name)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_by_id(&self, id: &CategoryId) -> Result<Option<Category>, DomainError> {
        let result = categories::Entity::find_by_id(id.0).one(&self.db).await?;
        Ok(result.map(|m| m.into()))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, DomainError> {
        let result = categories::Entity::find()
            .filter(categories::Column::Name.eq(name))
            .one(&self.db)
            .await?;

        Ok(result.map(|m| m.into()))
    }

    async fn missing(&self, ids: &[CategoryId]) -> Result<Vec<CategoryId>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found: HashSet<Uuid> = categories::Entity::find()
            .select_only()
            .column(categories::Column::Id)
            .filter(categories::Column::Id.is_in(ids.iter().map(|id| id.0)))
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await?
            .into_iter()
            .collect();

        Ok(ids
            .iter()
            .filter(|id| !found.contains(&id.0))
            .copied()
            .collect())
    }

    async fn count_children(&self, id: &CategoryId) -> Result<u64, DomainError> {
        let count = categories::Entity::find()
            .filter(categories::Column::ParentId.eq(id.0))
            .count(&self.db)
            .await?;

        Ok(count)
    }

    async fn create(&self, category: &NewCategory) -> Result<Category, DomainError> {
        let model = categories::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(category.name.clone()),
            description: Set(category.description.clone()),
            parent_id: Set(category.parent_id.map(|id| id.0)),
            sort_order: Set(category.sort_order),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(&self.db)
        .await?;

        Ok(model.into())
    }

    async fn update(
        &self,
        id: &CategoryId,
        changes: &CategoryChanges,
    ) -> Result<Category, DomainError> {
        let existing = categories::Entity::find_by_id(id.0)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Category {}", id)))?;

        let mut active = existing.into_active_model();
        if let Some(name) = &changes.name {
            active.name = Set(name.clone());
        }
        if let Some(description) = &changes.description {
            active.description = Set(description.clone());
        }
        if let Some(parent_id) = changes.parent_id {
            active.parent_id = Set(parent_id.map(|id| id.0));
        }
        if let Some(sort_order) = changes.sort_order {
            active.sort_order = Set(sort_order);
        }

        Ok(active.update(&self.db).await?.into())
    }

    async fn delete(&self, id: &CategoryId) -> Result<(), DomainError> {
        let result = categories::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            Err(DomainError::NotFound(format!("Category {}", id)))
        } else {
            Ok(())
        }
    }
}

/// Convert SeaORM model to domain entity
impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Category {
            id: CategoryId(model.id),
            name: model.name,
            description: model.description,
            parent_id: model.parent_id.map(CategoryId),
            sort_order: model.sort_order,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
