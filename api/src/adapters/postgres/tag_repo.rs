//! PostgreSQL adapter for TagRepository

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::domain::entities::{NewTag, Page, Tag, TagChanges, TagId};
use crate::domain::ports::TagRepository;
use crate::entity::{tags, template_tags};
use crate::error::DomainError;

/// PostgreSQL implementation of TagRepository
pub struct PostgresTagRepository {
    db: DatabaseConnection,
}

impl PostgresTagRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Attach template usage counts to tag rows
async fn with_counts<C: ConnectionTrait>(
    db: &C,
    models: Vec<tags::Model>,
) -> Result<Vec<Tag>, DomainError> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let counts: HashMap<Uuid, i64> = template_tags::Entity::find()
        .select_only()
        .column(template_tags::Column::TagId)
        .column_as(Expr::col(template_tags::Column::TemplateId).count(), "count")
        .filter(template_tags::Column::TagId.is_in(ids))
        .group_by(template_tags::Column::TagId)
        .into_tuple::<(Uuid, i64)>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    Ok(models
        .into_iter()
        .map(|m| {
            let count = counts.get(&m.id).copied().unwrap_or(0);
            to_tag(m, count)
        })
        .collect())
}

async fn with_count<C: ConnectionTrait>(db: &C, model: tags::Model) -> Result<Tag, DomainError> {
    with_counts(db, vec![model])
        .await?
        .pop()
        .ok_or_else(|| DomainError::Internal("Tag vanished while loading".to_string()))
}

#[async_trait]
impl TagRepository for PostgresTagRepository {
    async fn list(&self, page: Page) -> Result<Vec<Tag>, DomainError> {
        let models = tags::Entity::find()
            .order_by_asc(tags::Column::Name)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await?;

        with_counts(&self.db, models).await
    }

    async fn find_by_id(&self, id: &TagId) -> Result<Option<Tag>, DomainError> {
        match tags::Entity::find_by_id(id.0).one(&self.db).await? {
            Some(model) => Ok(Some(with_count(&self.db, model).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Tag>, DomainError> {
        let result = tags::Entity::find()
            .filter(tags::Column::Name.eq(name))
            .one(&self.db)
            .await?;

        match result {
            Some(model) => Ok(Some(with_count(&self.db, model).await?)),
            None => Ok(None),
        }
    }

    async fn missing(&self, ids: &[TagId]) -> Result<Vec<TagId>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found: HashSet<Uuid> = tags::Entity::find()
            .select_only()
            .column(tags::Column::Id)
            .filter(tags::Column::Id.is_in(ids.iter().map(|id| id.0)))
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

    async fn create(&self, tag: &NewTag) -> Result<Tag, DomainError> {
        let model = tags::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(tag.name.clone()),
            color: Set(tag.color.clone()),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(&self.db)
        .await?;

        Ok(to_tag(model, 0))
    }

    async fn update(&self, id: &TagId, changes: &TagChanges) -> Result<Tag, DomainError> {
        let existing = tags::Entity::find_by_id(id.0)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Tag {}", id)))?;

        let mut active = existing.into_active_model();
        if let Some(name) = &changes.name {
            active.name = Set(name.clone());
        }
        if let Some(color) = &changes.color {
            active.color = Set(color.clone());
        }
        let model = active.update(&self.db).await?;

        with_count(&self.db, model).await
    }

    async fn delete(&self, id: &TagId) -> Result<(), DomainError> {
        let result = tags::Entity::delete_by_id(id.0).exec(&self.db).await?;

        if result.rows_affected == 0 {
            Err(DomainError::NotFound(format!("Tag {}", id)))
        } else {
            Ok(())
        }
    }
}

fn to_tag(model: tags::Model, template_count: i64) -> Tag {
    Tag {
        id: TagId(model.id),
        name: model.name,
        color: model.color,
        template_count,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
