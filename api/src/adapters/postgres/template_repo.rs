//! PostgreSQL adapter for TemplateRepository

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{extension::postgres::PgExpr, Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::domain::entities::{
    CategoryId, EmployeeId, NewTemplate, Page, TagId, Template, TemplateChanges, TemplateFilter,
    TemplateId, TemplateStatus, TemplateVersion,
};
use crate::domain::ports::TemplateRepository;
use crate::entity::{template_categories, template_tags, template_versions, templates};
use crate::error::DomainError;

/// PostgreSQL implementation of TemplateRepository
pub struct PostgresTemplateRepository {
    db: DatabaseConnection,
}

impl PostgresTemplateRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Load tag and category ids for each model and build domain templates
async fn hydrate<C: ConnectionTrait>(
    db: &C,
    models: Vec<templates::Model>,
) -> Result<Vec<Template>, DomainError> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();

    let mut tags: HashMap<Uuid, Vec<TagId>> = HashMap::new();
    for row in template_tags::Entity::find()
        .filter(template_tags::Column::TemplateId.is_in(ids.clone()))
        .all(db)
        .await?
    {
        tags.entry(row.template_id)
            .or_default()
            .push(TagId(row.tag_id));
    }

    let mut categories: HashMap<Uuid, Vec<CategoryId>> = HashMap::new();
    for row in template_categories::Entity::find()
        .filter(template_categories::Column::TemplateId.is_in(ids))
        .all(db)
        .await?
    {
        categories
            .entry(row.template_id)
            .or_default()
            .push(CategoryId(row.category_id));
    }

    Ok(models
        .into_iter()
        .map(|m| {
            let mut tag_ids = tags.remove(&m.id).unwrap_or_default();
            let mut category_ids = categories.remove(&m.id).unwrap_or_default();
            tag_ids.sort();
            category_ids.sort();
            to_template(m, tag_ids, category_ids)
        })
        .collect())
}

async fn hydrate_one<C: ConnectionTrait>(
    db: &C,
    model: templates::Model,
) -> Result<Template, DomainError> {
    hydrate(db, vec![model])
        .await?
        .pop()
        .ok_or_else(|| DomainError::Internal("Template vanished while loading".to_string()))
}

async fn replace_tags<C: ConnectionTrait>(
    db: &C,
    template_id: Uuid,
    tag_ids: &[TagId],
) -> Result<(), DomainError> {
    template_tags::Entity::delete_many()
        .filter(template_tags::Column::TemplateId.eq(template_id))
        .exec(db)
        .await?;

    if tag_ids.is_empty() {
        return Ok(());
    }

    template_tags::Entity::insert_many(tag_ids.iter().map(|tag_id| template_tags::ActiveModel {
        template_id: Set(template_id),
        tag_id: Set(tag_id.0),
    }))
    .exec_without_returning(db)
    .await?;

    Ok(())
}

async fn replace_categories<C: ConnectionTrait>(
    db: &C,
    template_id: Uuid,
    category_ids: &[CategoryId],
) -> Result<(), DomainError> {
    template_categories::Entity::delete_many()
        .filter(template_categories::Column::TemplateId.eq(template_id))
        .exec(db)
        .await?;

    if category_ids.is_empty() {
        return Ok(());
    }

    template_categories::Entity::insert_many(category_ids.iter().map(|category_id| {
        template_categories::ActiveModel {
            template_id: Set(template_id),
            category_id: Set(category_id.0),
        }
    }))
    .exec_without_returning(db)
    .await?;

    Ok(())
}

async fn insert_version<C: ConnectionTrait>(
    db: &C,
    template_id: Uuid,
    version_number: i32,
    content: &str,
    change_note: Option<String>,
    created_by: Option<EmployeeId>,
) -> Result<(), DomainError> {
    template_versions::ActiveModel {
        id: Set(Uuid::new_v4()),
        template_id: Set(template_id),
        version_number: Set(version_number),
        content: Set(content.to_string()),
        change_note: Set(change_note),
        created_by: Set(created_by.map(|id| id.0)),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(db)
    .await?;

    Ok(())
}

#[async_trait]
impl TemplateRepository for PostgresTemplateRepository {
    async fn list(
        &self,
        filter: &TemplateFilter,
        page: Page,
    ) -> Result<Vec<Template>, DomainError> {
        let mut query = templates::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(templates::Column::Status.eq(status.as_str()));
        }

        if let Some(tag) = filter.tag {
            query = query.filter(
                templates::Column::Id.in_subquery(
                    Query::select()
                        .column(template_tags::Column::TemplateId)
                        .from(template_tags::Entity)
                        .and_where(template_tags::Column::TagId.eq(tag.0))
                        .to_owned(),
                ),
            );
        }

        if let Some(category) = filter.category {
            query = query.filter(
                templates::Column::Id.in_subquery(
                    Query::select()
                        .column(template_categories::Column::TemplateId)
                        .from(template_categories::Entity)
                        .and_where(template_categories::Column::CategoryId.eq(category.0))
                        .to_owned(),
                ),
            );
        }

        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = contains_pattern(search);
            let name = Expr::col((templates::Entity, templates::Column::Name));
            let slug = Expr::col((templates::Entity, templates::Column::Slug));
            query = query.filter(
                Condition::any()
                    .add(name.ilike(pattern.as_str()))
                    .add(slug.ilike(pattern.as_str())),
            );
        }

        let models = query
            .order_by_desc(templates::Column::UpdatedAt)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await?;

        hydrate(&self.db, models).await
    }

    async fn find_by_id(&self, id: &TemplateId) -> Result<Option<Template>, DomainError> {
        match templates::Entity::find_by_id(id.0).one(&self.db).await? {
            Some(model) => Ok(Some(hydrate_one(&self.db, model).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Template>, DomainError> {
        let result = templates::Entity::find()
            .filter(templates::Column::Slug.eq(slug))
            .one(&self.db)
            .await?;

        match result {
            Some(model) => Ok(Some(hydrate_one(&self.db, model).await?)),
            None => Ok(None),
        }
    }

    async fn create(&self, template: &NewTemplate, slug: &str) -> Result<Template, DomainError> {
        let id = Uuid::new_v4();
        let now = Utc::now().fixed_offset();
        let txn = self.db.begin().await?;

        let model = templates::ActiveModel {
            id: Set(id),
            name: Set(template.name.clone()),
            slug: Set(slug.to_string()),
            description: Set(template.description.clone()),
            content: Set(template.content.clone()),
            status: Set(TemplateStatus::Draft.to_string()),
            current_version: Set(1),
            created_by: Set(template.created_by.map(|id| id.0)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        insert_version(
            &txn,
            id,
            1,
            &template.content,
            Some("Initial version".to_string()),
            template.created_by,
        )
        .await?;
        replace_tags(&txn, id, &template.tag_ids).await?;
        replace_categories(&txn, id, &template.category_ids).await?;

        let created = hydrate_one(&txn, model).await?;
        txn.commit().await?;

        Ok(created)
    }

    async fn update(
        &self,
        id: &TemplateId,
        changes: &TemplateChanges,
    ) -> Result<Template, DomainError> {
        let txn = self.db.begin().await?;

        let existing = templates::Entity::find_by_id(id.0)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Template {}", id)))?;

        let next_version = existing.current_version + 1;
        let mut active = existing.into_active_model();

        if let Some(name) = &changes.name {
            active.name = Set(name.clone());
        }
        if let Some(description) = &changes.description {
            active.description = Set(description.clone());
        }
        if let Some(content) = &changes.content {
            insert_version(
                &txn,
                id.0,
                next_version,
                content,
                changes.change_note.clone(),
                changes.updated_by,
            )
            .await?;
            active.content = Set(content.clone());
            active.current_version = Set(next_version);
        }
        if let Some(tag_ids) = &changes.tag_ids {
            replace_tags(&txn, id.0, tag_ids).await?;
        }
        if let Some(category_ids) = &changes.category_ids {
            replace_categories(&txn, id.0, category_ids).await?;
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        let model = active.update(&txn).await?;
        let updated = hydrate_one(&txn, model).await?;
        txn.commit().await?;

        Ok(updated)
    }

    async fn set_status(
        &self,
        id: &TemplateId,
        status: TemplateStatus,
    ) -> Result<Template, DomainError> {
        let existing = templates::Entity::find_by_id(id.0)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Template {}", id)))?;

        let mut active = existing.into_active_model();
        active.status = Set(status.to_string());
        active.updated_at = Set(Utc::now().fixed_offset());
        let model = active.update(&self.db).await?;

        hydrate_one(&self.db, model).await
    }

    async fn delete(&self, id: &TemplateId) -> Result<(), DomainError> {
        let result = templates::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            Err(DomainError::NotFound(format!("Template {}", id)))
        } else {
            Ok(())
        }
    }

    async fn list_versions(&self, id: &TemplateId) -> Result<Vec<TemplateVersion>, DomainError> {
        let results = template_versions::Entity::find()
            .filter(template_versions::Column::TemplateId.eq(id.0))
            .order_by_desc(template_versions::Column::VersionNumber)
            .all(&self.db)
            .await?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_version(
        &self,
        id: &TemplateId,
        version_number: i32,
    ) -> Result<Option<TemplateVersion>, DomainError> {
        let result = template_versions::Entity::find()
            .filter(template_versions::Column::TemplateId.eq(id.0))
            .filter(template_versions::Column::VersionNumber.eq(version_number))
            .one(&self.db)
            .await?;

        Ok(result.map(|m| m.into()))
    }
}

fn to_template(
    model: templates::Model,
    tag_ids: Vec<TagId>,
    category_ids: Vec<CategoryId>,
) -> Template {
    Template {
        id: TemplateId(model.id),
        name: model.name,
        slug: model.slug,
        description: model.description,
        content: model.content,
        status: model.status.parse().unwrap_or(TemplateStatus::Draft),
        current_version: model.current_version,
        created_by: model.created_by.map(EmployeeId),
        tag_ids,
        category_ids,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

/// Convert SeaORM model to domain entity
impl From<template_versions::Model> for TemplateVersion {
    fn from(model: template_versions::Model) -> Self {
        TemplateVersion {
            template_id: TemplateId(model.template_id),
            version_number: model.version_number,
            content: model.content,
            change_note: model.change_note,
            created_by: model.created_by.map(EmployeeId),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

/// `ILIKE` pattern matching `search` literally anywhere in the column.
/// Postgres treats backslash as the default escape character.
fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
