//! PostgreSQL adapter for ChecklistRepository

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::domain::entities::{
    Checklist, ChecklistChanges, ChecklistId, ChecklistItem, ChecklistItemChanges,
    ChecklistItemId, NewChecklist, NewChecklistItem, OfficeId, Page,
};
use crate::domain::ports::ChecklistRepository;
use crate::entity::{checklist_items, checklists};
use crate::error::DomainError;

/// PostgreSQL implementation of ChecklistRepository
pub struct PostgresChecklistRepository {
    db: DatabaseConnection,
}

impl PostgresChecklistRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_item(
        &self,
        id: &ChecklistId,
        item_id: &ChecklistItemId,
    ) -> Result<checklist_items::Model, DomainError> {
        checklist_items::Entity::find_by_id(item_id.0)
            .filter(checklist_items::Column::ChecklistId.eq(id.0))
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!("Item {} in checklist {}", item_id, id))
            })
    }
}

/// Load items for each checklist, ordered by position
async fn with_items<C: ConnectionTrait>(
    db: &C,
    models: Vec<checklists::Model>,
) -> Result<Vec<Checklist>, DomainError> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let mut items: HashMap<Uuid, Vec<ChecklistItem>> = HashMap::new();
    for row in checklist_items::Entity::find()
        .filter(checklist_items::Column::ChecklistId.is_in(ids))
        .order_by_asc(checklist_items::Column::Position)
        .order_by_asc(checklist_items::Column::CreatedAt)
        .all(db)
        .await?
    {
        items.entry(row.checklist_id).or_default().push(row.into());
    }

    Ok(models
        .into_iter()
        .map(|m| {
            let checklist_items = items.remove(&m.id).unwrap_or_default();
            to_checklist(m, checklist_items)
        })
        .collect())
}

async fn with_item_list<C: ConnectionTrait>(
    db: &C,
    model: checklists::Model,
) -> Result<Checklist, DomainError> {
    with_items(db, vec![model])
        .await?
        .pop()
        .ok_or_else(|| DomainError::Internal("Checklist vanished while loading".to_string()))
}

async fn insert_item<C: ConnectionTrait>(
    db: &C,
    checklist_id: Uuid,
    item: &NewChecklistItem,
    position: i32,
) -> Result<checklist_items::Model, DomainError> {
    Ok(checklist_items::ActiveModel {
        id: Set(Uuid::new_v4()),
        checklist_id: Set(checklist_id),
        position: Set(position),
        text: Set(item.text.clone()),
        is_required: Set(item.is_required),
        completed_at: Set(None),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(db)
    .await?)
}

#[async_trait]
impl ChecklistRepository for PostgresChecklistRepository {
    async fn list(
        &self,
        office_id: Option<OfficeId>,
        page: Page,
    ) -> Result<Vec<Checklist>, DomainError> {
        let mut query = checklists::Entity::find();
        if let Some(office_id) = office_id {
            query = query.filter(checklists::Column::OfficeId.eq(office_id.0));
        }

        let models = query
            .order_by_asc(checklists::Column::Name)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await?;

        with_items(&self.db, models).await
    }

    async fn find_by_id(&self, id: &ChecklistId) -> Result<Option<Checklist>, DomainError> {
        match checklists::Entity::find_by_id(id.0).one(&self.db).await? {
            Some(model) => Ok(Some(with_item_list(&self.db, model).await?)),
            None => Ok(None),
        }
    }

    async fn create(&self, checklist: &NewChecklist) -> Result<Checklist, DomainError> {
        let id = Uuid::new_v4();
        let now = Utc::now().fixed_offset();
        let txn = self.db.begin().await?;

        let model = checklists::ActiveModel {
            id: Set(id),
            name: Set(checklist.name.clone()),
            description: Set(checklist.description.clone()),
            office_id: Set(checklist.office_id.map(|id| id.0)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for (position, item) in checklist.items.iter().enumerate() {
            insert_item(&txn, id, item, position as i32).await?;
        }

        let created = with_item_list(&txn, model).await?;
        txn.commit().await?;

        Ok(created)
    }

    async fn update(
        &self,
        id: &ChecklistId,
        changes: &ChecklistChanges,
    ) -> Result<Checklist, DomainError> {
        let existing = checklists::Entity::find_by_id(id.0)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Checklist {}", id)))?;

        let mut active = existing.into_active_model();
        if let Some(name) = &changes.name {
            active.name = Set(name.clone());
        }
        if let Some(description) = &changes.description {
            active.description = Set(description.clone());
        }
        if let Some(office_id) = changes.office_id {
            active.office_id = Set(office_id.map(|id| id.0));
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        let model = active.update(&self.db).await?;
        with_item_list(&self.db, model).await
    }

    async fn delete(&self, id: &ChecklistId) -> Result<(), DomainError> {
        let result = checklists::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            Err(DomainError::NotFound(format!("Checklist {}", id)))
        } else {
            Ok(())
        }
    }

    async fn add_item(
        &self,
        id: &ChecklistId,
        item: &NewChecklistItem,
        position: i32,
    ) -> Result<ChecklistItem, DomainError> {
        let exists = checklists::Entity::find_by_id(id.0)
            .one(&self.db)
            .await?
            .is_some();
        if !exists {
            return Err(DomainError::NotFound(format!("Checklist {}", id)));
        }

        Ok(insert_item(&self.db, id.0, item, position).await?.into())
    }

    async fn update_item(
        &self,
        id: &ChecklistId,
        item_id: &ChecklistItemId,
        changes: &ChecklistItemChanges,
    ) -> Result<ChecklistItem, DomainError> {
        let mut active = self.find_item(id, item_id).await?.into_active_model();
        if let Some(text) = &changes.text {
            active.text = Set(text.clone());
        }
        if let Some(is_required) = changes.is_required {
            active.is_required = Set(is_required);
        }
        if let Some(position) = changes.position {
            active.position = Set(position);
        }

        Ok(active.update(&self.db).await?.into())
    }

    async fn set_item_completed(
        &self,
        id: &ChecklistId,
        item_id: &ChecklistItemId,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<ChecklistItem, DomainError> {
        let mut active = self.find_item(id, item_id).await?.into_active_model();
        active.completed_at = Set(completed_at.map(|dt| dt.fixed_offset()));

        Ok(active.update(&self.db).await?.into())
    }

    async fn delete_item(
        &self,
        id: &ChecklistId,
        item_id: &ChecklistItemId,
    ) -> Result<(), DomainError> {
        let result = checklist_items::Entity::delete_many()
            .filter(checklist_items::Column::Id.eq(item_id.0))
            .filter(checklist_items::Column::ChecklistId.eq(id.0))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            Err(DomainError::NotFound(format!(
                "Item {} in checklist {}",
                item_id, id
            )))
        } else {
            Ok(())
        }
    }
}

fn to_checklist(model: checklists::Model, items: Vec<ChecklistItem>) -> Checklist {
    Checklist {
        id: ChecklistId(model.id),
        name: model.name,
        description: model.description,
        office_id: model.office_id.map(OfficeId),
        items,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

/// Convert SeaORM model to domain entity
impl From<checklist_items::Model> for ChecklistItem {
    fn from(model: checklist_items::Model) -> Self {
        ChecklistItem {
            id: ChecklistItemId(model.id),
            checklist_id: ChecklistId(model.checklist_id),
            position: model.position,
            text: model.text,
            is_required: model.is_required,
            completed_at: model.completed_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
