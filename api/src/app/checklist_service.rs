//! Checklist service
//!
//! Checklists and their ordered items. Completing an item stamps
//! `completed_at`; un-completing clears it.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use super::audit_service::AuditService;
use crate::domain::entities::{
    optional_text, required_text, AuditAction, Checklist, ChecklistChanges, ChecklistId,
    ChecklistItem, ChecklistItemChanges, ChecklistItemId, ChecklistProgress, EmployeeId,
    NewChecklist, NewChecklistItem, OfficeId, Page,
};
use crate::domain::ports::{AuditLogRepository, ChecklistRepository, OfficeRepository};
use crate::error::{AppError, DomainError};

const ENTITY: &str = "checklist";

/// A checklist with its completion summary
#[derive(Debug, Serialize)]
pub struct ChecklistView {
    #[serde(flatten)]
    pub checklist: Checklist,
    pub progress: ChecklistProgress,
}

impl From<Checklist> for ChecklistView {
    fn from(checklist: Checklist) -> Self {
        let progress = checklist.progress();
        Self {
            checklist,
            progress,
        }
    }
}

/// Service for managing checklists
pub struct ChecklistService<C, O, A>
where
    C: ChecklistRepository,
    O: OfficeRepository,
    A: AuditLogRepository,
{
    checklists: Arc<C>,
    offices: Arc<O>,
    audit: AuditService<A>,
}

impl<C, O, A> ChecklistService<C, O, A>
where
    C: ChecklistRepository,
    O: OfficeRepository,
    A: AuditLogRepository,
{
    pub fn new(checklists: Arc<C>, offices: Arc<O>, audit: AuditService<A>) -> Self {
        Self {
            checklists,
            offices,
            audit,
        }
    }

    pub async fn list(
        &self,
        office_id: Option<OfficeId>,
        page: Page,
    ) -> Result<Vec<ChecklistView>, AppError> {
        let checklists = self.checklists.list(office_id, page.clamped()).await?;
        Ok(checklists.into_iter().map(ChecklistView::from).collect())
    }

    pub async fn get(&self, id: &ChecklistId) -> Result<ChecklistView, AppError> {
        Ok(self.find(id).await?.into())
    }

    async fn find(&self, id: &ChecklistId) -> Result<Checklist, AppError> {
        self.checklists
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Checklist {}", id)))
    }

    pub async fn create(
        &self,
        new: NewChecklist,
        actor: Option<EmployeeId>,
    ) -> Result<ChecklistView, AppError> {
        let name = required_text("Name", &new.name, 200).map_err(DomainError::Validation)?;
        if let Some(office_id) = new.office_id {
            self.ensure_office_exists(&office_id).await?;
        }
        let items = new
            .items
            .iter()
            .map(normalize_item)
            .collect::<Result<Vec<_>, _>>()?;

        let checklist = self
            .checklists
            .create(&NewChecklist {
                name,
                description: optional_text(new.description.as_deref()),
                office_id: new.office_id,
                items,
            })
            .await?;

        tracing::info!(checklist_id = %checklist.id, items = checklist.items.len(), "Checklist created");
        self.audit
            .record(
                ENTITY,
                checklist.id.0,
                AuditAction::Create,
                actor,
                json!({ "name": checklist.name, "items": checklist.items.len() }),
            )
            .await;

        Ok(checklist.into())
    }

    pub async fn update(
        &self,
        id: &ChecklistId,
        mut changes: ChecklistChanges,
        actor: Option<EmployeeId>,
    ) -> Result<ChecklistView, AppError> {
        self.find(id).await?;

        if let Some(name) = &changes.name {
            changes.name =
                Some(required_text("Name", name, 200).map_err(DomainError::Validation)?);
        }
        changes.description = changes
            .description
            .map(|d| optional_text(d.as_deref()));
        if let Some(Some(office_id)) = changes.office_id {
            self.ensure_office_exists(&office_id).await?;
        }

        let checklist = self.checklists.update(id, &changes).await?;

        self.audit
            .record(
                ENTITY,
                id.0,
                AuditAction::Update,
                actor,
                json!({ "name": checklist.name }),
            )
            .await;

        Ok(checklist.into())
    }

    pub async fn delete(&self, id: &ChecklistId, actor: Option<EmployeeId>) -> Result<(), AppError> {
        let checklist = self.find(id).await?;
        self.checklists.delete(id).await?;

        self.audit
            .record(
                ENTITY,
                id.0,
                AuditAction::Delete,
                actor,
                json!({ "name": checklist.name }),
            )
            .await;

        Ok(())
    }

    /// Append an item after the current last position
    pub async fn add_item(
        &self,
        id: &ChecklistId,
        new: NewChecklistItem,
        actor: Option<EmployeeId>,
    ) -> Result<ChecklistItem, AppError> {
        let checklist = self.find(id).await?;
        let item = normalize_item(&new)?;

        let item = self
            .checklists
            .add_item(id, &item, checklist.next_position())
            .await?;

        self.audit
            .record(
                ENTITY,
                id.0,
                AuditAction::Update,
                actor,
                json!({ "item_added": item.id, "text": item.text }),
            )
            .await;

        Ok(item)
    }

    pub async fn update_item(
        &self,
        id: &ChecklistId,
        item_id: &ChecklistItemId,
        mut changes: ChecklistItemChanges,
        actor: Option<EmployeeId>,
    ) -> Result<ChecklistItem, AppError> {
        self.find_item(id, item_id).await?;

        if let Some(text) = &changes.text {
            changes.text = Some(required_text("Item text", text, 500).map_err(DomainError::Validation)?);
        }
        if changes.position.is_some_and(|p| p < 0) {
            return Err(
                DomainError::Validation("Item position must not be negative".to_string()).into(),
            );
        }

        let item = self.checklists.update_item(id, item_id, &changes).await?;

        self.audit
            .record(
                ENTITY,
                id.0,
                AuditAction::Update,
                actor,
                json!({ "item_updated": item.id }),
            )
            .await;

        Ok(item)
    }

    pub async fn delete_item(
        &self,
        id: &ChecklistId,
        item_id: &ChecklistItemId,
        actor: Option<EmployeeId>,
    ) -> Result<(), AppError> {
        self.find_item(id, item_id).await?;
        self.checklists.delete_item(id, item_id).await?;

        self.audit
            .record(
                ENTITY,
                id.0,
                AuditAction::Update,
                actor,
                json!({ "item_removed": item_id }),
            )
            .await;

        Ok(())
    }

    /// Mark an item complete (or not). Repeating the current state is a no-op.
    pub async fn complete_item(
        &self,
        id: &ChecklistId,
        item_id: &ChecklistItemId,
        completed: bool,
        actor: Option<EmployeeId>,
    ) -> Result<ChecklistItem, AppError> {
        let item = self.find_item(id, item_id).await?;
        if item.is_completed() == completed {
            return Ok(item);
        }

        let completed_at = completed.then(Utc::now);
        let item = self
            .checklists
            .set_item_completed(id, item_id, completed_at)
            .await?;

        tracing::debug!(checklist_id = %id, item_id = %item_id, completed, "Checklist item toggled");
        self.audit
            .record(
                ENTITY,
                id.0,
                AuditAction::Update,
                actor,
                json!({ "item": item_id, "completed": completed }),
            )
            .await;

        Ok(item)
    }

    async fn find_item(
        &self,
        id: &ChecklistId,
        item_id: &ChecklistItemId,
    ) -> Result<ChecklistItem, AppError> {
        self.find(id)
            .await?
            .items
            .into_iter()
            .find(|i| i.id == *item_id)
            .ok_or_else(|| AppError::NotFound(format!("Checklist item {}", item_id)))
    }

    async fn ensure_office_exists(&self, office_id: &OfficeId) -> Result<(), AppError> {
        if self.offices.find_by_id(office_id).await?.is_none() {
            return Err(
                DomainError::Validation(format!("Office {} does not exist", office_id)).into(),
            );
        }
        Ok(())
    }
}

fn normalize_item(item: &NewChecklistItem) -> Result<NewChecklistItem, AppError> {
    Ok(NewChecklistItem {
        text: required_text("Item text", &item.text, 500).map_err(DomainError::Validation)?,
        is_required: item.is_required,
    })
}
