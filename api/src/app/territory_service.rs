//! Territory service
//!
//! Territories own postal codes. Moving a code away from another territory
//! requires `force`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::audit_service::AuditService;
use crate::domain::entities::territory::{normalize_postal_code, normalize_postal_codes};
use crate::domain::entities::{
    optional_text, required_text, AuditAction, EmployeeId, NewTerritory, OfficeId, Page,
    PostalCode, Territory, TerritoryChanges, TerritoryId,
};
use crate::domain::ports::{AuditLogRepository, OfficeRepository, TerritoryRepository};
use crate::error::{AppError, DomainError};

const ENTITY: &str = "territory";

/// Request to attach postal codes to a territory
#[derive(Debug, Deserialize)]
pub struct AssignPostalCodes {
    pub codes: Vec<String>,
    /// Take codes away from territories that currently own them
    #[serde(default)]
    pub force: bool,
}

/// A postal code and the territory that owns it
#[derive(Debug, Serialize)]
pub struct PostalCodeLookup {
    #[serde(flatten)]
    pub postal_code: PostalCode,
    pub territory: Option<Territory>,
}

/// Service for managing territories
pub struct TerritoryService<T, O, A>
where
    T: TerritoryRepository,
    O: OfficeRepository,
    A: AuditLogRepository,
{
    territories: Arc<T>,
    offices: Arc<O>,
    audit: AuditService<A>,
}

impl<T, O, A> TerritoryService<T, O, A>
where
    T: TerritoryRepository,
    O: OfficeRepository,
    A: AuditLogRepository,
{
    pub fn new(territories: Arc<T>, offices: Arc<O>, audit: AuditService<A>) -> Self {
        Self {
            territories,
            offices,
            audit,
        }
    }

    pub async fn list(&self, page: Page) -> Result<Vec<Territory>, AppError> {
        Ok(self.territories.list(page.clamped()).await?)
    }

    pub async fn get(&self, id: &TerritoryId) -> Result<Territory, AppError> {
        self.territories
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Territory {}", id)))
    }

    pub async fn create(
        &self,
        new: NewTerritory,
        actor: Option<EmployeeId>,
    ) -> Result<Territory, AppError> {
        let name = required_text("Name", &new.name, 200).map_err(DomainError::Validation)?;
        self.ensure_name_free(&name, None).await?;
        if let Some(office_id) = new.office_id {
            self.ensure_office_exists(&office_id).await?;
        }

        let territory = self
            .territories
            .create(&NewTerritory {
                name,
                description: optional_text(new.description.as_deref()),
                office_id: new.office_id,
            })
            .await?;

        tracing::info!(territory_id = %territory.id, name = %territory.name, "Territory created");
        self.audit
            .record(
                ENTITY,
                territory.id.0,
                AuditAction::Create,
                actor,
                json!({ "name": territory.name }),
            )
            .await;

        Ok(territory)
    }

    pub async fn update(
        &self,
        id: &TerritoryId,
        mut changes: TerritoryChanges,
        actor: Option<EmployeeId>,
    ) -> Result<Territory, AppError> {
        self.get(id).await?;

        if let Some(name) = &changes.name {
            let name = required_text("Name", name, 200).map_err(DomainError::Validation)?;
            self.ensure_name_free(&name, Some(id)).await?;
            changes.name = Some(name);
        }
        changes.description = changes
            .description
            .map(|d| optional_text(d.as_deref()));
        if let Some(Some(office_id)) = changes.office_id {
            self.ensure_office_exists(&office_id).await?;
        }

        let territory = self.territories.update(id, &changes).await?;

        self.audit
            .record(
                ENTITY,
                id.0,
                AuditAction::Update,
                actor,
                json!({ "name": territory.name }),
            )
            .await;

        Ok(territory)
    }

    /// Delete a territory; its postal codes become unassigned
    pub async fn delete(&self, id: &TerritoryId, actor: Option<EmployeeId>) -> Result<(), AppError> {
        let territory = self.get(id).await?;
        self.territories.delete(id).await?;

        tracing::info!(territory_id = %id, "Territory deleted");
        self.audit
            .record(
                ENTITY,
                id.0,
                AuditAction::Delete,
                actor,
                json!({ "name": territory.name, "postal_codes": territory.postal_codes }),
            )
            .await;

        Ok(())
    }

    /// Assign postal codes to a territory.
    ///
    /// Codes already owned by a different territory are a conflict unless
    /// `force` is set, in which case they move.
    pub async fn assign_postal_codes(
        &self,
        id: &TerritoryId,
        request: AssignPostalCodes,
        actor: Option<EmployeeId>,
    ) -> Result<Territory, AppError> {
        self.get(id).await?;

        let codes = normalize_postal_codes(&request.codes).map_err(DomainError::Validation)?;
        if codes.is_empty() {
            return Err(AppError::BadRequest("No postal codes given".to_string()));
        }

        let assignment = self
            .territories
            .assign_postal_codes(id, &codes, request.force)
            .await?;
        let moved = assignment.moved;

        tracing::info!(
            territory_id = %id,
            assigned = codes.len(),
            moved = moved.len(),
            "Postal codes assigned"
        );
        self.audit
            .record(
                ENTITY,
                id.0,
                AuditAction::Update,
                actor,
                json!({
                    "postal_codes_assigned": codes,
                    "moved_from": moved
                        .iter()
                        .map(|pc| json!({ "code": pc.code, "territory_id": pc.territory_id }))
                        .collect::<Vec<_>>(),
                }),
            )
            .await;

        Ok(assignment.territory)
    }

    pub async fn remove_postal_code(
        &self,
        id: &TerritoryId,
        code: &str,
        actor: Option<EmployeeId>,
    ) -> Result<(), AppError> {
        self.get(id).await?;
        let code = normalize_postal_code(code).map_err(DomainError::Validation)?;

        if !self.territories.remove_postal_code(id, &code).await? {
            return Err(AppError::NotFound(format!(
                "Postal code {} in territory {}",
                code, id
            )));
        }

        self.audit
            .record(
                ENTITY,
                id.0,
                AuditAction::Update,
                actor,
                json!({ "postal_code_removed": code }),
            )
            .await;

        Ok(())
    }

    /// Find which territory owns a postal code
    pub async fn lookup(&self, code: &str) -> Result<PostalCodeLookup, AppError> {
        let code = normalize_postal_code(code).map_err(DomainError::Validation)?;

        let postal_code = self
            .territories
            .find_postal_codes(std::slice::from_ref(&code))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Postal code {}", code)))?;

        let territory = match postal_code.territory_id {
            Some(territory_id) => self.territories.find_by_id(&territory_id).await?,
            None => None,
        };

        Ok(PostalCodeLookup {
            postal_code,
            territory,
        })
    }

    async fn ensure_name_free(
        &self,
        name: &str,
        except: Option<&TerritoryId>,
    ) -> Result<(), AppError> {
        if let Some(other) = self.territories.find_by_name(name).await? {
            if except != Some(&other.id) {
                return Err(DomainError::AlreadyExists(format!(
                    "Territory '{}' already exists",
                    name
                ))
                .into());
            }
        }
        Ok(())
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
