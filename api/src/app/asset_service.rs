//! Company asset service

use std::sync::Arc;

use serde_json::json;

use super::audit_service::AuditService;
use crate::domain::entities::asset::validate_asset_url;
use crate::domain::entities::{
    optional_text, required_text, AssetChanges, AssetFilter, AssetId, AuditAction, CompanyAsset,
    EmployeeId, NewAsset, OfficeId, Page,
};
use crate::domain::ports::{AssetRepository, AuditLogRepository, OfficeRepository};
use crate::error::{AppError, DomainError};

/// Service for managing logos, images and other shared assets
pub struct AssetService<R, O, A>
where
    R: AssetRepository,
    O: OfficeRepository,
    A: AuditLogRepository,
{
    assets: Arc<R>,
    offices: Arc<O>,
    audit: AuditService<A>,
}

impl<R, O, A> AssetService<R, O, A>
where
    R: AssetRepository,
    O: OfficeRepository,
    A: AuditLogRepository,
{
    pub fn new(assets: Arc<R>, offices: Arc<O>, audit: AuditService<A>) -> Self {
        Self {
            assets,
            offices,
            audit,
        }
    }

    pub async fn list(
        &self,
        filter: &AssetFilter,
        page: Page,
    ) -> Result<Vec<CompanyAsset>, AppError> {
        Ok(self.assets.list(filter, page.clamped()).await?)
    }

    pub async fn get(&self, id: &AssetId) -> Result<CompanyAsset, AppError> {
        self.assets
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Asset {}", id)))
    }

    pub async fn create(
        &self,
        new: NewAsset,
        actor: Option<EmployeeId>,
    ) -> Result<CompanyAsset, AppError> {
        let name = required_text("Name", &new.name, 200).map_err(DomainError::Validation)?;
        let url = validate_asset_url(&new.url).map_err(DomainError::Validation)?;
        if let Some(office_id) = new.office_id {
            self.ensure_office_exists(&office_id).await?;
        }

        let asset = self
            .assets
            .create(&NewAsset {
                name,
                asset_type: new.asset_type,
                url,
                mime_type: optional_text(new.mime_type.as_deref()),
                description: optional_text(new.description.as_deref()),
                office_id: new.office_id,
            })
            .await?;

        tracing::info!(asset_id = %asset.id, asset_type = %asset.asset_type, "Asset created");
        self.audit
            .record(
                "asset",
                asset.id.0,
                AuditAction::Create,
                actor,
                json!({ "name": asset.name, "url": asset.url }),
            )
            .await;

        Ok(asset)
    }

    pub async fn update(
        &self,
        id: &AssetId,
        mut changes: AssetChanges,
        actor: Option<EmployeeId>,
    ) -> Result<CompanyAsset, AppError> {
        self.get(id).await?;

        if let Some(name) = &changes.name {
            changes.name =
                Some(required_text("Name", name, 200).map_err(DomainError::Validation)?);
        }
        if let Some(url) = &changes.url {
            changes.url = Some(validate_asset_url(url).map_err(DomainError::Validation)?);
        }
        if let Some(Some(office_id)) = changes.office_id {
            self.ensure_office_exists(&office_id).await?;
        }
        changes.mime_type = changes.mime_type.map(|m| optional_text(m.as_deref()));
        changes.description = changes
            .description
            .map(|d| optional_text(d.as_deref()));

        let asset = self.assets.update(id, &changes).await?;

        self.audit
            .record(
                "asset",
                id.0,
                AuditAction::Update,
                actor,
                json!({ "name": asset.name, "url": asset.url }),
            )
            .await;

        Ok(asset)
    }

    pub async fn delete(&self, id: &AssetId, actor: Option<EmployeeId>) -> Result<(), AppError> {
        let asset = self.get(id).await?;
        self.assets.delete(id).await?;

        tracing::info!(asset_id = %id, "Asset deleted");
        self.audit
            .record(
                "asset",
                id.0,
                AuditAction::Delete,
                actor,
                json!({ "name": asset.name }),
            )
            .await;

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
