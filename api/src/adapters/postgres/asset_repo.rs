//! PostgreSQL adapter for AssetRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::domain::entities::{
    AssetChanges, AssetFilter, AssetId, AssetType, CompanyAsset, NewAsset, OfficeId, Page,
};
use crate::domain::ports::AssetRepository;
use crate::entity::company_assets;
use crate::error::DomainError;

/// PostgreSQL implementation of AssetRepository
pub struct PostgresAssetRepository {
    db: DatabaseConnection,
}

impl PostgresAssetRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AssetRepository for PostgresAssetRepository {
    async fn list(
        &self,
        filter: &AssetFilter,
        page: Page,
    ) -> Result<Vec<CompanyAsset>, DomainError> {
        let mut query = company_assets::Entity::find();
        if let Some(asset_type) = filter.asset_type {
            query = query.filter(company_assets::Column::AssetType.eq(asset_type.as_str()));
        }
        if let Some(office_id) = filter.office_id {
            query = query.filter(company_assets::Column::OfficeId.eq(office_id.0));
        }

        let results = query
            .order_by_asc(company_assets::Column::Name)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_by_id(&self, id: &AssetId) -> Result<Option<CompanyAsset>, DomainError> {
        let result = company_assets::Entity::find_by_id(id.0)
            .one(&self.db)
            .await?;

        Ok(result.map(|m| m.into()))
    }

    async fn create(&self, asset: &NewAsset) -> Result<CompanyAsset, DomainError> {
        let now = Utc::now().fixed_offset();

        let model = company_assets::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(asset.name.clone()),
            asset_type: Set(asset.asset_type.to_string()),
            url: Set(asset.url.clone()),
            mime_type: Set(asset.mime_type.clone()),
            description: Set(asset.description.clone()),
            office_id: Set(asset.office_id.map(|id| id.0)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok(model.into())
    }

    async fn update(
        &self,
        id: &AssetId,
        changes: &AssetChanges,
    ) -> Result<CompanyAsset, DomainError> {
        let existing = company_assets::Entity::find_by_id(id.0)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Asset {}", id)))?;

        let mut active = existing.into_active_model();
        if let Some(name) = &changes.name {
            active.name = Set(name.clone());
        }
        if let Some(asset_type) = changes.asset_type {
            active.asset_type = Set(asset_type.to_string());
        }
        if let Some(url) = &changes.url {
            active.url = Set(url.clone());
        }
        if let Some(mime_type) = &changes.mime_type {
            active.mime_type = Set(mime_type.clone());
        }
        if let Some(description) = &changes.description {
            active.description = Set(description.clone());
        }
        if let Some(office_id) = changes.office_id {
            active.office_id = Set(office_id.map(|id| id.0));
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        Ok(active.update(&self.db).await?.into())
    }

    async fn delete(&self, id: &AssetId) -> Result<(), DomainError> {
        let result = company_assets::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            Err(DomainError::NotFound(format!("Asset {}", id)))
        } else {
            Ok(())
        }
    }
}

/// Convert SeaORM model to domain entity
impl From<company_assets::Model> for CompanyAsset {
    fn from(model: company_assets::Model) -> Self {
        CompanyAsset {
            id: AssetId(model.id),
            name: model.name,
            asset_type: model.asset_type.parse().unwrap_or(AssetType::Other),
            url: model.url,
            mime_type: model.mime_type,
            description: model.description,
            office_id: model.office_id.map(OfficeId),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
