//! PostgreSQL adapter for ListingRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::domain::entities::{
    EmployeeId, ExternalListing, ImportSummary, ListingChanges, ListingFilter, ListingId,
    ListingStatus, NewListing, OfficeId, Page,
};
use crate::domain::ports::ListingRepository;
use crate::entity::external_listings;
use crate::error::DomainError;

/// PostgreSQL implementation of ListingRepository
pub struct PostgresListingRepository {
    db: DatabaseConnection,
}

impl PostgresListingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

async fn find_external<C: ConnectionTrait>(
    db: &C,
    source: &str,
    external_id: &str,
) -> Result<Option<external_listings::Model>, DomainError> {
    Ok(external_listings::Entity::find()
        .filter(external_listings::Column::Source.eq(source))
        .filter(external_listings::Column::ExternalId.eq(external_id))
        .one(db)
        .await?)
}

async fn insert_listing<C: ConnectionTrait>(
    db: &C,
    listing: &NewListing,
) -> Result<external_listings::Model, DomainError> {
    let now = Utc::now().fixed_offset();

    let model = external_listings::ActiveModel {
        id: Set(Uuid::new_v4()),
        source: Set(listing.source.clone()),
        external_id: Set(listing.external_id.clone()),
        office_id: Set(listing.office_id.map(|id| id.0)),
        agent_id: Set(listing.agent_id.map(|id| id.0)),
        address: Set(listing.address.clone()),
        city: Set(listing.city.clone()),
        state: Set(listing.state.clone()),
        postal_code: Set(listing.postal_code.clone()),
        price_cents: Set(listing.price_cents),
        status: Set(listing.status.to_string()),
        bedrooms: Set(listing.bedrooms),
        bathrooms: Set(listing.bathrooms),
        listed_at: Set(listing.listed_at.map(|dt| dt.fixed_offset())),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    Ok(model)
}

/// Overwrite every imported column of an existing row
async fn replace_listing<C: ConnectionTrait>(
    db: &C,
    existing: external_listings::Model,
    listing: &NewListing,
) -> Result<(), DomainError> {
    let mut active = existing.into_active_model();
    active.office_id = Set(listing.office_id.map(|id| id.0));
    active.agent_id = Set(listing.agent_id.map(|id| id.0));
    active.address = Set(listing.address.clone());
    active.city = Set(listing.city.clone());
    active.state = Set(listing.state.clone());
    active.postal_code = Set(listing.postal_code.clone());
    active.price_cents = Set(listing.price_cents);
    active.status = Set(listing.status.to_string());
    active.bedrooms = Set(listing.bedrooms);
    active.bathrooms = Set(listing.bathrooms);
    active.listed_at = Set(listing.listed_at.map(|dt| dt.fixed_offset()));
    active.updated_at = Set(Utc::now().fixed_offset());
    active.update(db).await?;

    Ok(())
}

#[async_trait]
impl ListingRepository for PostgresListingRepository {
    async fn list(
        &self,
        filter: &ListingFilter,
        page: Page,
    ) -> Result<Vec<ExternalListing>, DomainError> {
        let mut query = external_listings::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(external_listings::Column::Status.eq(status.as_str()));
        }
        if let Some(office_id) = filter.office_id {
            query = query.filter(external_listings::Column::OfficeId.eq(office_id.0));
        }
        if let Some(postal_code) = &filter.postal_code {
            query = query.filter(external_listings::Column::PostalCode.eq(postal_code.as_str()));
        }

        let results = query
            .order_by_desc(external_listings::Column::UpdatedAt)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_by_id(&self, id: &ListingId) -> Result<Option<ExternalListing>, DomainError> {
        let result = external_listings::Entity::find_by_id(id.0)
            .one(&self.db)
            .await?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_by_external_id(
        &self,
        source: &str,
        external_id: &str,
    ) -> Result<Option<ExternalListing>, DomainError> {
        Ok(find_external(&self.db, source, external_id)
            .await?
            .map(|m| m.into()))
    }

    async fn create(&self, listing: &NewListing) -> Result<ExternalListing, DomainError> {
        Ok(insert_listing(&self.db, listing).await?.into())
    }

    async fn update(
        &self,
        id: &ListingId,
        changes: &ListingChanges,
    ) -> Result<ExternalListing, DomainError> {
        let existing = external_listings::Entity::find_by_id(id.0)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Listing {}", id)))?;

        let mut active = existing.into_active_model();
        if let Some(office_id) = changes.office_id {
            active.office_id = Set(office_id.map(|id| id.0));
        }
        if let Some(agent_id) = changes.agent_id {
            active.agent_id = Set(agent_id.map(|id| id.0));
        }
        if let Some(address) = &changes.address {
            active.address = Set(address.clone());
        }
        if let Some(city) = &changes.city {
            active.city = Set(city.clone());
        }
        if let Some(state) = &changes.state {
            active.state = Set(state.clone());
        }
        if let Some(postal_code) = &changes.postal_code {
            active.postal_code = Set(postal_code.clone());
        }
        if let Some(price_cents) = changes.price_cents {
            active.price_cents = Set(price_cents);
        }
        if let Some(status) = changes.status {
            active.status = Set(status.to_string());
        }
        if let Some(bedrooms) = changes.bedrooms {
            active.bedrooms = Set(bedrooms);
        }
        if let Some(bathrooms) = changes.bathrooms {
            active.bathrooms = Set(bathrooms);
        }
        if let Some(listed_at) = changes.listed_at {
            active.listed_at = Set(listed_at.map(|dt| dt.fixed_offset()));
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        Ok(active.update(&self.db).await?.into())
    }

    async fn upsert_many(&self, listings: &[NewListing]) -> Result<ImportSummary, DomainError> {
        let txn = self.db.begin().await?;
        let mut summary = ImportSummary::default();

        for listing in listings {
            match find_external(&txn, &listing.source, &listing.external_id).await? {
                Some(existing) => {
                    replace_listing(&txn, existing, listing).await?;
                    summary.updated += 1;
                }
                None => {
                    insert_listing(&txn, listing).await?;
                    summary.created += 1;
                }
            }
        }

        txn.commit().await?;
        Ok(summary)
    }

    async fn delete(&self, id: &ListingId) -> Result<(), DomainError> {
        let result = external_listings::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            Err(DomainError::NotFound(format!("Listing {}", id)))
        } else {
            Ok(())
        }
    }
}

/// Convert SeaORM model to domain entity
impl From<external_listings::Model> for ExternalListing {
    fn from(model: external_listings::Model) -> Self {
        ExternalListing {
            id: ListingId(model.id),
            source: model.source,
            external_id: model.external_id,
            office_id: model.office_id.map(OfficeId),
            agent_id: model.agent_id.map(EmployeeId),
            address: model.address,
            city: model.city,
            state: model.state,
            postal_code: model.postal_code,
            price_cents: model.price_cents,
            status: model.status.parse().unwrap_or(ListingStatus::Active),
            bedrooms: model.bedrooms,
            bathrooms: model.bathrooms,
            listed_at: model.listed_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
