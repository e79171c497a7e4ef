//! External listing service
//!
//! Listing CRUD plus bulk import keyed by `(source, external_id)`.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::audit_service::AuditService;
use crate::domain::entities::listing::validate_listing_numbers;
use crate::domain::entities::territory::normalize_postal_code;
use crate::domain::entities::{
    optional_text, required_text, AuditAction, EmployeeId, ExternalListing, ImportSummary,
    ListingChanges, ListingFilter, ListingId, NewListing, OfficeId, Page,
};
use crate::domain::ports::{
    AuditLogRepository, EmployeeRepository, ListingRepository, OfficeRepository,
};
use crate::error::{AppError, DomainError};

/// Largest batch accepted by one import call
pub const MAX_IMPORT_BATCH: usize = 1000;

/// A batch of listings from one source
#[derive(Debug, Deserialize)]
pub struct ListingImport {
    pub source: String,
    pub listings: Vec<NewListing>,
}

/// Service for managing external listings
pub struct ListingService<L, O, E, A>
where
    L: ListingRepository,
    O: OfficeRepository,
    E: EmployeeRepository,
    A: AuditLogRepository,
{
    listings: Arc<L>,
    offices: Arc<O>,
    employees: Arc<E>,
    audit: AuditService<A>,
}

impl<L, O, E, A> ListingService<L, O, E, A>
where
    L: ListingRepository,
    O: OfficeRepository,
    E: EmployeeRepository,
    A: AuditLogRepository,
{
    pub fn new(listings: Arc<L>, offices: Arc<O>, employees: Arc<E>, audit: AuditService<A>) -> Self {
        Self {
            listings,
            offices,
            employees,
            audit,
        }
    }

    pub async fn list(
        &self,
        filter: &ListingFilter,
        page: Page,
    ) -> Result<Vec<ExternalListing>, AppError> {
        let filter = ListingFilter {
            postal_code: match filter.postal_code.as_deref() {
                Some(code) => Some(normalize_postal_code(code).map_err(DomainError::Validation)?),
                None => None,
            },
            ..filter.clone()
        };
        Ok(self.listings.list(&filter, page.clamped()).await?)
    }

    pub async fn get(&self, id: &ListingId) -> Result<ExternalListing, AppError> {
        self.listings
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Listing {}", id)))
    }

    pub async fn create(
        &self,
        new: NewListing,
        actor: Option<EmployeeId>,
    ) -> Result<ExternalListing, AppError> {
        let listing = normalize_listing(new)?;
        self.ensure_references(listing.office_id, listing.agent_id)
            .await?;

        if self
            .listings
            .find_by_external_id(&listing.source, &listing.external_id)
            .await?
            .is_some()
        {
            return Err(DomainError::AlreadyExists(format!(
                "Listing {}/{} already exists",
                listing.source, listing.external_id
            ))
            .into());
        }

        let listing = self.listings.create(&listing).await?;

        tracing::info!(
            listing_id = %listing.id,
            source = %listing.source,
            external_id = %listing.external_id,
            "Listing created"
        );
        self.audit
            .record(
                "listing",
                listing.id.0,
                AuditAction::Create,
                actor,
                json!({ "source": listing.source, "external_id": listing.external_id }),
            )
            .await;

        Ok(listing)
    }

    pub async fn update(
        &self,
        id: &ListingId,
        mut changes: ListingChanges,
        actor: Option<EmployeeId>,
    ) -> Result<ExternalListing, AppError> {
        let current = self.get(id).await?;

        if let Some(address) = &changes.address {
            changes.address =
                Some(required_text("Address", address, 300).map_err(DomainError::Validation)?);
        }
        if let Some(code) = changes.postal_code.take() {
            changes.postal_code = Some(normalize_optional_postal_code(code.as_deref())?);
        }
        changes.city = changes.city.map(|c| optional_text(c.as_deref()));
        changes.state = changes.state.map(|s| optional_text(s.as_deref()));

        validate_listing_numbers(
            changes.price_cents.unwrap_or(current.price_cents),
            changes.bedrooms.unwrap_or(current.bedrooms),
            changes.bathrooms.unwrap_or(current.bathrooms),
        )
        .map_err(DomainError::Validation)?;

        self.ensure_references(changes.office_id.flatten(), changes.agent_id.flatten())
            .await?;

        let listing = self.listings.update(id, &changes).await?;

        self.audit
            .record(
                "listing",
                id.0,
                AuditAction::Update,
                actor,
                json!({ "status": listing.status, "price_cents": listing.price_cents }),
            )
            .await;

        Ok(listing)
    }

    pub async fn delete(&self, id: &ListingId, actor: Option<EmployeeId>) -> Result<(), AppError> {
        let listing = self.get(id).await?;
        self.listings.delete(id).await?;

        self.audit
            .record(
                "listing",
                id.0,
                AuditAction::Delete,
                actor,
                json!({ "source": listing.source, "external_id": listing.external_id }),
            )
            .await;

        Ok(())
    }

    /// Upsert a batch of listings from one source.
    ///
    /// The whole batch is validated before anything is written.
    pub async fn import(
        &self,
        batch: ListingImport,
        actor: Option<EmployeeId>,
    ) -> Result<ImportSummary, AppError> {
        let source = normalize_source(&batch.source)?;
        if batch.listings.is_empty() {
            return Err(AppError::BadRequest("Import contains no listings".to_string()));
        }
        if batch.listings.len() > MAX_IMPORT_BATCH {
            return Err(AppError::BadRequest(format!(
                "Import contains {} listings, limit is {}",
                batch.listings.len(),
                MAX_IMPORT_BATCH
            )));
        }

        let mut seen = HashSet::new();
        let mut listings = Vec::with_capacity(batch.listings.len());
        for (index, mut listing) in batch.listings.into_iter().enumerate() {
            listing.source = source.clone();
            let listing = normalize_listing(listing).map_err(|e| match e {
                AppError::Domain(DomainError::Validation(msg)) => {
                    DomainError::Validation(format!("Listing #{}: {}", index + 1, msg)).into()
                }
                other => other,
            })?;
            if !seen.insert(listing.external_id.clone()) {
                return Err(DomainError::Validation(format!(
                    "Listing #{}: duplicate external id '{}' in batch",
                    index + 1,
                    listing.external_id
                ))
                .into());
            }
            listings.push(listing);
        }

        let offices: HashSet<OfficeId> = listings.iter().filter_map(|l| l.office_id).collect();
        let agents: HashSet<EmployeeId> = listings.iter().filter_map(|l| l.agent_id).collect();
        for office_id in &offices {
            self.ensure_references(Some(*office_id), None).await?;
        }
        for agent_id in &agents {
            self.ensure_references(None, Some(*agent_id)).await?;
        }

        let summary = self.listings.upsert_many(&listings).await?;

        tracing::info!(
            source = %source,
            created = summary.created,
            updated = summary.updated,
            "Listings imported"
        );
        self.audit
            .record(
                "listing",
                Uuid::nil(),
                AuditAction::Update,
                actor,
                json!({
                    "import": source,
                    "created": summary.created,
                    "updated": summary.updated,
                }),
            )
            .await;

        Ok(summary)
    }

    async fn ensure_references(
        &self,
        office_id: Option<OfficeId>,
        agent_id: Option<EmployeeId>,
    ) -> Result<(), AppError> {
        if let Some(office_id) = office_id {
            if self.offices.find_by_id(&office_id).await?.is_none() {
                return Err(DomainError::Validation(format!(
                    "Office {} does not exist",
                    office_id
                ))
                .into());
            }
        }
        if let Some(agent_id) = agent_id {
            if self.employees.find_by_id(&agent_id).await?.is_none() {
                return Err(DomainError::Validation(format!(
                    "Agent {} does not exist",
                    agent_id
                ))
                .into());
            }
        }
        Ok(())
    }
}

fn normalize_source(source: &str) -> Result<String, AppError> {
    Ok(required_text("Source", source, 50)
        .map_err(DomainError::Validation)?
        .to_lowercase())
}

fn normalize_optional_postal_code(code: Option<&str>) -> Result<Option<String>, AppError> {
    Ok(optional_text(code)
        .map(|c| normalize_postal_code(&c))
        .transpose()
        .map_err(DomainError::Validation)?)
}

fn normalize_listing(new: NewListing) -> Result<NewListing, AppError> {
    validate_listing_numbers(new.price_cents, new.bedrooms, new.bathrooms)
        .map_err(DomainError::Validation)?;

    Ok(NewListing {
        source: normalize_source(&new.source)?,
        external_id: required_text("External id", &new.external_id, 100)
            .map_err(DomainError::Validation)?,
        address: required_text("Address", &new.address, 300).map_err(DomainError::Validation)?,
        city: optional_text(new.city.as_deref()),
        state: optional_text(new.state.as_deref()),
        postal_code: normalize_optional_postal_code(new.postal_code.as_deref())?,
        ..new
    })
}
