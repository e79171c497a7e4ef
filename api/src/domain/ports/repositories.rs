//! Repository port traits
//!
//! These traits define the interface for data persistence.
//! Implementations are provided by adapters (e.g., PostgreSQL).
//! Inputs arrive already validated and normalized by the application layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::{
    AssetChanges, AssetFilter, AssetId, AuditFilter, AuditLog, Category, CategoryChanges,
    CategoryId, Checklist, ChecklistChanges, ChecklistId, ChecklistItem, ChecklistItemChanges,
    ChecklistItemId, CodePattern, CodePatternChanges, CodePatternId, CompanyAsset, Employee,
    EmployeeChanges, EmployeeFilter, EmployeeId, ExternalListing, ImportSummary, LayoutPartial,
    LayoutPartialChanges, LayoutPartialId, ListingChanges, ListingFilter, ListingId, MergeField,
    MergeFieldChanges, MergeFieldId, NewAsset, NewAuditLog, NewCategory, NewChecklist,
    NewChecklistItem, NewCodePattern, NewEmployee, NewLayoutPartial, NewListing, NewMergeField,
    NewOffice, NewTag, NewTemplate, NewTerritory, Office, OfficeChanges, OfficeId, Page,
    PostalCode, PostalCodeAssignment, SystemRole, Tag, TagChanges, TagId, Template,
    TemplateChanges, TemplateFilter, TemplateId, TemplateStatus, TemplateVersion, Territory,
    TerritoryChanges, TerritoryId,
};
use crate::error::DomainError;

/// Repository for templates and their versions
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// List templates, most recently updated first
    async fn list(&self, filter: &TemplateFilter, page: Page)
        -> Result<Vec<Template>, DomainError>;

    async fn find_by_id(&self, id: &TemplateId) -> Result<Option<Template>, DomainError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Template>, DomainError>;

    /// Insert the template, its first version and its associations atomically
    async fn create(&self, template: &NewTemplate, slug: &str) -> Result<Template, DomainError>;

    /// Apply changes atomically; a content change appends a new version
    async fn update(
        &self,
        id: &TemplateId,
        changes: &TemplateChanges,
    ) -> Result<Template, DomainError>;

    async fn set_status(
        &self,
        id: &TemplateId,
        status: TemplateStatus,
    ) -> Result<Template, DomainError>;

    /// Delete the template with its versions and associations
    async fn delete(&self, id: &TemplateId) -> Result<(), DomainError>;

    /// Versions newest first
    async fn list_versions(&self, id: &TemplateId) -> Result<Vec<TemplateVersion>, DomainError>;

    async fn find_version(
        &self,
        id: &TemplateId,
        version_number: i32,
    ) -> Result<Option<TemplateVersion>, DomainError>;
}

/// Repository for tags
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// List tags by name with their template usage counts
    async fn list(&self, page: Page) -> Result<Vec<Tag>, DomainError>;

    async fn find_by_id(&self, id: &TagId) -> Result<Option<Tag>, DomainError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Tag>, DomainError>;

    /// Return the ids from `ids` that do not exist
    async fn missing(&self, ids: &[TagId]) -> Result<Vec<TagId>, DomainError>;

    async fn create(&self, tag: &NewTag) -> Result<Tag, DomainError>;

    async fn update(&self, id: &TagId, changes: &TagChanges) -> Result<Tag, DomainError>;

    async fn delete(&self, id: &TagId) -> Result<(), DomainError>;
}

/// Repository for categories
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// List categories by sort order then name
    async fn list(&self, page: Page) -> Result<Vec<Category>, DomainError>;

    async fn find_by_id(&self, id: &CategoryId) -> Result<Option<Category>, DomainError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, DomainError>;

    /// Return the ids from `ids` that do not exist
    async fn missing(&self, ids: &[CategoryId]) -> Result<Vec<CategoryId>, DomainError>;

    async fn count_children(&self, id: &CategoryId) -> Result<u64, DomainError>;

    async fn create(&self, category: &NewCategory) -> Result<Category, DomainError>;

    async fn update(
        &self,
        id: &CategoryId,
        changes: &CategoryChanges,
    ) -> Result<Category, DomainError>;

    async fn delete(&self, id: &CategoryId) -> Result<(), DomainError>;
}

/// Append-only audit log
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn append(&self, entry: &NewAuditLog) -> Result<AuditLog, DomainError>;

    /// Entries newest first
    async fn list(&self, filter: &AuditFilter, page: Page) -> Result<Vec<AuditLog>, DomainError>;
}

/// Repository for merge fields
#[async_trait]
pub trait MergeFieldRepository: Send + Sync {
    async fn list(&self, page: Page) -> Result<Vec<MergeField>, DomainError>;

    /// Every merge field, used to validate and render templates
    async fn all(&self) -> Result<Vec<MergeField>, DomainError>;

    async fn find_by_id(&self, id: &MergeFieldId) -> Result<Option<MergeField>, DomainError>;

    async fn find_by_key(&self, key: &str) -> Result<Option<MergeField>, DomainError>;

    async fn create(&self, field: &NewMergeField) -> Result<MergeField, DomainError>;

    async fn update(
        &self,
        id: &MergeFieldId,
        changes: &MergeFieldChanges,
    ) -> Result<MergeField, DomainError>;

    async fn delete(&self, id: &MergeFieldId) -> Result<(), DomainError>;
}

/// Repository for code patterns
#[async_trait]
pub trait CodePatternRepository: Send + Sync {
    async fn list(&self, page: Page) -> Result<Vec<CodePattern>, DomainError>;

    async fn find_by_id(&self, id: &CodePatternId) -> Result<Option<CodePattern>, DomainError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<CodePattern>, DomainError>;

    async fn create(&self, pattern: &NewCodePattern) -> Result<CodePattern, DomainError>;

    async fn update(
        &self,
        id: &CodePatternId,
        changes: &CodePatternChanges,
    ) -> Result<CodePattern, DomainError>;

    async fn delete(&self, id: &CodePatternId) -> Result<(), DomainError>;
}

/// Repository for layout partials
#[async_trait]
pub trait LayoutPartialRepository: Send + Sync {
    async fn list(&self, page: Page) -> Result<Vec<LayoutPartial>, DomainError>;

    /// Every partial, used to validate and render templates
    async fn all(&self) -> Result<Vec<LayoutPartial>, DomainError>;

    async fn find_by_id(&self, id: &LayoutPartialId)
        -> Result<Option<LayoutPartial>, DomainError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<LayoutPartial>, DomainError>;

    async fn create(&self, partial: &NewLayoutPartial) -> Result<LayoutPartial, DomainError>;

    async fn update(
        &self,
        id: &LayoutPartialId,
        changes: &LayoutPartialChanges,
    ) -> Result<LayoutPartial, DomainError>;

    async fn delete(&self, id: &LayoutPartialId) -> Result<(), DomainError>;
}

/// Repository for offices
#[async_trait]
pub trait OfficeRepository: Send + Sync {
    async fn list(&self, active: Option<bool>, page: Page) -> Result<Vec<Office>, DomainError>;

    async fn find_by_id(&self, id: &OfficeId) -> Result<Option<Office>, DomainError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Office>, DomainError>;

    async fn create(&self, office: &NewOffice) -> Result<Office, DomainError>;

    async fn update(&self, id: &OfficeId, changes: &OfficeChanges)
        -> Result<Office, DomainError>;

    async fn delete(&self, id: &OfficeId) -> Result<(), DomainError>;
}

/// Repository for employees and their roles
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn list(&self, filter: &EmployeeFilter, page: Page)
        -> Result<Vec<Employee>, DomainError>;

    async fn count(&self, filter: &EmployeeFilter) -> Result<u64, DomainError>;

    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, DomainError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, DomainError>;

    /// Find an active employee by API key hash
    async fn find_by_api_key_hash(&self, hash: &str) -> Result<Option<Employee>, DomainError>;

    async fn create(&self, employee: &NewEmployee) -> Result<Employee, DomainError>;

    async fn update(
        &self,
        id: &EmployeeId,
        changes: &EmployeeChanges,
    ) -> Result<Employee, DomainError>;

    /// Replace the employee's role set atomically
    async fn set_roles(
        &self,
        id: &EmployeeId,
        roles: &[SystemRole],
    ) -> Result<Employee, DomainError>;

    /// Store (or clear) the hash of the employee's API key
    async fn set_api_key_hash(
        &self,
        id: &EmployeeId,
        hash: Option<&str>,
    ) -> Result<(), DomainError>;

    async fn delete(&self, id: &EmployeeId) -> Result<(), DomainError>;
}

/// Repository for company assets
#[async_trait]
pub trait AssetRepository: Send + Sync {
    async fn list(&self, filter: &AssetFilter, page: Page)
        -> Result<Vec<CompanyAsset>, DomainError>;

    async fn find_by_id(&self, id: &AssetId) -> Result<Option<CompanyAsset>, DomainError>;

    async fn create(&self, asset: &NewAsset) -> Result<CompanyAsset, DomainError>;

    async fn update(
        &self,
        id: &AssetId,
        changes: &AssetChanges,
    ) -> Result<CompanyAsset, DomainError>;

    async fn delete(&self, id: &AssetId) -> Result<(), DomainError>;
}

/// Repository for external listings
#[async_trait]
pub trait ListingRepository: Send + Sync {
    async fn list(
        &self,
        filter: &ListingFilter,
        page: Page,
    ) -> Result<Vec<ExternalListing>, DomainError>;

    async fn find_by_id(&self, id: &ListingId) -> Result<Option<ExternalListing>, DomainError>;

    async fn find_by_external_id(
        &self,
        source: &str,
        external_id: &str,
    ) -> Result<Option<ExternalListing>, DomainError>;

    async fn create(&self, listing: &NewListing) -> Result<ExternalListing, DomainError>;

    async fn update(
        &self,
        id: &ListingId,
        changes: &ListingChanges,
    ) -> Result<ExternalListing, DomainError>;

    /// Insert or replace each listing by `(source, external_id)` in one transaction
    async fn upsert_many(&self, listings: &[NewListing]) -> Result<ImportSummary, DomainError>;

    async fn delete(&self, id: &ListingId) -> Result<(), DomainError>;
}

/// Repository for checklists and their items
#[async_trait]
pub trait ChecklistRepository: Send + Sync {
    async fn list(
        &self,
        office_id: Option<OfficeId>,
        page: Page,
    ) -> Result<Vec<Checklist>, DomainError>;

    async fn find_by_id(&self, id: &ChecklistId) -> Result<Option<Checklist>, DomainError>;

    /// Insert the checklist and its initial items atomically
    async fn create(&self, checklist: &NewChecklist) -> Result<Checklist, DomainError>;

    async fn update(
        &self,
        id: &ChecklistId,
        changes: &ChecklistChanges,
    ) -> Result<Checklist, DomainError>;

    async fn delete(&self, id: &ChecklistId) -> Result<(), DomainError>;

    async fn add_item(
        &self,
        id: &ChecklistId,
        item: &NewChecklistItem,
        position: i32,
    ) -> Result<ChecklistItem, DomainError>;

    async fn update_item(
        &self,
        id: &ChecklistId,
        item_id: &ChecklistItemId,
        changes: &ChecklistItemChanges,
    ) -> Result<ChecklistItem, DomainError>;

    async fn set_item_completed(
        &self,
        id: &ChecklistId,
        item_id: &ChecklistItemId,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<ChecklistItem, DomainError>;

    async fn delete_item(
        &self,
        id: &ChecklistId,
        item_id: &ChecklistItemId,
    ) -> Result<(), DomainError>;
}

/// Repository for territories and postal codes
#[async_trait]
pub trait TerritoryRepository: Send + Sync {
    async fn list(&self, page: Page) -> Result<Vec<Territory>, DomainError>;

    async fn find_by_id(&self, id: &TerritoryId) -> Result<Option<Territory>, DomainError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Territory>, DomainError>;

    async fn create(&self, territory: &NewTerritory) -> Result<Territory, DomainError>;

    async fn update(
        &self,
        id: &TerritoryId,
        changes: &TerritoryChanges,
    ) -> Result<Territory, DomainError>;

    async fn delete(&self, id: &TerritoryId) -> Result<(), DomainError>;

    /// Look up postal codes by their normalized codes
    async fn find_postal_codes(&self, codes: &[String]) -> Result<Vec<PostalCode>, DomainError>;

    /// Point every code at `id`, creating postal code rows as needed.
    ///
    /// Unless `force` is set, a code owned by another territory fails the
    /// whole call with `Conflict` and nothing is written. The ownership check
    /// and the write are atomic.
    async fn assign_postal_codes(
        &self,
        id: &TerritoryId,
        codes: &[String],
        force: bool,
    ) -> Result<PostalCodeAssignment, DomainError>;

    /// Detach a code from the territory; false if it was not assigned there
    async fn remove_postal_code(&self, id: &TerritoryId, code: &str)
        -> Result<bool, DomainError>;
}
