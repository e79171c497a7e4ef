//! Application layer
//!
//! Contains use cases and service orchestration.
//! Services coordinate between domain entities, ports, and external systems.

pub mod asset_service;
pub mod audit_service;
pub mod catalog;
pub mod checklist_service;
pub mod document_service;
pub mod employee_service;
pub mod integration_service;
pub mod library_service;
pub mod listing_service;
pub mod office_service;
pub mod taxonomy_service;
pub mod template_service;
pub mod territory_service;

pub use asset_service::AssetService;
pub use audit_service::AuditService;
pub use checklist_service::{ChecklistService, ChecklistView};
pub use document_service::SanitizerService;
pub use employee_service::{EmployeeService, IssuedApiKey};
pub use integration_service::{
    AnnounceRequest, ExportRequest, ExportResult, IntegrationService, SiteQuery,
};
pub use library_service::{ContentLibraryService, Saved};
pub use listing_service::{ListingImport, ListingService};
pub use office_service::OfficeService;
pub use taxonomy_service::TaxonomyService;
pub use template_service::{Preview, SavedTemplate, TemplateService};
pub use territory_service::{AssignPostalCodes, PostalCodeLookup, TerritoryService};
