//! Domain ports (traits)
//!
//! Port traits define interfaces that the domain layer requires.
//! Adapters provide concrete implementations of these traits.

pub mod graph;
pub mod repositories;

pub use graph::{
    GraphChannel, GraphChatMessage, GraphClient, GraphDriveItem, GraphSite, GraphTeam,
};
pub use repositories::{
    AssetRepository, AuditLogRepository, CategoryRepository, ChecklistRepository,
    CodePatternRepository, EmployeeRepository, LayoutPartialRepository, ListingRepository,
    MergeFieldRepository, OfficeRepository, TagRepository, TemplateRepository,
    TerritoryRepository,
};
