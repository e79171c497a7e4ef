//! Adapters layer
//!
//! Implementations of port traits for external systems.

pub mod graph;
pub mod postgres;

pub use graph::GraphClientImpl;
pub use postgres::{
    PostgresAssetRepository, PostgresAuditLogRepository, PostgresCategoryRepository,
    PostgresChecklistRepository, PostgresCodePatternRepository, PostgresEmployeeRepository,
    PostgresLayoutPartialRepository, PostgresListingRepository, PostgresMergeFieldRepository,
    PostgresOfficeRepository, PostgresTagRepository, PostgresTemplateRepository,
    PostgresTerritoryRepository,
};
