//! PostgreSQL adapters
//!
//! Implementations of repository traits using SeaORM and PostgreSQL.

pub mod asset_repo;
pub mod audit_log_repo;
pub mod category_repo;
pub mod checklist_repo;
pub mod code_pattern_repo;
pub mod employee_repo;
pub mod layout_partial_repo;
pub mod listing_repo;
pub mod merge_field_repo;
pub mod office_repo;
pub mod tag_repo;
pub mod template_repo;
pub mod territory_repo;


pub use asset_repo::PostgresAssetRepository;
pub use audit_log_repo::PostgresAuditLogRepository;
pub use category_repo::PostgresCategoryRepository;
pub use checklist_repo::PostgresChecklistRepository;
pub use code_pattern_repo::PostgresCodePatternRepository;
pub use employee_repo::PostgresEmployeeRepository;
pub use layout_partial_repo::PostgresLayoutPartialRepository;
pub use listing_repo::PostgresListingRepository;
pub use merge_field_repo::PostgresMergeFieldRepository;
pub use office_repo::PostgresOfficeRepository;
pub use tag_repo::PostgresTagRepository;
pub use template_repo::PostgresTemplateRepository;
pub use territory_repo::PostgresTerritoryRepository;
