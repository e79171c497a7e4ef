//! SeaORM entities
//!
//! Table mappings for the Document Hub schema. The schema itself is owned by
//! the SQL files in `db::migrations`; these models mirror it column for column.

pub mod audit_logs;
pub mod categories;
pub mod checklist_items;
pub mod checklists;
pub mod code_patterns;
pub mod company_assets;
pub mod employee_roles;
pub mod employees;
pub mod external_listings;
pub mod layout_partials;
pub mod merge_fields;
pub mod offices;
pub mod postal_codes;
pub mod tags;
pub mod template_categories;
pub mod template_tags;
pub mod template_versions;
pub mod templates;
pub mod territories;
