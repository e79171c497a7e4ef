//! HTTP handlers
//!
//! Axum request handlers for the API endpoints.

pub mod assets;
pub mod audit;
pub mod checklists;
pub mod integrations;
pub mod library;
pub mod listings;
pub mod organization;
pub mod sanitizer;
pub mod taxonomy;
pub mod templates;
pub mod territories;

pub use assets::{create_asset, delete_asset, get_asset, list_assets, update_asset};
pub use audit::list_audit_logs;
pub use checklists::{
    add_item, complete_item, create_checklist, delete_checklist, delete_item, get_checklist,
    list_checklists, update_checklist, update_item,
};
pub use integrations::{find_sites, list_channels, list_drive, list_teams};
pub use library::{
    create_code_pattern, create_merge_field, create_partial, delete_code_pattern,
    delete_merge_field, delete_partial, get_code_pattern, get_merge_field, get_partial,
    list_code_patterns, list_merge_fields, list_partials, update_code_pattern,
    update_merge_field, update_partial,
};
pub use listings::{
    create_listing, delete_listing, get_listing, import_listings, list_listings, update_listing,
};
pub use organization::{
    create_employee, create_office, delete_employee, delete_office, get_employee, get_office,
    issue_api_key, list_employees, list_offices, revoke_api_key, set_employee_roles,
    update_employee, update_office,
};
pub use sanitizer::{convert_docx, sanitize_html};
pub use taxonomy::{
    create_category, create_tag, delete_category, delete_tag, get_category, get_tag,
    list_categories, list_tags, update_category, update_tag,
};
pub use templates::{
    announce_template, create_template, delete_template, export_template, get_template,
    get_version, list_templates, list_versions, preview_template, restore_version,
    set_template_status, update_template, validate_template,
};
pub use territories::{
    assign_postal_codes, create_territory, delete_territory, get_territory, list_territories,
    lookup_postal_code, remove_postal_code, update_territory,
};
