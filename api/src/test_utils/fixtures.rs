//! Test fixtures
//!
//! Factory functions for creating test data with sensible defaults.
//! Each fixture function creates a valid entity that can be customized.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::entities::template::slugify;
use crate::domain::entities::{
    AssetId, AssetType, Category, CategoryId, Checklist, ChecklistId, ChecklistItem,
    ChecklistItemId, CompanyAsset, Employee, EmployeeId, ExternalListing, LayoutPartial,
    LayoutPartialId, ListingId, ListingStatus, MergeField, MergeFieldId, MergeFieldType, Office,
    OfficeId, PartialKind, SystemRole, Tag, TagId, Template, TemplateId, TemplateStatus,
    Territory, TerritoryId,
};

/// Create a draft template at version 1
pub fn test_template(name: &str) -> Template {
    let now = Utc::now();
    Template {
        id: TemplateId(Uuid::new_v4()),
        name: name.to_string(),
        slug: slugify(name),
        description: None,
        content: format!("<h1>{}</h1>", name),
        status: TemplateStatus::Draft,
        current_version: 1,
        created_by: None,
        tag_ids: Vec::new(),
        category_ids: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

/// Create a test tag with no color
pub fn test_tag(name: &str) -> Tag {
    Tag {
        id: TagId(Uuid::new_v4()),
        name: name.to_string(),
        color: None,
        template_count: 0,
        created_at: Utc::now(),
    }
}

/// Create a top-level test category
pub fn test_category(name: &str) -> Category {
    Category {
        id: CategoryId(Uuid::new_v4()),
        name: name.to_string(),
        description: None,
        parent_id: None,
        sort_order: 0,
        created_at: Utc::now(),
    }
}

/// Create a text merge field labelled with its key
pub fn test_merge_field(key: &str, sample_value: Option<&str>) -> MergeField {
    let now = Utc::now();
    MergeField {
        id: MergeFieldId(Uuid::new_v4()),
        key: key.to_string(),
        label: key.to_string(),
        description: None,
        sample_value: sample_value.map(str::to_string),
        data_type: MergeFieldType::Text,
        created_at: now,
        updated_at: now,
    }
}

pub fn test_partial(name: &str, content: &str) -> LayoutPartial {
    let now = Utc::now();
    LayoutPartial {
        id: LayoutPartialId(Uuid::new_v4()),
        name: name.to_string(),
        kind: PartialKind::Block,
        content: content.to_string(),
        created_at: now,
        updated_at: now,
    }
}

/// Create an active office with only a name and code
pub fn test_office(code: &str) -> Office {
    let now = Utc::now();
    Office {
        id: OfficeId(Uuid::new_v4()),
        name: format!("{} Office", code),
        code: code.to_string(),
        street: None,
        city: None,
        state: None,
        postal_code: None,
        phone: None,
        email: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// Create an active editor without an office or API key
pub fn test_employee(email: &str) -> Employee {
    let now = Utc::now();
    Employee {
        id: EmployeeId(Uuid::new_v4()),
        office_id: None,
        first_name: "Test".to_string(),
        last_name: "Employee".to_string(),
        email: email.to_string(),
        title: None,
        phone: None,
        is_active: true,
        roles: vec![SystemRole::Editor],
        has_api_key: false,
        created_at: now,
        updated_at: now,
    }
}

/// Create a company-wide logo asset
pub fn test_asset(name: &str) -> CompanyAsset {
    let now = Utc::now();
    CompanyAsset {
        id: AssetId(Uuid::new_v4()),
        name: name.to_string(),
        asset_type: AssetType::Logo,
        url: format!("https://cdn.example.com/{}.png", slugify(name)),
        mime_type: Some("image/png".to_string()),
        description: None,
        office_id: None,
        created_at: now,
        updated_at: now,
    }
}

/// Create an active MLS listing with no office, agent or postal code
pub fn test_listing(external_id: &str) -> ExternalListing {
    let now = Utc::now();
    ExternalListing {
        id: ListingId(Uuid::new_v4()),
        source: "mls".to_string(),
        external_id: external_id.to_string(),
        office_id: None,
        agent_id: None,
        address: "100 Main St".to_string(),
        city: Some("Dallas".to_string()),
        state: Some("TX".to_string()),
        postal_code: None,
        price_cents: Some(45_000_000),
        status: ListingStatus::Active,
        bedrooms: Some(3),
        bathrooms: Some(2.5),
        listed_at: Some(now),
        created_at: now,
        updated_at: now,
    }
}

/// Create a checklist whose items are all required and open
pub fn test_checklist(name: &str, items: &[&str]) -> Checklist {
    let now = Utc::now();
    let id = ChecklistId(Uuid::new_v4());
    Checklist {
        id,
        name: name.to_string(),
        description: None,
        office_id: None,
        items: items
            .iter()
            .enumerate()
            .map(|(position, text)| ChecklistItem {
                id: ChecklistItemId(Uuid::new_v4()),
                checklist_id: id,
                position: position as i32,
                text: text.to_string(),
                is_required: true,
                completed_at: None,
                created_at: now,
            })
            .collect(),
        created_at: now,
        updated_at: now,
    }
}

pub fn test_territory(name: &str) -> Territory {
    let now = Utc::now();
    Territory {
        id: TerritoryId(Uuid::new_v4()),
        name: name.to_string(),
        description: None,
        office_id: None,
        postal_codes: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}
