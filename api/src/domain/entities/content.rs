//! Content library entities
//!
//! Merge fields, code patterns and layout partials are the building blocks
//! templates reference.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::double_option;

entity_id!(
    /// Unique identifier for a merge field
    MergeFieldId
);

entity_id!(
    /// Unique identifier for a code pattern
    CodePatternId
);

entity_id!(
    /// Unique identifier for a layout partial
    LayoutPartialId
);

string_enum!(
    /// Kind of value a merge field expands to
    MergeFieldType {
        Text => "text",
        Number => "number",
        Date => "date",
        Currency => "currency",
        Image => "image",
        Url => "url",
    }
);

string_enum!(
    /// Where a layout partial is meant to sit
    PartialKind {
        Header => "header",
        Footer => "footer",
        Sidebar => "sidebar",
        Block => "block",
    }
);

static MERGE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)*$").unwrap());

static PARTIAL_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap());

/// A named placeholder substituted when a template is rendered
#[derive(Debug, Clone, Serialize)]
pub struct MergeField {
    pub id: MergeFieldId,
    pub key: String,
    pub label: String,
    pub description: Option<String>,
    pub sample_value: Option<String>,
    pub data_type: MergeFieldType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMergeField {
    pub key: String,
    pub label: String,
    pub description: Option<String>,
    pub sample_value: Option<String>,
    #[serde(default = "default_field_type")]
    pub data_type: MergeFieldType,
}

fn default_field_type() -> MergeFieldType {
    MergeFieldType::Text
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MergeFieldChanges {
    pub label: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub sample_value: Option<Option<String>>,
    pub data_type: Option<MergeFieldType>,
}

/// A reusable HTML snippet editors paste into templates
#[derive(Debug, Clone, Serialize)]
pub struct CodePattern {
    pub id: CodePatternId,
    pub name: String,
    pub description: Option<String>,
    pub snippet: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCodePattern {
    pub name: String,
    pub description: Option<String>,
    pub snippet: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodePatternChanges {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub snippet: Option<String>,
}

/// A reusable fragment included into templates with `{{> name }}`
#[derive(Debug, Clone, Serialize)]
pub struct LayoutPartial {
    pub id: LayoutPartialId,
    pub name: String,
    pub kind: PartialKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLayoutPartial {
    pub name: String,
    #[serde(default = "default_partial_kind")]
    pub kind: PartialKind,
    pub content: String,
}

fn default_partial_kind() -> PartialKind {
    PartialKind::Block
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayoutPartialChanges {
    pub name: Option<String>,
    pub kind: Option<PartialKind>,
    pub content: Option<String>,
}

/// Merge keys are dotted lowercase identifiers such as `listing.price`
pub fn validate_merge_key(key: &str) -> Result<String, String> {
    let key = key.trim();
    if key.len() > 100 || !MERGE_KEY.is_match(key) {
        return Err(format!(
            "Merge field key '{}' must be dotted lowercase identifiers (e.g. listing.price)",
            key
        ));
    }
    Ok(key.to_string())
}

/// Partial names are lowercase slugs that may contain `_` and `-`
pub fn validate_partial_name(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.len() > 100 || !PARTIAL_NAME.is_match(name) {
        return Err(format!(
            "Partial name '{}' may only contain lowercase letters, digits, '_' and '-'",
            name
        ));
    }
    Ok(name.to_string())
}
