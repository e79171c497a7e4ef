//! Office domain entity
//!
//! A franchise office. Employees, assets, listings and territories may
//! belong to one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::double_option;

entity_id!(
    /// Unique identifier for an office
    OfficeId
);

#[derive(Debug, Clone, Serialize)]
pub struct Office {
    pub id: OfficeId,
    pub name: String,
    pub code: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOffice {
    pub name: String,
    pub code: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfficeChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub street: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub state: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub postal_code: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Office codes are uppercase, 2..=16 characters of letters, digits and dashes
pub fn normalize_office_code(code: &str) -> Result<String, String> {
    let code = code.trim().to_uppercase();
    let valid = (2..=16).contains(&code.len())
        && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !valid {
        return Err(format!(
            "Office code '{}' must be 2-16 letters, digits or dashes",
            code
        ));
    }
    Ok(code)
}
