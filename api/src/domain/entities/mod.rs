//! Domain entities
//!
//! Pure domain models representing core business concepts.
//! These are separate from the SeaORM entities in the `entity` module.

use serde::{Deserialize, Deserializer};

/// Declares a UUID-backed identifier newtype.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub uuid::Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(id: uuid::Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

/// Declares a lowercase string-backed enum with `Display` and `FromStr`.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!(
                        "Unknown {} '{}', expected one of: {}",
                        stringify!($name),
                        s,
                        $name::ALL
                            .iter()
                            .map(|v| v.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    )),
                }
            }
        }
    };
}

pub mod asset;
pub mod audit;
pub mod checklist;
pub mod content;
pub mod employee;
pub mod listing;
pub mod office;
pub mod taxonomy;
pub mod template;
pub mod territory;

pub use asset::{AssetChanges, AssetFilter, AssetId, AssetType, CompanyAsset, NewAsset};
pub use audit::{AuditAction, AuditFilter, AuditLog, AuditLogId, NewAuditLog};
pub use checklist::{
    Checklist, ChecklistChanges, ChecklistId, ChecklistItem, ChecklistItemChanges,
    ChecklistItemId, ChecklistProgress, NewChecklist, NewChecklistItem,
};
pub use content::{
    CodePattern, CodePatternChanges, CodePatternId, LayoutPartial, LayoutPartialChanges,
    LayoutPartialId, MergeField, MergeFieldChanges, MergeFieldId, MergeFieldType, NewCodePattern,
    NewLayoutPartial, NewMergeField, PartialKind,
};
pub use employee::{
    Employee, EmployeeChanges, EmployeeFilter, EmployeeId, NewEmployee, Principal, SystemRole,
};
pub use listing::{
    ExternalListing, ImportSummary, ListingChanges, ListingFilter, ListingId, ListingStatus,
    NewListing,
};
pub use office::{NewOffice, Office, OfficeChanges, OfficeId};
pub use taxonomy::{
    Category, CategoryChanges, CategoryId, NewCategory, NewTag, Tag, TagChanges, TagId,
};
pub use template::{
    NewTemplate, Template, TemplateChanges, TemplateFilter, TemplateId, TemplateStatus,
    TemplateVersion,
};
pub use territory::{
    NewTerritory, PostalCode, PostalCodeAssignment, Territory, TerritoryChanges, TerritoryId,
};

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: u64 = 20;
/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: u64 = 100;
/// Offsets are bound as signed 64-bit integers by the database driver
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Limit/offset window for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Page {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl Page {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self { limit, offset }.clamped()
    }

    /// Clamp the limit into `1..=MAX_PAGE_SIZE` and the offset to what
    /// the database accepts
    pub fn clamped(self) -> Self {
        Self {
            limit: self.limit.clamp(1, MAX_PAGE_SIZE),
            offset: self.offset.min(MAX_OFFSET),
        }
    }

    /// Apply the window to an in-memory iterator
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

/// Deserialize a field that distinguishes "absent" from "null".
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// absent -> `None`, `null` -> `Some(None)`, value -> `Some(Some(v))`.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trim a required text field and enforce a length range
pub fn required_text(field: &str, value: &str, max: usize) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{} must not be empty", field));
    }
    if trimmed.chars().count() > max {
        return Err(format!("{} must be at most {} characters", field, max));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field, mapping blank to `None`
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
