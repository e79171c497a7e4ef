//! External listing domain entity
//!
//! Property listings mirrored from outside sources (MLS feeds and similar).
//! A listing is identified externally by `(source, external_id)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::double_option;
use super::employee::EmployeeId;
use super::office::OfficeId;

entity_id!(
    /// Unique identifier for an external listing
    ListingId
);

string_enum!(
    ListingStatus {
        Active => "active",
        Pending => "pending",
        Sold => "sold",
        Withdrawn => "withdrawn",
    }
);

#[derive(Debug, Clone, Serialize)]
pub struct ExternalListing {
    pub id: ListingId,
    pub source: String,
    pub external_id: String,
    pub office_id: Option<OfficeId>,
    pub agent_id: Option<EmployeeId>,
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub price_cents: Option<i64>,
    pub status: ListingStatus,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<f64>,
    pub listed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewListing {
    /// Filled from the batch when the listing arrives through an import
    #[serde(default)]
    pub source: String,
    pub external_id: String,
    pub office_id: Option<OfficeId>,
    pub agent_id: Option<EmployeeId>,
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub price_cents: Option<i64>,
    #[serde(default = "default_status")]
    pub status: ListingStatus,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<f64>,
    pub listed_at: Option<DateTime<Utc>>,
}

fn default_status() -> ListingStatus {
    ListingStatus::Active
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingChanges {
    #[serde(default, deserialize_with = "double_option")]
    pub office_id: Option<Option<OfficeId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub agent_id: Option<Option<EmployeeId>>,
    pub address: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub state: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub postal_code: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub price_cents: Option<Option<i64>>,
    pub status: Option<ListingStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub bedrooms: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub bathrooms: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub listed_at: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingFilter {
    pub status: Option<ListingStatus>,
    pub office_id: Option<OfficeId>,
    pub postal_code: Option<String>,
}

impl ListingFilter {
    pub fn matches(&self, listing: &ExternalListing) -> bool {
        self.status.map_or(true, |s| listing.status == s)
            && self.office_id.map_or(true, |id| listing.office_id == Some(id))
            && self
                .postal_code
                .as_deref()
                .map_or(true, |code| listing.postal_code.as_deref() == Some(code))
    }
}

/// Outcome of a bulk listing import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: u64,
    pub updated: u64,
}

/// Check the numeric fields of a listing are in range
pub fn validate_listing_numbers(
    price_cents: Option<i64>,
    bedrooms: Option<i32>,
    bathrooms: Option<f64>,
) -> Result<(), String> {
    if price_cents.is_some_and(|p| p < 0) {
        return Err("Price must not be negative".to_string());
    }
    if bedrooms.is_some_and(|b| b < 0) {
        return Err("Bedrooms must not be negative".to_string());
    }
    if bathrooms.is_some_and(|b| !b.is_finite() || b < 0.0) {
        return Err("Bathrooms must be a non-negative number".to_string());
    }
    Ok(())
}
