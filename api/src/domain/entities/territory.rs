//! Territory domain entity
//!
//! A territory is a named set of postal codes. Each postal code belongs to
//! at most one territory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::double_option;
use super::office::OfficeId;

entity_id!(
    /// Unique identifier for a territory
    TerritoryId
);

#[derive(Debug, Clone, Serialize)]
pub struct PostalCode {
    pub code: String,
    pub territory_id: Option<TerritoryId>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Territory {
    pub id: TerritoryId,
    pub name: String,
    pub description: Option<String>,
    pub office_id: Option<OfficeId>,
    /// Sorted postal codes assigned to this territory
    pub postal_codes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of pointing postal codes at a territory
#[derive(Debug, Clone)]
pub struct PostalCodeAssignment {
    pub territory: Territory,
    /// Codes taken from another territory, with their previous owner
    pub moved: Vec<PostalCode>,
}

/// Conflict message for codes owned by another territory
pub fn taken_codes_message(taken: &[PostalCode]) -> String {
    let listed = taken
        .iter()
        .map(|pc| pc.code.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!("Postal codes already belong to another territory: {}", listed)
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTerritory {
    pub name: String,
    pub description: Option<String>,
    pub office_id: Option<OfficeId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TerritoryChanges {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub office_id: Option<Option<OfficeId>>,
}

/// Normalize a US postal code to its 5-digit form.
///
/// Accepts `12345` and `12345-6789`.
pub fn normalize_postal_code(code: &str) -> Result<String, String> {
    let code = code.trim();
    let (zip, plus4) = match code.split_once('-') {
        Some((zip, plus4)) => (zip, Some(plus4)),
        None => (code, None),
    };

    let digits = |s: &str, n: usize| s.len() == n && s.chars().all(|c| c.is_ascii_digit());
    if !digits(zip, 5) || plus4.is_some_and(|p| !digits(p, 4)) {
        return Err(format!("'{}' is not a valid postal code", code));
    }

    Ok(zip.to_string())
}

/// Normalize and deduplicate a batch of postal codes, returning them sorted
pub fn normalize_postal_codes(codes: &[String]) -> Result<Vec<String>, String> {
    let mut normalized = codes
        .iter()
        .map(|c| normalize_postal_code(c))
        .collect::<Result<Vec<_>, _>>()?;
    normalized.sort();
    normalized.dedup();
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postal_codes_normalize_to_five_digits() {
        assert_eq!(normalize_postal_code("75201").unwrap(), "75201");
        assert_eq!(normalize_postal_code(" 75201-1234 ").unwrap(), "75201");
    }

    #[test]
    fn invalid_postal_codes_are_rejected() {
        assert!(normalize_postal_code("7520").is_err());
        assert!(normalize_postal_code("75201-12").is_err());
        assert!(normalize_postal_code("7520A").is_err());
        assert!(normalize_postal_code("").is_err());
    }

    #[test]
    fn batches_are_sorted_and_deduplicated() {
        let codes = vec![
            "75202".to_string(),
            "75201-0001".to_string(),
            "75201".to_string(),
        ];
        assert_eq!(
            normalize_postal_codes(&codes).unwrap(),
            vec!["75201".to_string(), "75202".to_string()]
        );
        assert!(normalize_postal_codes(&["bad".to_string()]).is_err());
    }
}
