//! Company asset domain entity
//!
//! Logos, images, documents and fonts referenced by templates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::double_option;
use super::office::OfficeId;

entity_id!(
    /// Unique identifier for a company asset
    AssetId
);

string_enum!(
    AssetType {
        Logo => "logo",
        Image => "image",
        Document => "document",
        Font => "font",
        Other => "other",
    }
);

#[derive(Debug, Clone, Serialize)]
pub struct CompanyAsset {
    pub id: AssetId,
    pub name: String,
    pub asset_type: AssetType,
    pub url: String,
    pub mime_type: Option<String>,
    pub description: Option<String>,
    pub office_id: Option<OfficeId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAsset {
    pub name: String,
    pub asset_type: AssetType,
    pub url: String,
    pub mime_type: Option<String>,
    pub description: Option<String>,
    pub office_id: Option<OfficeId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetChanges {
    pub name: Option<String>,
    pub asset_type: Option<AssetType>,
    pub url: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub mime_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub office_id: Option<Option<OfficeId>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetFilter {
    pub asset_type: Option<AssetType>,
    pub office_id: Option<OfficeId>,
}

impl AssetFilter {
    pub fn matches(&self, asset: &CompanyAsset) -> bool {
        self.asset_type.map_or(true, |t| asset.asset_type == t)
            && self.office_id.map_or(true, |id| asset.office_id == Some(id))
    }
}

/// Asset URLs must be absolute http(s) URLs with a host
pub fn validate_asset_url(url: &str) -> Result<String, String> {
    let url = url.trim();
    let parsed = reqwest::Url::parse(url).map_err(|e| format!("Invalid URL '{}': {}", url, e))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(format!("Asset URL '{}' must be an http(s) URL", url));
    }
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_urls() {
        assert!(validate_asset_url("https://cdn.example.com/logo.png").is_ok());
        assert!(validate_asset_url(" http://example.com/a.pdf ").is_ok());
        assert!(validate_asset_url("ftp://example.com/a.pdf").is_err());
        assert!(validate_asset_url("/relative/path.png").is_err());
        assert!(validate_asset_url("javascript:alert(1)").is_err());
    }

    #[test]
    fn asset_type_parse() {
        assert_eq!("LOGO".parse::<AssetType>().unwrap(), AssetType::Logo);
        assert!("video".parse::<AssetType>().is_err());
    }
}
