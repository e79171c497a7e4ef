//! Seed file loading
//!
//! A seed file is a JSON object with optional arrays `tags`, `categories`,
//! `merge_fields`, `offices` and `layout_partials`. Each entry is posted
//! unchanged to the matching create endpoint.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::client::{CreateOutcome, DocuHubClient};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedFile {
    pub tags: Vec<Value>,
    pub categories: Vec<Value>,
    pub merge_fields: Vec<Value>,
    pub offices: Vec<Value>,
    pub layout_partials: Vec<Value>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub created: usize,
    pub skipped: usize,
}

impl SeedFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid seed file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Sections in the order they must be created
    pub fn sections(&self) -> [(&'static str, &[Value]); 5] {
        [
            ("/tags", self.tags.as_slice()),
            ("/categories", self.categories.as_slice()),
            ("/merge-fields", self.merge_fields.as_slice()),
            ("/offices", self.offices.as_slice()),
            ("/layout-partials", self.layout_partials.as_slice()),
        ]
    }

    pub fn len(&self) -> usize {
        self.sections().iter().map(|(_, items)| items.len()).sum()
    }
}

/// Create every seed record; records that already exist are skipped
pub async fn apply(client: &DocuHubClient, seed: &SeedFile) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for (path, items) in seed.sections() {
        for item in items {
            match client.create(path, item).await? {
                CreateOutcome::Created => summary.created += 1,
                CreateOutcome::AlreadyExists => {
                    tracing::debug!(path, "Record already exists, skipping");
                    summary.skipped += 1;
                }
            }
        }
        if !items.is_empty() {
            tracing::info!(path, count = items.len(), "Seeded section");
        }
    }

    Ok(summary)
}
