//! HTTP client for the Document Hub API

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Largest page the API serves
const PAGE_SIZE: u64 = 100;

/// HTTP client for communicating with the Document Hub API
#[derive(Clone)]
pub struct DocuHubClient {
    client: reqwest::Client,
    base_url: String,
}

/// Result of a create call that tolerates existing records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateSummary {
    pub id: String,
    pub slug: String,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagSummary {
    pub id: String,
    pub name: String,
    pub template_count: i64,
}

impl DocuHubClient {
    /// Create a new client with explicit configuration
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .context("Invalid API key format")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[cfg(test)]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.get_json("/health").await
    }

    /// Every template with the given status, across all pages
    pub async fn templates_with_status(&self, status: &str) -> Result<Vec<TemplateSummary>> {
        self.get_all(&format!("/templates?status={}", status)).await
    }

    pub async fn delete_template(&self, id: &str) -> Result<()> {
        self.delete(&format!("/templates/{}", id)).await
    }

    pub async fn tags(&self) -> Result<Vec<TagSummary>> {
        self.get_all("/tags").await
    }

    pub async fn delete_tag(&self, id: &str) -> Result<()> {
        self.delete(&format!("/tags/{}", id)).await
    }

    /// POST a record; a 409 means it was seeded before and is not an error
    pub async fn create<T: Serialize>(&self, path: &str, body: &T) -> Result<CreateOutcome> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to POST {}", path))?;

        if response.status() == StatusCode::CONFLICT {
            return Ok(CreateOutcome::AlreadyExists);
        }
        handle_response(response).await?;
        Ok(CreateOutcome::Created)
    }

    // --- Internal helpers ---

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to GET {}", path))?;

        let body = handle_response(response).await?;
        serde_json::from_str(&body).with_context(|| format!("Unexpected response from {}", path))
    }

    /// Walk `limit`/`offset` pages until a short page comes back
    async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();
        let mut offset = 0;

        loop {
            let page: Vec<T> = self
                .get_json(&format!(
                    "{}{}limit={}&offset={}",
                    path, separator, PAGE_SIZE, offset
                ))
                .await?;
            let fetched = page.len() as u64;
            items.extend(page);
            if fetched < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }

        Ok(items)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .with_context(|| format!("Failed to DELETE {}", path))?;

        handle_response(response).await.map(|_| ())
    }
}

async fn handle_response(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .context("Failed to read response body")?;

    if !status.is_success() {
        anyhow::bail!("API error ({}): {}", status, body);
    }

    Ok(body)
}
