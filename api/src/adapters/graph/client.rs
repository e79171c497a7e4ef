//! Microsoft Graph API client implementation
//!
//! Authenticates with the OAuth2 client-credentials flow and caches the
//! access token until shortly before it expires.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use urlencoding::encode;

use crate::config::GraphConfig;
use crate::domain::ports::{
    GraphChannel, GraphChatMessage, GraphClient, GraphDriveItem, GraphSite, GraphTeam,
};
use crate::error::GraphError;

const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
/// Tokens are refreshed this long before Graph says they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
/// Upper bound on `@odata.nextLink` pages followed for one listing
const MAX_PAGES: usize = 20;

struct Credentials {
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

impl CachedToken {
    fn new(access_token: String, expires_in: u64, now: Instant) -> Self {
        let lifetime = Duration::from_secs(expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        Self {
            access_token,
            refresh_at: now + lifetime,
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now < self.refresh_at
    }
}

/// Implementation of the Microsoft Graph client
pub struct GraphClientImpl {
    http: Client,
    base_url: String,
    login_url: String,
    credentials: Option<Credentials>,
    token: RwLock<Option<CachedToken>>,
}

impl GraphClientImpl {
    pub fn new(config: &GraphConfig) -> Self {
        let credentials = match (
            &config.tenant_id,
            &config.client_id,
            &config.client_secret,
        ) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => Some(Credentials {
                tenant_id: tenant_id.clone(),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            }),
            _ => None,
        };

        Self {
            http: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            login_url: config.login_url.trim_end_matches('/').to_string(),
            credentials,
            token: RwLock::new(None),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Return a valid access token, requesting a new one when the cache is stale
    async fn access_token(&self) -> Result<String, GraphError> {
        let credentials = self.credentials.as_ref().ok_or(GraphError::NotConfigured)?;

        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
                return Ok(token.access_token.clone());
            }
        }

        let mut cached = self.token.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.access_token.clone());
        }

        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_url,
            encode(&credentials.tenant_id)
        );
        let resp = self
            .http
            .post(url)
            .form(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("scope", GRAPH_SCOPE),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GraphError::Token(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| GraphError::Token(e.to_string()))?;

        tracing::debug!(expires_in = token.expires_in, "Acquired Microsoft Graph token");

        let access_token = token.access_token.clone();
        *cached = Some(CachedToken::new(
            token.access_token,
            token.expires_in,
            Instant::now(),
        ));

        Ok(access_token)
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, GraphError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| GraphError::Deserialization(e.to_string()))
        } else if status == StatusCode::UNAUTHORIZED {
            // Drop the cached token so the next call re-authenticates
            self.token.write().await.take();
            Err(GraphError::Unauthorized)
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            Err(GraphError::RateLimited)
        } else if status == StatusCode::NOT_FOUND {
            let message = response.text().await.unwrap_or_default();
            Err(GraphError::NotFound(error_message(&message)))
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(GraphError::Api {
                status: status.as_u16(),
                message: error_message(&message),
            })
        }
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, GraphError> {
        let token = self.access_token().await?;
        let resp = self.http.get(url).bearer_auth(token).send().await?;
        self.handle_response(resp).await
    }

    /// Fetch a collection, following `@odata.nextLink` pages
    async fn get_collection<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
    ) -> Result<Vec<T>, GraphError> {
        let mut items = Vec::new();
        let mut next = Some(self.api_url(path));
        let mut pages = 0;

        while let Some(url) = next.take() {
            let page: Collection<T> = self.get(&url).await?;
            items.extend(page.value);
            pages += 1;

            if pages >= MAX_PAGES {
                if page.next_link.is_some() {
                    tracing::warn!(path, "Truncated Graph listing after {} pages", MAX_PAGES);
                }
                break;
            }
            next = page.next_link;
        }

        Ok(items)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct Collection<T> {
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Deserialize)]
struct GraphErrorEnvelope {
    error: GraphErrorBody,
}

#[derive(Deserialize)]
struct GraphErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatMessageBody<'a> {
    content_type: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatMessageRequest<'a> {
    body: ChatMessageBody<'a>,
}

/// Pull `code: message` out of a Graph error body, falling back to the raw text
fn error_message(body: &str) -> String {
    match serde_json::from_str::<GraphErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => {
            format!("{}: {}", envelope.error.code, envelope.error.message)
        }
        _ => body.to_string(),
    }
}

/// Percent-encode each segment of a drive path, dropping empty segments
fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl GraphClient for GraphClientImpl {
    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn list_teams(&self) -> Result<Vec<GraphTeam>, GraphError> {
        self.get_collection("/teams?$select=id,displayName,description")
            .await
    }

    async fn list_channels(&self, team_id: &str) -> Result<Vec<GraphChannel>, GraphError> {
        self.get_collection(&format!(
            "/teams/{}/channels?$select=id,displayName,description,webUrl",
            encode(team_id)
        ))
        .await
    }

    async fn search_sites(&self, query: &str) -> Result<Vec<GraphSite>, GraphError> {
        self.get_collection(&format!("/sites?search={}", encode(query)))
            .await
    }

    async fn get_site(&self, hostname: &str, path: &str) -> Result<GraphSite, GraphError> {
        let path = encode_path(path);
        let url = if path.is_empty() {
            self.api_url(&format!("/sites/{}", encode(hostname)))
        } else {
            self.api_url(&format!("/sites/{}:/{}", encode(hostname), path))
        };

        self.get(&url).await
    }

    async fn list_drive_children(
        &self,
        site_id: &str,
        folder_path: &str,
    ) -> Result<Vec<GraphDriveItem>, GraphError> {
        let folder = encode_path(folder_path);
        let path = if folder.is_empty() {
            format!("/sites/{}/drive/root/children", encode(site_id))
        } else {
            format!(
                "/sites/{}/drive/root:/{}:/children",
                encode(site_id),
                folder
            )
        };

        self.get_collection(&path).await
    }

    async fn upload_file(
        &self,
        site_id: &str,
        file_path: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<GraphDriveItem, GraphError> {
        let file_path = encode_path(file_path);
        if file_path.is_empty() {
            return Err(GraphError::Api {
                status: 400,
                message: "Upload path must name a file".to_string(),
            });
        }

        let token = self.access_token().await?;
        let resp = self
            .http
            .put(self.api_url(&format!(
                "/sites/{}/drive/root:/{}:/content",
                encode(site_id),
                file_path
            )))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(content)
            .send()
            .await?;

        self.handle_response(resp).await
    }

    async fn post_channel_message(
        &self,
        team_id: &str,
        channel_id: &str,
        html: &str,
    ) -> Result<GraphChatMessage, GraphError> {
        let token = self.access_token().await?;
        let resp = self
            .http
            .post(self.api_url(&format!(
                "/teams/{}/channels/{}/messages",
                encode(team_id),
                encode(channel_id)
            )))
            .bearer_auth(token)
            .json(&ChatMessageRequest {
                body: ChatMessageBody {
                    content_type: "html",
                    content: html,
                },
            })
            .send()
            .await?;

        self.handle_response(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unconfigured() -> GraphClientImpl {
        GraphClientImpl::new(&GraphConfig {
            base_url: "https://graph.example.test/v1.0/".to_string(),
            login_url: "https://login.example.test".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn missing_credentials_disable_client() {
        let client = unconfigured();
        assert!(!client.is_configured());
        assert_eq!(
            client.api_url("/teams"),
            "https://graph.example.test/v1.0/teams"
        );
    }

    #[test]
    fn complete_credentials_enable_client() {
        let client = GraphClientImpl::new(&GraphConfig {
            tenant_id: Some("tenant".to_string()),
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            base_url: "https://graph.example.test/v1.0".to_string(),
            login_url: "https://login.example.test".to_string(),
        });
        assert!(client.is_configured());
    }

    #[tokio::test]
    async fn unconfigured_calls_fail_without_network() {
        let client = unconfigured();
        let err = client.list_teams().await.unwrap_err();
        assert!(matches!(err, GraphError::NotConfigured));

        let err = client
            .upload_file("site", "a/b.html", vec![], "text/html")
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::NotConfigured));
    }

    #[test]
    fn token_refreshes_before_expiry() {
        let now = Instant::now();
        let token = CachedToken::new("t".to_string(), 3600, now);
        assert!(token.is_fresh(now + Duration::from_secs(3500)));
        assert!(!token.is_fresh(now + Duration::from_secs(3541)));

        let short = CachedToken::new("t".to_string(), 30, now);
        assert!(!short.is_fresh(now));
    }

    #[test]
    fn drive_paths_are_encoded_per_segment() {
        assert_eq!(encode_path("/Shared Documents/Flyers/"), "Shared%20Documents/Flyers");
        assert_eq!(encode_path("a#b/c?d"), "a%23b/c%3Fd");
        assert_eq!(encode_path("/"), "");
    }

    #[test]
    fn graph_error_bodies_are_summarized() {
        let body = r#"{"error":{"code":"itemNotFound","message":"The resource could not be found."}}"#;
        assert_eq!(
            error_message(body),
            "itemNotFound: The resource could not be found."
        );
        assert_eq!(error_message("plain failure"), "plain failure");
    }

    #[test]
    fn collections_expose_next_link() {
        let json = r#"{"value":[{"id":"1","displayName":"Sales"}],"@odata.nextLink":"https://next"}"#;
        let page: Collection<GraphTeam> = serde_json::from_str(json).unwrap();
        assert_eq!(page.value.len(), 1);
        assert_eq!(page.next_link.as_deref(), Some("https://next"));
    }
}
