//! Microsoft Graph port trait
//!
//! Defines the interface for the Teams / SharePoint operations Document Hub uses.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// A Microsoft Team (a group with a team provisioned)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphTeam {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A channel inside a team
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphChannel {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
}

/// A SharePoint site
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSite {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub web_url: String,
}

/// Marker present on drive items that are folders
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphFolder {
    #[serde(default)]
    pub child_count: i64,
}

/// A file or folder in a SharePoint document library
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDriveItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub folder: Option<GraphFolder>,
    #[serde(default)]
    pub last_modified_date_time: Option<String>,
}

impl GraphDriveItem {
    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }
}

/// A message posted to a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphChatMessage {
    pub id: String,
    #[serde(default)]
    pub web_url: Option<String>,
}

/// Client for Microsoft Graph
#[async_trait]
pub trait GraphClient: Send + Sync {
    /// Whether credentials are configured
    fn is_configured(&self) -> bool;

    async fn list_teams(&self) -> Result<Vec<GraphTeam>, GraphError>;

    async fn list_channels(&self, team_id: &str) -> Result<Vec<GraphChannel>, GraphError>;

    /// Search SharePoint sites by keyword
    async fn search_sites(&self, query: &str) -> Result<Vec<GraphSite>, GraphError>;

    /// Resolve a site by hostname and server-relative path (e.g. `/sites/marketing`)
    async fn get_site(&self, hostname: &str, path: &str) -> Result<GraphSite, GraphError>;

    /// List the children of a folder in the site's default document library.
    /// An empty `folder_path` lists the library root.
    async fn list_drive_children(
        &self,
        site_id: &str,
        folder_path: &str,
    ) -> Result<Vec<GraphDriveItem>, GraphError>;

    /// Upload (create or replace) a small file at `file_path` in the site's library
    async fn upload_file(
        &self,
        site_id: &str,
        file_path: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<GraphDriveItem, GraphError>;

    /// Post an HTML message to a team channel
    async fn post_channel_message(
        &self,
        team_id: &str,
        channel_id: &str,
        html: &str,
    ) -> Result<GraphChatMessage, GraphError>;
}
