//! Microsoft Graph integration service
//!
//! Browsing Teams and SharePoint, exporting templates to a document library
//! and announcing published templates in a channel.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::audit_service::AuditService;
use crate::domain::entities::{AuditAction, EmployeeId, Template, TemplateId, TemplateStatus};
use crate::domain::ports::{
    AuditLogRepository, GraphChannel, GraphChatMessage, GraphClient, GraphDriveItem, GraphSite,
    GraphTeam, TemplateRepository,
};
use crate::error::{AppError, DomainError, GraphError};
use crate::sanitizer::merge::escape_html;

/// How to find SharePoint sites: keyword search or an exact hostname + path
#[derive(Debug, Default, Deserialize)]
pub struct SiteQuery {
    pub search: Option<String>,
    pub hostname: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub site_id: String,
    /// Folder inside the site's default library; empty for the root
    #[serde(default)]
    pub folder: String,
}

#[derive(Debug, Deserialize)]
pub struct AnnounceRequest {
    pub team_id: String,
    pub channel_id: String,
    /// Extra text placed above the announcement
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExportResult {
    pub path: String,
    pub item: GraphDriveItem,
}

/// Service for the Teams / SharePoint integration
pub struct IntegrationService<GC, T, A>
where
    GC: GraphClient,
    T: TemplateRepository,
    A: AuditLogRepository,
{
    graph: Arc<GC>,
    templates: Arc<T>,
    audit: AuditService<A>,
}

impl<GC, T, A> IntegrationService<GC, T, A>
where
    GC: GraphClient,
    T: TemplateRepository,
    A: AuditLogRepository,
{
    pub fn new(graph: Arc<GC>, templates: Arc<T>, audit: AuditService<A>) -> Self {
        Self {
            graph,
            templates,
            audit,
        }
    }

    fn ensure_configured(&self) -> Result<(), AppError> {
        if !self.graph.is_configured() {
            return Err(GraphError::NotConfigured.into());
        }
        Ok(())
    }

    pub async fn list_teams(&self) -> Result<Vec<GraphTeam>, AppError> {
        self.ensure_configured()?;
        Ok(self.graph.list_teams().await?)
    }

    pub async fn list_channels(&self, team_id: &str) -> Result<Vec<GraphChannel>, AppError> {
        self.ensure_configured()?;
        Ok(self.graph.list_channels(team_id).await?)
    }

    pub async fn find_sites(&self, query: &SiteQuery) -> Result<Vec<GraphSite>, AppError> {
        self.ensure_configured()?;

        match (query.hostname.as_deref(), query.search.as_deref()) {
            (Some(hostname), _) => {
                let path = query.path.as_deref().unwrap_or("");
                Ok(vec![self.graph.get_site(hostname, path).await?])
            }
            (None, Some(search)) if !search.trim().is_empty() => {
                Ok(self.graph.search_sites(search.trim()).await?)
            }
            _ => Err(AppError::BadRequest(
                "Provide either `search` or `hostname` (with optional `path`)".to_string(),
            )),
        }
    }

    pub async fn list_drive(
        &self,
        site_id: &str,
        folder: &str,
    ) -> Result<Vec<GraphDriveItem>, AppError> {
        self.ensure_configured()?;
        Ok(self
            .graph
            .list_drive_children(site_id, &normalize_folder(folder)?)
            .await?)
    }

    /// Upload the template as `<slug>.html` into a SharePoint folder
    pub async fn export_template(
        &self,
        id: &TemplateId,
        request: ExportRequest,
        actor: Option<EmployeeId>,
    ) -> Result<ExportResult, AppError> {
        self.ensure_configured()?;
        let template = self.template(id).await?;

        let folder = normalize_folder(&request.folder)?;
        let file_name = format!("{}.html", template.slug);
        let path = if folder.is_empty() {
            file_name
        } else {
            format!("{}/{}", folder, file_name)
        };

        let item = self
            .graph
            .upload_file(
                &request.site_id,
                &path,
                html_document(&template).into_bytes(),
                "text/html",
            )
            .await?;

        tracing::info!(template_id = %id, site_id = %request.site_id, path = %path, "Template exported");
        self.audit
            .record(
                "template",
                id.0,
                AuditAction::Update,
                actor,
                json!({
                    "exported_to": { "site_id": request.site_id, "path": path, "item_id": item.id },
                    "version": template.current_version,
                }),
            )
            .await;

        Ok(ExportResult { path, item })
    }

    /// Post a notice about a published template to a channel
    pub async fn announce_template(
        &self,
        id: &TemplateId,
        request: AnnounceRequest,
        actor: Option<EmployeeId>,
    ) -> Result<GraphChatMessage, AppError> {
        self.ensure_configured()?;
        let template = self.template(id).await?;

        if template.status != TemplateStatus::Published {
            return Err(DomainError::Conflict(format!(
                "Template '{}' is {}, only published templates can be announced",
                template.slug, template.status
            ))
            .into());
        }

        let message = self
            .graph
            .post_channel_message(
                &request.team_id,
                &request.channel_id,
                &announcement(&template, request.message.as_deref()),
            )
            .await?;

        tracing::info!(template_id = %id, channel_id = %request.channel_id, "Template announced");
        self.audit
            .record(
                "template",
                id.0,
                AuditAction::Update,
                actor,
                json!({
                    "announced_in": { "team_id": request.team_id, "channel_id": request.channel_id },
                    "message_id": message.id,
                }),
            )
            .await;

        Ok(message)
    }

    async fn template(&self, id: &TemplateId) -> Result<Template, AppError> {
        self.templates
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Template {}", id)))
    }
}

/// Trim slashes and reject parent-directory segments
fn normalize_folder(folder: &str) -> Result<String, AppError> {
    let segments: Vec<&str> = folder
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if segments.iter().any(|s| *s == "." || *s == "..") {
        return Err(AppError::BadRequest(format!(
            "Folder '{}' may not contain '.' or '..' segments",
            folder
        )));
    }

    Ok(segments.join("/"))
}

/// Wrap stored template content in a standalone HTML document
fn html_document(template: &Template) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(&template.name),
        template.content
    )
}

fn announcement(template: &Template, message: Option<&str>) -> String {
    let mut html = String::new();
    if let Some(message) = message.map(str::trim).filter(|m| !m.is_empty()) {
        html.push_str(&format!("<p>{}</p>", escape_html(message)));
    }
    html.push_str(&format!(
        "<p>Template <b>{}</b> (version {}) is published and ready to use.</p>",
        escape_html(&template.name),
        template.current_version
    ));
    if let Some(description) = &template.description {
        html.push_str(&format!("<p>{}</p>", escape_html(description)));
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        test_template, InMemoryAuditLogRepository, InMemoryTemplateRepository, MockGraphClient,
    };

    type Service =
        IntegrationService<MockGraphClient, InMemoryTemplateRepository, InMemoryAuditLogRepository>;

    fn service(graph: MockGraphClient, templates: InMemoryTemplateRepository) -> (Service, Arc<MockGraphClient>) {
        let graph = Arc::new(graph);
        let service = IntegrationService::new(
            graph.clone(),
            Arc::new(templates),
            AuditService::new(Arc::new(InMemoryAuditLogRepository::new())),
        );
        (service, graph)
    }

    #[test]
    fn folders_are_normalized() {
        assert_eq!(normalize_folder("/Marketing//Flyers/").unwrap(), "Marketing/Flyers");
        assert_eq!(normalize_folder("").unwrap(), "");
        assert!(normalize_folder("Marketing/../Secrets").is_err());
    }

    #[test]
    fn document_escapes_title() {
        let mut template = test_template("Open <House>");
        template.content = "<p>{{ listing.address }}</p>".to_string();
        let doc = html_document(&template);
        assert!(doc.contains("<title>Open &lt;House&gt;</title>"));
        assert!(doc.contains("<p>{{ listing.address }}</p>"));
    }

    #[tokio::test]
    async fn unconfigured_graph_is_unavailable() {
        let (service, _) = service(MockGraphClient::unconfigured(), InMemoryTemplateRepository::new());

        let err = service.list_teams().await.unwrap_err();
        assert!(matches!(err, AppError::Graph(GraphError::NotConfigured)));
    }

    #[tokio::test]
    async fn export_uploads_slug_file_into_folder() {
        let template = test_template("Just Listed");
        let (service, graph) = service(
            MockGraphClient::new(),
            InMemoryTemplateRepository::new().with_template(template.clone()),
        );

        let result = service
            .export_template(
                &template.id,
                ExportRequest {
                    site_id: "site-1".to_string(),
                    folder: "/Templates/".to_string(),
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(result.path, "Templates/just-listed.html");
        let uploads = graph.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, "site-1");
        assert_eq!(uploads[0].1, "Templates/just-listed.html");
        assert!(uploads[0].2.starts_with("<!DOCTYPE html>"));
    }

    #[tokio::test]
    async fn announce_requires_published_template() {
        let mut template = test_template("Just Listed");
        let (service, graph) = service(
            MockGraphClient::new(),
            InMemoryTemplateRepository::new().with_template(template.clone()),
        );

        let request = || AnnounceRequest {
            team_id: "team-1".to_string(),
            channel_id: "chan-1".to_string(),
            message: Some("Fresh for spring".to_string()),
        };

        let err = service
            .announce_template(&template.id, request(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::Conflict(_))));
        assert!(graph.messages().is_empty());

        template.status = TemplateStatus::Published;
        let (service, graph) = service_published(template.clone());
        service
            .announce_template(&template.id, request(), None)
            .await
            .unwrap();
        let messages = graph.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].2.contains("Fresh for spring"));
        assert!(messages[0].2.contains("<b>Just Listed</b>"));
    }

    fn service_published(template: Template) -> (Service, Arc<MockGraphClient>) {
        service(
            MockGraphClient::new(),
            InMemoryTemplateRepository::new().with_template(template),
        )
    }

    #[tokio::test]
    async fn site_query_needs_search_or_hostname() {
        let (service, _) = service(MockGraphClient::new(), InMemoryTemplateRepository::new());

        let err = service.find_sites(&SiteQuery::default()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let sites = service
            .find_sites(&SiteQuery {
                hostname: Some("contoso.sharepoint.com".to_string()),
                path: Some("/sites/marketing".to_string()),
                search: None,
            })
            .await
            .unwrap();
        assert_eq!(sites.len(), 1);
    }
}
