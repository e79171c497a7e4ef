//! Template service
//!
//! Template CRUD, status workflow, versions, preview rendering and content
//! validation. Content is sanitized before it is stored.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use super::audit_service::AuditService;
use super::catalog::ContentCatalog;
use crate::domain::entities::template::{is_valid_slug, slugify};
use crate::domain::entities::{
    optional_text, required_text, AuditAction, CategoryId, EmployeeId, NewTemplate, Page, TagId,
    Template, TemplateChanges, TemplateFilter, TemplateId, TemplateStatus, TemplateVersion,
};
use crate::domain::ports::{
    AuditLogRepository, CategoryRepository, LayoutPartialRepository, MergeFieldRepository,
    TagRepository, TemplateRepository,
};
use crate::error::{AppError, DomainError};
use crate::sanitizer::html::{self, SanitizeOptions, SanitizeReport, SanitizeWarning};
use crate::sanitizer::merge::{self, Token};

const ENTITY: &str = "template";

/// A stored template with the warnings raised while cleaning its content
#[derive(Debug, Serialize)]
pub struct SavedTemplate {
    #[serde(flatten)]
    pub template: Template,
    pub warnings: Vec<SanitizeWarning>,
}

/// Rendered template content
#[derive(Debug, Serialize)]
pub struct Preview {
    pub html: String,
    /// Merge keys with neither a supplied value nor a sample
    pub unresolved_fields: Vec<String>,
}

/// Service for managing templates
pub struct TemplateService<T, G, C, M, P, A>
where
    T: TemplateRepository,
    G: TagRepository,
    C: CategoryRepository,
    M: MergeFieldRepository,
    P: LayoutPartialRepository,
    A: AuditLogRepository,
{
    templates: Arc<T>,
    tags: Arc<G>,
    categories: Arc<C>,
    merge_fields: Arc<M>,
    partials: Arc<P>,
    audit: AuditService<A>,
    max_html_bytes: usize,
}

impl<T, G, C, M, P, A> TemplateService<T, G, C, M, P, A>
where
    T: TemplateRepository,
    G: TagRepository,
    C: CategoryRepository,
    M: MergeFieldRepository,
    P: LayoutPartialRepository,
    A: AuditLogRepository,
{
    pub fn new(
        templates: Arc<T>,
        tags: Arc<G>,
        categories: Arc<C>,
        merge_fields: Arc<M>,
        partials: Arc<P>,
        audit: AuditService<A>,
        max_html_bytes: usize,
    ) -> Self {
        Self {
            templates,
            tags,
            categories,
            merge_fields,
            partials,
            audit,
            max_html_bytes,
        }
    }

    pub async fn list(
        &self,
        filter: &TemplateFilter,
        page: Page,
    ) -> Result<Vec<Template>, AppError> {
        Ok(self.templates.list(filter, page.clamped()).await?)
    }

    pub async fn get(&self, id: &TemplateId) -> Result<Template, AppError> {
        self.templates
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Template {}", id)))
    }

    /// Create a template and its first version
    pub async fn create(
        &self,
        new: NewTemplate,
        actor: Option<EmployeeId>,
    ) -> Result<SavedTemplate, AppError> {
        let name = required_text("Name", &new.name, 200).map_err(DomainError::Validation)?;
        html::check_size(new.content.len(), self.max_html_bytes)?;

        let slug = match new.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) if is_valid_slug(slug) => slug.to_string(),
            Some(slug) => {
                return Err(DomainError::Validation(format!(
                    "Slug '{}' must be lowercase letters and digits separated by single dashes",
                    slug
                ))
                .into())
            }
            None => slugify(&name),
        };
        if slug.is_empty() {
            return Err(DomainError::Validation(
                "Name must contain at least one letter or digit".to_string(),
            )
            .into());
        }
        if self.templates.find_by_slug(&slug).await?.is_some() {
            return Err(DomainError::AlreadyExists(format!(
                "Template with slug '{}' already exists",
                slug
            ))
            .into());
        }

        let tag_ids = dedup(new.tag_ids);
        let category_ids = dedup(new.category_ids);
        self.ensure_taxonomy(&tag_ids, &category_ids).await?;

        let report = self.clean(&new.content).await?;

        let template = self
            .templates
            .create(
                &NewTemplate {
                    name,
                    slug: Some(slug.clone()),
                    description: optional_text(new.description.as_deref()),
                    content: report.html,
                    tag_ids,
                    category_ids,
                    created_by: actor,
                },
                &slug,
            )
            .await?;

        tracing::info!(template_id = %template.id, slug = %template.slug, "Template created");
        self.audit
            .record(
                ENTITY,
                template.id.0,
                AuditAction::Create,
                actor,
                json!({ "slug": template.slug, "version": template.current_version }),
            )
            .await;

        Ok(SavedTemplate {
            template,
            warnings: report.warnings,
        })
    }

    /// Apply a partial update; new content becomes the next version
    pub async fn update(
        &self,
        id: &TemplateId,
        mut changes: TemplateChanges,
        actor: Option<EmployeeId>,
    ) -> Result<SavedTemplate, AppError> {
        if changes.is_empty() {
            return Err(AppError::BadRequest("No changes supplied".to_string()));
        }
        if let Some(content) = &changes.content {
            html::check_size(content.len(), self.max_html_bytes)?;
        }
        self.get(id).await?;

        if let Some(name) = &changes.name {
            changes.name =
                Some(required_text("Name", name, 200).map_err(DomainError::Validation)?);
        }
        changes.description = changes
            .description
            .map(|d| optional_text(d.as_deref()));
        changes.change_note = optional_text(changes.change_note.as_deref());
        changes.tag_ids = changes.tag_ids.map(dedup);
        changes.category_ids = changes.category_ids.map(dedup);
        self.ensure_taxonomy(
            changes.tag_ids.as_deref().unwrap_or_default(),
            changes.category_ids.as_deref().unwrap_or_default(),
        )
        .await?;

        let mut warnings = Vec::new();
        if let Some(content) = &changes.content {
            let report = self.clean(content).await?;
            changes.content = Some(report.html);
            warnings = report.warnings;
        }
        changes.updated_by = actor;

        let template = self.templates.update(id, &changes).await?;

        tracing::info!(
            template_id = %template.id,
            version = template.current_version,
            "Template updated"
        );
        self.audit
            .record(
                ENTITY,
                template.id.0,
                AuditAction::Update,
                actor,
                json!({
                    "fields": changed_fields(&changes),
                    "version": template.current_version,
                }),
            )
            .await;

        Ok(SavedTemplate { template, warnings })
    }

    pub async fn delete(&self, id: &TemplateId, actor: Option<EmployeeId>) -> Result<(), AppError> {
        let template = self.get(id).await?;
        self.templates.delete(id).await?;

        tracing::info!(template_id = %id, "Template deleted");
        self.audit
            .record(
                ENTITY,
                id.0,
                AuditAction::Delete,
                actor,
                json!({ "slug": template.slug }),
            )
            .await;

        Ok(())
    }

    /// Move a template through the draft / published / archived workflow
    pub async fn set_status(
        &self,
        id: &TemplateId,
        status: TemplateStatus,
        actor: Option<EmployeeId>,
    ) -> Result<Template, AppError> {
        let current = self.get(id).await?;
        if !current.status.can_transition_to(status) {
            return Err(DomainError::Conflict(format!(
                "Cannot move template from {} to {}",
                current.status, status
            ))
            .into());
        }

        let template = self.templates.set_status(id, status).await?;

        tracing::info!(template_id = %id, from = %current.status, to = %status, "Template status changed");
        self.audit
            .record(
                ENTITY,
                id.0,
                current.status.transition_action(status),
                actor,
                json!({ "from": current.status, "to": status }),
            )
            .await;

        Ok(template)
    }

    /// Versions newest first
    pub async fn list_versions(&self, id: &TemplateId) -> Result<Vec<TemplateVersion>, AppError> {
        self.get(id).await?;
        Ok(self.templates.list_versions(id).await?)
    }

    pub async fn get_version(
        &self,
        id: &TemplateId,
        version_number: i32,
    ) -> Result<TemplateVersion, AppError> {
        self.templates
            .find_version(id, version_number)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Version {} of template {}", version_number, id))
            })
    }

    /// Write a new version carrying the content of an older one
    pub async fn restore_version(
        &self,
        id: &TemplateId,
        version_number: i32,
        actor: Option<EmployeeId>,
    ) -> Result<Template, AppError> {
        let version = self.get_version(id, version_number).await?;

        let changes = TemplateChanges {
            content: Some(version.content),
            change_note: Some(format!("Restored from version {}", version_number)),
            updated_by: actor,
            ..Default::default()
        };
        let template = self.templates.update(id, &changes).await?;

        tracing::info!(
            template_id = %id,
            restored_from = version_number,
            version = template.current_version,
            "Template version restored"
        );
        self.audit
            .record(
                ENTITY,
                id.0,
                AuditAction::Update,
                actor,
                json!({
                    "restored_from": version_number,
                    "version": template.current_version,
                }),
            )
            .await;

        Ok(template)
    }

    /// Render a template with caller values, falling back to catalog samples
    pub async fn preview(
        &self,
        id: &TemplateId,
        values: HashMap<String, String>,
    ) -> Result<Preview, AppError> {
        let template = self.get(id).await?;
        let catalog = ContentCatalog::load(&*self.merge_fields, &*self.partials).await?;

        let html = merge::render(&template.content, &catalog.render_context(values));

        let mut unresolved_fields: Vec<String> = merge::scan(&html)
            .into_iter()
            .filter_map(|span| match span.token {
                Token::Field(key) => Some(key.to_string()),
                _ => None,
            })
            .collect();
        unresolved_fields.sort();
        unresolved_fields.dedup();

        Ok(Preview {
            html,
            unresolved_fields,
        })
    }

    /// Check stored content against the current catalogs
    pub async fn validate(&self, id: &TemplateId) -> Result<SanitizeReport, AppError> {
        let template = self.get(id).await?;
        let catalog = ContentCatalog::load(&*self.merge_fields, &*self.partials).await?;

        Ok(html::sanitize(
            &template.content,
            &SanitizeOptions::default(),
            Some(&catalog.names()),
        ))
    }

    async fn clean(&self, content: &str) -> Result<SanitizeReport, AppError> {
        html::check_size(content.len(), self.max_html_bytes)?;
        let catalog = ContentCatalog::load(&*self.merge_fields, &*self.partials).await?;

        Ok(html::sanitize(
            content,
            &SanitizeOptions::default(),
            Some(&catalog.names()),
        ))
    }

    async fn ensure_taxonomy(
        &self,
        tag_ids: &[TagId],
        category_ids: &[CategoryId],
    ) -> Result<(), AppError> {
        if !tag_ids.is_empty() {
            let missing = self.tags.missing(tag_ids).await?;
            if !missing.is_empty() {
                return Err(DomainError::Validation(format!(
                    "Unknown tag ids: {}",
                    join_ids(&missing)
                ))
                .into());
            }
        }

        if !category_ids.is_empty() {
            let missing = self.categories.missing(category_ids).await?;
            if !missing.is_empty() {
                return Err(DomainError::Validation(format!(
                    "Unknown category ids: {}",
                    join_ids(&missing)
                ))
                .into());
            }
        }

        Ok(())
    }
}

fn dedup<I: Ord>(mut ids: Vec<I>) -> Vec<I> {
    ids.sort();
    ids.dedup();
    ids
}

fn join_ids<I: std::fmt::Display>(ids: &[I]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn changed_fields(changes: &TemplateChanges) -> Vec<&'static str> {
    [
        ("name", changes.name.is_some()),
        ("description", changes.description.is_some()),
        ("content", changes.content.is_some()),
        ("tag_ids", changes.tag_ids.is_some()),
        ("category_ids", changes.category_ids.is_some()),
    ]
    .into_iter()
    .filter_map(|(field, changed)| changed.then_some(field))
    .collect()
}
