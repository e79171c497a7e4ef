//! Content library service
//!
//! Merge fields, code patterns and layout partials. Snippets and partial
//! content are sanitized like template content before they are stored.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use super::audit_service::AuditService;
use crate::domain::entities::content::{validate_merge_key, validate_partial_name};
use crate::domain::entities::{
    optional_text, required_text, AuditAction, CodePattern, CodePatternChanges, CodePatternId,
    EmployeeId, LayoutPartial, LayoutPartialChanges, LayoutPartialId, MergeField,
    MergeFieldChanges, MergeFieldId, NewCodePattern, NewLayoutPartial, NewMergeField, Page,
};
use crate::domain::ports::{
    AuditLogRepository, CodePatternRepository, LayoutPartialRepository, MergeFieldRepository,
};
use crate::error::{AppError, DomainError};
use crate::sanitizer::html::{self, SanitizeOptions, SanitizeReport, SanitizeWarning};

/// A stored library item with the warnings raised while cleaning it
#[derive(Debug, Serialize)]
pub struct Saved<T> {
    #[serde(flatten)]
    pub item: T,
    pub warnings: Vec<SanitizeWarning>,
}

/// Service for the merge-field, code-pattern and partial catalogs
pub struct ContentLibraryService<M, CP, P, A>
where
    M: MergeFieldRepository,
    CP: CodePatternRepository,
    P: LayoutPartialRepository,
    A: AuditLogRepository,
{
    merge_fields: Arc<M>,
    patterns: Arc<CP>,
    partials: Arc<P>,
    audit: AuditService<A>,
    max_html_bytes: usize,
}

impl<M, CP, P, A> ContentLibraryService<M, CP, P, A>
where
    M: MergeFieldRepository,
    CP: CodePatternRepository,
    P: LayoutPartialRepository,
    A: AuditLogRepository,
{
    pub fn new(
        merge_fields: Arc<M>,
        patterns: Arc<CP>,
        partials: Arc<P>,
        audit: AuditService<A>,
        max_html_bytes: usize,
    ) -> Self {
        Self {
            merge_fields,
            patterns,
            partials,
            audit,
            max_html_bytes,
        }
    }

    fn clean(&self, content: &str) -> Result<SanitizeReport, AppError> {
        html::check_size(content.len(), self.max_html_bytes)?;
        Ok(html::sanitize(content, &SanitizeOptions::default(), None))
    }

    // ------------------------------------------------------------------
    // Merge fields
    // ------------------------------------------------------------------

    pub async fn list_merge_fields(&self, page: Page) -> Result<Vec<MergeField>, AppError> {
        Ok(self.merge_fields.list(page.clamped()).await?)
    }

    pub async fn get_merge_field(&self, id: &MergeFieldId) -> Result<MergeField, AppError> {
        self.merge_fields
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Merge field {}", id)))
    }

    pub async fn create_merge_field(
        &self,
        new: NewMergeField,
        actor: Option<EmployeeId>,
    ) -> Result<MergeField, AppError> {
        let key = validate_merge_key(&new.key).map_err(DomainError::Validation)?;
        let label = required_text("Label", &new.label, 200).map_err(DomainError::Validation)?;

        if self.merge_fields.find_by_key(&key).await?.is_some() {
            return Err(DomainError::AlreadyExists(format!(
                "Merge field '{}' already exists",
                key
            ))
            .into());
        }

        let field = self
            .merge_fields
            .create(&NewMergeField {
                key,
                label,
                description: optional_text(new.description.as_deref()),
                sample_value: new.sample_value,
                data_type: new.data_type,
            })
            .await?;

        tracing::info!(merge_field_id = %field.id, key = %field.key, "Merge field created");
        self.audit
            .record(
                "merge_field",
                field.id.0,
                AuditAction::Create,
                actor,
                json!({ "key": field.key, "data_type": field.data_type }),
            )
            .await;

        Ok(field)
    }

    pub async fn update_merge_field(
        &self,
        id: &MergeFieldId,
        mut changes: MergeFieldChanges,
        actor: Option<EmployeeId>,
    ) -> Result<MergeField, AppError> {
        self.get_merge_field(id).await?;

        if let Some(label) = &changes.label {
            changes.label =
                Some(required_text("Label", label, 200).map_err(DomainError::Validation)?);
        }
        changes.description = changes
            .description
            .map(|d| optional_text(d.as_deref()));

        let field = self.merge_fields.update(id, &changes).await?;

        self.audit
            .record(
                "merge_field",
                id.0,
                AuditAction::Update,
                actor,
                json!({ "key": field.key }),
            )
            .await;

        Ok(field)
    }

    pub async fn delete_merge_field(
        &self,
        id: &MergeFieldId,
        actor: Option<EmployeeId>,
    ) -> Result<(), AppError> {
        let field = self.get_merge_field(id).await?;
        self.merge_fields.delete(id).await?;

        tracing::info!(merge_field_id = %id, "Merge field deleted");
        self.audit
            .record(
                "merge_field",
                id.0,
                AuditAction::Delete,
                actor,
                json!({ "key": field.key }),
            )
            .await;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Code patterns
    // ------------------------------------------------------------------

    pub async fn list_code_patterns(&self, page: Page) -> Result<Vec<CodePattern>, AppError> {
        Ok(self.patterns.list(page.clamped()).await?)
    }

    pub async fn get_code_pattern(&self, id: &CodePatternId) -> Result<CodePattern, AppError> {
        self.patterns
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Code pattern {}", id)))
    }

    pub async fn create_code_pattern(
        &self,
        new: NewCodePattern,
        actor: Option<EmployeeId>,
    ) -> Result<Saved<CodePattern>, AppError> {
        let name = required_text("Name", &new.name, 200).map_err(DomainError::Validation)?;
        if self.patterns.find_by_name(&name).await?.is_some() {
            return Err(DomainError::AlreadyExists(format!(
                "Code pattern '{}' already exists",
                name
            ))
            .into());
        }
        let report = self.clean(&new.snippet)?;

        let pattern = self
            .patterns
            .create(&NewCodePattern {
                name,
                description: optional_text(new.description.as_deref()),
                snippet: report.html,
            })
            .await?;

        tracing::info!(code_pattern_id = %pattern.id, name = %pattern.name, "Code pattern created");
        self.audit
            .record(
                "code_pattern",
                pattern.id.0,
                AuditAction::Create,
                actor,
                json!({ "name": pattern.name }),
            )
            .await;

        Ok(Saved {
            item: pattern,
            warnings: report.warnings,
        })
    }

    pub async fn update_code_pattern(
        &self,
        id: &CodePatternId,
        mut changes: CodePatternChanges,
        actor: Option<EmployeeId>,
    ) -> Result<Saved<CodePattern>, AppError> {
        self.get_code_pattern(id).await?;

        if let Some(name) = &changes.name {
            let name = required_text("Name", name, 200).map_err(DomainError::Validation)?;
            if let Some(other) = self.patterns.find_by_name(&name).await? {
                if other.id != *id {
                    return Err(DomainError::AlreadyExists(format!(
                        "Code pattern '{}' already exists",
                        name
                    ))
                    .into());
                }
            }
            changes.name = Some(name);
        }
        changes.description = changes
            .description
            .map(|d| optional_text(d.as_deref()));

        let mut warnings = Vec::new();
        if let Some(snippet) = &changes.snippet {
            let report = self.clean(snippet)?;
            changes.snippet = Some(report.html);
            warnings = report.warnings;
        }

        let pattern = self.patterns.update(id, &changes).await?;

        self.audit
            .record(
                "code_pattern",
                id.0,
                AuditAction::Update,
                actor,
                json!({ "name": pattern.name, "snippet_changed": changes.snippet.is_some() }),
            )
            .await;

        Ok(Saved {
            item: pattern,
            warnings,
        })
    }

    pub async fn delete_code_pattern(
        &self,
        id: &CodePatternId,
        actor: Option<EmployeeId>,
    ) -> Result<(), AppError> {
        let pattern = self.get_code_pattern(id).await?;
        self.patterns.delete(id).await?;

        self.audit
            .record(
                "code_pattern",
                id.0,
                AuditAction::Delete,
                actor,
                json!({ "name": pattern.name }),
            )
            .await;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Layout partials
    // ------------------------------------------------------------------

    pub async fn list_partials(&self, page: Page) -> Result<Vec<LayoutPartial>, AppError> {
        Ok(self.partials.list(page.clamped()).await?)
    }

    pub async fn get_partial(&self, id: &LayoutPartialId) -> Result<LayoutPartial, AppError> {
        self.partials
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Layout partial {}", id)))
    }

    pub async fn create_partial(
        &self,
        new: NewLayoutPartial,
        actor: Option<EmployeeId>,
    ) -> Result<Saved<LayoutPartial>, AppError> {
        let name = validate_partial_name(&new.name).map_err(DomainError::Validation)?;
        if self.partials.find_by_name(&name).await?.is_some() {
            return Err(DomainError::AlreadyExists(format!(
                "Layout partial '{}' already exists",
                name
            ))
            .into());
        }
        let report = self.clean(&new.content)?;

        let partial = self
            .partials
            .create(&NewLayoutPartial {
                name,
                kind: new.kind,
                content: report.html,
            })
            .await?;

        tracing::info!(partial_id = %partial.id, name = %partial.name, "Layout partial created");
        self.audit
            .record(
                "layout_partial",
                partial.id.0,
                AuditAction::Create,
                actor,
                json!({ "name": partial.name, "kind": partial.kind }),
            )
            .await;

        Ok(Saved {
            item: partial,
            warnings: report.warnings,
        })
    }

    pub async fn update_partial(
        &self,
        id: &LayoutPartialId,
        mut changes: LayoutPartialChanges,
        actor: Option<EmployeeId>,
    ) -> Result<Saved<LayoutPartial>, AppError> {
        self.get_partial(id).await?;

        if let Some(name) = &changes.name {
            let name = validate_partial_name(name).map_err(DomainError::Validation)?;
            if let Some(other) = self.partials.find_by_name(&name).await? {
                if other.id != *id {
                    return Err(DomainError::AlreadyExists(format!(
                        "Layout partial '{}' already exists",
                        name
                    ))
                    .into());
                }
            }
            changes.name = Some(name);
        }

        let mut warnings = Vec::new();
        if let Some(content) = &changes.content {
            let report = self.clean(content)?;
            changes.content = Some(report.html);
            warnings = report.warnings;
        }

        let partial = self.partials.update(id, &changes).await?;

        self.audit
            .record(
                "layout_partial",
                id.0,
                AuditAction::Update,
                actor,
                json!({ "name": partial.name, "content_changed": changes.content.is_some() }),
            )
            .await;

        Ok(Saved {
            item: partial,
            warnings,
        })
    }

    pub async fn delete_partial(
        &self,
        id: &LayoutPartialId,
        actor: Option<EmployeeId>,
    ) -> Result<(), AppError> {
        let partial = self.get_partial(id).await?;
        self.partials.delete(id).await?;

        self.audit
            .record(
                "layout_partial",
                id.0,
                AuditAction::Delete,
                actor,
                json!({ "name": partial.name }),
            )
            .await;

        Ok(())
    }
}
