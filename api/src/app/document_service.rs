//! Standalone sanitizer and Word conversion

use std::sync::Arc;

use super::catalog::ContentCatalog;
use crate::domain::ports::{LayoutPartialRepository, MergeFieldRepository};
use crate::error::AppError;
use crate::sanitizer::html::{self, SanitizeOptions, SanitizeReport};
use crate::sanitizer::word::docx_to_html;

/// Cleans caller HTML and converts `.docx` uploads, checking merge tokens
/// against the live catalogs
pub struct SanitizerService<M, P>
where
    M: MergeFieldRepository,
    P: LayoutPartialRepository,
{
    merge_fields: Arc<M>,
    partials: Arc<P>,
    max_html_bytes: usize,
    max_upload_bytes: usize,
}

impl<M, P> SanitizerService<M, P>
where
    M: MergeFieldRepository,
    P: LayoutPartialRepository,
{
    pub fn new(
        merge_fields: Arc<M>,
        partials: Arc<P>,
        max_html_bytes: usize,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            merge_fields,
            partials,
            max_html_bytes,
            max_upload_bytes,
        }
    }

    pub async fn sanitize(
        &self,
        input: &str,
        options: &SanitizeOptions,
    ) -> Result<SanitizeReport, AppError> {
        html::check_size(input.len(), self.max_html_bytes)?;
        self.clean(input, options).await
    }

    /// Convert a Word document to HTML, then sanitize it
    pub async fn convert(
        &self,
        bytes: &[u8],
        options: &SanitizeOptions,
    ) -> Result<SanitizeReport, AppError> {
        html::check_size(bytes.len(), self.max_upload_bytes)?;

        let converted = docx_to_html(bytes, self.max_html_bytes)?;
        tracing::debug!(
            docx_bytes = bytes.len(),
            html_bytes = converted.len(),
            "Word document converted"
        );
        html::check_size(converted.len(), self.max_html_bytes)?;

        self.clean(&converted, options).await
    }

    async fn clean(
        &self,
        input: &str,
        options: &SanitizeOptions,
    ) -> Result<SanitizeReport, AppError> {
        let catalog = ContentCatalog::load(&*self.merge_fields, &*self.partials).await?;
        let report = html::sanitize(input, options, Some(&catalog.names()));

        if !report.warnings.is_empty() {
            tracing::debug!(warnings = report.warnings.len(), "Sanitizer reported warnings");
        }

        Ok(report)
    }
}
