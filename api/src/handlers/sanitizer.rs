//! Sanitizer handlers
//!
//! Stateless HTML cleaning and `.docx` conversion. Both endpoints are rate
//! limited and check merge tokens against the live catalogs.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::sanitizer::{SanitizeOptions, SanitizeReport};
use crate::AppState;

/// Request body for POST /sanitizer/sanitize
#[derive(Debug, Deserialize)]
pub struct SanitizeRequest {
    pub html: String,
    #[serde(default)]
    pub options: SanitizeOptions,
}

/// POST /sanitizer/sanitize
pub async fn sanitize_html(
    State(state): State<AppState>,
    Json(request): Json<SanitizeRequest>,
) -> Result<Json<SanitizeReport>, AppError> {
    Ok(Json(
        state
            .sanitizer_service
            .sanitize(&request.html, &request.options)
            .await?,
    ))
}

/// POST /sanitizer/convert
///
/// Multipart upload: the document in field `file`; optional text fields
/// `allow_style_blocks` and `strip_word_artifacts` override the defaults.
pub async fn convert_docx(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SanitizeReport>, AppError> {
    let mut document = None;
    let mut options = SanitizeOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
                document = Some(bytes);
            }
            Some(name @ ("allow_style_blocks" | "strip_word_artifacts")) => {
                let name = name.to_string();
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
                let value = parse_flag(&name, &text)?;
                if name == "allow_style_blocks" {
                    options.allow_style_blocks = value;
                } else {
                    options.strip_word_artifacts = value;
                }
            }
            _ => {}
        }
    }

    let document = document
        .ok_or_else(|| AppError::BadRequest("Missing multipart field `file`".to_string()))?;

    tracing::debug!(bytes = document.len(), "Converting uploaded document");
    Ok(Json(
        state
            .sanitizer_service
            .convert(&document, &options)
            .await?,
    ))
}

fn parse_flag(name: &str, value: &str) -> Result<bool, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        other => Err(AppError::BadRequest(format!(
            "Field `{}` must be a boolean, got '{}'",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_request_uses_default_options() {
        let request: SanitizeRequest = serde_json::from_str(r#"{"html": "<p>x</p>"}"#).unwrap();
        assert_eq!(request.options, SanitizeOptions::default());

        let request: SanitizeRequest = serde_json::from_str(
            r#"{"html": "<p>x</p>", "options": {"allow_style_blocks": false}}"#,
        )
        .unwrap();
        assert!(!request.options.allow_style_blocks);
        assert!(request.options.strip_word_artifacts);
    }

    #[test]
    fn flags_accept_form_spellings() {
        assert!(parse_flag("f", "ON").unwrap());
        assert!(!parse_flag("f", "0").unwrap());
        assert!(matches!(parse_flag("f", "maybe"), Err(AppError::BadRequest(_))));
    }
}
