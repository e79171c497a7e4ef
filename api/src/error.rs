//! Unified error types for the Document Hub API
//!
//! This module defines error types for each layer:
//! - `DomainError`: Core business logic and persistence errors
//! - `GraphError`: Microsoft Graph client errors
//! - `SanitizeError`: HTML / Word conversion input errors
//! - `AppError`: Application layer errors (wraps the above for HTTP responses)

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Domain layer errors - pure business logic errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Entity already exists: {0}")]
    AlreadyExists(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Microsoft Graph client errors
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Token request failed: {0}")]
    Token(String),

    #[error("Microsoft Graph is not configured")]
    NotConfigured,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Unauthorized - token rejected")]
    Unauthorized,

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// Errors raised while reading sanitizer / converter input
#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("Input is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("Not a Word document: {0}")]
    InvalidDocument(String),

    #[error("Document part missing: {0}")]
    MissingPart(String),

    #[error("Malformed document XML: {0}")]
    MalformedXml(String),
}

/// Application layer errors - used by HTTP handlers
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Sanitizer error: {0}")]
    Sanitize(#[from] SanitizeError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body for JSON responses
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            AppError::Domain(DomainError::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, "Not found", Some(msg.clone()))
            }
            AppError::Domain(DomainError::AlreadyExists(msg)) => {
                (StatusCode::CONFLICT, "Already exists", Some(msg.clone()))
            }
            AppError::Domain(DomainError::Validation(msg)) => (
                StatusCode::BAD_REQUEST,
                "Validation error",
                Some(msg.clone()),
            ),
            AppError::Domain(DomainError::Conflict(msg)) => {
                (StatusCode::CONFLICT, "Conflict", Some(msg.clone()))
            }
            AppError::Domain(DomainError::Database(msg)) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    None,
                )
            }
            AppError::Domain(DomainError::Internal(msg)) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    None,
                )
            }
            AppError::Graph(e) => {
                tracing::error!("Graph error: {}", e);
                match e {
                    GraphError::NotConfigured => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Microsoft Graph integration is not configured",
                        None,
                    ),
                    GraphError::NotFound(msg) => (
                        StatusCode::NOT_FOUND,
                        "Graph resource not found",
                        Some(msg.clone()),
                    ),
                    GraphError::RateLimited => {
                        (StatusCode::TOO_MANY_REQUESTS, "Rate limited", None)
                    }
                    GraphError::Api { status, message } => {
                        let http_status = match *status {
                            404 => StatusCode::NOT_FOUND,
                            403 => StatusCode::FORBIDDEN,
                            _ => StatusCode::BAD_GATEWAY,
                        };
                        (http_status, "Graph service error", Some(message.clone()))
                    }
                    _ => (StatusCode::BAD_GATEWAY, "Graph service error", None),
                }
            }
            AppError::Sanitize(e) => (
                StatusCode::BAD_REQUEST,
                "Unprocessable document",
                Some(e.to_string()),
            ),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "Bad request", Some(msg.clone()))
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized", None),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", Some(msg.clone())),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    None,
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = self.parts();

        let body = Json(ErrorResponse {
            error: error.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        match e.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(msg)) => {
                DomainError::AlreadyExists(msg)
            }
            Some(sea_orm::SqlErr::ForeignKeyConstraintViolation(msg)) => DomainError::Conflict(
                format!("Record is referenced by or references another record: {}", msg),
            ),
            _ => DomainError::Database(e.to_string()),
        }
    }
}
