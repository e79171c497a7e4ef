//! Audit log domain entity
//!
//! Append-only record of mutations made through the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::employee::EmployeeId;

entity_id!(
    /// Unique identifier for an audit entry
    AuditLogId
);

string_enum!(
    /// What happened to the audited entity
    AuditAction {
        Create => "create",
        Update => "update",
        Delete => "delete",
        Publish => "publish",
        Unpublish => "unpublish",
        Archive => "archive",
        Restore => "restore",
    }
);

/// A recorded mutation
#[derive(Debug, Clone, Serialize)]
pub struct AuditLog {
    pub id: AuditLogId,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub action: AuditAction,
    pub actor_id: Option<EmployeeId>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Data needed to append an audit entry
#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub entity_type: &'static str,
    pub entity_id: Uuid,
    pub action: AuditAction,
    pub actor_id: Option<EmployeeId>,
    pub details: serde_json::Value,
}

/// Filters for listing audit entries
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditLog) -> bool {
        self.entity_type
            .as_deref()
            .map_or(true, |t| entry.entity_type == t)
            && self.entity_id.map_or(true, |id| entry.entity_id == id)
    }
}
