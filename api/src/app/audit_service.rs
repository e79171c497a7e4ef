//! Audit trail
//!
//! Every service records its mutations here. Appending never fails the
//! caller: errors are logged and swallowed.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::domain::entities::{AuditAction, AuditFilter, AuditLog, EmployeeId, NewAuditLog, Page};
use crate::domain::ports::AuditLogRepository;
use crate::error::AppError;

/// Service for appending and reading audit entries
pub struct AuditService<A>
where
    A: AuditLogRepository,
{
    logs: Arc<A>,
}

impl<A> Clone for AuditService<A>
where
    A: AuditLogRepository,
{
    fn clone(&self) -> Self {
        Self {
            logs: self.logs.clone(),
        }
    }
}

impl<A> AuditService<A>
where
    A: AuditLogRepository,
{
    pub fn new(logs: Arc<A>) -> Self {
        Self { logs }
    }

    /// Append an entry, logging (not returning) any failure
    pub async fn record(
        &self,
        entity_type: &'static str,
        entity_id: Uuid,
        action: AuditAction,
        actor_id: Option<EmployeeId>,
        details: Value,
    ) {
        let entry = NewAuditLog {
            entity_type,
            entity_id,
            action,
            actor_id,
            details,
        };

        if let Err(e) = self.logs.append(&entry).await {
            tracing::warn!(
                error = %e,
                entity_type,
                entity_id = %entity_id,
                action = %action,
                "Failed to append audit entry"
            );
        }
    }

    /// List entries, newest first
    pub async fn list(&self, filter: &AuditFilter, page: Page) -> Result<Vec<AuditLog>, AppError> {
        Ok(self.logs.list(filter, page.clamped()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::InMemoryAuditLogRepository;
    use serde_json::json;

    #[tokio::test]
    async fn record_appends_entry() {
        let repo = Arc::new(InMemoryAuditLogRepository::new());
        let service = AuditService::new(repo.clone());
        let id = Uuid::new_v4();

        service
            .record("office", id, AuditAction::Create, None, json!({"code": "DAL"}))
            .await;

        let entries = service.list(&AuditFilter::default(), Page::default()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entity_type, "office");
        assert_eq!(entries[0].entity_id, id);
        assert_eq!(entries[0].details["code"], "DAL");
    }

    #[tokio::test]
    async fn record_swallows_failures() {
        let service = AuditService::new(Arc::new(InMemoryAuditLogRepository::failing()));

        // Must not panic or surface the error
        service
            .record("office", Uuid::new_v4(), AuditAction::Delete, None, json!({}))
            .await;
    }

    #[tokio::test]
    async fn list_filters_and_orders_newest_first() {
        let service = AuditService::new(Arc::new(InMemoryAuditLogRepository::new()));
        let template = Uuid::new_v4();

        service
            .record("template", template, AuditAction::Create, None, json!({}))
            .await;
        service
            .record("tag", Uuid::new_v4(), AuditAction::Create, None, json!({}))
            .await;
        service
            .record("template", template, AuditAction::Publish, None, json!({}))
            .await;

        let filter = AuditFilter {
            entity_type: Some("template".to_string()),
            entity_id: Some(template),
        };
        let entries = service.list(&filter, Page::default()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::Publish);
        assert_eq!(entries[1].action, AuditAction::Create);
    }
}
