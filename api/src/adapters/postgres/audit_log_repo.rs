//! PostgreSQL adapter for AuditLogRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::domain::entities::{
    AuditAction, AuditFilter, AuditLog, AuditLogId, EmployeeId, NewAuditLog, Page,
};
use crate::domain::ports::AuditLogRepository;
use crate::entity::audit_logs;
use crate::error::DomainError;

/// PostgreSQL implementation of AuditLogRepository
pub struct PostgresAuditLogRepository {
    db: DatabaseConnection,
}

impl PostgresAuditLogRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn append(&self, entry: &NewAuditLog) -> Result<AuditLog, DomainError> {
        let model = audit_logs::ActiveModel {
            id: Set(Uuid::new_v4()),
            entity_type: Set(entry.entity_type.to_string()),
            entity_id: Set(entry.entity_id),
            action: Set(entry.action.to_string()),
            actor_id: Set(entry.actor_id.map(|id| id.0)),
            details: Set(entry.details.clone()),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(&self.db)
        .await?;

        Ok(model.into())
    }

    async fn list(&self, filter: &AuditFilter, page: Page) -> Result<Vec<AuditLog>, DomainError> {
        let mut query = audit_logs::Entity::find();

        if let Some(entity_type) = &filter.entity_type {
            query = query.filter(audit_logs::Column::EntityType.eq(entity_type.as_str()));
        }
        if let Some(entity_id) = filter.entity_id {
            query = query.filter(audit_logs::Column::EntityId.eq(entity_id));
        }

        let results = query
            .order_by_desc(audit_logs::Column::CreatedAt)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }
}

/// Convert SeaORM model to domain entity
impl From<audit_logs::Model> for AuditLog {
    fn from(model: audit_logs::Model) -> Self {
        AuditLog {
            id: AuditLogId(model.id),
            entity_type: model.entity_type,
            entity_id: model.entity_id,
            action: model.action.parse().unwrap_or(AuditAction::Update),
            actor_id: model.actor_id.map(EmployeeId),
            details: model.details,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
