//! PostgreSQL adapter for TerritoryRepository

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::domain::entities::territory::taken_codes_message;
use crate::domain::entities::{
    NewTerritory, OfficeId, Page, PostalCode, PostalCodeAssignment, Territory, TerritoryChanges,
    TerritoryId,
};
use crate::domain::ports::TerritoryRepository;
use crate::entity::{postal_codes, territories};
use crate::error::DomainError;

/// PostgreSQL implementation of TerritoryRepository
pub struct PostgresTerritoryRepository {
    db: DatabaseConnection,
}

impl PostgresTerritoryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Load assigned postal codes for each territory
async fn with_codes<C: ConnectionTrait>(
    db: &C,
    models: Vec<territories::Model>,
) -> Result<Vec<Territory>, DomainError> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let mut codes: HashMap<Uuid, Vec<String>> = HashMap::new();
    for row in postal_codes::Entity::find()
        .filter(postal_codes::Column::TerritoryId.is_in(ids))
        .order_by_asc(postal_codes::Column::Code)
        .all(db)
        .await?
    {
        if let Some(territory_id) = row.territory_id {
            codes.entry(territory_id).or_default().push(row.code);
        }
    }

    Ok(models
        .into_iter()
        .map(|m| {
            let postal_codes = codes.remove(&m.id).unwrap_or_default();
            to_territory(m, postal_codes)
        })
        .collect())
}

async fn with_code_list<C: ConnectionTrait>(
    db: &C,
    model: territories::Model,
) -> Result<Territory, DomainError> {
    with_codes(db, vec![model])
        .await?
        .pop()
        .ok_or_else(|| DomainError::Internal("Territory vanished while loading".to_string()))
}

#[async_trait]
impl TerritoryRepository for PostgresTerritoryRepository {
    async fn list(&self, page: Page) -> Result<Vec<Territory>, DomainError> {
        let models = territories::Entity::find()
            .order_by_asc(territories::Column::Name)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await?;

        with_codes(&self.db, models).await
    }

    async fn find_by_id(&self, id: &TerritoryId) -> Result<Option<Territory>, DomainError> {
        match territories::Entity::find_by_id(id.0).one(&self.db).await? {
            Some(model) => Ok(Some(with_code_list(&self.db, model).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Territory>, DomainError> {
        let result = territories::Entity::find()
            .filter(territories::Column::Name.eq(name))
            .one(&self.db)
            .await?;

        match result {
            Some(model) => Ok(Some(with_code_list(&self.db, model).await?)),
            None => Ok(None),
        }
    }

    async fn create(&self, territory: &NewTerritory) -> Result<Territory, DomainError> {
        let now = Utc::now().fixed_offset();

        let model = territories::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(territory.name.clone()),
            description: Set(territory.description.clone()),
            office_id: Set(territory.office_id.map(|id| id.0)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok(to_territory(model, Vec::new()))
    }

    async fn update(
        &self,
        id: &TerritoryId,
        changes: &TerritoryChanges,
    ) -> Result<Territory, DomainError> {
        let existing = territories::Entity::find_by_id(id.0)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Territory {}", id)))?;

        let mut active = existing.into_active_model();
        if let Some(name) = &changes.name {
            active.name = Set(name.clone());
        }
        if let Some(description) = &changes.description {
            active.description = Set(description.clone());
        }
        if let Some(office_id) = changes.office_id {
            active.office_id = Set(office_id.map(|id| id.0));
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        let model = active.update(&self.db).await?;
        with_code_list(&self.db, model).await
    }

    async fn delete(&self, id: &TerritoryId) -> Result<(), DomainError> {
        let result = territories::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            Err(DomainError::NotFound(format!("Territory {}", id)))
        } else {
            Ok(())
        }
    }

    async fn find_postal_codes(&self, codes: &[String]) -> Result<Vec<PostalCode>, DomainError> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let results = postal_codes::Entity::find()
            .filter(postal_codes::Column::Code.is_in(codes.iter().cloned()))
            .order_by_asc(postal_codes::Column::Code)
            .all(&self.db)
            .await?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn assign_postal_codes(
        &self,
        id: &TerritoryId,
        codes: &[String],
        force: bool,
    ) -> Result<PostalCodeAssignment, DomainError> {
        let txn = self.db.begin().await?;

        let existing = territories::Entity::find_by_id(id.0)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Territory {}", id)))?;

        // Rows are locked in code order so concurrent assigns queue up
        let moved: Vec<PostalCode> = postal_codes::Entity::find()
            .filter(postal_codes::Column::Code.is_in(codes.iter().cloned()))
            .order_by_asc(postal_codes::Column::Code)
            .lock_exclusive()
            .all(&txn)
            .await?
            .into_iter()
            .map(PostalCode::from)
            .filter(|pc| pc.territory_id.is_some_and(|owner| owner != *id))
            .collect();

        if !moved.is_empty() && !force {
            return Err(DomainError::Conflict(taken_codes_message(&moved)));
        }

        if !codes.is_empty() {
            let mut on_conflict = OnConflict::column(postal_codes::Column::Code)
                .update_column(postal_codes::Column::TerritoryId)
                .to_owned();
            if !force {
                // Rows inserted by another transaction after the lock above
                // keep their owner
                let owner = || Expr::col((postal_codes::Entity, postal_codes::Column::TerritoryId));
                on_conflict.action_and_where(owner().is_null().or(owner().eq(id.0)));
            }

            let written = postal_codes::Entity::insert_many(codes.iter().map(|code| {
                postal_codes::ActiveModel {
                    code: Set(code.clone()),
                    territory_id: Set(Some(id.0)),
                    city: Set(None),
                    state: Set(None),
                }
            }))
            .on_conflict(on_conflict)
            .exec_without_returning(&txn)
            .await?;

            if written < codes.len() as u64 {
                let taken: Vec<PostalCode> = postal_codes::Entity::find()
                    .filter(postal_codes::Column::Code.is_in(codes.iter().cloned()))
                    .filter(postal_codes::Column::TerritoryId.ne(id.0))
                    .order_by_asc(postal_codes::Column::Code)
                    .all(&txn)
                    .await?
                    .into_iter()
                    .map(PostalCode::from)
                    .collect();
                return Err(DomainError::Conflict(taken_codes_message(&taken)));
            }
        }

        let mut active = existing.into_active_model();
        active.updated_at = Set(Utc::now().fixed_offset());
        let model = active.update(&txn).await?;

        let territory = with_code_list(&txn, model).await?;
        txn.commit().await?;

        Ok(PostalCodeAssignment { territory, moved })
    }

    async fn remove_postal_code(
        &self,
        id: &TerritoryId,
        code: &str,
    ) -> Result<bool, DomainError> {
        let result = postal_codes::Entity::update_many()
            .col_expr(
                postal_codes::Column::TerritoryId,
                Expr::value(Option::<Uuid>::None),
            )
            .filter(postal_codes::Column::Code.eq(code))
            .filter(postal_codes::Column::TerritoryId.eq(id.0))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

fn to_territory(model: territories::Model, postal_codes: Vec<String>) -> Territory {
    Territory {
        id: TerritoryId(model.id),
        name: model.name,
        description: model.description,
        office_id: model.office_id.map(OfficeId),
        postal_codes,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

/// Convert SeaORM model to domain entity
impl From<postal_codes::Model> for PostalCode {
    fn from(model: postal_codes::Model) -> Self {
        PostalCode {
            code: model.code,
            territory_id: model.territory_id.map(TerritoryId),
            city: model.city,
            state: model.state,
        }
    }
}
