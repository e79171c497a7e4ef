//! PostgreSQL migration registry and executor.
//!
//! Migrations are plain SQL files applied in version order inside a single
//! transaction. Applied versions are recorded in `schema_migrations`.

use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr, Statement, TransactionTrait,
};
use thiserror::Error;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: i32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "templates",
        sql: include_str!("0001_templates.sql"),
    },
    Migration {
        version: 2,
        name: "content_library",
        sql: include_str!("0002_content_library.sql"),
    },
    Migration {
        version: 3,
        name: "organization",
        sql: include_str!("0003_organization.sql"),
    },
    Migration {
        version: 4,
        name: "assets_listings",
        sql: include_str!("0004_assets_listings.sql"),
    },
    Migration {
        version: 5,
        name: "checklists_territories",
        sql: include_str!("0005_checklists_territories.sql"),
    },
];

const CREATE_TRACKING_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Database schema version {db_version} is newer than supported version {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: i32,
        latest_supported: i32,
    },
}

/// Latest migration version known by this binary
pub fn latest_version() -> i32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Apply every pending migration. Returns the number applied.
pub async fn apply_migrations(db: &DatabaseConnection) -> Result<usize, MigrationError> {
    db.execute_unprepared(CREATE_TRACKING_TABLE).await?;

    let current = current_version(db).await?;
    let latest = latest_version();

    if current > latest {
        return Err(MigrationError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }

    let pending = pending_migrations(current);
    if pending.is_empty() {
        tracing::debug!(version = current, "Schema is up to date");
        return Ok(0);
    }

    let txn = db.begin().await?;
    for migration in pending {
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        txn.execute_unprepared(migration.sql).await?;
        txn.execute(Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "INSERT INTO schema_migrations (version, name) VALUES ($1, $2)",
            [migration.version.into(), migration.name.into()],
        ))
        .await?;
    }
    txn.commit().await?;

    Ok(pending.len())
}

async fn current_version(db: &DatabaseConnection) -> Result<i32, MigrationError> {
    let row = db
        .query_one(Statement::from_string(
            DatabaseBackend::Postgres,
            "SELECT COALESCE(MAX(version), 0) AS version FROM schema_migrations",
        ))
        .await?;

    match row {
        Some(row) => Ok(row.try_get::<i32>("", "version")?),
        None => Ok(0),
    }
}

fn pending_migrations(current: i32) -> &'static [Migration] {
    let start = MIGRATIONS
        .iter()
        .position(|m| m.version > current)
        .unwrap_or(MIGRATIONS.len());
    &MIGRATIONS[start..]
}
