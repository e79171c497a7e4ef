//! Database schema management

pub mod migrations;

pub use migrations::{apply_migrations, latest_version};
