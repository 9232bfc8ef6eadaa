//! Database configuration module.
//!
//! Handles connecting to the backend database and creating all tables from the
//! entity definitions with `Schema::create_table_from_entity`, so the schema always
//! matches the Rust models.

use crate::entities::{
    Booking, Collector, MarketRate, Profile, ScrapCategory, Transaction, UserRoleEntity,
};
use crate::errors::{Error, Result};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;
use tracing::{debug, info};

/// Establishes a connection to the database at `database_url`.
///
/// For a file-backed `SQLite` URL the parent directory is created first.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database at {database_url}");
    if let Some(parent) = sqlite_parent_dir(database_url) {
        std::fs::create_dir_all(parent).map_err(|e| Error::Config {
            message: format!("cannot create database directory {}: {e}", parent.display()),
        })?;
    }
    Database::connect(database_url).await.map_err(Into::into)
}

fn sqlite_parent_dir(database_url: &str) -> Option<&Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or_default();
    Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
}

/// Creates all tables if they do not exist yet.
///
/// Parent tables are created before the tables holding foreign keys to them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut statements = vec![
        schema.create_table_from_entity(Profile),
        schema.create_table_from_entity(ScrapCategory),
        schema.create_table_from_entity(Collector),
        schema.create_table_from_entity(UserRoleEntity),
        schema.create_table_from_entity(Booking),
        schema.create_table_from_entity(MarketRate),
        schema.create_table_from_entity(Transaction),
    ];

    for statement in &mut statements {
        db.execute(builder.build(statement.if_not_exists())).await?;
    }

    info!("Database tables ensured ({} tables)", statements.len());
    Ok(())
}
