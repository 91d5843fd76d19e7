use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

use crate::repository::{RepositoryError, RepositoryResult};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Establish a blocking database connection
pub fn establish_connection(database_url: &str) -> Result<PgConnection, diesel::ConnectionError> {
  PgConnection::establish(database_url)
}

/// Apply pending embedded migrations; returns the versions that ran
pub async fn run_migrations(database_url: &str) -> RepositoryResult<Vec<String>> {
  let database_url = database_url.to_string();

  tokio::task::spawn_blocking(move || {
    let mut conn = establish_connection(&database_url)
      .map_err(|e| RepositoryError::PoolError(format!("Failed to connect to database: {}", e)))?;
    let applied = conn
      .run_pending_migrations(MIGRATIONS)
      .map_err(|e| RepositoryError::MigrationError(e.to_string()))?;

    let versions: Vec<String> = applied.iter().map(|v| v.to_string()).collect();
    info!(count = versions.len(), "Migrations applied");
    Ok(versions)
  })
  .await
  .map_err(|e| RepositoryError::QueryError(format!("Task join error: {}", e)))?
}
