pub mod schema;

use color_eyre::{eyre::eyre, Result};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::time::Duration;

/// Shared pool of SQLite connections backing the cache tables.
pub type Pool = r2d2::Pool<SqliteConnectionManager>;

const MAX_CONNECTIONS: u32 = 8;

/// Open or create the database at `path` and run migrations.
pub fn open(path: &Path) -> Result<Pool> {
  // Ensure parent directory exists
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)
      .map_err(|e| eyre!("Failed to create database directory: {}", e))?;
  }

  let manager = configure(SqliteConnectionManager::file(path));
  let pool = r2d2::Pool::builder()
    .max_size(MAX_CONNECTIONS)
    .build(manager)
    .map_err(|e| eyre!("Failed to open database at {}: {}", path.display(), e))?;

  run_migrations(&pool)?;
  Ok(pool)
}

/// Single-connection in-memory database. Every pooled connection to
/// `:memory:` would be a separate database, so the pool holds exactly one.
#[cfg(test)]
pub fn open_in_memory() -> Result<Pool> {
  let manager = configure(SqliteConnectionManager::memory());
  let pool = r2d2::Pool::builder()
    .max_size(1)
    .build(manager)
    .map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;

  run_migrations(&pool)?;
  Ok(pool)
}

fn configure(manager: SqliteConnectionManager) -> SqliteConnectionManager {
  manager.with_init(|conn| {
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
  })
}

fn run_migrations(pool: &Pool) -> Result<()> {
  let conn = pool
    .get()
    .map_err(|e| eyre!("Failed to acquire connection for migrations: {}", e))?;

  conn
    .execute_batch(schema::SCHEMA)
    .map_err(|e| eyre!("Failed to run migrations: {}", e))?;

  Ok(())
}
