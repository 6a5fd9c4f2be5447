//! Cache storage trait and SQLite implementation.

use rusqlite::{params_from_iter, OptionalExtension};

use super::traits::{CachedRecord, LookupKey};
use crate::db::Pool;
use crate::error::{Error, Result};

/// Trait for cache storage backends.
pub trait CacheStore: Send + Sync + 'static {
  /// All rows of kind `R` matching `key`, in insertion order.
  fn lookup<R: CachedRecord>(&self, key: &LookupKey) -> Result<Vec<R>>;

  /// Insert records in one transaction, skipping rows that already exist.
  /// Returns the records with their assigned ids.
  fn insert_all<R: CachedRecord>(&self, records: Vec<R>) -> Result<Vec<R>>;

  /// Delete every row of kind `R` matching `key`.
  fn delete<R: CachedRecord>(&self, key: &LookupKey) -> Result<usize>;
}

/// SQLite-based cache storage on a connection pool.
///
/// Each call checks a connection out of the pool and returns it when done.
#[derive(Clone)]
pub struct SqliteStore {
  pool: Pool,
}

impl SqliteStore {
  pub fn new(pool: Pool) -> Self {
    Self { pool }
  }
}

impl CacheStore for SqliteStore {
  fn lookup<R: CachedRecord>(&self, key: &LookupKey) -> Result<Vec<R>> {
    let conn = self.pool.get()?;
    let sql = format!(
      "SELECT id, {} FROM {} WHERE {} = ?1 ORDER BY id",
      R::columns().join(", "),
      R::table(),
      R::key_column()
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
      .query_map([key], |row| R::from_row(row))?
      .collect::<rusqlite::Result<Vec<R>>>()?;

    Ok(rows)
  }

  fn insert_all<R: CachedRecord>(&self, mut records: Vec<R>) -> Result<Vec<R>> {
    let mut conn = self.pool.get()?;
    let columns = R::columns();
    let key_index = columns
      .iter()
      .position(|c| *c == R::key_column())
      .ok_or_else(|| {
        Error::PersistenceFailure(format!(
          "{} does not list its key column {}",
          R::table(),
          R::key_column()
        ))
      })?;

    let placeholders = (1..=columns.len())
      .map(|i| format!("?{}", i))
      .collect::<Vec<_>>()
      .join(", ");
    let insert_sql = format!(
      "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT DO NOTHING RETURNING id",
      R::table(),
      columns.join(", "),
      placeholders
    );
    let existing_sql = format!(
      "SELECT id FROM {} WHERE {} = ?1 ORDER BY id LIMIT 1",
      R::table(),
      R::key_column()
    );

    // Any failure drops the transaction, which rolls back every row
    let tx = conn.transaction()?;
    {
      let mut insert = tx.prepare(&insert_sql)?;
      let mut existing = tx.prepare(&existing_sql)?;

      for record in records.iter_mut() {
        let values = record.values();
        let inserted: Option<i64> = insert
          .query_row(params_from_iter(values.iter()), |row| row.get(0))
          .optional()?;

        let id = match inserted {
          Some(id) => id,
          None => existing.query_row([&values[key_index]], |row| row.get(0))?,
        };
        record.set_id(id);
      }
    }
    tx.commit()?;

    Ok(records)
  }

  fn delete<R: CachedRecord>(&self, key: &LookupKey) -> Result<usize> {
    let conn = self.pool.get()?;
    let sql = format!("DELETE FROM {} WHERE {} = ?1", R::table(), R::key_column());
    Ok(conn.execute(&sql, [key])?)
  }
}
