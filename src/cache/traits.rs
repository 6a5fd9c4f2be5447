//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use rusqlite::types::{ToSqlOutput, Value};
use rusqlite::{Row, ToSql};
use serde::Serialize;
use std::fmt;

/// Trait for records persisted in a per-kind cache table.
///
/// Implementors describe their table layout so one generic store can read and
/// write every resource kind.
pub trait CachedRecord: Clone + Send + Sync + Serialize + 'static {
  /// Table holding this kind (e.g. "weathers")
  fn table() -> &'static str;

  /// Column compared against the lookup key
  fn key_column() -> &'static str;

  /// Columns written on insert, in the order `values` returns them.
  /// Excludes the generated `id`.
  fn columns() -> &'static [&'static str];

  /// Column values for insert.
  fn values(&self) -> Vec<Value>;

  /// Build a record from a row selected as `id, <columns>`.
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

  /// Creation time in Unix milliseconds
  fn created_at(&self) -> i64;

  /// Record the id assigned by the store.
  fn set_id(&mut self, id: i64);
}

/// Value identifying the cached rows of one resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LookupKey {
  /// Raw search text (locations)
  Search(String),
  /// Previously resolved location id (everything else)
  Location(i64),
}

impl fmt::Display for LookupKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Search(query) => write!(f, "search:{}", query),
      Self::Location(id) => write!(f, "location:{}", id),
    }
  }
}

impl ToSql for LookupKey {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    Ok(match self {
      Self::Search(query) => ToSqlOutput::from(query.as_str()),
      Self::Location(id) => ToSqlOutput::from(*id),
    })
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from freshly fetched data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from cached rows.
  pub fn from_cache(data: T, cached_at: Option<DateTime<Utc>>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at,
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fetched from the upstream API and persisted
  Network,
  /// Served from the store, still fresh
  Cache,
}

impl CacheSource {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Network => "miss",
      Self::Cache => "hit",
    }
  }
}
