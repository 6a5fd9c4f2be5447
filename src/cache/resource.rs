//! Per-resource configuration consumed by the cache layer.

use serde_json::Value;
use std::time::Duration;

use crate::error::Result;
use crate::upstream::client::FetchRequest;

/// Converts an upstream JSON body into records stamped with `created_at`.
pub type MapFn<R> = Box<dyn Fn(&Value, i64) -> Result<Vec<R>> + Send + Sync>;

/// Everything the cache layer needs to resolve one resource kind.
pub struct ResourceSpec<R> {
  /// Name used in logs and error messages (e.g. "weather")
  pub name: &'static str,
  /// Maximum age of cached rows; `None` never expires
  pub freshness: Option<Duration>,
  /// Upstream request to issue on a miss
  pub request: FetchRequest,
  /// Upstream body to records
  pub map: MapFn<R>,
}

impl<R> ResourceSpec<R> {
  pub fn new(
    name: &'static str,
    request: FetchRequest,
    map: impl Fn(&Value, i64) -> Result<Vec<R>> + Send + Sync + 'static,
  ) -> Self {
    Self {
      name,
      freshness: None,
      request,
      map: Box::new(map),
    }
  }

  pub fn with_freshness(mut self, freshness: Duration) -> Self {
    self.freshness = Some(freshness);
    self
  }

  /// Whether rows created at `created_at` are too old at `now` (both Unix ms).
  pub fn is_stale(&self, created_at: i64, now: i64) -> bool {
    match self.freshness {
      Some(threshold) => now.saturating_sub(created_at) > threshold.as_millis() as i64,
      None => false,
    }
  }
}
