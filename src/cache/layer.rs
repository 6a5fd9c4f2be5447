//! Cache layer that orchestrates caching logic with upstream fetching.

use chrono::{DateTime, Utc};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::resource::ResourceSpec;
use super::storage::CacheStore;
use super::traits::{CacheResult, CachedRecord, LookupKey};
use crate::error::{Error, Result};
use crate::upstream::client::Fetch;

/// Outcome of one cycle, a `Result<CacheResult<Vec<R>>>` for the key's record type.
type Outcome = Arc<dyn Any + Send + Sync>;

type InFlight = Mutex<HashMap<String, watch::Receiver<Option<Outcome>>>>;

/// Cache layer that manages caching logic and upstream fetching.
///
/// This layer sits between the routes and the upstream client. Every
/// resource kind goes through the same `resolve`, configured by a
/// [`ResourceSpec`].
pub struct CacheLayer<S: CacheStore> {
  store: Arc<S>,
  fetcher: Arc<dyn Fetch>,
  /// Upper bound for one upstream call
  timeout: Duration,
  /// Cycles currently running, keyed by `table:key`
  in_flight: Arc<InFlight>,
}

enum Role {
  Leader(Flight),
  Follower(watch::Receiver<Option<Outcome>>),
}

impl<S: CacheStore> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend and fetcher.
  pub fn new(store: S, fetcher: Arc<dyn Fetch>) -> Self {
    Self {
      store: Arc::new(store),
      fetcher,
      timeout: Duration::from_secs(10),
      in_flight: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// Set the upstream call timeout.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  #[cfg(test)]
  pub fn store(&self) -> &S {
    &self.store
  }

  /// Resolve the rows for `key` with a cache-first strategy.
  ///
  /// 1. Look up cached rows - if present and fresh, return them
  /// 2. If present but stale, delete them all
  /// 3. Fetch from upstream, map, persist in one transaction, return
  ///
  /// Only one cycle per key runs at a time. Callers arriving while it runs
  /// receive its outcome, success or error, instead of starting their own.
  /// If the running caller is dropped first, one of them takes over.
  pub async fn resolve<R: CachedRecord>(
    &self,
    key: LookupKey,
    spec: &ResourceSpec<R>,
  ) -> Result<CacheResult<Vec<R>>> {
    let flight_key = format!("{}:{}", R::table(), key);

    loop {
      let mut rx = match self.join(&flight_key) {
        Role::Leader(flight) => {
          let outcome = self.run_cycle(&key, spec).await;
          flight.finish(Arc::new(outcome.clone()));
          return outcome;
        }
        Role::Follower(rx) => rx,
      };

      debug!(resource = spec.name, %key, "awaiting in-flight cycle");
      let shared = rx.wait_for(Option::is_some).await.map(|value| value.clone());
      let Ok(Some(shared)) = shared else {
        // Leader dropped before finishing
        continue;
      };

      return match shared.downcast_ref::<Result<CacheResult<Vec<R>>>>() {
        Some(outcome) => outcome.clone(),
        None => Err(Error::PersistenceFailure(format!(
          "in-flight result for {} has another record type",
          flight_key
        ))),
      };
    }
  }

  /// Lookup, evict if stale, then fetch and persist.
  async fn run_cycle<R: CachedRecord>(
    &self,
    key: &LookupKey,
    spec: &ResourceSpec<R>,
  ) -> Result<CacheResult<Vec<R>>> {
    let lookup_key = key.clone();
    let rows: Vec<R> = self
      .blocking(move |store| store.lookup::<R>(&lookup_key))
      .await?;

    // All rows of one cycle share a timestamp, the newest one decides
    if let Some(newest) = rows.iter().map(CachedRecord::created_at).max() {
      let now = Utc::now().timestamp_millis();
      if !spec.is_stale(newest, now) {
        debug!(resource = spec.name, %key, rows = rows.len(), "cache hit");
        return Ok(CacheResult::from_cache(
          rows,
          DateTime::from_timestamp_millis(newest),
        ));
      }

      debug!(
        resource = spec.name,
        %key,
        age_ms = now - newest,
        "cache stale, evicting"
      );
      let delete_key = key.clone();
      self
        .blocking(move |store| store.delete::<R>(&delete_key))
        .await
        .inspect_err(|e| warn!(resource = spec.name, %key, error = %e, "eviction failed"))?;
    } else {
      debug!(resource = spec.name, %key, "cache miss");
    }

    let records = self.fetch_records(spec).await?;
    let records = self
      .blocking(move |store| store.insert_all(records))
      .await
      .inspect_err(|e| warn!(resource = spec.name, %key, error = %e, "persist failed"))?;

    debug!(resource = spec.name, %key, rows = records.len(), "cached fresh rows");
    Ok(CacheResult::from_network(records))
  }

  /// Fetch the upstream body within the timeout and map it to records.
  async fn fetch_records<R: CachedRecord>(&self, spec: &ResourceSpec<R>) -> Result<Vec<R>> {
    let body = tokio::time::timeout(self.timeout, self.fetcher.fetch_json(&spec.request))
      .await
      .map_err(|_| {
        Error::upstream(
          spec.name,
          format!("timed out after {}ms", self.timeout.as_millis()),
        )
      })?
      .inspect_err(|e| warn!(resource = spec.name, error = %e, "upstream fetch failed"))?;

    (spec.map)(&body, Utc::now().timestamp_millis())
      .inspect_err(|e| warn!(resource = spec.name, error = %e, "unusable upstream payload"))
  }

  /// Run a store operation on the blocking pool.
  async fn blocking<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&S) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    let store = Arc::clone(&self.store);
    tokio::task::spawn_blocking(move || f(&store))
      .await
      .map_err(|e| Error::PersistenceFailure(format!("store task failed: {}", e)))?
  }

  /// Become the leader for `key`, or follow the cycle already running.
  fn join(&self, key: &str) -> Role {
    let mut map = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(rx) = map.get(key) {
      return Role::Follower(rx.clone());
    }

    let (tx, rx) = watch::channel(None);
    map.insert(key.to_string(), rx);
    Role::Leader(Flight {
      in_flight: Arc::clone(&self.in_flight),
      key: key.to_string(),
      tx,
    })
  }

  #[cfg(test)]
  fn in_flight_len(&self) -> usize {
    self
      .in_flight
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }
}

impl<S: CacheStore> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      fetcher: Arc::clone(&self.fetcher),
      timeout: self.timeout,
      in_flight: Arc::clone(&self.in_flight),
    }
  }
}

/// The leader's claim on a key. Only the leader owns the map entry, so
/// dropping it, finished or not, always clears the entry.
struct Flight {
  in_flight: Arc<InFlight>,
  key: String,
  tx: watch::Sender<Option<Outcome>>,
}

impl Flight {
  fn finish(self, outcome: Outcome) {
    self.tx.send_replace(Some(outcome));
  }
}

impl Drop for Flight {
  fn drop(&mut self) {
    // Removed before the sender closes, so followers that retry find no entry
    self
      .in_flight
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(&self.key);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::SqliteStore;
  use crate::db;
  use crate::upstream::client::FetchRequest;
  use crate::upstream::mapper;
  use crate::upstream::testing::{Reply, ScriptedFetch};
  use crate::upstream::types::{Location, Weather};
  use serde_json::json;
  use std::sync::atomic::{AtomicUsize, Ordering};

  /// Store wrapper counting mutations.
  struct CountingStore {
    inner: SqliteStore,
    inserts: AtomicUsize,
    deletes: AtomicUsize,
  }

  impl CacheStore for CountingStore {
    fn lookup<R: CachedRecord>(&self, key: &LookupKey) -> Result<Vec<R>> {
      self.inner.lookup(key)
    }

    fn insert_all<R: CachedRecord>(&self, records: Vec<R>) -> Result<Vec<R>> {
      self.inserts.fetch_add(1, Ordering::SeqCst);
      self.inner.insert_all(records)
    }

    fn delete<R: CachedRecord>(&self, key: &LookupKey) -> Result<usize> {
      self.deletes.fetch_add(1, Ordering::SeqCst);
      self.inner.delete::<R>(key)
    }
  }

  fn darksky_body() -> serde_json::Value {
    json!({
      "daily": {
        "data": [
          { "time": 1540969200, "summary": "Light rain in the morning." },
          { "time": 1541055600, "summary": "Partly cloudy throughout the day." }
        ]
      }
    })
  }

  fn layer(fetch: Arc<ScriptedFetch>) -> (CacheLayer<CountingStore>, i64) {
    let store = SqliteStore::new(db::open_in_memory().unwrap());
    let location = store
      .insert_all(vec![Location {
        id: None,
        search_query: "Seattle".into(),
        formatted_query: "Seattle, WA, USA".into(),
        latitude: 47.6,
        longitude: -122.3,
        created_at: 0,
      }])
      .unwrap();

    let counting = CountingStore {
      inner: store,
      inserts: AtomicUsize::new(0),
      deletes: AtomicUsize::new(0),
    };
    (
      CacheLayer::new(counting, fetch).with_timeout(Duration::from_millis(200)),
      location[0].id.unwrap(),
    )
  }

  fn weather_spec(location_id: i64) -> ResourceSpec<Weather> {
    ResourceSpec::new(
      "weather",
      FetchRequest::new("weather", "https://weather.test/forecast"),
      move |body, created_at| mapper::weather(body, location_id, created_at),
    )
    .with_freshness(Duration::from_millis(60_000))
  }

  fn stored_weather(layer: &CacheLayer<CountingStore>, location_id: i64) -> Vec<Weather> {
    layer
      .store()
      .inner
      .lookup(&LookupKey::Location(location_id))
      .unwrap()
  }

  #[tokio::test]
  async fn test_miss_fetches_persists_and_returns() {
    let fetch = Arc::new(ScriptedFetch::new().reply("weather", Reply::Json(darksky_body())));
    let (layer, location_id) = layer(fetch.clone());

    let result = layer
      .resolve(LookupKey::Location(location_id), &weather_spec(location_id))
      .await
      .unwrap();

    assert_eq!(result.source, crate::cache::CacheSource::Network);
    assert_eq!(result.data.len(), 2);
    assert!(result.data.iter().all(|w| w.id.is_some()));
    assert_eq!(fetch.calls(), 1);
    assert_eq!(stored_weather(&layer, location_id).len(), 2);
  }

  #[tokio::test]
  async fn test_fresh_rows_served_without_fetch() {
    let fetch = Arc::new(ScriptedFetch::new().reply("weather", Reply::Json(darksky_body())));
    let (layer, location_id) = layer(fetch.clone());
    let spec = weather_spec(location_id);

    let first = layer
      .resolve(LookupKey::Location(location_id), &spec)
      .await
      .unwrap();
    let second = layer
      .resolve(LookupKey::Location(location_id), &spec)
      .await
      .unwrap();

    assert_eq!(fetch.calls(), 1);
    assert_eq!(second.source, crate::cache::CacheSource::Cache);
    let first_ids: Vec<_> = first.data.iter().map(|w| w.id).collect();
    let second_ids: Vec<_> = second.data.iter().map(|w| w.id).collect();
    assert_eq!(first_ids, second_ids);
    assert_eq!(layer.store().deletes.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_stale_rows_deleted_once_then_fetched_once() {
    let fetch = Arc::new(ScriptedFetch::new().reply("weather", Reply::Json(darksky_body())));
    let (layer, location_id) = layer(fetch.clone());

    let two_minutes_ago = Utc::now().timestamp_millis() - 120_000;
    layer
      .store()
      .inner
      .insert_all(vec![Weather {
        id: None,
        forecast: "Old forecast".into(),
        time: "Mon Jan 01 2001".into(),
        created_at: two_minutes_ago,
        location_id,
      }])
      .unwrap();

    let result = layer
      .resolve(LookupKey::Location(location_id), &weather_spec(location_id))
      .await
      .unwrap();

    assert_eq!(layer.store().deletes.load(Ordering::SeqCst), 1);
    assert_eq!(fetch.calls(), 1);
    assert_eq!(result.source, crate::cache::CacheSource::Network);

    let stored = stored_weather(&layer, location_id);
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|w| w.forecast != "Old forecast"));
  }

  #[tokio::test]
  async fn test_concurrent_misses_fetch_once() {
    let fetch = Arc::new(
      ScriptedFetch::new()
        .reply("weather", Reply::Json(darksky_body()))
        .with_delay(Duration::from_millis(50)),
    );
    let (layer, location_id) = layer(fetch.clone());
    let spec = weather_spec(location_id);

    let results = futures::future::join_all(
      (0..8).map(|_| layer.resolve(LookupKey::Location(location_id), &spec)),
    )
    .await;

    assert_eq!(fetch.calls(), 1);
    assert_eq!(layer.store().inserts.load(Ordering::SeqCst), 1);
    for result in results {
      assert_eq!(result.unwrap().data.len(), 2);
    }
    assert_eq!(stored_weather(&layer, location_id).len(), 2);
    assert_eq!(layer.in_flight_len(), 0);
  }

  #[tokio::test]
  async fn test_concurrent_callers_share_upstream_error() {
    let fetch = Arc::new(
      ScriptedFetch::new()
        .reply("weather", Reply::Status(503))
        .with_delay(Duration::from_millis(50)),
    );
    let (layer, location_id) = layer(fetch.clone());
    let spec = weather_spec(location_id);

    let results = futures::future::join_all(
      (0..8).map(|_| layer.resolve(LookupKey::Location(location_id), &spec)),
    )
    .await;

    assert_eq!(fetch.calls(), 1);
    for result in results {
      assert!(matches!(result, Err(Error::UpstreamUnavailable { .. })));
    }
    assert_eq!(layer.store().inserts.load(Ordering::SeqCst), 0);
    assert_eq!(layer.in_flight_len(), 0);
  }

  #[tokio::test]
  async fn test_concurrent_callers_share_one_timeout() {
    let fetch = Arc::new(ScriptedFetch::new().reply("weather", Reply::Hang));
    let (layer, location_id) = layer(fetch.clone());
    let spec = weather_spec(location_id);

    let started = std::time::Instant::now();
    let results = futures::future::join_all(
      (0..5).map(|_| layer.resolve(LookupKey::Location(location_id), &spec)),
    )
    .await;

    assert_eq!(fetch.calls(), 1);
    // One 200ms timeout, not five in a row
    assert!(started.elapsed() < Duration::from_millis(600));
    for result in results {
      match result {
        Err(Error::UpstreamUnavailable { reason, .. }) => assert!(reason.contains("timed out")),
        other => panic!("unexpected result: {other:?}"),
      }
    }
  }

  #[tokio::test]
  async fn test_concurrent_callers_share_empty_payload() {
    let fetch = Arc::new(
      ScriptedFetch::new()
        .reply("weather", Reply::Json(json!({ "daily": { "data": [] } })))
        .with_delay(Duration::from_millis(50)),
    );
    let (layer, location_id) = layer(fetch.clone());
    let spec = weather_spec(location_id);

    let results = futures::future::join_all(
      (0..8).map(|_| layer.resolve(LookupKey::Location(location_id), &spec)),
    )
    .await;

    assert_eq!(fetch.calls(), 1);
    for result in results {
      assert!(result.unwrap().data.is_empty());
    }
  }

  #[tokio::test]
  async fn test_follower_takes_over_when_leader_is_dropped() {
    let fetch = Arc::new(
      ScriptedFetch::new()
        .reply("weather", Reply::Json(darksky_body()))
        .with_delay(Duration::from_millis(100)),
    );
    let (layer, location_id) = layer(fetch.clone());
    let spec = weather_spec(location_id);

    let (dropped, finished) = futures::join!(
      tokio::time::timeout(
        Duration::from_millis(30),
        layer.resolve(LookupKey::Location(location_id), &spec),
      ),
      layer.resolve(LookupKey::Location(location_id), &spec),
    );

    assert!(dropped.is_err());
    assert_eq!(finished.unwrap().data.len(), 2);
    assert_eq!(layer.store().inserts.load(Ordering::SeqCst), 1);
    assert_eq!(stored_weather(&layer, location_id).len(), 2);
    assert_eq!(layer.in_flight_len(), 0);
  }

  #[tokio::test]
  async fn test_dropped_callers_leave_no_entry() {
    let fetch = Arc::new(ScriptedFetch::new().reply("weather", Reply::Hang));
    let (layer, location_id) = layer(fetch.clone());
    let spec = weather_spec(location_id);

    let all = futures::future::join_all(
      (0..4).map(|_| layer.resolve(LookupKey::Location(location_id), &spec)),
    );
    assert!(tokio::time::timeout(Duration::from_millis(50), all)
      .await
      .is_err());

    assert_eq!(layer.in_flight_len(), 0);
  }

  #[tokio::test]
  async fn test_upstream_failure_leaves_store_untouched() {
    let fetch = Arc::new(ScriptedFetch::new().reply("weather", Reply::Status(503)));
    let (layer, location_id) = layer(fetch.clone());

    let err = layer
      .resolve(LookupKey::Location(location_id), &weather_spec(location_id))
      .await
      .unwrap_err();

    assert!(matches!(err, Error::UpstreamUnavailable { .. }));
    assert_eq!(layer.store().inserts.load(Ordering::SeqCst), 0);
    assert!(stored_weather(&layer, location_id).is_empty());
  }

  #[tokio::test]
  async fn test_timeout_is_upstream_unavailable() {
    let fetch = Arc::new(ScriptedFetch::new().reply("weather", Reply::Hang));
    let (layer, location_id) = layer(fetch.clone());

    let err = layer
      .resolve(LookupKey::Location(location_id), &weather_spec(location_id))
      .await
      .unwrap_err();

    match err {
      Error::UpstreamUnavailable { resource, reason } => {
        assert_eq!(resource, "weather");
        assert!(reason.contains("timed out"));
      }
      other => panic!("unexpected error: {other:?}"),
    }
    assert!(stored_weather(&layer, location_id).is_empty());
  }

  #[tokio::test]
  async fn test_malformed_payload_writes_nothing() {
    let fetch = Arc::new(
      ScriptedFetch::new().reply("weather", Reply::Json(json!({ "currently": {} }))),
    );
    let (layer, location_id) = layer(fetch.clone());

    let err = layer
      .resolve(LookupKey::Location(location_id), &weather_spec(location_id))
      .await
      .unwrap_err();

    assert!(matches!(err, Error::MalformedUpstreamPayload { .. }));
    assert_eq!(layer.store().inserts.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_locations_never_expire() {
    let fetch = Arc::new(ScriptedFetch::new());
    let (layer, location_id) = layer(fetch.clone());
    let spec = ResourceSpec::new(
      "location",
      FetchRequest::new("location", "https://geocode.test/"),
      |body, created_at| mapper::location("Seattle", body, created_at).map(|l| vec![l]),
    );

    // The seeded row was created at the epoch
    let result = layer
      .resolve(LookupKey::Search("Seattle".into()), &spec)
      .await
      .unwrap();

    assert_eq!(fetch.calls(), 0);
    assert_eq!(result.data[0].id, Some(location_id));
  }
}
