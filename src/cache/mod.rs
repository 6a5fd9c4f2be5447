//! Location-keyed cache in front of the upstream APIs.
//!
//! This module provides a resource-agnostic cache-or-fetch mechanism that:
//! - Stores rows per resource kind, keyed by search text or location id
//! - Serves cached rows while the newest one is younger than the freshness threshold
//! - Evicts stale rows, then fetches, maps and persists fresh ones
//! - Runs at most one fetch/persist cycle per key at a time

mod layer;
mod resource;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use resource::ResourceSpec;
pub use storage::{CacheStore, SqliteStore};
pub use traits::{CacheResult, CacheSource, CachedRecord, LookupKey};
