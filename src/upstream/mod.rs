//! Third-party APIs behind the cache: geocoding, weather, events, business
//! reviews, movies and trails.

pub mod api_types;
pub mod cache;
pub mod cached_client;
pub mod client;
pub mod mapper;
#[cfg(test)]
pub mod testing;
pub mod types;

pub use cached_client::CachedClient;
pub use client::UpstreamClient;
