//! Serde-deserializable types matching the upstream API responses.
//!
//! These types are separate from domain types so that missing or mistyped
//! fields surface as decode errors instead of panics deep in the mappers.

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Decode an upstream body, reporting shape mismatches as malformed payloads.
pub fn decode<T: DeserializeOwned>(resource: &'static str, value: &Value) -> Result<T> {
  T::deserialize(value).map_err(|e| Error::malformed(resource, e))
}

// ============================================================================
// Google geocoding
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiGeocodeResponse {
  #[serde(default)]
  pub results: Vec<ApiGeocodeResult>,
  pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiGeocodeResult {
  pub formatted_address: String,
  pub geometry: ApiGeometry,
}

#[derive(Debug, Deserialize)]
pub struct ApiGeometry {
  pub location: ApiLatLng,
}

#[derive(Debug, Deserialize)]
pub struct ApiLatLng {
  pub lat: f64,
  pub lng: f64,
}

// ============================================================================
// Dark Sky forecast
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiForecastResponse {
  pub daily: ApiDaily,
}

#[derive(Debug, Deserialize)]
pub struct ApiDaily {
  #[serde(default)]
  pub data: Vec<ApiDay>,
}

#[derive(Debug, Deserialize)]
pub struct ApiDay {
  /// Unix seconds
  pub time: i64,
  #[serde(default)]
  pub summary: String,
}

// ============================================================================
// Eventbrite search
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiEventsResponse {
  pub events: Vec<ApiEvent>,
}

#[derive(Debug, Deserialize)]
pub struct ApiEvent {
  pub url: Option<String>,
  pub name: ApiText,
  pub start: Option<ApiEventStart>,
  pub description: Option<ApiText>,
}

#[derive(Debug, Deserialize)]
pub struct ApiText {
  pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiEventStart {
  /// Local wall-clock time, e.g. "2018-11-01T19:00:00"
  pub local: Option<String>,
}

// ============================================================================
// Yelp business search
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiBusinessesResponse {
  pub businesses: Vec<ApiBusiness>,
}

#[derive(Debug, Deserialize)]
pub struct ApiBusiness {
  pub name: String,
  pub image_url: Option<String>,
  pub price: Option<String>,
  pub rating: Option<f64>,
  pub url: Option<String>,
}

// ============================================================================
// TMDb movie search
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiMovieSearchResponse {
  pub results: Vec<ApiMovie>,
}

#[derive(Debug, Deserialize)]
pub struct ApiMovie {
  pub title: String,
  pub overview: Option<String>,
  pub vote_average: Option<f64>,
  pub vote_count: Option<i64>,
  pub poster_path: Option<String>,
  pub popularity: Option<f64>,
  pub release_date: Option<String>,
}

// ============================================================================
// Hiking Project trails
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiTrailsResponse {
  pub trails: Vec<ApiTrail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTrail {
  pub name: String,
  pub location: Option<String>,
  pub length: Option<f64>,
  pub stars: Option<f64>,
  pub star_votes: Option<i64>,
  pub summary: Option<String>,
  pub url: Option<String>,
  pub condition_status: Option<String>,
  /// "YYYY-MM-DD HH:MM:SS"
  pub condition_date: Option<String>,
}
