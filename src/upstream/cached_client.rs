//! Upstream client with transparent caching, one method per resource kind.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheLayer, CacheResult, CacheStore, LookupKey, ResourceSpec};
use crate::config::{ApiKeys, FreshnessConfig};
use crate::error::{Error, Result};

use super::client::{expand_template, FetchRequest};
use super::mapper;
use super::types::{Event, Location, LocationRef, Movie, Trail, Weather, Yelp};

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json?address={query}&key={key}";
const WEATHER_URL: &str = "https://api.darksky.net/forecast/{key}/{lat},{lng}";
const EVENTS_URL: &str =
  "https://www.eventbriteapi.com/v3/events/search?token={key}&location.address={address}";
const YELP_URL: &str = "https://api.yelp.com/v3/businesses/search?location={query}";
const MOVIES_URL: &str =
  "https://api.themoviedb.org/3/search/movie/?api_key={key}&language=en-US&page=1&query={query}";
const TRAILS_URL: &str =
  "https://www.hikingproject.com/data/get-trails?lat={lat}&lon={lng}&maxDistance=10&key={key}";

/// Resolves every resource kind through one shared cache layer.
pub struct CachedClient<S: CacheStore> {
  cache: CacheLayer<S>,
  keys: Arc<ApiKeys>,
  freshness: FreshnessConfig,
}

impl<S: CacheStore> CachedClient<S> {
  pub fn new(cache: CacheLayer<S>, keys: ApiKeys, freshness: FreshnessConfig) -> Self {
    Self {
      cache,
      keys: Arc::new(keys),
      freshness,
    }
  }

  /// Geocode search text. Locations are created once and never expire.
  pub async fn location(&self, search_query: &str) -> Result<CacheResult<Location>> {
    let key = credential(&self.keys.geocode, "location", ApiKeys::GEOCODE)?;
    let url = expand_template(GEOCODE_URL, &[("query", search_query), ("key", key)]);

    let query = search_query.to_string();
    let spec = ResourceSpec::new(
      "location",
      FetchRequest::new("location", url),
      move |body, created_at| mapper::location(&query, body, created_at).map(|l| vec![l]),
    );

    let result = self
      .cache
      .resolve(LookupKey::Search(search_query.to_string()), &spec)
      .await?;

    let source = result.source;
    let cached_at = result.cached_at;
    let location = result
      .data
      .into_iter()
      .next()
      .ok_or_else(|| Error::malformed("location", "no location row"))?;

    Ok(CacheResult {
      data: location,
      source,
      cached_at,
    })
  }

  /// Daily forecasts for a resolved location.
  pub async fn weather(&self, at: &LocationRef) -> Result<CacheResult<Vec<Weather>>> {
    let key = credential(&self.keys.weather, "weather", ApiKeys::WEATHER)?;
    let (lat, lng) = at.coordinates()?;
    let (lat, lng) = (lat.to_string(), lng.to_string());
    let url = expand_template(
      WEATHER_URL,
      &[("key", key), ("lat", lat.as_str()), ("lng", lng.as_str())],
    );

    let location_id = at.id;
    let spec = ResourceSpec::new(
      "weather",
      FetchRequest::new("weather", url),
      move |body, created_at| mapper::weather(body, location_id, created_at),
    )
    .with_freshness(millis(self.freshness.weather_ms));

    self.cache.resolve(LookupKey::Location(at.id), &spec).await
  }

  /// Upcoming events near a resolved location's address.
  pub async fn events(&self, at: &LocationRef) -> Result<CacheResult<Vec<Event>>> {
    let key = credential(&self.keys.eventbrite, "events", ApiKeys::EVENTBRITE)?;
    let address = at.formatted_query()?;
    let url = expand_template(EVENTS_URL, &[("key", key), ("address", address)]);

    let location_id = at.id;
    let spec = ResourceSpec::new(
      "events",
      FetchRequest::new("events", url),
      move |body, created_at| mapper::events(body, location_id, created_at),
    )
    .with_freshness(millis(self.freshness.events_ms));

    self.cache.resolve(LookupKey::Location(at.id), &spec).await
  }

  /// Business reviews for a resolved location.
  pub async fn yelp(&self, at: &LocationRef) -> Result<CacheResult<Vec<Yelp>>> {
    let key = credential(&self.keys.yelp, "yelp", ApiKeys::YELP)?;
    let query = at.search_query()?;
    let url = expand_template(YELP_URL, &[("query", query)]);

    let location_id = at.id;
    let spec = ResourceSpec::new(
      "yelp",
      FetchRequest::new("yelp", url).with_bearer(key),
      move |body, created_at| mapper::yelp(body, location_id, created_at),
    )
    .with_freshness(millis(self.freshness.yelp_ms));

    self.cache.resolve(LookupKey::Location(at.id), &spec).await
  }

  /// Movies matching a resolved location's search text.
  pub async fn movies(&self, at: &LocationRef) -> Result<CacheResult<Vec<Movie>>> {
    let key = credential(&self.keys.movie, "movies", ApiKeys::MOVIE)?;
    let query = at.search_query()?;
    let url = expand_template(MOVIES_URL, &[("key", key), ("query", query)]);

    let location_id = at.id;
    let spec = ResourceSpec::new(
      "movies",
      FetchRequest::new("movies", url),
      move |body, created_at| mapper::movies(body, location_id, created_at),
    )
    .with_freshness(millis(self.freshness.movies_ms));

    self.cache.resolve(LookupKey::Location(at.id), &spec).await
  }

  /// Hiking trails around a resolved location.
  pub async fn trails(&self, at: &LocationRef) -> Result<CacheResult<Vec<Trail>>> {
    let key = credential(&self.keys.trail, "trails", ApiKeys::TRAIL)?;
    let (lat, lng) = at.coordinates()?;
    let (lat, lng) = (lat.to_string(), lng.to_string());
    let url = expand_template(
      TRAILS_URL,
      &[("lat", lat.as_str()), ("lng", lng.as_str()), ("key", key)],
    );

    let location_id = at.id;
    let spec = ResourceSpec::new(
      "trails",
      FetchRequest::new("trails", url),
      move |body, created_at| mapper::trails(body, location_id, created_at),
    )
    .with_freshness(millis(self.freshness.trails_ms));

    self.cache.resolve(LookupKey::Location(at.id), &spec).await
  }
}

fn credential<'a>(
  value: &'a Option<String>,
  resource: &'static str,
  env: &'static str,
) -> Result<&'a str> {
  value
    .as_deref()
    .ok_or_else(|| Error::upstream(resource, format!("{} is not set", env)))
}

fn millis(ms: u64) -> Duration {
  Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheSource, SqliteStore};
  use crate::db;
  use crate::upstream::testing::{Reply, ScriptedFetch};
  use serde_json::json;

  fn keys() -> ApiKeys {
    ApiKeys {
      geocode: Some("geo-key".into()),
      weather: Some("sky-key".into()),
      eventbrite: Some("eb-key".into()),
      yelp: Some("yelp-key".into()),
      movie: Some("tmdb-key".into()),
      trail: Some("hp-key".into()),
    }
  }

  fn client(fetch: Arc<ScriptedFetch>, keys: ApiKeys) -> CachedClient<SqliteStore> {
    let store = SqliteStore::new(db::open_in_memory().unwrap());
    CachedClient::new(CacheLayer::new(store, fetch), keys, FreshnessConfig::default())
  }

  fn geocode_body() -> serde_json::Value {
    json!({
      "status": "OK",
      "results": [{
        "formatted_address": "Seattle, WA, USA",
        "geometry": { "location": { "lat": 47.6062095, "lng": -122.3320708 } }
      }]
    })
  }

  async fn seattle(client: &CachedClient<SqliteStore>) -> LocationRef {
    let location = client.location("Seattle").await.unwrap().data;
    LocationRef {
      id: location.id.unwrap(),
      search_query: Some(location.search_query),
      formatted_query: Some(location.formatted_query),
      latitude: Some(location.latitude),
      longitude: Some(location.longitude),
    }
  }

  #[tokio::test]
  async fn test_location_created_once() {
    let fetch = Arc::new(ScriptedFetch::new().reply("location", Reply::Json(geocode_body())));
    let client = client(fetch.clone(), keys());

    let first = client.location("Seattle").await.unwrap();
    let second = client.location("Seattle").await.unwrap();

    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(first.data.id, second.data.id);
    assert_eq!(fetch.calls(), 1);
    assert_eq!(
      fetch.requests()[0].0,
      "https://maps.googleapis.com/maps/api/geocode/json?address=Seattle&key=geo-key"
    );
  }

  #[tokio::test]
  async fn test_weather_url_uses_coordinates() {
    let fetch = Arc::new(
      ScriptedFetch::new()
        .reply("location", Reply::Json(geocode_body()))
        .reply(
          "weather",
          Reply::Json(json!({ "daily": { "data": [{ "time": 1540969200, "summary": "Rain" }] } })),
        ),
    );
    let client = client(fetch.clone(), keys());
    let at = seattle(&client).await;

    let days = client.weather(&at).await.unwrap().data;
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].location_id, at.id);
    assert_eq!(
      fetch.requests()[1].0,
      "https://api.darksky.net/forecast/sky-key/47.6062095,-122.3320708"
    );
  }

  #[tokio::test]
  async fn test_yelp_sends_bearer_token() {
    let fetch = Arc::new(
      ScriptedFetch::new()
        .reply("location", Reply::Json(geocode_body()))
        .reply("yelp", Reply::Json(json!({ "businesses": [{ "name": "Cafe" }] }))),
    );
    let client = client(fetch.clone(), keys());
    let at = seattle(&client).await;

    client.yelp(&at).await.unwrap();
    let (url, bearer) = fetch.requests()[1].clone();
    assert_eq!(url, "https://api.yelp.com/v3/businesses/search?location=Seattle");
    assert_eq!(bearer.as_deref(), Some("yelp-key"));
  }

  #[tokio::test]
  async fn test_events_movies_trails_resolve() {
    let fetch = Arc::new(
      ScriptedFetch::new()
        .reply("location", Reply::Json(geocode_body()))
        .reply(
          "events",
          Reply::Json(json!({ "events": [{ "name": { "text": "Demo Day" } }] })),
        )
        .reply("movies", Reply::Json(json!({ "results": [{ "title": "Sleepless" }] })))
        .reply("trails", Reply::Json(json!({ "trails": [{ "name": "Rattlesnake" }] }))),
    );
    let client = client(fetch.clone(), keys());
    let at = seattle(&client).await;

    assert_eq!(client.events(&at).await.unwrap().data[0].name, "Demo Day");
    assert_eq!(client.movies(&at).await.unwrap().data[0].title, "Sleepless");
    assert_eq!(client.trails(&at).await.unwrap().data[0].name, "Rattlesnake");

    let urls: Vec<String> = fetch.requests().into_iter().map(|(url, _)| url).collect();
    assert!(urls[1].ends_with("location.address=Seattle%2C%20WA%2C%20USA"));
    assert!(urls[2].ends_with("&query=Seattle"));
    assert!(urls[3].contains("lat=47.6062095&lon=-122.3320708"));
  }

  #[tokio::test]
  async fn test_missing_credential_is_upstream_unavailable() {
    let fetch = Arc::new(ScriptedFetch::new());
    let client = client(fetch.clone(), ApiKeys::default());

    let err = client.location("Seattle").await.unwrap_err();
    assert!(matches!(err, Error::UpstreamUnavailable { .. }));
    assert!(err.to_string().contains(ApiKeys::GEOCODE));
    assert_eq!(fetch.calls(), 0);
  }

  #[tokio::test]
  async fn test_missing_coordinates_is_bad_request() {
    let client = client(Arc::new(ScriptedFetch::new()), keys());
    let at = LocationRef {
      id: 1,
      search_query: None,
      formatted_query: None,
      latitude: None,
      longitude: None,
    };
    assert!(matches!(client.weather(&at).await, Err(Error::BadRequest(_))));
    assert!(matches!(client.movies(&at).await, Err(Error::BadRequest(_))));
  }
}
