//! Pure conversions from upstream payloads to domain records.

use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;

use super::api_types::{
  decode, ApiBusinessesResponse, ApiEventsResponse, ApiForecastResponse, ApiGeocodeResponse,
  ApiMovieSearchResponse, ApiTrailsResponse,
};
use super::types::{Event, Location, Movie, Trail, Weather, Yelp};
use crate::error::{Error, Result};

/// Free text longer than this is cut down to fit, ellipsis included.
pub const MAX_TEXT_CHARS: usize = 10_000;

const ELLIPSIS: &str = "...";
const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";
const DISPLAY_DATE: &str = "%a %b %d %Y";

/// Truncate to `MAX_TEXT_CHARS` characters, ending in "..." when cut.
pub fn truncate(text: &str) -> String {
  if text.chars().count() <= MAX_TEXT_CHARS {
    return text.to_string();
  }
  let mut cut: String = text.chars().take(MAX_TEXT_CHARS - ELLIPSIS.len()).collect();
  cut.push_str(ELLIPSIS);
  cut
}

/// Unix seconds as "Www Mmm DD YYYY" (UTC).
pub fn display_date(unix_secs: i64) -> Option<String> {
  DateTime::from_timestamp(unix_secs, 0).map(|dt| dt.format(DISPLAY_DATE).to_string())
}

/// Local ISO timestamp as "Www Mmm DD YYYY"; unparseable input passes through.
fn display_local(iso: &str) -> String {
  NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S")
    .map(|dt| dt.format(DISPLAY_DATE).to_string())
    .unwrap_or_else(|_| iso.to_string())
}

pub fn location(search_query: &str, body: &Value, created_at: i64) -> Result<Location> {
  let response: ApiGeocodeResponse = decode("location", body)?;
  let first = response.results.into_iter().next().ok_or_else(|| {
    Error::malformed(
      "location",
      format!(
        "no geocoding results for '{}' (status {})",
        search_query,
        response.status.as_deref().unwrap_or("unknown")
      ),
    )
  })?;

  Ok(Location {
    id: None,
    search_query: search_query.to_string(),
    formatted_query: first.formatted_address,
    latitude: first.geometry.location.lat,
    longitude: first.geometry.location.lng,
    created_at,
  })
}

pub fn weather(body: &Value, location_id: i64, created_at: i64) -> Result<Vec<Weather>> {
  let response: ApiForecastResponse = decode("weather", body)?;
  response
    .daily
    .data
    .into_iter()
    .map(|day| {
      let time = display_date(day.time)
        .ok_or_else(|| Error::malformed("weather", format!("bad timestamp {}", day.time)))?;
      Ok(Weather {
        id: None,
        forecast: day.summary,
        time,
        created_at,
        location_id,
      })
    })
    .collect()
}

pub fn events(body: &Value, location_id: i64, created_at: i64) -> Result<Vec<Event>> {
  let response: ApiEventsResponse = decode("events", body)?;
  Ok(
    response
      .events
      .into_iter()
      .map(|event| Event {
        id: None,
        link: event.url,
        name: event.name.text.unwrap_or_default(),
        event_date: event.start.and_then(|s| s.local).map(|l| display_local(&l)),
        summary: event.description.and_then(|d| d.text).map(|t| truncate(&t)),
        created_at,
        location_id,
      })
      .collect(),
  )
}

pub fn yelp(body: &Value, location_id: i64, created_at: i64) -> Result<Vec<Yelp>> {
  let response: ApiBusinessesResponse = decode("yelp", body)?;
  Ok(
    response
      .businesses
      .into_iter()
      .map(|business| Yelp {
        id: None,
        name: business.name,
        image_url: business.image_url,
        price: business.price,
        rating: business.rating,
        url: business.url,
        created_at,
        location_id,
      })
      .collect(),
  )
}

pub fn movies(body: &Value, location_id: i64, created_at: i64) -> Result<Vec<Movie>> {
  let response: ApiMovieSearchResponse = decode("movies", body)?;
  Ok(
    response
      .results
      .into_iter()
      .map(|movie| Movie {
        id: None,
        title: movie.title,
        overview: movie.overview.map(|o| truncate(&o)),
        average_votes: movie.vote_average,
        total_votes: movie.vote_count,
        image_url: movie
          .poster_path
          .map(|path| format!("{}{}", TMDB_IMAGE_BASE, path)),
        popularity: movie.popularity,
        released_on: movie.release_date,
        created_at,
        location_id,
      })
      .collect(),
  )
}

pub fn trails(body: &Value, location_id: i64, created_at: i64) -> Result<Vec<Trail>> {
  let response: ApiTrailsResponse = decode("trails", body)?;
  Ok(
    response
      .trails
      .into_iter()
      .map(|trail| {
        let (condition_date, condition_time) = match trail.condition_date.as_deref() {
          Some(stamp) => match stamp.split_once(' ') {
            Some((date, time)) => (Some(date.to_string()), Some(time.to_string())),
            None => (Some(stamp.to_string()), None),
          },
          None => (None, None),
        };

        Trail {
          id: None,
          name: trail.name,
          location: trail.location,
          length: trail.length,
          stars: trail.stars,
          star_votes: trail.star_votes,
          summary: trail.summary.map(|s| truncate(&s)),
          trail_url: trail.url,
          conditions: trail.condition_status,
          condition_date,
          condition_time,
          created_at,
          location_id,
        }
      })
      .collect(),
  )
}
