use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Geocoded search text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
  pub id: Option<i64>,
  pub search_query: String,
  pub formatted_query: String,
  pub latitude: f64,
  pub longitude: f64,
  pub created_at: i64,
}

/// One forecast day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Weather {
  pub id: Option<i64>,
  pub forecast: String,
  pub time: String,
  pub created_at: i64,
  pub location_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
  pub id: Option<i64>,
  pub link: Option<String>,
  pub name: String,
  pub event_date: Option<String>,
  pub summary: Option<String>,
  pub created_at: i64,
  pub location_id: i64,
}

/// Business review summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Yelp {
  pub id: Option<i64>,
  pub name: String,
  pub image_url: Option<String>,
  pub price: Option<String>,
  pub rating: Option<f64>,
  pub url: Option<String>,
  pub created_at: i64,
  pub location_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movie {
  pub id: Option<i64>,
  pub title: String,
  pub overview: Option<String>,
  pub average_votes: Option<f64>,
  pub total_votes: Option<i64>,
  pub image_url: Option<String>,
  pub popularity: Option<f64>,
  pub released_on: Option<String>,
  pub created_at: i64,
  pub location_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trail {
  pub id: Option<i64>,
  pub name: String,
  pub location: Option<String>,
  pub length: Option<f64>,
  pub stars: Option<f64>,
  pub star_votes: Option<i64>,
  pub summary: Option<String>,
  pub trail_url: Option<String>,
  pub conditions: Option<String>,
  pub condition_date: Option<String>,
  pub condition_time: Option<String>,
  pub created_at: i64,
  pub location_id: i64,
}

/// A previously resolved location as sent back by clients.
///
/// Numeric fields accept numbers or numeric strings, since form-encoded
/// clients send everything as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocationRef {
  #[serde(deserialize_with = "de_i64")]
  pub id: i64,
  #[serde(default)]
  pub search_query: Option<String>,
  #[serde(default)]
  pub formatted_query: Option<String>,
  #[serde(default, deserialize_with = "de_opt_f64")]
  pub latitude: Option<f64>,
  #[serde(default, deserialize_with = "de_opt_f64")]
  pub longitude: Option<f64>,
}

impl LocationRef {
  pub fn coordinates(&self) -> Result<(f64, f64)> {
    match (self.latitude, self.longitude) {
      (Some(lat), Some(lng)) => Ok((lat, lng)),
      _ => Err(Error::BadRequest(
        "data must include latitude and longitude".into(),
      )),
    }
  }

  pub fn search_query(&self) -> Result<&str> {
    non_empty(self.search_query.as_deref(), "search_query")
  }

  pub fn formatted_query(&self) -> Result<&str> {
    non_empty(self.formatted_query.as_deref(), "formatted_query")
  }
}

fn non_empty<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
  value
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .ok_or_else(|| Error::BadRequest(format!("data must include {}", field)))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
  Number(serde_json::Number),
  Text(String),
}

fn de_i64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
  match NumberOrText::deserialize(deserializer)? {
    NumberOrText::Number(n) => n
      .as_i64()
      .ok_or_else(|| de::Error::custom(format!("{} is not an integer id", n))),
    NumberOrText::Text(s) => s
      .trim()
      .parse()
      .map_err(|_| de::Error::custom(format!("'{}' is not an integer id", s))),
  }
}

fn de_opt_f64<'de, D: Deserializer<'de>>(
  deserializer: D,
) -> std::result::Result<Option<f64>, D::Error> {
  match Option::<NumberOrText>::deserialize(deserializer)? {
    None => Ok(None),
    Some(NumberOrText::Number(n)) => Ok(n.as_f64()),
    Some(NumberOrText::Text(s)) if s.trim().is_empty() => Ok(None),
    Some(NumberOrText::Text(s)) => s
      .trim()
      .parse()
      .map(Some)
      .map_err(|_| de::Error::custom(format!("'{}' is not a coordinate", s))),
  }
}
