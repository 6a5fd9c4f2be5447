//! Table layouts for the upstream record types.

use rusqlite::types::Value;
use rusqlite::Row;

use crate::cache::CachedRecord;

use super::types::{Event, Location, Movie, Trail, Weather, Yelp};

fn opt<T: Into<Value>>(value: Option<T>) -> Value {
  value.map_or(Value::Null, Into::into)
}

impl CachedRecord for Location {
  fn table() -> &'static str {
    "locations"
  }

  fn key_column() -> &'static str {
    "search_query"
  }

  fn columns() -> &'static [&'static str] {
    &[
      "search_query",
      "formatted_query",
      "latitude",
      "longitude",
      "created_at",
    ]
  }

  fn values(&self) -> Vec<Value> {
    vec![
      self.search_query.clone().into(),
      self.formatted_query.clone().into(),
      self.latitude.into(),
      self.longitude.into(),
      self.created_at.into(),
    ]
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id: row.get("id")?,
      search_query: row.get("search_query")?,
      formatted_query: row.get("formatted_query")?,
      latitude: row.get("latitude")?,
      longitude: row.get("longitude")?,
      created_at: row.get("created_at")?,
    })
  }

  fn created_at(&self) -> i64 {
    self.created_at
  }

  fn set_id(&mut self, id: i64) {
    self.id = Some(id);
  }
}

impl CachedRecord for Weather {
  fn table() -> &'static str {
    "weathers"
  }

  fn key_column() -> &'static str {
    "location_id"
  }

  fn columns() -> &'static [&'static str] {
    &["forecast", "time", "created_at", "location_id"]
  }

  fn values(&self) -> Vec<Value> {
    vec![
      self.forecast.clone().into(),
      self.time.clone().into(),
      self.created_at.into(),
      self.location_id.into(),
    ]
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id: row.get("id")?,
      forecast: row.get("forecast")?,
      time: row.get("time")?,
      created_at: row.get("created_at")?,
      location_id: row.get("location_id")?,
    })
  }

  fn created_at(&self) -> i64 {
    self.created_at
  }

  fn set_id(&mut self, id: i64) {
    self.id = Some(id);
  }
}

impl CachedRecord for Event {
  fn table() -> &'static str {
    "events"
  }

  fn key_column() -> &'static str {
    "location_id"
  }

  fn columns() -> &'static [&'static str] {
    &[
      "link",
      "name",
      "event_date",
      "summary",
      "created_at",
      "location_id",
    ]
  }

  fn values(&self) -> Vec<Value> {
    vec![
      opt(self.link.clone()),
      self.name.clone().into(),
      opt(self.event_date.clone()),
      opt(self.summary.clone()),
      self.created_at.into(),
      self.location_id.into(),
    ]
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id: row.get("id")?,
      link: row.get("link")?,
      name: row.get("name")?,
      event_date: row.get("event_date")?,
      summary: row.get("summary")?,
      created_at: row.get("created_at")?,
      location_id: row.get("location_id")?,
    })
  }

  fn created_at(&self) -> i64 {
    self.created_at
  }

  fn set_id(&mut self, id: i64) {
    self.id = Some(id);
  }
}

impl CachedRecord for Yelp {
  fn table() -> &'static str {
    "yelps"
  }

  fn key_column() -> &'static str {
    "location_id"
  }

  fn columns() -> &'static [&'static str] {
    &[
      "name",
      "image_url",
      "price",
      "rating",
      "url",
      "created_at",
      "location_id",
    ]
  }

  fn values(&self) -> Vec<Value> {
    vec![
      self.name.clone().into(),
      opt(self.image_url.clone()),
      opt(self.price.clone()),
      opt(self.rating),
      opt(self.url.clone()),
      self.created_at.into(),
      self.location_id.into(),
    ]
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id: row.get("id")?,
      name: row.get("name")?,
      image_url: row.get("image_url")?,
      price: row.get("price")?,
      rating: row.get("rating")?,
      url: row.get("url")?,
      created_at: row.get("created_at")?,
      location_id: row.get("location_id")?,
    })
  }

  fn created_at(&self) -> i64 {
    self.created_at
  }

  fn set_id(&mut self, id: i64) {
    self.id = Some(id);
  }
}

impl CachedRecord for Movie {
  fn table() -> &'static str {
    "movies"
  }

  fn key_column() -> &'static str {
    "location_id"
  }

  fn columns() -> &'static [&'static str] {
    &[
      "title",
      "overview",
      "average_votes",
      "total_votes",
      "image_url",
      "popularity",
      "released_on",
      "created_at",
      "location_id",
    ]
  }

  fn values(&self) -> Vec<Value> {
    vec![
      self.title.clone().into(),
      opt(self.overview.clone()),
      opt(self.average_votes),
      opt(self.total_votes),
      opt(self.image_url.clone()),
      opt(self.popularity),
      opt(self.released_on.clone()),
      self.created_at.into(),
      self.location_id.into(),
    ]
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id: row.get("id")?,
      title: row.get("title")?,
      overview: row.get("overview")?,
      average_votes: row.get("average_votes")?,
      total_votes: row.get("total_votes")?,
      image_url: row.get("image_url")?,
      popularity: row.get("popularity")?,
      released_on: row.get("released_on")?,
      created_at: row.get("created_at")?,
      location_id: row.get("location_id")?,
    })
  }

  fn created_at(&self) -> i64 {
    self.created_at
  }

  fn set_id(&mut self, id: i64) {
    self.id = Some(id);
  }
}

impl CachedRecord for Trail {
  fn table() -> &'static str {
    "trails"
  }

  fn key_column() -> &'static str {
    "location_id"
  }

  fn columns() -> &'static [&'static str] {
    &[
      "name",
      "location",
      "length",
      "stars",
      "star_votes",
      "summary",
      "trail_url",
      "conditions",
      "condition_date",
      "condition_time",
      "created_at",
      "location_id",
    ]
  }

  fn values(&self) -> Vec<Value> {
    vec![
      self.name.clone().into(),
      opt(self.location.clone()),
      opt(self.length),
      opt(self.stars),
      opt(self.star_votes),
      opt(self.summary.clone()),
      opt(self.trail_url.clone()),
      opt(self.conditions.clone()),
      opt(self.condition_date.clone()),
      opt(self.condition_time.clone()),
      self.created_at.into(),
      self.location_id.into(),
    ]
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id: row.get("id")?,
      name: row.get("name")?,
      location: row.get("location")?,
      length: row.get("length")?,
      stars: row.get("stars")?,
      star_votes: row.get("star_votes")?,
      summary: row.get("summary")?,
      trail_url: row.get("trail_url")?,
      conditions: row.get("conditions")?,
      condition_date: row.get("condition_date")?,
      condition_time: row.get("condition_time")?,
      created_at: row.get("created_at")?,
      location_id: row.get("location_id")?,
    })
  }

  fn created_at(&self) -> i64 {
    self.created_at
  }

  fn set_id(&mut self, id: i64) {
    self.id = Some(id);
  }
}
