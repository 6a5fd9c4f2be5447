use axum::extract::{RawQuery, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use super::params::DataParam;
use super::AppState;
use crate::cache::CacheResult;
use crate::error::{ErrorBody, Result};

/// Body plus an `x-cache` header saying whether the store answered.
fn respond<T: Serialize>(result: CacheResult<T>) -> Response {
  (
    [("x-cache", result.source.as_str())],
    Json(result.data),
  )
    .into_response()
}

pub async fn location(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<Response> {
  let query = DataParam::from_query(raw.as_deref())?.into_search()?;
  Ok(respond(state.location(&query).await?))
}

pub async fn weather(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<Response> {
  let at = DataParam::from_query(raw.as_deref())?.into_location()?;
  Ok(respond(state.weather(&at).await?))
}

pub async fn events(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<Response> {
  let at = DataParam::from_query(raw.as_deref())?.into_location()?;
  Ok(respond(state.events(&at).await?))
}

pub async fn yelp(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<Response> {
  let at = DataParam::from_query(raw.as_deref())?.into_location()?;
  Ok(respond(state.yelp(&at).await?))
}

pub async fn movies(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<Response> {
  let at = DataParam::from_query(raw.as_deref())?.into_location()?;
  Ok(respond(state.movies(&at).await?))
}

pub async fn trails(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<Response> {
  let at = DataParam::from_query(raw.as_deref())?.into_location()?;
  Ok(respond(state.trails(&at).await?))
}

pub async fn not_found(uri: Uri) -> ErrorBody {
  ErrorBody::new(
    StatusCode::NOT_FOUND,
    format!("Sorry, {} does not exist", uri.path()),
  )
}
