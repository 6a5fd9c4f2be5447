//! Error taxonomy shared by the store, the fetcher and the routes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
  /// Fetch failed, timed out or returned a non-2xx status
  #[error("{resource} upstream unavailable: {reason}")]
  UpstreamUnavailable {
    resource: &'static str,
    reason: String,
  },

  /// Store read, write or delete failed
  #[error("persistence failure: {0}")]
  PersistenceFailure(String),

  /// Upstream answered but the expected JSON shape was absent
  #[error("malformed {resource} payload: {reason}")]
  MalformedUpstreamPayload {
    resource: &'static str,
    reason: String,
  },

  /// The `data` query parameter is missing or lacks a required field
  #[error("bad request: {0}")]
  BadRequest(String),
}

impl Error {
  pub fn upstream(resource: &'static str, reason: impl ToString) -> Self {
    Self::UpstreamUnavailable {
      resource,
      reason: reason.to_string(),
    }
  }

  pub fn malformed(resource: &'static str, reason: impl ToString) -> Self {
    Self::MalformedUpstreamPayload {
      resource,
      reason: reason.to_string(),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::UpstreamUnavailable { .. }
      | Self::PersistenceFailure(_)
      | Self::MalformedUpstreamPayload { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    Self::PersistenceFailure(e.to_string())
  }
}

impl From<r2d2::Error> for Error {
  fn from(e: r2d2::Error) -> Self {
    Self::PersistenceFailure(format!("connection pool: {}", e))
  }
}

/// JSON error body: `{"status": 404, "responseText": "Not Found"}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
  pub status: u16,
  #[serde(rename = "responseText")]
  pub response_text: String,
}

impl ErrorBody {
  pub fn new(status: StatusCode, response_text: impl Into<String>) -> Self {
    Self {
      status: status.as_u16(),
      response_text: response_text.into(),
    }
  }
}

impl IntoResponse for ErrorBody {
  fn into_response(self) -> Response {
    let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(self)).into_response()
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    } else {
      tracing::debug!(error = %self, "rejected request");
    }
    ErrorBody::new(status, self.to_string()).into_response()
  }
}
