//! Parsing of the `data` query parameter.

use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::error::{Error, Result};
use crate::upstream::types::LocationRef;

/// What a client sent in `data`.
#[derive(Debug, Clone, PartialEq)]
pub enum DataParam {
  /// Raw search text (`data=Seattle`)
  Search(String),
  /// A location resolved earlier, as JSON (`data={"id":5,...}`) or in
  /// bracket form (`data[id]=5&data[latitude]=...`)
  Location(LocationRef),
}

impl DataParam {
  /// Parse the raw query string of a request.
  pub fn from_query(raw: Option<&str>) -> Result<Self> {
    let mut plain: Option<String> = None;
    let mut fields = Map::new();

    for (name, value) in form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
      if name == "data" {
        plain = Some(value.into_owned());
      } else if let Some(field) = name
        .strip_prefix("data[")
        .and_then(|rest| rest.strip_suffix(']'))
      {
        fields.insert(field.to_string(), Value::String(value.into_owned()));
      }
    }

    if !fields.is_empty() {
      return location_ref(Value::Object(fields)).map(Self::Location);
    }

    let plain = plain.ok_or_else(|| Error::BadRequest("missing data query parameter".into()))?;
    let trimmed = plain.trim();
    if trimmed.starts_with('{') {
      let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| Error::BadRequest(format!("data is not valid JSON: {}", e)))?;
      return location_ref(value).map(Self::Location);
    }
    if trimmed.is_empty() {
      return Err(Error::BadRequest("data must not be empty".into()));
    }
    Ok(Self::Search(trimmed.to_string()))
  }

  /// Search text, from either form.
  pub fn into_search(self) -> Result<String> {
    match self {
      Self::Search(query) => Ok(query),
      Self::Location(location) => location.search_query().map(str::to_string),
    }
  }

  /// The resolved location; plain search text is rejected.
  pub fn into_location(self) -> Result<LocationRef> {
    match self {
      Self::Location(location) => Ok(location),
      Self::Search(_) => Err(Error::BadRequest(
        "data must describe a location returned by /location".into(),
      )),
    }
  }
}

fn location_ref(value: Value) -> Result<LocationRef> {
  serde_json::from_value(value).map_err(|e| Error::BadRequest(format!("invalid location: {}", e)))
}
