use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result as EyreResult};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::form_urlencoded;

use crate::error::{Error, Result};

/// One upstream GET: target URL plus optional bearer credential.
#[derive(Clone)]
pub struct FetchRequest {
  /// Resource kind, used in errors
  pub resource: &'static str,
  pub url: String,
  pub bearer: Option<String>,
}

impl FetchRequest {
  pub fn new(resource: &'static str, url: impl Into<String>) -> Self {
    Self {
      resource,
      url: url.into(),
      bearer: None,
    }
  }

  pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
    self.bearer = Some(token.into());
    self
  }
}

/// Issues upstream requests and returns the parsed JSON body.
#[async_trait]
pub trait Fetch: Send + Sync {
  async fn fetch_json(&self, request: &FetchRequest) -> Result<Value>;
}

/// Substitute `{name}` placeholders with percent-encoded values.
pub fn expand_template(template: &str, params: &[(&str, &str)]) -> String {
  params.iter().fold(template.to_string(), |url, (name, value)| {
    url.replace(&format!("{{{}}}", name), &encode(value))
  })
}

fn encode(value: &str) -> String {
  // form encoding writes spaces as '+' and escapes literal '+' as %2B
  form_urlencoded::byte_serialize(value.as_bytes())
    .collect::<String>()
    .replace('+', "%20")
}

/// reqwest-backed fetcher
#[derive(Clone)]
pub struct UpstreamClient {
  client: reqwest::Client,
}

impl UpstreamClient {
  pub fn new(timeout: Duration) -> EyreResult<Self> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("city-explorer/", env!("CARGO_PKG_VERSION")))
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

#[async_trait]
impl Fetch for UpstreamClient {
  async fn fetch_json(&self, request: &FetchRequest) -> Result<Value> {
    let resource = request.resource;
    debug!(resource, "fetching upstream");

    let mut builder = self.client.get(&request.url);
    if let Some(token) = &request.bearer {
      builder = builder.bearer_auth(token);
    }

    // URLs carry credentials, keep them out of error messages
    let resp = builder
      .send()
      .await
      .map_err(|e| Error::upstream(resource, e.without_url()))?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      let snippet: String = body.chars().take(200).collect();
      return Err(Error::upstream(
        resource,
        format!("HTTP {}: {}", status, snippet),
      ));
    }

    let bytes = resp
      .bytes()
      .await
      .map_err(|e| Error::upstream(resource, e.without_url()))?;

    serde_json::from_slice(&bytes).map_err(|e| Error::malformed(resource, e))
  }
}
