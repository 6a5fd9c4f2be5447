//! Scripted fetcher for exercising the cache and routes without a network.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::client::{Fetch, FetchRequest};
use crate::error::{Error, Result};

#[derive(Clone)]
pub enum Reply {
  Json(Value),
  /// Non-2xx status
  Status(u16),
  /// Never answers
  Hang,
}

/// Answers per resource kind and records every request.
#[derive(Default)]
pub struct ScriptedFetch {
  replies: HashMap<&'static str, Reply>,
  delay: Duration,
  calls: AtomicUsize,
  requests: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedFetch {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn reply(mut self, resource: &'static str, reply: Reply) -> Self {
    self.replies.insert(resource, reply);
    self
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  /// (url, bearer) of every request so far.
  pub fn requests(&self) -> Vec<(String, Option<String>)> {
    self.requests.lock().unwrap().clone()
  }
}

#[async_trait]
impl Fetch for ScriptedFetch {
  async fn fetch_json(&self, request: &FetchRequest) -> Result<Value> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self
      .requests
      .lock()
      .unwrap()
      .push((request.url.clone(), request.bearer.clone()));

    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }

    match self.replies.get(request.resource).cloned() {
      Some(Reply::Json(body)) => Ok(body),
      Some(Reply::Status(status)) => Err(Error::upstream(
        request.resource,
        format!("HTTP {}", status),
      )),
      Some(Reply::Hang) => {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(Error::upstream(request.resource, "hung"))
      }
      None => Err(Error::upstream(request.resource, "no scripted reply")),
    }
  }
}
