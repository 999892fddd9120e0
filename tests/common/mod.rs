#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use weather_agent::utils::response::CompletionResponse;
use weather_agent::{ChatCompletions, CompletionRequest, Error};

/// Replays canned provider replies in order and records every request.
#[derive(Default)]
pub struct ScriptedProvider {
  replies: Mutex<VecDeque<Result<CompletionResponse, Error>>>,
  requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
  pub fn new(replies: Vec<Result<CompletionResponse, Error>>) -> Self {
    Self {
      replies: Mutex::new(replies.into()),
      requests: Mutex::new(Vec::new()),
    }
  }

  pub fn calls(&self) -> usize {
    self.requests.lock().unwrap().len()
  }

  pub fn request(&self, index: usize) -> CompletionRequest {
    self.requests.lock().unwrap()[index].clone()
  }
}

#[async_trait]
impl ChatCompletions for ScriptedProvider {
  async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error> {
    self.requests.lock().unwrap().push(request);
    self
      .replies
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or_else(|| Ok(CompletionResponse::default()))
  }
}

/// Never answers; used to observe cancellation.
pub struct HangingProvider;

#[async_trait]
impl ChatCompletions for HangingProvider {
  async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, Error> {
    std::future::pending().await
  }
}

/// Answers from a script, but only after `delay`.
pub struct SlowProvider {
  pub delay: Duration,
  pub inner: ScriptedProvider,
}

#[async_trait]
impl ChatCompletions for SlowProvider {
  async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error> {
    tokio::time::sleep(self.delay).await;
    self.inner.complete(request).await
  }
}

pub fn completion(raw: Value) -> Result<CompletionResponse, Error> {
  Ok(serde_json::from_value(raw).unwrap())
}

pub fn tool_call_reply(id: &str, name: &str, arguments: Value) -> Result<CompletionResponse, Error> {
  completion(json!({
    "model": "test-model",
    "choices": [{
      "message": {
        "role": "assistant",
        "content": null,
        "tool_calls": [{
          "id": id,
          "type": "function",
          "function": { "name": name, "arguments": arguments.to_string() }
        }]
      }
    }]
  }))
}

pub fn text_reply(content: &str) -> Result<CompletionResponse, Error> {
  completion(json!({
    "model": "test-model",
    "choices": [{ "message": { "role": "assistant", "content": content } }]
  }))
}

pub fn empty_reply() -> Result<CompletionResponse, Error> {
  completion(json!({ "model": "test-model", "choices": [] }))
}
