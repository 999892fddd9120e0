use async_trait::async_trait;
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::utils::message::ChatMessage;
use crate::utils::response::CompletionResponse;

pub mod agent;
pub mod config;
pub mod schema;
pub mod server;
pub mod utils;

pub use agent::{AgentError, WeatherAgent};
pub use utils::message::Conversation;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("provider request failed: {0}")]
  FetchError(#[from] reqwest::Error),
  #[error("provider returned {status}: {body}")]
  Status { status: u16, body: String },
  #[error("could not decode provider response: {0}")]
  DecodeError(#[from] serde_json::Error),
  #[error("provider call was cancelled")]
  Cancelled,
}

impl Error {
  /// Transport failures, timeouts, 429 and 5xx are worth another attempt.
  pub fn is_retryable(&self) -> bool {
    match self {
      Error::FetchError(_) => true,
      Error::Status { status, .. } => *status == 429 || *status >= 500,
      Error::DecodeError(_) | Error::Cancelled => false,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolChoice {
  Auto,
  #[default]
  Required,
}

impl ToolChoice {
  pub fn as_str(&self) -> &'static str {
    match self {
      ToolChoice::Auto => "auto",
      ToolChoice::Required => "required",
    }
  }
}

impl FromStr for ToolChoice {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "auto" => Ok(ToolChoice::Auto),
      "required" => Ok(ToolChoice::Required),
      other => Err(format!("unknown tool choice: {}", other)),
    }
  }
}

/// One chat completion call. The model identifier is owned by the client.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
  pub messages: Vec<ChatMessage>,
  pub tools: Vec<Value>,
  pub tool_choice: Option<ToolChoice>,
  pub response_format: Option<Value>,
}

impl CompletionRequest {
  pub fn body(&self, model: &str) -> Value {
    let mut body = json!({
      "model": model,
      "messages": self.messages,
    });
    if !self.tools.is_empty() {
      body["tools"] = Value::Array(self.tools.clone());
      if let Some(choice) = self.tool_choice {
        body["tool_choice"] = json!(choice.as_str());
      }
    }
    if let Some(format) = &self.response_format {
      body["response_format"] = format.clone();
    }
    body
  }
}

#[async_trait]
pub trait ChatCompletions: Send + Sync {
  async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error>;
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
  pub max_retries: u32,
  pub backoff: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_retries: 1,
      backoff: Duration::from_millis(500),
    }
  }
}

impl RetryPolicy {
  pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
    self.backoff * attempt.max(1)
  }
}

/// OpenAI-compatible chat completions client, shared by every request.
pub struct OpenAiClient {
  http: reqwest::Client,
  base_url: String,
  api_key: Option<String>,
  model: String,
  retry: RetryPolicy,
}

impl OpenAiClient {
  pub fn new(config: &ProviderConfig) -> Result<Self, Error> {
    let http = reqwest::Client::builder().timeout(config.timeout).build()?;
    Ok(Self {
      http,
      base_url: config.base_url.clone(),
      api_key: config.api_key.clone(),
      model: config.model.clone(),
      retry: config.retry.clone(),
    })
  }

  pub fn model(&self) -> &str {
    &self.model
  }

  fn get_endpoint(&self) -> String {
    format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
  }

  async fn send_request(&self, body: &Value) -> Result<CompletionResponse, Error> {
    let mut req = self
      .http
      .post(self.get_endpoint())
      .header("content-type", "application/json")
      .json(body);
    if let Some(key) = &self.api_key {
      req = req.bearer_auth(key);
    }
    let resp = req.send().await?;
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
      return Err(Error::Status {
        status: status.as_u16(),
        body: text,
      });
    }
    Ok(serde_json::from_str(&text)?)
  }
}

#[async_trait]
impl ChatCompletions for OpenAiClient {
  async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error> {
    let body = request.body(&self.model);
    let mut attempt = 0;
    loop {
      match self.send_request(&body).await {
        Ok(resp) => return Ok(resp),
        Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
          attempt += 1;
          let delay = self.retry.delay_for_attempt(attempt);
          warn!(attempt, ?delay, error = %err, "provider call failed, retrying");
          tokio::time::sleep(delay).await;
        }
        Err(err) => {
          debug!(attempts = attempt + 1, "giving up on provider call");
          return Err(err);
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn body_omits_tool_fields_without_tools() {
    let request = CompletionRequest {
      messages: vec![ChatMessage::user("hi")],
      tools: vec![],
      tool_choice: Some(ToolChoice::Required),
      response_format: Some(json!({ "type": "json_schema" })),
    };
    let body = request.body("gpt-5");
    assert_eq!(body["model"], "gpt-5");
    assert!(body.get("tools").is_none());
    assert!(body.get("tool_choice").is_none());
    assert_eq!(body["response_format"]["type"], "json_schema");
  }

  #[test]
  fn body_carries_tool_choice_with_tools() {
    let request = CompletionRequest {
      messages: vec![ChatMessage::user("hi")],
      tools: vec![json!({ "type": "function" })],
      tool_choice: Some(ToolChoice::Auto),
      response_format: None,
    };
    let body = request.body("local-model");
    assert_eq!(body["tool_choice"], "auto");
    assert_eq!(body["tools"].as_array().map(Vec::len), Some(1));
    assert!(body.get("response_format").is_none());
  }

  #[test]
  fn retry_classification() {
    let server = Error::Status { status: 503, body: String::new() };
    let limited = Error::Status { status: 429, body: String::new() };
    let denied = Error::Status { status: 401, body: String::new() };
    assert!(server.is_retryable());
    assert!(limited.is_retryable());
    assert!(!denied.is_retryable());
    assert!(!Error::Cancelled.is_retryable());
  }

  #[test]
  fn tool_choice_parses() {
    assert_eq!("required".parse::<ToolChoice>(), Ok(ToolChoice::Required));
    assert_eq!(" AUTO ".parse::<ToolChoice>(), Ok(ToolChoice::Auto));
    assert!("none".parse::<ToolChoice>().is_err());
  }
}
