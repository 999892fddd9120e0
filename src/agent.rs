//! Two-phase tool calling conversation.
//!
//! Phase one sends the prompt with the function registry and expects exactly one tool
//! call back. The matching local function runs and its result is appended to the
//! conversation. Phase two asks the model to compose the final answer under the
//! `WeatherResponse` JSON schema.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::schema::{response_format, ParseError, PromptInput, WeatherResponse};
use crate::utils::functions::{base::tools, FunctionCall, FunctionCallError};
use crate::utils::message::{Conversation, ToolCall, UnmatchedToolCall};
use crate::utils::response::{CompletionResponse, ResponseMessage};
use crate::{ChatCompletions, CompletionRequest, Error, RetryPolicy, ToolChoice};

pub const INSTRUCTIONS: &str = r#"You are a strict weather assistant.
- If the user asks for the weather in a city, CALL the "get_weather" tool with the city's name.
- Otherwise CALL the "return_error" tool with a short message like "Sorry, I can only answer weather questions."
Respond ONLY by calling one of those two tools.
When you compose the final answer, use the "remark" field for a short tip based on the condition and temperature."#;

pub const GENERIC_FAILURE: &str = "Something went wrong";
pub const UNRELIABLE_ANSWER: &str = "Could not get reliable weather information";

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
  #[error("provider returned no message")]
  EmptyReply,
  #[error("model replied without calling a tool")]
  ModelProtocolViolation,
  #[error("unsupported tool: {0}")]
  UnknownTool(String),
  #[error("invalid tool arguments: {0}")]
  InvalidArguments(#[source] FunctionCallError),
  #[error("could not encode tool output: {0}")]
  Encode(#[source] serde_json::Error),
  #[error(transparent)]
  Conversation(#[from] UnmatchedToolCall),
  #[error("final answer rejected: {0}")]
  Parse(#[from] ParseError),
  #[error(transparent)]
  Provider(#[from] Error),
}

impl From<FunctionCallError> for AgentError {
  fn from(err: FunctionCallError) -> Self {
    match err {
      FunctionCallError::Unknown(name) => AgentError::UnknownTool(name),
      other => AgentError::InvalidArguments(other),
    }
  }
}

impl AgentError {
  pub fn kind(&self) -> &'static str {
    match self {
      AgentError::EmptyReply => "empty_reply",
      AgentError::ModelProtocolViolation => "model_protocol_violation",
      AgentError::UnknownTool(_) => "unsupported_tool",
      AgentError::InvalidArguments(_) => "invalid_arguments",
      AgentError::Encode(_) => "encode",
      AgentError::Conversation(_) => "conversation",
      AgentError::Parse(_) => "parse",
      AgentError::Provider(Error::Cancelled) => "cancelled",
      AgentError::Provider(_) => "provider",
    }
  }

  /// What the client is told. Never carries provider details.
  pub fn to_envelope(&self) -> WeatherResponse {
    match self {
      AgentError::ModelProtocolViolation => WeatherResponse::failure(UNRELIABLE_ANSWER),
      AgentError::UnknownTool(name) => WeatherResponse::failure(format!("Unsupported tool: {}", name)),
      _ => WeatherResponse::failure(GENERIC_FAILURE),
    }
  }
}

pub struct WeatherAgent {
  provider: Arc<dyn ChatCompletions>,
  tool_choice: ToolChoice,
  retry: RetryPolicy,
  rng: Mutex<StdRng>,
}

impl WeatherAgent {
  pub fn new(provider: Arc<dyn ChatCompletions>, tool_choice: ToolChoice) -> Self {
    Self {
      provider,
      tool_choice,
      retry: RetryPolicy::default(),
      rng: Mutex::new(StdRng::from_entropy()),
    }
  }

  /// Policy for replies that arrive without a message.
  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  pub fn with_rng(mut self, rng: StdRng) -> Self {
    self.rng = Mutex::new(rng);
    self
  }

  pub async fn run(
    &self,
    input: &PromptInput,
    cancel: &CancellationToken,
  ) -> Result<WeatherResponse, AgentError> {
    let mut conversation = Conversation::new(INSTRUCTIONS, &input.prompt);

    let tool_call = self.decide_tool(&mut conversation, cancel).await?;
    self.dispatch(&mut conversation, &tool_call)?;
    self.finalize(&conversation, cancel).await
  }

  async fn decide_tool(
    &self,
    conversation: &mut Conversation,
    cancel: &CancellationToken,
  ) -> Result<ToolCall, AgentError> {
    let request = CompletionRequest {
      messages: conversation.messages().to_vec(),
      tools: tools(),
      tool_choice: Some(self.tool_choice),
      response_format: None,
    };
    let (content, tool_calls) = self.request_message(request, "tool_selection", cancel).await?.into_parts();
    let extra = tool_calls.len().saturating_sub(1);
    let tool_call = match tool_calls.into_iter().next() {
      Some(call) if call.is_function() => call,
      _ => {
        debug!(reply = ?content, "model did not return a function call, returning early");
        return Err(AgentError::ModelProtocolViolation);
      }
    };
    if extra > 0 {
      debug!(extra, "ignoring additional tool calls");
    }

    // Only the honored call is recorded so every call in the history has a result.
    conversation.push_assistant(content, vec![tool_call.clone()]);
    Ok(tool_call)
  }

  fn dispatch(&self, conversation: &mut Conversation, tool_call: &ToolCall) -> Result<(), AgentError> {
    let call = FunctionCall::parse(&tool_call.function.name, &tool_call.function.arguments)?;
    info!(
      function = call.name().as_str(),
      arguments = %tool_call.function.arguments,
      "dispatching function call"
    );

    let output = {
      let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
      call.execute(&mut *rng)
    };
    let content = serde_json::to_string(&output).map_err(AgentError::Encode)?;
    conversation.push_tool_result(&tool_call.id, content)?;
    Ok(())
  }

  async fn finalize(
    &self,
    conversation: &Conversation,
    cancel: &CancellationToken,
  ) -> Result<WeatherResponse, AgentError> {
    let request = CompletionRequest {
      messages: conversation.messages().to_vec(),
      tools: Vec::new(),
      tool_choice: None,
      response_format: Some(response_format()),
    };
    let message = self.request_message(request, "final_answer", cancel).await?;
    let content = message.content.unwrap_or_default();
    Ok(WeatherResponse::parse(&content)?)
  }

  async fn request_message(
    &self,
    request: CompletionRequest,
    phase: &'static str,
    cancel: &CancellationToken,
  ) -> Result<ResponseMessage, AgentError> {
    let mut attempt = 0;
    loop {
      let response = self.call_provider(request.clone(), cancel).await?;
      info!(model = response.model_name(), phase, "provider call completed");
      if let Some(message) = response.into_message() {
        return Ok(message);
      }
      if attempt >= self.retry.max_retries {
        return Err(AgentError::EmptyReply);
      }
      attempt += 1;
      let delay = self.retry.delay_for_attempt(attempt);
      warn!(phase, attempt, ?delay, "provider returned no message, retrying");
      tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(AgentError::Provider(Error::Cancelled)),
        _ = tokio::time::sleep(delay) => {}
      }
    }
  }

  async fn call_provider(
    &self,
    request: CompletionRequest,
    cancel: &CancellationToken,
  ) -> Result<CompletionResponse, AgentError> {
    tokio::select! {
      biased;
      _ = cancel.cancelled() => {
        warn!("request cancelled before the provider answered");
        Err(AgentError::Provider(Error::Cancelled))
      }
      response = self.provider.complete(request) => Ok(response?),
    }
  }
}
