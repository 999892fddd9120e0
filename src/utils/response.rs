use serde::Deserialize;

use super::message::ToolCall;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionResponse {
  #[serde(default)]
  pub model: Option<String>,
  #[serde(default)]
  pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
  #[serde(default)]
  pub message: Option<ResponseMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
  #[serde(default)]
  pub content: Option<String>,
  #[serde(default)]
  pub tool_calls: Option<Vec<ToolCall>>,
}

impl CompletionResponse {
  pub fn model_name(&self) -> &str {
    self.model.as_deref().unwrap_or("unknown")
  }

  /// The first choice's message, if the provider sent one.
  pub fn into_message(self) -> Option<ResponseMessage> {
    self.choices.into_iter().next().and_then(|choice| choice.message)
  }
}

impl ResponseMessage {
  pub fn into_parts(self) -> (Option<String>, Vec<ToolCall>) {
    (self.content, self.tool_calls.unwrap_or_default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn reads_tool_call_reply() {
    let raw = json!({
      "id": "chatcmpl-1",
      "model": "gpt-5",
      "choices": [{
        "index": 0,
        "finish_reason": "tool_calls",
        "message": {
          "role": "assistant",
          "content": null,
          "refusal": null,
          "tool_calls": [{
            "id": "call_abc",
            "type": "function",
            "function": { "name": "get_weather", "arguments": "{\"city\":\"Tokyo\"}" }
          }]
        }
      }]
    });
    let resp: CompletionResponse = serde_json::from_value(raw).unwrap();
    assert_eq!(resp.model_name(), "gpt-5");
    let (content, calls) = resp.into_message().unwrap().into_parts();
    assert_eq!(content, None);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "call_abc");
    assert_eq!(calls[0].function.arguments, "{\"city\":\"Tokyo\"}");
  }

  #[test]
  fn null_tool_calls_and_missing_choices() {
    let resp: CompletionResponse =
      serde_json::from_value(json!({ "choices": [{ "message": { "content": "hi", "tool_calls": null } }] })).unwrap();
    let (content, calls) = resp.into_message().unwrap().into_parts();
    assert_eq!(content.as_deref(), Some("hi"));
    assert!(calls.is_empty());

    let empty: CompletionResponse = serde_json::from_value(json!({})).unwrap();
    assert_eq!(empty.model_name(), "unknown");
    assert!(empty.into_message().is_none());
  }
}
