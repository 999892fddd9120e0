use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallFunction {
  pub name: String,
  /// JSON-encoded argument object, exactly as the model produced it.
  #[serde(default)]
  pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
  pub id: String,
  #[serde(rename = "type", default = "function_kind")]
  pub kind: String,
  pub function: ToolCallFunction,
}

fn function_kind() -> String {
  String::from("function")
}

impl ToolCall {
  pub fn is_function(&self) -> bool {
    self.kind == "function"
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
  Developer {
    content: String,
  },
  User {
    content: String,
  },
  Assistant {
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCall>>,
  },
  Tool {
    tool_call_id: String,
    content: String,
  },
}

impl ChatMessage {
  pub fn developer(content: &str) -> Self {
    ChatMessage::Developer {
      content: content.to_owned(),
    }
  }

  pub fn user(content: &str) -> Self {
    ChatMessage::User {
      content: content.to_owned(),
    }
  }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("tool result references call {0}, which the preceding assistant message did not make")]
pub struct UnmatchedToolCall(pub String);

/// Append-only message list for a single request.
#[derive(Debug, Clone)]
pub struct Conversation {
  messages: Vec<ChatMessage>,
}

impl Conversation {
  pub fn new(instructions: &str, prompt: &str) -> Self {
    Self {
      messages: vec![ChatMessage::developer(instructions), ChatMessage::user(prompt)],
    }
  }

  pub fn messages(&self) -> &[ChatMessage] {
    &self.messages
  }

  pub fn len(&self) -> usize {
    self.messages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.messages.is_empty()
  }

  pub fn push_assistant(&mut self, content: Option<String>, tool_calls: Vec<ToolCall>) {
    let tool_calls = if tool_calls.is_empty() {
      None
    } else {
      Some(tool_calls)
    };
    self.messages.push(ChatMessage::Assistant { content, tool_calls });
  }

  pub fn push_tool_result(&mut self, call_id: &str, content: String) -> Result<(), UnmatchedToolCall> {
    let matched = match self.messages.last() {
      Some(ChatMessage::Assistant {
        tool_calls: Some(calls),
        ..
      }) => calls.iter().any(|call| call.id == call_id),
      _ => false,
    };
    if !matched {
      return Err(UnmatchedToolCall(call_id.to_owned()));
    }
    self.messages.push(ChatMessage::Tool {
      tool_call_id: call_id.to_owned(),
      content,
    });
    Ok(())
  }
}
