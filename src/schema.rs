use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const MIN_TEMPERATURE: i32 = 1;
pub const MAX_TEMPERATURE: i32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
  #[error("Prompt is required")]
  MissingPrompt,
  #[error("Invalid request body: {0}")]
  Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PromptInput {
  #[serde(default)]
  pub prompt: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StrictPromptInput {
  #[serde(default)]
  prompt: String,
}

impl PromptInput {
  /// Unknown keys are ignored unless `strict` is set.
  pub fn validate(raw: Value, strict: bool) -> Result<Self, ValidationError> {
    let input = if strict {
      serde_json::from_value::<StrictPromptInput>(raw).map(|input| PromptInput {
        prompt: input.prompt,
      })
    } else {
      serde_json::from_value::<PromptInput>(raw)
    }
    .map_err(|err| ValidationError::Malformed(err.to_string()))?;

    if input.prompt.is_empty() {
      return Err(ValidationError::MissingPrompt);
    }
    Ok(input)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
  Sunny,
  Cloudy,
  Rainy,
  Snowy,
  Windy,
  Stormy,
}

impl Condition {
  pub const ALL: [Condition; 6] = [
    Condition::Sunny,
    Condition::Cloudy,
    Condition::Rainy,
    Condition::Snowy,
    Condition::Windy,
    Condition::Stormy,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Condition::Sunny => "sunny",
      Condition::Cloudy => "cloudy",
      Condition::Rainy => "rainy",
      Condition::Snowy => "snowy",
      Condition::Windy => "windy",
      Condition::Stormy => "stormy",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeatherFact {
  pub temperature: i32,
  pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeatherData {
  pub temperature: i32,
  pub condition: Condition,
  pub remark: String,
}

/// The envelope every client receives, success or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeatherResponse {
  pub success: bool,
  #[serde(rename = "weatherData")]
  pub weather_data: Option<WeatherData>,
  pub error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
  #[error("not a WeatherResponse: {0}")]
  Json(#[from] serde_json::Error),
  #[error("inconsistent envelope: {0}")]
  Envelope(&'static str),
}

impl WeatherResponse {
  pub fn failure(message: impl Into<String>) -> Self {
    Self {
      success: false,
      weather_data: None,
      error: Some(message.into()),
    }
  }

  /// `success` decides which of `weatherData` and `error` carries the payload.
  pub fn check(&self) -> Result<(), ParseError> {
    match (self.success, &self.weather_data, &self.error) {
      (true, Some(data), None) if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&data.temperature) => {
        Err(ParseError::Envelope("temperature out of range"))
      }
      (true, Some(_), None) => Ok(()),
      (true, None, _) => Err(ParseError::Envelope("success without weatherData")),
      (true, Some(_), Some(_)) => Err(ParseError::Envelope("success with an error")),
      (false, Some(_), _) => Err(ParseError::Envelope("failure with weatherData")),
      (false, None, Some(error)) if !error.trim().is_empty() => Ok(()),
      (false, None, _) => Err(ParseError::Envelope("failure without an error message")),
    }
  }

  pub fn parse(raw: &str) -> Result<Self, ParseError> {
    let response: WeatherResponse = serde_json::from_str(raw)?;
    response.check()?;
    Ok(response)
  }
}

lazy_static! {
  static ref CONDITION_NAMES: Vec<&'static str> = Condition::ALL.iter().map(Condition::as_str).collect();
  pub static ref WEATHER_RESPONSE_SCHEMA: Value = json!({
    "type": "object",
    "properties": {
      "success": { "type": "boolean" },
      "weatherData": {
        "anyOf": [
          {
            "type": "object",
            "properties": {
              "temperature": {
                "type": "integer",
                "minimum": MIN_TEMPERATURE,
                "maximum": MAX_TEMPERATURE
              },
              "condition": {
                "type": "string",
                "enum": CONDITION_NAMES.clone()
              },
              "remark": { "type": "string" }
            },
            "required": ["temperature", "condition", "remark"],
            "additionalProperties": false
          },
          { "type": "null" }
        ]
      },
      "error": {
        "anyOf": [{ "type": "string" }, { "type": "null" }]
      }
    },
    "required": ["success", "weatherData", "error"],
    "additionalProperties": false
  });
}

/// `response_format` constraining a completion to [`WeatherResponse`].
pub fn response_format() -> Value {
  json!({
    "type": "json_schema",
    "json_schema": {
      "name": "WeatherResponse",
      "strict": true,
      "schema": WEATHER_RESPONSE_SCHEMA.clone()
    }
  })
}
