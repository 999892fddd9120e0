use lazy_static::lazy_static;
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use super::get_weather::{get_weather, get_weather_fn, GetWeatherArgs};
use super::return_error::{return_error, return_error_fn, ReturnErrorArgs};
use crate::schema::{WeatherFact, WeatherResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionDeclarationName {
  GetWeather,
  ReturnError,
}

impl FunctionDeclarationName {
  pub const ALL: [FunctionDeclarationName; 2] =
    [FunctionDeclarationName::GetWeather, FunctionDeclarationName::ReturnError];

  pub fn as_str(&self) -> &'static str {
    match self {
      FunctionDeclarationName::GetWeather => "get_weather",
      FunctionDeclarationName::ReturnError => "return_error",
    }
  }

  pub fn declaration(&self) -> FunctionDeclaration {
    match self {
      FunctionDeclarationName::GetWeather => get_weather_fn(),
      FunctionDeclarationName::ReturnError => return_error_fn(),
    }
  }
}

impl fmt::Display for FunctionDeclarationName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for FunctionDeclarationName {
  type Err = FunctionCallError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    FunctionDeclarationName::ALL
      .into_iter()
      .find(|name| name.as_str() == s)
      .ok_or_else(|| FunctionCallError::Unknown(s.to_owned()))
  }
}

#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
  pub name: FunctionDeclarationName,
  pub description: String,
  pub parameters: Value,
}

impl FunctionDeclaration {
  /// Chat completions `tools` entry.
  pub fn to_tool(&self) -> Value {
    json!({
      "type": "function",
      "function": {
        "name": self.name.as_str(),
        "description": self.description,
        "parameters": self.parameters
      }
    })
  }
}

lazy_static! {
  pub static ref FUNCTIONS: Vec<FunctionDeclaration> = FunctionDeclarationName::ALL
    .iter()
    .map(FunctionDeclarationName::declaration)
    .collect();
}

pub fn tools() -> Vec<Value> {
  FUNCTIONS.iter().map(FunctionDeclaration::to_tool).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum FunctionCallError {
  #[error("unsupported tool: {0}")]
  Unknown(String),
  #[error("invalid arguments for {name}: {source}")]
  Arguments {
    name: FunctionDeclarationName,
    #[source]
    source: serde_json::Error,
  },
}

/// A model-requested call, resolved against the registry with typed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionCall {
  GetWeather(GetWeatherArgs),
  ReturnError(ReturnErrorArgs),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FunctionOutput {
  Weather(WeatherFact),
  Error(WeatherResponse),
}

impl FunctionCall {
  pub fn parse(name: &str, arguments: &str) -> Result<Self, FunctionCallError> {
    let name: FunctionDeclarationName = name.parse()?;
    let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };
    let invalid = |source| FunctionCallError::Arguments { name, source };
    match name {
      FunctionDeclarationName::GetWeather => {
        serde_json::from_str(arguments).map(FunctionCall::GetWeather).map_err(invalid)
      }
      FunctionDeclarationName::ReturnError => {
        serde_json::from_str(arguments).map(FunctionCall::ReturnError).map_err(invalid)
      }
    }
  }

  pub fn name(&self) -> FunctionDeclarationName {
    match self {
      FunctionCall::GetWeather(_) => FunctionDeclarationName::GetWeather,
      FunctionCall::ReturnError(_) => FunctionDeclarationName::ReturnError,
    }
  }

  pub fn execute<R: Rng + ?Sized>(&self, rng: &mut R) -> FunctionOutput {
    match self {
      FunctionCall::GetWeather(args) => FunctionOutput::Weather(get_weather(args, rng)),
      FunctionCall::ReturnError(args) => FunctionOutput::Error(return_error(args)),
    }
  }
}
