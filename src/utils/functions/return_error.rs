use serde::{Deserialize, Serialize};

use super::base::{FunctionDeclaration, FunctionDeclarationName};
use crate::schema::WeatherResponse;

pub fn return_error_fn() -> FunctionDeclaration {
  FunctionDeclaration {
    name: FunctionDeclarationName::ReturnError,
    description: String::from(
      "Return an error when the user asks something that is NOT about the weather.",
    ),
    parameters: serde_json::json!({
      "type": "object",
      "properties": {
        "message": { "type": "string" }
      },
      "required": ["message"],
      "additionalProperties": false
    }),
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReturnErrorArgs {
  pub message: String,
}

pub fn return_error(args: &ReturnErrorArgs) -> WeatherResponse {
  WeatherResponse::failure(args.message.clone())
}
