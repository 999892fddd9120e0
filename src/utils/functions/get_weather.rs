use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::base::{FunctionDeclaration, FunctionDeclarationName};
use crate::schema::{Condition, WeatherFact, MAX_TEMPERATURE, MIN_TEMPERATURE};

pub fn get_weather_fn() -> FunctionDeclaration {
  FunctionDeclaration {
    name: FunctionDeclarationName::GetWeather,
    description: String::from("Get current temperature for a given location."),
    parameters: serde_json::json!({
      "type": "object",
      "properties": {
        "city": { "type": "string" }
      },
      "required": ["city"],
      "additionalProperties": false
    }),
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetWeatherArgs {
  pub city: String,
}

/// Mock lookup: the city is only logged, the fact is drawn from `rng`.
pub fn get_weather<R: Rng + ?Sized>(args: &GetWeatherArgs, rng: &mut R) -> WeatherFact {
  debug!(city = %args.city, "get_weather called");
  let fact = WeatherFact {
    temperature: rng.gen_range(MIN_TEMPERATURE..=MAX_TEMPERATURE),
    condition: Condition::ALL[rng.gen_range(0..Condition::ALL.len())],
  };
  debug!(temperature = fact.temperature, condition = fact.condition.as_str(), "get_weather returning");
  fact
}
