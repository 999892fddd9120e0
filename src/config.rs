use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::{RetryPolicy, ToolChoice};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-5";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("missing required environment variable {0}")]
  Missing(&'static str),
  #[error("invalid value for {key}: {value:?}")]
  Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
  Development,
  Production,
}

impl fmt::Display for Environment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Environment::Development => write!(f, "development"),
      Environment::Production => write!(f, "production"),
    }
  }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
  pub base_url: String,
  pub api_key: Option<String>,
  pub model: String,
  pub timeout: Duration,
  pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct Config {
  pub environment: Environment,
  pub bind_host: String,
  pub port: u16,
  pub provider: ProviderConfig,
  pub tool_choice: ToolChoice,
  pub strict_input: bool,
  /// How long in-flight requests may run after a shutdown signal.
  pub shutdown_grace: Duration,
}

impl Config {
  /// Reads `.env` (if any) and then the process environment.
  pub fn from_env() -> Result<Self, ConfigError> {
    dotenv::dotenv().ok();
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
    let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

    let environment = match get("APP_ENV").or_else(|| get("NODE_ENV")) {
      Some(value) if value.eq_ignore_ascii_case("development") => Environment::Development,
      _ => Environment::Production,
    };

    let (base_url, api_key, model) = match environment {
      Environment::Development => (
        require("LOCAL_BASE_URL")?,
        get("LOCAL_API_KEY"),
        require("LOCAL_MODEL_ID")?,
      ),
      Environment::Production => (
        get("OPENAI_BASE_URL").unwrap_or_else(|| OPENAI_BASE_URL.to_owned()),
        Some(require("OPENAI_API_KEY")?),
        get("OPENAI_MODEL_ID").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_owned()),
      ),
    };

    let timeout_secs: u64 = parse_or(&get, "PROVIDER_TIMEOUT_SECS", 30)?;
    let max_retries: u32 = parse_or(&get, "PROVIDER_MAX_RETRIES", 1)?;
    let backoff_ms: u64 = parse_or(&get, "PROVIDER_RETRY_BACKOFF_MS", 500)?;
    let grace_secs: u64 = parse_or(&get, "SHUTDOWN_GRACE_SECS", 10)?;

    Ok(Self {
      environment,
      bind_host: get("BIND_HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
      port: parse_or(&get, "PORT", 3000)?,
      provider: ProviderConfig {
        base_url,
        api_key,
        model,
        timeout: Duration::from_secs(timeout_secs),
        retry: RetryPolicy {
          max_retries,
          backoff: Duration::from_millis(backoff_ms),
        },
      },
      tool_choice: parse_or(&get, "TOOL_CHOICE", ToolChoice::Required)?,
      strict_input: parse_or(&get, "STRICT_INPUT", false)?,
      shutdown_grace: Duration::from_secs(grace_secs),
    })
  }

  pub fn bind_addr(&self) -> String {
    format!("{}:{}", self.bind_host, self.port)
  }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
  T: FromStr,
  G: Fn(&str) -> Option<String>,
{
  match get(key) {
    None => Ok(default),
    Some(value) => value
      .trim()
      .parse()
      .map_err(|_| ConfigError::Invalid { key, value }),
  }
}
