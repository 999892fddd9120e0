use axum::{
  extract::{rejection::JsonRejection, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post},
  Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{error, warn};

use crate::agent::{AgentError, WeatherAgent, GENERIC_FAILURE};
use crate::schema::{PromptInput, WeatherResponse};

#[derive(Clone)]
pub struct AppState {
  pub agent: Arc<WeatherAgent>,
  pub strict_input: bool,
  /// Cancelled once the shutdown grace period runs out; every request runs under a child of it.
  pub abort: CancellationToken,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
  pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
  BadRequest(String),
  Agent(AgentError),
}

impl From<AgentError> for ApiError {
  fn from(err: AgentError) -> Self {
    ApiError::Agent(err)
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::BadRequest(message) => {
        (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message })).into_response()
      }
      ApiError::Agent(err) => {
        match &err {
          AgentError::ModelProtocolViolation => {
            warn!(kind = err.kind(), "model did not follow the tool calling contract")
          }
          _ => error!(kind = err.kind(), error = %err, "weather request failed"),
        }
        (StatusCode::INTERNAL_SERVER_ERROR, Json(err.to_envelope())).into_response()
      }
    }
  }
}

pub fn create_router(state: AppState) -> Router {
  Router::new()
    .route("/agents/weather", post(get_current_weather).fallback(not_found))
    .route("/health", get(health))
    .fallback(not_found)
    .layer(CatchPanicLayer::custom(handle_panic))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn get_current_weather(
  State(state): State<AppState>,
  body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<WeatherResponse>, ApiError> {
  let Json(raw) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
  let input = PromptInput::validate(raw, state.strict_input)
    .map_err(|err| ApiError::BadRequest(err.to_string()))?;

  // A client disconnect drops this future and the provider call with it.
  let cancel = state.abort.child_token();

  let response = state.agent.run(&input, &cancel).await?;
  Ok(Json(response))
}

/// Serves `app` until `shutdown` fires, then lets in-flight requests drain for up to
/// `grace` before cancelling `abort`.
pub async fn serve(
  listener: TcpListener,
  app: Router,
  shutdown: CancellationToken,
  abort: CancellationToken,
  grace: Duration,
) -> std::io::Result<()> {
  let deadline = {
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
      shutdown.cancelled().await;
      tokio::time::sleep(grace).await;
      warn!(?grace, "grace period elapsed, aborting in-flight requests");
      abort.cancel();
    })
  };

  let result = axum::serve(listener, app)
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await;
  deadline.abort();
  result
}

async fn health() -> Json<Value> {
  Json(json!({
    "status": "ok",
    "version": env!("CARGO_PKG_VERSION"),
  }))
}

async fn not_found() -> (StatusCode, Json<ErrorBody>) {
  (
    StatusCode::NOT_FOUND,
    Json(ErrorBody {
      error: String::from("Not Found"),
    }),
  )
}

fn handle_panic(_payload: Box<dyn Any + Send + 'static>) -> Response {
  error!("handler panicked");
  (
    StatusCode::INTERNAL_SERVER_ERROR,
    Json(WeatherResponse::failure(GENERIC_FAILURE)),
  )
    .into_response()
}
