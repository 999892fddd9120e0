use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use weather_agent::config::Config;
use weather_agent::server::{create_router, serve, AppState};
use weather_agent::{OpenAiClient, WeatherAgent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let config = Config::from_env()?;

  tracing_subscriber::registry()
    .with(fmt::layer().compact())
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,weather_agent=debug")))
    .init();

  let client = OpenAiClient::new(&config.provider)?;
  info!(
    environment = %config.environment,
    base_url = %config.provider.base_url,
    model = client.model(),
    tool_choice = config.tool_choice.as_str(),
    "provider client ready"
  );

  let agent = WeatherAgent::new(Arc::new(client), config.tool_choice)
    .with_retry(config.provider.retry.clone());

  let shutdown = CancellationToken::new();
  let abort = CancellationToken::new();
  let state = AppState {
    agent: Arc::new(agent),
    strict_input: config.strict_input,
    abort: abort.clone(),
  };
  let app = create_router(state);

  let listener = TcpListener::bind(config.bind_addr()).await?;
  info!("weather agent listening at http://{}", listener.local_addr()?);

  tokio::spawn(shutdown_signal(shutdown.clone()));
  serve(listener, app, shutdown, abort, config.shutdown_grace).await?;

  info!("server shutdown complete");
  Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
  let ctrl_c = async {
    signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
  };

  #[cfg(unix)]
  let terminate = async {
    signal::unix::signal(signal::unix::SignalKind::terminate())
      .expect("failed to install SIGTERM handler")
      .recv()
      .await;
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }

  info!("shutdown signal received");
  shutdown.cancel();
}
