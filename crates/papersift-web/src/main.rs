use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use papersift_core::{ModelBackend, OllamaClient, Pipeline, config_file};
use papersift_web::{AppState, build_router, spawn_session_reaper};

const SESSION_SWEEP_PERIOD: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = config_file::resolve(&config_file::load_config()).apply_env();

    let ollama: Arc<dyn ModelBackend> = Arc::new(
        OllamaClient::new(reqwest::Client::new(), &config.ollama_url)
            .with_timeout(config.request_timeout_secs.map(Duration::from_secs)),
    );
    tracing::info!(ollama = %config.ollama_url, model = %config.model, "model backend configured");

    let addr: SocketAddr = config.bind.parse()?;
    let extractor = papersift_ingest::default_extractor(&config);
    let pipeline = Pipeline::new(config, extractor, ollama.clone());
    let state = Arc::new(AppState::new(pipeline, ollama));
    spawn_session_reaper(&state, SESSION_SWEEP_PERIOD);

    let app = build_router(state);

    tracing::info!("Listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
