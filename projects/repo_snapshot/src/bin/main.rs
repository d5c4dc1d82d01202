use anyhow::Result;
use axum::serve;
use projects_repo_snapshot::{
    app::{build_http_client, build_router, AppState},
    config::{AppConfig, ConfigError},
    db::{build_pool, prepare_database, BuildPoolError, EnsureSchemaError},
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MainError {
    #[error("Config: {source}")]
    Config {
        #[source]
        source: ConfigError,
    },
    #[error("TracingInit: {source}")]
    TracingInit {
        #[source]
        source: utils_trace::TracingInitError,
    },
    #[error("BuildPool: {source}")]
    BuildPool {
        #[source]
        source: BuildPoolError,
    },
    #[error("EnsureSchema: {source}")]
    EnsureSchema {
        #[source]
        source: EnsureSchemaError,
    },
    #[error("SchemaTask: {source}")]
    SchemaTask {
        #[source]
        source: tokio::task::JoinError,
    },
    #[error("BuildHttpClient: {source}")]
    BuildHttpClient {
        #[source]
        source: reqwest::Error,
    },
    #[error("TcpListenerBind: {source}")]
    TcpListenerBind {
        #[source]
        source: std::io::Error,
    },
    #[error("Serve: {source}")]
    Serve {
        #[source]
        source: std::io::Error,
    },
}

#[tokio::main]
async fn main() -> Result<(), MainError> {
    // A missing .env is fine; the variables may come from the process.
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().map_err(|source| MainError::Config { source })?;

    utils_trace::init(&config.trace).map_err(|source| MainError::TracingInit { source })?;

    let pool = build_pool(&config.database).map_err(|source| MainError::BuildPool { source })?;

    let schema_pool = pool.clone();
    tokio::task::spawn_blocking(move || prepare_database(&schema_pool))
        .await
        .map_err(|source| MainError::SchemaTask { source })?
        .map_err(|source| MainError::EnsureSchema { source })?;
    info!("database schema ready");

    let http = build_http_client(&config.http)
        .map_err(|source| MainError::BuildHttpClient { source })?;

    let addr = config.server.bind_addr;
    let callback_path = config.server.callback_path.clone();
    let app = build_router(AppState::new(config, http, pool));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| MainError::TcpListenerBind { source })?;

    info!(%addr, %callback_path, "Server running");

    serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|source| MainError::Serve { source })?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
