use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use reqwest::Client;
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, HttpClientConfig};
use crate::db::PgPool;
use crate::endpoints::github::{
    authorize::index::handler as github_authorize_handler,
    callback::index::handler as github_callback_handler,
};
use crate::endpoints::health::index::handler as health_handler;

/// Path GitHub may redirect to regardless of `CALLBACK_PATH`.
pub const DEFAULT_CALLBACK_ROUTE: &str = "/callback";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub http: Client,
    pub pool: PgPool,
}

impl AppState {
    pub fn new(config: AppConfig, http: Client, pool: PgPool) -> Self {
        Self {
            config: Arc::new(config),
            http,
            pool,
        }
    }
}

pub fn build_http_client(config: &HttpClientConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()
}

pub fn build_router(state: AppState) -> Router {
    let callback_path = state.config.server.callback_path.clone();

    let mut router = Router::new()
        .route("/", get(github_authorize_handler))
        .route("/health", get(health_handler))
        .route(&callback_path, get(github_callback_handler));

    if callback_path != DEFAULT_CALLBACK_ROUTE {
        router = router.route(DEFAULT_CALLBACK_ROUTE, get(github_callback_handler));
    }

    router
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}
