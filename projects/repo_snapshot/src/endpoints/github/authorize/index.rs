use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use interfaces_github_oauth::{authorize_url, AuthorizeUrlError};
use thiserror::Error;
use tracing::error;

use crate::app::AppState;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("AuthorizeUrl: {source}")]
    AuthorizeUrl {
        #[from]
        source: AuthorizeUrlError,
    },
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> axum::response::Response {
        error!(error = %self, "cannot start authorization");
        match self {
            HandlerError::AuthorizeUrl { source } => {
                (StatusCode::INTERNAL_SERVER_ERROR, source.to_string()).into_response()
            }
        }
    }
}

/// Axum handler: GET /
pub async fn handler(Extension(state): Extension<AppState>) -> Result<Redirect, HandlerError> {
    let url = authorize_url(&state.config.oauth)?;
    Ok(Redirect::to(url.as_str()))
}
