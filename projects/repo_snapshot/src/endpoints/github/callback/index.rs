use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use interfaces_github_oauth::{exchange_code, TokenExchangeError};
use interfaces_github_user::{fetch_user_resources, FetchCall, FetchError};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::app::AppState;
use crate::db::snapshot::{persist_snapshot, PersistenceError};
use crate::utils::{
    csv_export::{render_csv, CsvExport, ExportError},
    normalize::{normalize_snapshot, NormalizationError},
};

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("CodeMissing: callback carried no authorization code")]
    CodeMissing,

    #[error("AuthorizationDenied: {error}: {description}")]
    AuthorizationDenied { error: String, description: String },

    #[error(transparent)]
    IngestAndExport {
        #[from]
        source: IngestAndExportError,
    },
}

impl HandlerError {
    pub fn stage(&self) -> &'static str {
        match self {
            HandlerError::CodeMissing | HandlerError::AuthorizationDenied { .. } => "authorize",
            HandlerError::IngestAndExport { source } => source.stage(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            HandlerError::CodeMissing | HandlerError::AuthorizationDenied { .. } => {
                StatusCode::BAD_REQUEST
            }
            HandlerError::IngestAndExport { source } => match source {
                IngestAndExportError::TokenExchange { .. }
                | IngestAndExportError::Fetch { .. }
                | IngestAndExportError::Normalization { .. } => StatusCode::BAD_GATEWAY,
                IngestAndExportError::Persistence { .. } | IngestAndExportError::Export { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> axum::response::Response {
        let stage = self.stage();
        error!(stage, error = %self, "ingestion cycle failed");
        (
            self.status(),
            Json(json!({ "stage": stage, "error": self.to_string() })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Axum handler: GET /github/callback
pub async fn handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<CsvExport, HandlerError> {
    if let Some(error) = query.error {
        return Err(HandlerError::AuthorizationDenied {
            error,
            description: query.error_description.unwrap_or_default(),
        });
    }

    let code = query
        .code
        .filter(|code| !code.trim().is_empty())
        .ok_or(HandlerError::CodeMissing)?;

    Ok(ingest_and_export(&state, &code).await?)
}

#[derive(Debug, Error)]
pub enum IngestAndExportError {
    #[error("TokenExchange: {source}")]
    TokenExchange {
        #[from]
        source: TokenExchangeError,
    },

    #[error("{source}")]
    Fetch {
        #[from]
        source: FetchError,
    },

    #[error("Normalization: {source}")]
    Normalization {
        #[from]
        source: NormalizationError,
    },

    #[error("Persistence: {source}")]
    Persistence {
        #[from]
        source: PersistenceError,
    },

    #[error("Export: {source}")]
    Export {
        #[from]
        source: ExportError,
    },
}

impl IngestAndExportError {
    pub fn stage(&self) -> &'static str {
        match self {
            IngestAndExportError::TokenExchange { .. } => "token_exchange",
            IngestAndExportError::Fetch { source } => match source.call {
                FetchCall::Identity => "fetch_identity",
                FetchCall::Resources => "fetch_resources",
            },
            IngestAndExportError::Normalization { .. } => "normalization",
            IngestAndExportError::Persistence { .. } => "persistence",
            IngestAndExportError::Export { .. } => "export",
        }
    }
}

#[instrument(skip_all)]
pub async fn ingest_and_export(
    state: &AppState,
    code: &str,
) -> Result<CsvExport, IngestAndExportError> {
    let token = exchange_code(&state.http, &state.config.oauth, code).await?;

    let resources = fetch_user_resources(&state.http, &state.config.github_api, &token).await?;

    let snapshot = normalize_snapshot(&resources.identity, &resources.repositories)?;
    info!(
        owner_id = snapshot.owner.id,
        repositories = snapshot.repositories.len(),
        "normalized GitHub payloads"
    );

    let rows = persist_snapshot(&state.pool, snapshot).await?;

    let body = render_csv(&rows)?;
    info!(rows = rows.len(), bytes = body.len(), "export ready");

    Ok(CsvExport::new(body))
}
