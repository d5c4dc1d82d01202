use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use thiserror::Error;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Logging settings. `RUST_LOG`, when set, wins over `level`.
#[derive(Debug, Clone)]
pub struct TraceConfig {
    pub level: String,
    /// Also append plain-text logs to this file.
    pub log_file: Option<PathBuf>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
        }
    }
}

pub fn init(config: &TraceConfig) -> Result<(), TracingInitError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|source| TracingInitError::InvalidFilter { source })?;

    let file_layer = match &config.log_file {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(open_log_file(path)?)),
        ),
        None => None,
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|source| TracingInitError::SetGlobalDefault { source })?;

    Ok(())
}

fn open_log_file(path: &Path) -> Result<File, TracingInitError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| TracingInitError::OpenLogFile {
            path: path.to_path_buf(),
            source,
        })
}

#[derive(Debug, Error)]
pub enum TracingInitError {
    #[error("Invalid filter config")]
    InvalidFilter {
        #[from]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("Failed to open log file {path:?}")]
    OpenLogFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to set global default subscriber")]
    SetGlobalDefault {
        #[from]
        source: tracing::subscriber::SetGlobalDefaultError,
    },
}
