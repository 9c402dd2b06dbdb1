/// Crate-wide error type for the outer layers (loader, persistence, UI).
/// The simulation core itself never fails once a session is built.

use std::path::PathBuf;

use thiserror::Error;

use crate::sim::level::LevelError;

#[derive(Debug, Error)]
pub enum CmanError {
    #[error("level error: {0}")]
    Level(#[from] LevelError),

    #[error("i/o error on {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bad json in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CmanError>;
