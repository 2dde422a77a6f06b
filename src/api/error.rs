use std::path::PathBuf;

use super::validation::InputErrors;

/// Failures of the command-line and HTTP adapters. The engine itself has no
/// error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid input: {0}")]
    Input(#[from] InputErrors),

    #[error("failed to serialize result: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("server error: {0}")]
    Server(#[source] std::io::Error),
}
