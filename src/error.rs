//! Error types for the review engine.
//!
//! Most invalid interactions are no-ops reported through return values; the
//! types here cover the few conditions that are genuine failures.

use std::path::PathBuf;

use thiserror::Error;

use crate::state::AnnotationId;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised by [`crate::state::AnnotationStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The id allocator handed out an id that is already stored.
    #[error("annotation id {0} is already present in the store")]
    DuplicateId(AnnotationId),

    /// The box is inverted, empty, or leaves the 0-1000 scale.
    #[error("annotation {0} has a malformed box")]
    InvalidBox(AnnotationId),

    #[error("annotation {0} not found")]
    NotFound(AnnotationId),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a configuration directory")]
    NoConfigDir,

    #[error("config I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level error used by the command-line front end.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl Error {
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
