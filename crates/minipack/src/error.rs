use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinipackError {
    // Verification errors
    #[error("Names must be unique, \"{name}\" is used more than once")]
    DuplicateName { name: String },

    // Construction errors
    #[error("{identifier} did not resolve to an npm package: {reason}")]
    Resolution { identifier: String, reason: String },

    #[error("Invalid dependency: {0}")]
    InvalidDependency(String),

    // Task errors
    #[error("\"{reason}\" when downloading {url}")]
    Download { url: String, reason: String },

    #[error("{0}")]
    Extraction(String),

    #[error("Failed to copy {}: {source}", path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Filesystem preparation and cleanup
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MinipackError {
    pub(crate) fn copy(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MinipackError::Copy {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MinipackError>;
