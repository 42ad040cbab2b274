use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported recording version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

impl RecordingError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RecordingError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RecordingError>;
