//! Error types for session file persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or flushing the session file.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session file exists but could not be read.
    #[error("failed to read session file {path}: {source}")]
    Read {
        /// Session file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The session file has content that is not a serialized cookie set.
    #[error("session file {path} is corrupt: {source}")]
    Corrupt {
        /// Session file path.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The cookie set could not be serialized.
    #[error("failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The session file (or its directory) could not be written.
    #[error("failed to write session file {path}: {source}")]
    Write {
        /// Session file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl SessionError {
    /// Creates a read error.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a write error.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
