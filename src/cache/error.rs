use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store `{name}` is unavailable: {reason}")]
    Unavailable { name: String, reason: String },
    #[error("failed to access cache snapshot `{path}`: {source}")]
    SnapshotIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache snapshot `{path}` is malformed: {reason}")]
    SnapshotFormat { path: PathBuf, reason: String },
}

impl CacheError {
    pub fn unavailable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn snapshot_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SnapshotIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn snapshot_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SnapshotFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
