use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Failure category surfaced across the adapter boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputNotFound,
    OutputExists,
    UnsupportedFormat,
    ConversionFailed,
    OutputWriteFailed,
    DuplicateOutput,
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("{}: no such file", .0.display())]
    InputNotFound(PathBuf),

    #[error("{}: file already exists", .0.display())]
    OutputExists(PathBuf),

    #[error("{}: unsupported format ({reason})", path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("{}: {message}", path.display())]
    ConversionFailed { path: PathBuf, message: String },

    #[error("{}: write failed: {source}", path.display())]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: output path used by more than one job", .0.display())]
    DuplicateOutput(PathBuf),
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::InputNotFound(_) => ErrorKind::InputNotFound,
            ConvertError::OutputExists(_) => ErrorKind::OutputExists,
            ConvertError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            ConvertError::ConversionFailed { .. } => ErrorKind::ConversionFailed,
            ConvertError::OutputWriteFailed { .. } => ErrorKind::OutputWriteFailed,
            ConvertError::DuplicateOutput(_) => ErrorKind::DuplicateOutput,
        }
    }

    /// Wraps an internal engine failure, keeping the full context chain in the message.
    pub fn conversion(path: impl Into<PathBuf>, err: anyhow::Error) -> Self {
        ConvertError::ConversionFailed {
            path: path.into(),
            message: format!("{err:#}"),
        }
    }

    /// Maps a failed output write. Losing a create-new race counts as `OutputExists`.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::AlreadyExists {
            return ConvertError::OutputExists(path);
        }
        ConvertError::OutputWriteFailed { path, source }
    }
}

pub type ConvertResult<T> = std::result::Result<T, ConvertError>;
