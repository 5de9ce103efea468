//! Error types for semtab.
//!
//! Library crates use [`SemtabError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all semtab operations.
#[derive(Debug, thiserror::Error)]
pub enum SemtabError {
    /// A key the table or a service response must carry is absent.
    #[error("structural error: {message}")]
    Structural { message: String },

    /// A service id or prefix is not present in the catalog.
    #[error("lookup error: {message}")]
    Lookup { message: String },

    /// An extension response carries more columns than names were supplied.
    #[error("arity error: {columns} response columns but only {names} new column names")]
    Arity { columns: usize, names: usize },

    /// Network/HTTP failure while talking to a service.
    #[error("transport error: {0}")]
    Transport(String),

    /// A service or file payload could not be decoded.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Caller-supplied arguments are unusable.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SemtabError>;

impl SemtabError {
    /// Create a structural error from any displayable message.
    pub fn structural(msg: impl Into<String>) -> Self {
        Self::Structural {
            message: msg.into(),
        }
    }

    /// Create a lookup error from any displayable message.
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup {
            message: msg.into(),
        }
    }

    /// Create a decode error from any displayable message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
