//! Unified error handling for chromadiff
//!
//! Most diff operations absorb failures into empty sentinel images. This
//! type exists for the places that report causes explicitly: decoding,
//! configuration loading, identifier parsing and the command-line driver.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for all chromadiff operations
#[derive(Error, Debug)]
pub enum Error {
    // ==================== I/O Errors ====================

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    // ==================== Decode Errors ====================

    /// Image could not be decoded (missing, unsupported or corrupt)
    #[error("Failed to decode {path}: {message}")]
    Decode {
        path: PathBuf,
        message: String,
    },

    // ==================== Diff Errors ====================

    /// Source images do not share the same dimensions
    #[error("Size mismatch: {left} vs {right}")]
    SizeMismatch {
        left: crate::ImageSize,
        right: crate::ImageSize,
    },

    // ==================== Store Errors ====================

    /// Identifier is not present in the store
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    /// Identifier does not follow `scheme://store-name/entry-name`
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    // ==================== Configuration Errors ====================

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        message: String,
    },

    // ==================== General Errors ====================

    /// Background task ended without producing a result
    #[error("Task disconnected: {message}")]
    TaskDisconnected {
        message: String,
    },

    /// Custom error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a decode error
    pub fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            message: message.into(),
        }
    }

    /// Check if this is a "not found" type error
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::FileNotFound(_) | Error::UnknownIdentifier(_) => true,
            Error::WithContext { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error was caused by the inputs of a diff request
    pub fn is_input_error(&self) -> bool {
        match self {
            Error::Decode { .. } | Error::SizeMismatch { .. } => true,
            Error::WithContext { source, .. } => source.is_input_error(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
