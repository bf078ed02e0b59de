//! Error types for schema resolution and form data validation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors during schema resolution.
///
/// Only broken schemas are fatal. Mergeable conflicts (incompatible `type`
/// values in `allOf`, form data that does not match an
/// `additionalProperties` schema) degrade with a logged warning instead.
#[derive(Debug, Error)]
pub enum ResolveError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    // Schema errors (exit code 2)
    #[error("could not find a definition for {reference}")]
    ReferenceNotFound { reference: String },

    #[error("invalid $ref pointer {reference}: expected a #/-rooted JSON Pointer")]
    InvalidReference { reference: String },

    #[error("recursion limit reached while resolving {reference}: possible $ref cycle")]
    DepthExceeded { reference: String },

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::FileNotFound { .. } | ResolveError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            ResolveError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors during form data validation.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<ValidationIssue> },
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Resolve(e) => e.exit_code(),
            ValidateError::Invalid { .. } => 1,
        }
    }
}

/// Single validation error with field context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationIssue {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}
