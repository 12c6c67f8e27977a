//! Error types for the Beanmorph core library
//!
//! Every failure of a transformation surfaces as exactly one [`Error`] variant.
//! Variants that relate to a destination location carry the dotted field path
//! (for example `dept.manager.name` or `tags[2]`) so nested failures can be
//! diagnosed from the top-level call site.

use crate::transform::validator::ConstraintViolation;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for Beanmorph operations
#[derive(Error, Debug)]
pub enum Error {
    /// Bad call-site input (non-object source, immutable target for in-place population)
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The type cannot be introspected into a known construction shape
    #[error("Unsupported shape for type '{type_name}': {message}")]
    UnsupportedShape { type_name: String, message: String },

    /// A configured source path does not resolve against the source shape
    #[error("Invalid mapping for '{path}': source path '{source_path}' {message}")]
    InvalidMapping {
        path: String,
        source_path: String,
        message: String,
    },

    /// No correspondence found and the default-value policy is disabled
    #[error("Missing field: no source value found for destination field '{path}' of '{type_name}'")]
    MissingField { path: String, type_name: String },

    /// Scalar coercion impossible or shapes do not line up
    #[error("Incompatible type at '{path}': cannot convert {from} to {to}{}", detail_suffix(.detail))]
    IncompatibleType {
        path: String,
        from: String,
        to: String,
        detail: Option<String>,
    },

    /// A source object refers back to an object already on the current path
    #[error("Cyclic graph detected at '{path}': instance of '{type_name}' is already being transformed")]
    CyclicGraph { path: String, type_name: String },

    /// Nesting deeper than the configured maximum
    #[error("Maximum transformation depth {max_depth} exceeded at '{path}'")]
    DepthExceeded { path: String, max_depth: usize },

    /// Construction or accessor failure
    #[error("Failed to build '{type_name}' at '{path}': {message}")]
    Build {
        path: String,
        type_name: String,
        message: String,
    },

    /// Post-build validation found constraint violations
    #[error("Validation failed: {}", summarize(.violations))]
    Validation { violations: Vec<ConstraintViolation> },

    /// Settings could not be read or parsed
    #[error("Settings error: {message}")]
    Settings {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Broken engine invariant; indicates a bug rather than bad input
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Discriminant of [`Error`], convenient for branching without matching payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidArgument,
    UnsupportedShape,
    InvalidMapping,
    MissingField,
    IncompatibleType,
    CyclicGraph,
    DepthExceeded,
    Build,
    Validation,
    Settings,
    Internal,
}

impl Error {
    /// The kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Error::UnsupportedShape { .. } => ErrorKind::UnsupportedShape,
            Error::InvalidMapping { .. } => ErrorKind::InvalidMapping,
            Error::MissingField { .. } => ErrorKind::MissingField,
            Error::IncompatibleType { .. } => ErrorKind::IncompatibleType,
            Error::CyclicGraph { .. } => ErrorKind::CyclicGraph,
            Error::DepthExceeded { .. } => ErrorKind::DepthExceeded,
            Error::Build { .. } => ErrorKind::Build,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Settings { .. } => ErrorKind::Settings,
            Error::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Destination field path the error is attached to, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::InvalidMapping { path, .. }
            | Error::MissingField { path, .. }
            | Error::IncompatibleType { path, .. }
            | Error::CyclicGraph { path, .. }
            | Error::DepthExceeded { path, .. }
            | Error::Build { path, .. } => Some(path),
            _ => None,
        }
    }

    /// True for [`Error::MissingField`]
    pub fn is_missing_field(&self) -> bool {
        self.kind() == ErrorKind::MissingField
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Error::Internal {
            source: anyhow::anyhow!(message.clone()),
            message,
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!(" ({})", detail),
        None => String::new(),
    }
}

fn summarize(violations: &[ConstraintViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::UnsupportedShape => "UnsupportedShape",
            ErrorKind::InvalidMapping => "InvalidMapping",
            ErrorKind::MissingField => "MissingField",
            ErrorKind::IncompatibleType => "IncompatibleType",
            ErrorKind::CyclicGraph => "CyclicGraph",
            ErrorKind::DepthExceeded => "DepthExceeded",
            ErrorKind::Build => "Build",
            ErrorKind::Validation => "Validation",
            ErrorKind::Settings => "Settings",
            ErrorKind::Internal => "Internal",
        };
        write!(f, "{}", name)
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Settings {
            message: err.to_string(),
            source: Some(err.into()),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Settings {
            message: err.to_string(),
            source: Some(err.into()),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}
