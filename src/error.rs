//! Uniform result and failure model.
//!
//! Every stage returns an [`Outcome`] instead of panicking or bubbling up
//! collaborator-specific errors. A [`Failure`] carries a closed
//! [`ErrorKind`] so callers can branch on the class of problem without
//! knowing which backend produced it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Closed classification of everything that can go wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed or incomplete input, or a request the store refused.
    Validation,
    /// An image with an unsupported extension.
    InvalidFileType,
    /// A resource (bucket, object) does not exist.
    NotFound,
    /// A name collision in the object store.
    Conflict,
    /// Transport or protocol failure talking to a collaborator.
    IoError,
    /// A collaborator did not answer in time.
    Timeout,
    /// A collaborator is reachable but not serving.
    Unavailable,
    /// Anything unclassified.
    Unknown,
}

impl ErrorKind {
    /// HTTP status the hosting layer answers with for this kind.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation | ErrorKind::InvalidFileType => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Timeout => 504,
            ErrorKind::Unavailable => 503,
            ErrorKind::IoError | ErrorKind::Unknown => 500,
        }
    }

    /// Wire name, e.g. `"INVALID_FILE_TYPE"`.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::InvalidFileType => "INVALID_FILE_TYPE",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::IoError => "IO_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Unavailable => "UNAVAILABLE",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed failure with diagnostic context.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{kind}: {message}")]
pub struct Failure {
    /// Classification used for branching and status mapping.
    #[serde(rename = "code")]
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Accumulated diagnostic key/values.
    pub context: BTreeMap<String, Value>,
}

impl Failure {
    /// Create a failure with an empty context.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn invalid_file_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidFileType, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IoError, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    /// Return a copy with `key` set in the context.
    ///
    /// `self` is consumed; clone first to keep the original around.
    ///
    /// ```
    /// use message_relay::{ErrorKind, Failure};
    ///
    /// let base = Failure::new(ErrorKind::IoError, "upstream failed");
    /// let enriched = base.clone().with("status", 502);
    /// assert!(base.context.is_empty());
    /// assert_eq!(enriched.context["status"], 502);
    /// ```
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut context = self.context;
        context.insert(key.into(), value.into());
        Self {
            kind: self.kind,
            message: self.message,
            context,
        }
    }

    /// HTTP status for this failure's kind.
    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }
}

/// Result type used throughout the crate.
pub type Outcome<T> = std::result::Result<T, Failure>;

/// `fold` for [`Outcome`]: collapse both rails into one value.
///
/// `map` and `and_then` already come from `Result`.
pub trait OutcomeExt<T> {
    fn fold<R>(self, on_err: impl FnOnce(Failure) -> R, on_ok: impl FnOnce(T) -> R) -> R;
}

impl<T> OutcomeExt<T> for Outcome<T> {
    fn fold<R>(self, on_err: impl FnOnce(Failure) -> R, on_ok: impl FnOnce(T) -> R) -> R {
        match self {
            Ok(value) => on_ok(value),
            Err(failure) => on_err(failure),
        }
    }
}
