//! Object-store abstraction and error classification.
//!
//! The [`ObjectStore`] trait is what the image materializer talks to.
//! Implementations translate their native errors into [`Failure`]s using
//! [`kind_for_code`] so callers branch on [`ErrorKind`] only.
//!
//! ```text
//! materialize ──► ObjectStore::put_object ──► ObjectStore::presigned_get
//!                          │
//!               ┌──────────┴──────────┐
//!            S3Store              MemoryStore
//!     (MinIO / AWS, feature s3)   (tests, local runs)
//! ```

pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

pub use memory::MemoryStore;
#[cfg(feature = "s3")]
pub use s3::{S3Settings, S3Store};

use crate::error::{ErrorKind, Failure, Outcome};
use async_trait::async_trait;
use std::time::Duration;

/// Uploads larger than this are sent in parts of this size.
pub const PART_SIZE: usize = 10 * 1024 * 1024;

/// Storage capability consumed by the pipeline.
///
/// Object-safe; held as `Arc<dyn ObjectStore>`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Make sure the bucket exists, creating it (publicly readable) if not.
    ///
    /// Called once at startup, never per request.
    async fn ensure_bucket(&self) -> Outcome<()>;

    /// Store `bytes` under `key` with the given content type.
    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Outcome<()>;

    /// Time-limited retrieval URL for `key`.
    async fn presigned_get(&self, key: &str, ttl: Duration) -> Outcome<String>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Map an object-store error code to an [`ErrorKind`].
///
/// `None` means the backend gave no code at all.
pub fn kind_for_code(code: Option<&str>) -> ErrorKind {
    match code {
        Some("NoSuchBucket") => ErrorKind::NotFound,
        Some(
            "AccessDenied"
            | "InvalidBucketName"
            | "InvalidObjectName"
            | "InvalidAccessKeyId"
            | "SignatureDoesNotMatch",
        ) => ErrorKind::Validation,
        Some("BucketAlreadyExists" | "BucketAlreadyOwnedByYou") => ErrorKind::Conflict,
        Some("InternalError" | "ServiceUnavailable" | "SlowDown") => ErrorKind::Unavailable,
        Some("RequestTimeout") => ErrorKind::Timeout,
        Some(_) => ErrorKind::IoError,
        None => ErrorKind::Unknown,
    }
}

/// Build a [`Failure`] for a coded store error during `operation`.
pub(crate) fn store_failure(operation: &str, code: Option<&str>, detail: &str) -> Failure {
    let kind = kind_for_code(code);
    let message = match kind {
        ErrorKind::NotFound => format!("Bucket does not exist: {detail}"),
        ErrorKind::Conflict => format!("Bucket already exists: {detail}"),
        ErrorKind::Validation if code == Some("AccessDenied") => {
            format!("Access denied: {detail}")
        }
        ErrorKind::Validation => format!("Invalid request: {detail}"),
        ErrorKind::Unavailable => format!("Object store server error: {detail}"),
        _ => format!("Object store error while {operation}: {detail}"),
    };
    let failure = Failure::new(kind, message).with("operation", operation);
    match code {
        Some(code) => failure.with("code", code),
        None => failure,
    }
}
