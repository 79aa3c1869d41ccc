//! Image materialization: upload validated bytes, hand back a signed URL.

use crate::error::Outcome;
use crate::storage::ObjectStore;
use crate::types::ImagePayload;
use std::time::Duration;
use uuid::Uuid;

pub use crate::storage::PART_SIZE;

/// Logical folder every uploaded image lands in.
pub const IMAGE_PREFIX: &str = "images/";

/// How long a signed retrieval URL stays valid.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(600);

const DEFAULT_EXTENSION: &str = ".jpg";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type for an image filename, by extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let lower = filename.to_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else {
        FALLBACK_CONTENT_TYPE
    }
}

/// A fresh object key: `images/<uuid><ext>`.
///
/// The extension is everything from the last `.` of `filename`, or `.jpg`
/// when there is none.
pub fn object_key_for(filename: &str) -> String {
    let extension = filename
        .rfind('.')
        .map(|idx| &filename[idx..])
        .unwrap_or(DEFAULT_EXTENSION);
    format!("{IMAGE_PREFIX}{}{extension}", Uuid::new_v4())
}

/// Upload `image` and return a time-limited URL for it.
pub async fn materialize(store: &dyn ObjectStore, image: ImagePayload) -> Outcome<String> {
    let ImagePayload { bytes, filename } = image;
    let key = object_key_for(&filename);
    let content_type = content_type_for(&filename);
    let size = bytes.len();

    store
        .put_object(&key, bytes, content_type)
        .await
        .map_err(|f| f.with("key", key.as_str()))?;
    tracing::info!(store = store.name(), key = %key, size, content_type, "image uploaded");

    let url = store
        .presigned_get(&key, SIGNED_URL_TTL)
        .await
        .map_err(|f| f.with("key", key.as_str()))?;
    tracing::debug!(key = %key, ttl_secs = SIGNED_URL_TTL.as_secs(), "signed url issued");
    Ok(url)
}
