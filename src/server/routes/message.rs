//! `POST /message` and `POST /upload`.

use crate::server::error::{ServerError, ServerResult};
use crate::server::state::AppState;
use crate::types::InboundMessage;
use crate::Failure;
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Success body of both endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub response: String,
}

/// Process a JSON message.
///
/// Takes the raw body so that an empty body reaches the validator as a
/// missing message and malformed JSON comes back as a validation failure.
pub async fn process_message(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<Json<ProcessResponse>> {
    let message = parse_message(&body)?;
    let response = state.pipeline.process_message(message).await?;
    Ok(Json(ProcessResponse { response }))
}

fn parse_message(body: &[u8]) -> Result<Option<InboundMessage>, Failure> {
    let trimmed = body.trim_ascii();
    if trimmed.is_empty() || trimmed == b"null" {
        return Ok(None);
    }
    serde_json::from_slice(trimmed)
        .map(Some)
        .map_err(|e| Failure::validation(format!("Invalid request body: {e}")))
}

/// Process a multipart upload with fields `file`, `text` and `fileName`.
///
/// `fileName` wins over the filename of the `file` part. `token` and
/// `model` fields are honoured too.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServerResult<Json<ProcessResponse>> {
    let mut multipart = multipart.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let mut message = InboundMessage::default();
    let mut part_filename = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                part_filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(e.body_text()))?;
                message.image_bytes = Some(bytes.to_vec());
            }
            "text" | "fileName" | "token" | "model" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(e.body_text()))?;
                match name.as_str() {
                    "text" => message.text = Some(value),
                    "fileName" => message.image_filename = Some(value),
                    "token" => message.auth_token = Some(value),
                    _ => message.model_name = Some(value),
                }
            }
            other => tracing::debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    if message.image_bytes.is_some() && message.image_filename.is_none() {
        message.image_filename = part_filename;
    }
    tracing::info!(
        has_file = message.image_bytes.is_some(),
        filename = message.image_filename.as_deref().unwrap_or("-"),
        has_text = message.text.is_some(),
        "upload received"
    );

    let response = state.pipeline.process_message(Some(message)).await?;
    Ok(Json(ProcessResponse { response }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_empty_body_is_missing_message() {
        assert!(parse_message(b"").unwrap().is_none());
        assert!(parse_message(b"  \n").unwrap().is_none());
        assert!(parse_message(b"null").unwrap().is_none());
    }

    #[test]
    fn test_malformed_body_is_validation() {
        let err = parse_message(b"{not json").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.starts_with("Invalid request body"));
    }

    #[test]
    fn test_body_parsed() {
        let msg = parse_message(br#"{"text": "hi"}"#).unwrap().unwrap();
        assert_eq!(msg.text.as_deref(), Some("hi"));
    }
}
