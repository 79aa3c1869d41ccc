use crate::error::{ErrorKind, Failure};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type ServerResult<T> = Result<T, ServerError>;

/// Everything a handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Failure(#[from] Failure),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Telegram bot is not configured")]
    TelegramDisabled,

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// An [`ErrorKind`] name, e.g. `"INVALID_FILE_TYPE"`.
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl ServerError {
    fn kind(&self) -> ErrorKind {
        match self {
            ServerError::Failure(f) => f.kind,
            ServerError::BadRequest(_) => ErrorKind::Validation,
            ServerError::TelegramDisabled => ErrorKind::Unavailable,
            ServerError::NotFound => ErrorKind::NotFound,
        }
    }

    /// Get HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.kind().as_str().to_string();
        let (message, context) = match self {
            ServerError::Failure(f) => (f.message, f.context.into_iter().collect()),
            other => (other.to_string(), Map::new()),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code,
                message,
                context,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(err: ServerError) -> (StatusCode, ErrorResponse) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_failure_body() {
        let failure = Failure::invalid_file_type("Only PNG, JPG and JPEG files are supported")
            .with("filename", "document.pdf");
        let (status, body) = render(failure.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.code, "INVALID_FILE_TYPE");
        assert_eq!(body.error.message, "Only PNG, JPG and JPEG files are supported");
        assert_eq!(body.error.context["filename"], "document.pdf");
    }

    #[tokio::test]
    async fn test_status_table() {
        let cases = [
            (ErrorKind::Validation, 400),
            (ErrorKind::NotFound, 404),
            (ErrorKind::Conflict, 409),
            (ErrorKind::Timeout, 504),
            (ErrorKind::Unavailable, 503),
            (ErrorKind::IoError, 500),
            (ErrorKind::Unknown, 500),
        ];
        for (kind, expected) in cases {
            let (status, body) = render(Failure::new(kind, "x").into()).await;
            assert_eq!(status.as_u16(), expected, "{kind}");
            assert_eq!(body.error.code, kind.as_str());
        }
    }

    #[tokio::test]
    async fn test_telegram_disabled() {
        let (status, body) = render(ServerError::TelegramDisabled).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.error.code, "UNAVAILABLE");
        assert!(body.error.context.is_empty());
    }
}
