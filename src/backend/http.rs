//! Backend for the HTTP completion service.
//!
//! Endpoint: `POST {base_url}/process` with a JSON [`CompletionRequest`].
//! Only an exact `200` counts as success; the body is returned untouched.

use super::Backend;
use crate::error::{Failure, Outcome};
use crate::types::CompletionRequest;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

const SERVICE: &str = "Completion service";
const UNREADABLE_BODY: &str = "unable to read";

/// Talks to the completion service over plain HTTP.
///
/// # Example
///
/// ```
/// use message_relay::backend::{Backend, HttpBackend};
///
/// let backend = HttpBackend::new();
/// assert_eq!(backend.name(), "http");
/// ```
#[derive(Debug, Clone)]
pub struct HttpBackend {
    path: String,
}

impl HttpBackend {
    pub fn new() -> Self {
        Self {
            path: "/process".to_string(),
        }
    }

    fn url(&self, base_url: &str) -> String {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &CompletionRequest,
    ) -> Outcome<String> {
        let url = self.url(base_url);
        tracing::debug!(
            url = %url,
            model = %request.model,
            has_image = request.image_url.is_some(),
            "calling completion service"
        );

        let resp = client.post(&url).json(request).send().await.map_err(|e| {
            tracing::error!(url = %url, error = %e, "completion service unreachable");
            Failure::io(format!("Failed to call completion service: {e}"))
                .with("url", url.as_str())
                .with("timed_out", e.is_timeout())
        })?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(error = %e, "could not read error body");
                    UNREADABLE_BODY.to_string()
                }
            };
            tracing::error!(status = status.as_u16(), body = %body, "completion service error");
            return Err(Failure::io(format!(
                "{SERVICE} returned status: {}, body: {body}",
                status.as_u16()
            ))
            .with("status", status.as_u16()));
        }

        resp.text().await.map_err(|e| {
            Failure::io(format!("Failed to call completion service: {e}"))
                .with("url", url.as_str())
                .with("timed_out", e.is_timeout())
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
