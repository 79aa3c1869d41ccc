//! Completion-service transport.
//!
//! The [`Backend`] trait takes a finished [`CompletionRequest`] and returns
//! the service's raw response text. Decoding that text is the job of
//! [`parsing`](crate::parsing), not the backend.
//!
//! ```text
//! MessagePipeline ──► CompletionRequest ──► Backend::complete() ──► raw body
//!                                                 │
//!                                      ┌──────────┴──────────┐
//!                                 HttpBackend            MockBackend
//!                                POST /process        canned responses
//! ```

pub mod http;
pub mod mock;

pub use http::HttpBackend;
pub use mock::{MockBackend, MockReply};

use crate::error::Outcome;
use crate::types::CompletionRequest;
use async_trait::async_trait;
use reqwest::Client;

/// Abstraction over the completion service.
///
/// Object-safe; held as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Send `request` and return the raw body of a successful response.
    ///
    /// Every transport or status problem comes back as a
    /// [`Failure`](crate::Failure), never a panic.
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &CompletionRequest,
    ) -> Outcome<String>;

    /// Human-readable name for logging.
    fn name(&self) -> &'static str;
}
