//! Execution context shared by every pipeline run.
//!
//! [`PipelineCtx`] carries the HTTP client, completion backend, endpoint,
//! object store, default credentials and optional event handler. Build it
//! once at startup and share it across requests.

use crate::backend::{Backend, HttpBackend};
use crate::events::EventHandler;
use crate::storage::{MemoryStore, ObjectStore};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Model used when neither the message nor the builder names one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Request timeout used when the builder is not given one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Collaborators and defaults for [`MessagePipeline`](crate::MessagePipeline).
///
/// # Example
///
/// ```
/// use message_relay::PipelineCtx;
/// use std::time::Duration;
///
/// let ctx = PipelineCtx::builder("http://localhost:8000")
///     .default_model("gpt-4o")
///     .timeout(Duration::from_secs(30))
///     .build();
/// assert_eq!(ctx.base_url, "http://localhost:8000");
/// ```
pub struct PipelineCtx {
    /// HTTP client (cheap to clone -- uses `Arc` internally).
    pub client: Client,
    /// Base URL of the completion service.
    pub base_url: String,
    /// Completion backend. Default: [`HttpBackend`].
    pub backend: Arc<dyn Backend>,
    /// Where images are uploaded. Default: an in-memory store.
    pub store: Arc<dyn ObjectStore>,
    /// Token sent when the message carries none.
    pub default_token: String,
    /// Model sent when the message names none.
    pub default_model: String,
    /// Optional event handler for lifecycle events.
    pub event_handler: Option<Arc<dyn EventHandler>>,
}

impl PipelineCtx {
    /// Create a new builder.
    pub fn builder(base_url: impl Into<String>) -> PipelineCtxBuilder {
        PipelineCtxBuilder {
            client: None,
            base_url: base_url.into(),
            backend: None,
            store: None,
            default_token: String::new(),
            default_model: DEFAULT_MODEL.to_string(),
            event_handler: None,
            timeout: None,
        }
    }
}

impl std::fmt::Debug for PipelineCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineCtx")
            .field("base_url", &self.base_url)
            .field("backend", &self.backend.name())
            .field("store", &self.store.name())
            .field("has_default_token", &!self.default_token.is_empty())
            .field("default_model", &self.default_model)
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}

/// Builder for [`PipelineCtx`].
pub struct PipelineCtxBuilder {
    client: Option<Client>,
    base_url: String,
    backend: Option<Arc<dyn Backend>>,
    store: Option<Arc<dyn ObjectStore>>,
    default_token: String,
    default_model: String,
    event_handler: Option<Arc<dyn EventHandler>>,
    timeout: Option<Duration>,
}

impl PipelineCtxBuilder {
    /// Set the HTTP client. If not set, a default client is created.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the completion backend. Default: [`HttpBackend`].
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the object store.
    pub fn store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn default_token(mut self, token: impl Into<String>) -> Self {
        self.default_token = token.into();
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the event handler.
    pub fn event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Set the request timeout. Default: 60 seconds.
    ///
    /// Ignored when a custom `Client` is supplied via `.client()`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the execution context.
    pub fn build(self) -> PipelineCtx {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = self.client.unwrap_or_else(|| {
            Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "falling back to default HTTP client");
                    Client::new()
                })
        });
        PipelineCtx {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            backend: self.backend.unwrap_or_else(|| Arc::new(HttpBackend::new())),
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemoryStore::new("images"))),
            default_token: self.default_token,
            default_model: self.default_model,
            event_handler: self.event_handler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;

    #[test]
    fn test_defaults() {
        let ctx = PipelineCtx::builder("http://localhost:8000/").build();
        assert_eq!(ctx.base_url, "http://localhost:8000");
        assert_eq!(ctx.backend.name(), "http");
        assert_eq!(ctx.store.name(), "memory");
        assert_eq!(ctx.default_model, DEFAULT_MODEL);
        assert!(ctx.default_token.is_empty());
        assert!(ctx.event_handler.is_none());
    }

    #[test]
    fn test_overrides() {
        let ctx = PipelineCtx::builder("http://ai")
            .backend(Arc::new(MockBackend::responding("x")))
            .default_token("secret")
            .default_model("gpt-4o")
            .timeout(Duration::from_secs(5))
            .build();
        assert_eq!(ctx.backend.name(), "mock");
        assert_eq!(ctx.default_token, "secret");
        assert_eq!(ctx.default_model, "gpt-4o");
    }

    #[test]
    fn test_debug_hides_token() {
        let ctx = PipelineCtx::builder("http://ai").default_token("secret").build();
        let debug = format!("{:?}", ctx);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("has_default_token: true"));
    }
}
