//! Mock backend for testing without a live completion service.
//!
//! [`MockBackend`] returns pre-configured replies in order and remembers
//! what it was asked, so tests can assert on the outbound request.
//!
//! # Example
//!
//! ```
//! use message_relay::backend::MockBackend;
//!
//! let mock = MockBackend::fixed(r#"{"response": "Hi!"}"#);
//! assert_eq!(mock.call_count(), 0);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;

use super::Backend;
use crate::error::{Failure, Outcome};
use crate::types::CompletionRequest;

/// One canned reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// A `200` with this body.
    Body(String),
    /// A non-`200` status with this body, reported like the HTTP backend does.
    Status(u16, String),
}

/// A test backend that returns canned replies in order.
///
/// Cycles back to the beginning when all replies have been consumed.
#[derive(Debug)]
pub struct MockBackend {
    replies: Vec<MockReply>,
    index: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl MockBackend {
    /// Create a mock with the given replies. Panics if `replies` is empty.
    pub fn new(replies: Vec<MockReply>) -> Self {
        assert!(!replies.is_empty(), "MockBackend requires at least one reply");
        Self {
            replies,
            index: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Always answer `200` with `body`.
    pub fn fixed(body: impl Into<String>) -> Self {
        Self::new(vec![MockReply::Body(body.into())])
    }

    /// Always answer `{"response": <text>}`.
    pub fn responding(text: &str) -> Self {
        Self::fixed(serde_json::json!({ "response": text }).to_string())
    }

    /// Always answer with a failing status.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::new(vec![MockReply::Status(status, body.into())])
    }

    /// Number of `complete` calls so far.
    pub fn call_count(&self) -> usize {
        self.index.load(Ordering::Relaxed)
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().ok()?.clone()
    }

    fn next_reply(&self) -> MockReply {
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % self.replies.len();
        self.replies[idx].clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn complete(
        &self,
        _client: &Client,
        _base_url: &str,
        request: &CompletionRequest,
    ) -> Outcome<String> {
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }
        match self.next_reply() {
            MockReply::Body(body) => Ok(body),
            MockReply::Status(status, body) => Err(Failure::io(format!(
                "Completion service returned status: {status}, body: {body}"
            ))
            .with("status", status)),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
