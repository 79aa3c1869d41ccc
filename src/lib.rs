//! # Message Relay
//!
//! Turns a user message (text, optionally with an image) into one answer
//! from an AI completion service.
//!
//! Every message runs through the same five stages and stops at the first
//! failure:
//!
//! ```text
//! InboundMessage ─► validate ─► upload image ─► build request ─► call completion ─► decode
//!                                  (if any)
//! ```
//!
//! ## Core Concepts
//!
//! - **[`Outcome`]**: `Result<T, Failure>`. Every fallible operation in the
//!   crate returns one; nothing panics on expected failures.
//! - **[`Failure`]**: an [`ErrorKind`] plus a message and a context map.
//!   Callers branch on the kind only; the HTTP layer maps it to a status.
//! - **[`MessagePipeline`]**: the orchestrator. Built from a
//!   [`PipelineCtx`] holding the completion [`Backend`](backend::Backend)
//!   and the [`ObjectStore`](storage::ObjectStore).
//! - **[`telegram`]**: a small bot flow that answers webhook updates with
//!   canned replies.
//! - **`server`** (feature `server`): axum routes around all of the above.
//!
//! ## Quick Start
//!
//! ```
//! use message_relay::backend::MockBackend;
//! use message_relay::storage::MemoryStore;
//! use message_relay::{InboundMessage, MessagePipeline, PipelineCtx};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let ctx = PipelineCtx::builder("http://localhost:8000")
//!     .backend(Arc::new(MockBackend::responding("Hi!")))
//!     .store(Arc::new(MemoryStore::new("images")))
//!     .build();
//! let pipeline = MessagePipeline::new(ctx);
//!
//! let answer = pipeline
//!     .process_message(Some(InboundMessage::text("Hello World!")))
//!     .await
//!     .unwrap();
//! assert_eq!(answer, "Hi!");
//! # });
//! ```

pub mod backend;
pub mod error;
pub mod events;
pub mod exec_ctx;
pub mod materialize;
pub mod parsing;
pub mod pipeline;
pub mod request;
pub mod stage;
pub mod storage;
pub mod telegram;
pub mod types;
pub mod validate;

#[cfg(feature = "server")]
pub mod server;

pub use backend::{Backend, HttpBackend, MockBackend};
pub use error::{ErrorKind, Failure, Outcome, OutcomeExt};
pub use events::{Event, EventHandler, FnEventHandler};
pub use exec_ctx::{PipelineCtx, PipelineCtxBuilder};
pub use pipeline::MessagePipeline;
pub use stage::Stage;
pub use storage::{MemoryStore, ObjectStore};
pub use types::{CompletionRequest, ImagePayload, InboundMessage, MaterializedMessage, ValidatedMessage};
