//! Event system for pipeline lifecycle hooks.
//!
//! Provides an optional, non-intrusive way to observe a pipeline run.
//! The orchestrator emits an event when each stage starts and ends, and
//! once when the run finishes. Implement [`EventHandler`] to receive them
//! for progress tracking or metrics.

use crate::error::ErrorKind;
use crate::stage::Stage;
use std::sync::Arc;

/// Events emitted during a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A stage has started.
    StageStart { stage: Stage },
    /// A stage has finished.
    StageEnd {
        stage: Stage,
        /// Whether the stage succeeded.
        ok: bool,
        elapsed_ms: u64,
    },
    /// The whole run has finished.
    PipelineEnd {
        /// `None` on success, otherwise the kind of the failure returned.
        failure: Option<ErrorKind>,
        elapsed_ms: u64,
    },
}

/// Handler for pipeline lifecycle events.
///
/// Entirely optional; the pipeline works without one.
///
/// # Example
///
/// ```
/// use message_relay::events::{Event, EventHandler};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: Event) {
///         match event {
///             Event::StageStart { stage } => println!("[start] {}", stage),
///             Event::StageEnd { stage, ok, .. } => println!("[end] {} ok={}", stage, ok),
///             Event::PipelineEnd { failure, .. } => println!("[done] {:?}", failure),
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Called when the pipeline emits an event.
    fn on_event(&self, event: Event);
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(handler: &Option<Arc<dyn EventHandler>>, event: Event) {
    if let Some(ref h) = handler {
        h.on_event(event);
    }
}

/// An [`EventHandler`] backed by a closure.
///
/// # Example
///
/// ```
/// use message_relay::events::{Event, FnEventHandler};
/// use std::sync::Arc;
///
/// let handler = Arc::new(FnEventHandler(|event: Event| {
///     if let Event::StageEnd { stage, ok: false, .. } = event {
///         eprintln!("{} failed", stage);
///     }
/// }));
/// ```
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}
