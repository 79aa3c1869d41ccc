use crate::{
    error::{Failure, Outcome},
    events::{emit, Event},
    exec_ctx::PipelineCtx,
    materialize::materialize,
    parsing::decode_response,
    request::build_request,
    stage::Stage,
    types::{InboundMessage, MaterializedMessage, ValidatedMessage},
    validate::validate,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Orchestrates one message from validation to decoded answer.
///
/// Stages run strictly in order:
/// `validate → upload image (if any) → build request → call completion → decode`.
/// The first failure aborts the run and is returned with a `stage` entry
/// in its context. Nothing is retried.
///
/// Cheap to clone; the context is shared.
#[derive(Clone)]
pub struct MessagePipeline {
    ctx: Arc<PipelineCtx>,
}

impl std::fmt::Debug for MessagePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagePipeline")
            .field("ctx", &self.ctx)
            .finish()
    }
}

impl MessagePipeline {
    pub fn new(ctx: PipelineCtx) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub fn ctx(&self) -> &PipelineCtx {
        &self.ctx
    }

    /// Make sure the image bucket exists. Call once at startup.
    pub async fn ensure_storage(&self) -> Outcome<()> {
        self.ctx.store.ensure_bucket().await.map_err(|f| {
            tracing::error!(
                store = self.ctx.store.name(),
                kind = %f.kind,
                message = %f.message,
                "bucket bootstrap failed"
            );
            f
        })?;
        tracing::info!(store = self.ctx.store.name(), "object store ready");
        Ok(())
    }

    /// Run one message through every stage.
    ///
    /// `None` stands for a request with no body and fails validation.
    /// The message's own token and model win over the context defaults.
    pub async fn process_message(&self, message: Option<InboundMessage>) -> Outcome<String> {
        let started = Instant::now();
        let result = self.run_stages(message).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(answer) => {
                tracing::info!(elapsed_ms, answer_len = answer.len(), "message processed")
            }
            Err(f) => tracing::warn!(
                elapsed_ms,
                kind = %f.kind,
                message = %f.message,
                "message failed"
            ),
        }
        emit(
            &self.ctx.event_handler,
            Event::PipelineEnd {
                failure: result.as_ref().err().map(|f| f.kind),
                elapsed_ms,
            },
        );
        result
    }

    async fn run_stages(&self, message: Option<InboundMessage>) -> Outcome<String> {
        let (token, model) = self.credentials(message.as_ref());

        let ValidatedMessage {
            text,
            image,
            output_example,
        } = self.stage(Stage::Validate, async { validate(message) }).await?;

        let image_url = match image {
            Some(image) => Some(
                self.stage(Stage::UploadImage, materialize(self.ctx.store.as_ref(), image))
                    .await?,
            ),
            None => None,
        };

        let request = self
            .stage(Stage::BuildRequest, async {
                Ok(build_request(
                    MaterializedMessage {
                        text,
                        image_url,
                        output_example,
                    },
                    token,
                    model,
                ))
            })
            .await?;
        tracing::info!(
            model = %request.model,
            image_url = request.image_url.as_deref().unwrap_or("-"),
            "built completion request"
        );

        let raw = self
            .stage(
                Stage::CallCompletion,
                self.ctx
                    .backend
                    .complete(&self.ctx.client, &self.ctx.base_url, &request),
            )
            .await?;

        self.stage(Stage::DecodeResponse, async { decode_response(&raw) })
            .await
    }

    fn credentials(&self, message: Option<&InboundMessage>) -> (String, String) {
        let pick = |own: Option<&String>, fallback: &str| -> String {
            own.filter(|v| !v.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| fallback.to_string())
        };
        (
            pick(
                message.and_then(|m| m.auth_token.as_ref()),
                &self.ctx.default_token,
            ),
            pick(
                message.and_then(|m| m.model_name.as_ref()),
                &self.ctx.default_model,
            ),
        )
    }

    /// Run one stage with events, timing and failure tagging.
    async fn stage<T>(&self, stage: Stage, work: impl Future<Output = Outcome<T>>) -> Outcome<T> {
        emit(&self.ctx.event_handler, Event::StageStart { stage });
        let started = Instant::now();

        let result = work.await.map_err(|f: Failure| f.with("stage", stage.as_str()));

        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(stage = %stage, ok = result.is_ok(), elapsed_ms, "stage finished");
        emit(
            &self.ctx.event_handler,
            Event::StageEnd {
                stage,
                ok: result.is_ok(),
                elapsed_ms,
            },
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockReply};
    use crate::error::ErrorKind;
    use crate::events::FnEventHandler;
    use crate::storage::MemoryStore;
    use std::sync::Mutex;

    fn pipeline(
        backend: MockBackend,
        store: MemoryStore,
    ) -> (MessagePipeline, Arc<MockBackend>, Arc<MemoryStore>) {
        let backend = Arc::new(backend);
        let store = Arc::new(store);
        let ctx = PipelineCtx::builder("http://unused")
            .backend(backend.clone())
            .store(store.clone())
            .default_token("default-token")
            .build();
        (MessagePipeline::new(ctx), backend, store)
    }

    #[tokio::test]
    async fn test_text_only_success() {
        let (p, backend, store) =
            pipeline(MockBackend::responding("Hi!"), MemoryStore::new("images"));
        let answer = p
            .process_message(Some(InboundMessage::text("Hello World!")))
            .await
            .unwrap();
        assert_eq!(answer, "Hi!");

        let sent = backend.last_request().unwrap();
        assert_eq!(sent.text, "Hello World!");
        assert_eq!(sent.token, "default-token");
        assert_eq!(sent.model, "gpt-4o-mini");
        assert!(sent.image_url.is_none());
        assert!(sent.output_example.is_none());
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_message_credentials_win() {
        let (p, backend, _) = pipeline(MockBackend::responding("ok"), MemoryStore::new("images"));
        let msg = InboundMessage {
            auth_token: Some("user-token".into()),
            model_name: Some("gpt-4o".into()),
            ..InboundMessage::text("hi")
        };
        p.process_message(Some(msg)).await.unwrap();
        let sent = backend.last_request().unwrap();
        assert_eq!(sent.token, "user-token");
        assert_eq!(sent.model, "gpt-4o");
    }

    #[tokio::test]
    async fn test_image_uploaded_and_url_forwarded() {
        let (p, backend, store) =
            pipeline(MockBackend::responding("ok"), MemoryStore::new("images"));
        let msg = InboundMessage::text("receipt").with_image(vec![1, 2, 3], "r.JPG");
        p.process_message(Some(msg)).await.unwrap();

        let url = backend.last_request().unwrap().image_url.unwrap();
        let obj = store.get(&url).unwrap();
        assert_eq!(obj.bytes, vec![1, 2, 3]);
        assert_eq!(obj.content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_validation_failure_short_circuits() {
        let (p, backend, store) =
            pipeline(MockBackend::responding("x"), MemoryStore::new("images"));
        let err = p.process_message(None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, "Request is null");
        assert_eq!(err.context["stage"], "validate");
        assert_eq!(backend.call_count(), 0);
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_failure_skips_completion() {
        let (p, backend, _) = pipeline(
            MockBackend::responding("x"),
            MemoryStore::failing("images", Failure::new(ErrorKind::Unavailable, "down")),
        );
        let msg = InboundMessage::text("hi").with_image(vec![1], "a.png");
        let err = p.process_message(Some(msg)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unavailable);
        assert_eq!(err.context["stage"], "upload_image");
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_completion_failure_tagged() {
        let (p, _, _) = pipeline(MockBackend::status(500, "oops"), MemoryStore::new("images"));
        let err = p
            .process_message(Some(InboundMessage::text("hi")))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::IoError);
        assert!(err.message.contains("500"));
        assert_eq!(err.context["stage"], "call_completion");
    }

    #[tokio::test]
    async fn test_decode_failure_tagged() {
        let (p, _, _) = pipeline(
            MockBackend::new(vec![MockReply::Body(r#"{"text": "no"}"#.into())]),
            MemoryStore::new("images"),
        );
        let err = p
            .process_message(Some(InboundMessage::text("hi")))
            .await
            .unwrap_err();
        assert_eq!(err.context["stage"], "decode_response");
    }

    #[tokio::test]
    async fn test_events_in_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let ctx = PipelineCtx::builder("http://unused")
            .backend(Arc::new(MockBackend::responding("ok")))
            .event_handler(Arc::new(FnEventHandler(move |e: Event| {
                sink.lock().unwrap().push(e);
            })))
            .build();
        MessagePipeline::new(ctx)
            .process_message(Some(InboundMessage::text("hi")))
            .await
            .unwrap();

        let events = events.lock().unwrap();
        let starts: Vec<Stage> = events
            .iter()
            .filter_map(|e| match e {
                Event::StageStart { stage } => Some(*stage),
                _ => None,
            })
            .collect();
        assert_eq!(
            starts,
            [
                Stage::Validate,
                Stage::BuildRequest,
                Stage::CallCompletion,
                Stage::DecodeResponse
            ]
        );
        assert!(matches!(
            events.last(),
            Some(Event::PipelineEnd { failure: None, .. })
        ));
    }

    #[tokio::test]
    async fn test_ensure_storage() {
        let (p, _, store) = pipeline(MockBackend::responding("x"), MemoryStore::new("images"));
        p.ensure_storage().await.unwrap();
        assert!(store.bucket_ready());
    }
}
