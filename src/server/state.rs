use super::config::{Settings, StorageKind};
use crate::exec_ctx::PipelineCtx;
use crate::pipeline::MessagePipeline;
use crate::storage::{MemoryStore, ObjectStore};
use crate::telegram::TelegramClient;
use std::sync::Arc;

/// Shared application state
#[derive(Clone, Debug)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub pipeline: MessagePipeline,
    /// `None` when no bot token is configured.
    pub telegram: Option<TelegramClient>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        pipeline: MessagePipeline,
        telegram: Option<TelegramClient>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            pipeline,
            telegram,
        }
    }

    /// Wire collaborators from `settings`. Does no network I/O.
    pub async fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let store = build_store(&settings).await?;
        let ctx = PipelineCtx::builder(&settings.completion.base_url)
            .store(store)
            .default_token(&settings.completion.token)
            .default_model(&settings.completion.model)
            .timeout(settings.completion.timeout())
            .build();

        let telegram = settings
            .telegram
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|token| {
                TelegramClient::new(ctx.client.clone(), token)
                    .with_api_base(&settings.telegram.api_base)
            });

        Ok(Self::new(settings, MessagePipeline::new(ctx), telegram))
    }
}

async fn build_store(settings: &Settings) -> anyhow::Result<Arc<dyn ObjectStore>> {
    match settings.storage.kind {
        StorageKind::Memory => {
            tracing::warn!("using in-memory image store, uploads are lost on restart");
            Ok(Arc::new(MemoryStore::new("images")))
        }
        #[cfg(feature = "s3")]
        StorageKind::S3 => {
            let s3 = settings
                .storage
                .s3
                .clone()
                .ok_or_else(|| anyhow::anyhow!("storage.kind is s3 but [storage.s3] is missing"))?;
            tracing::info!(endpoint = %s3.endpoint, bucket = %s3.bucket, "using S3 image store");
            Ok(Arc::new(crate::storage::S3Store::connect(s3).await))
        }
        #[cfg(not(feature = "s3"))]
        StorageKind::S3 => anyhow::bail!("storage.kind is s3 but the s3 feature is disabled"),
    }
}
