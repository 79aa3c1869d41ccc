//! S3-compatible object store (MinIO, AWS S3).
//!
//! [`S3Store`] uses path-style addressing and static credentials so it
//! works against a self-hosted MinIO endpoint. Uploads above
//! [`PART_SIZE`] go through a multipart upload.

use super::{store_failure, ObjectStore, PART_SIZE};
use crate::error::{ErrorKind, Failure, Outcome};
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use serde::Deserialize;
use std::time::Duration;

/// Connection settings for [`S3Store`].
#[derive(Clone, Deserialize)]
pub struct S3Settings {
    /// Endpoint URL, e.g. `http://localhost:9000`.
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Per-operation timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Settings")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_bucket() -> String {
    "images".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Object store backed by the AWS SDK.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    part_size: usize,
}

impl std::fmt::Debug for S3Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Store")
            .field("bucket", &self.bucket)
            .field("part_size", &self.part_size)
            .finish()
    }
}

impl S3Store {
    /// Build a client for `settings`. Performs no network I/O.
    pub async fn connect(settings: S3Settings) -> Self {
        let credentials = Credentials::new(
            settings.access_key.clone(),
            settings.secret_key.clone(),
            None,
            None,
            "message-relay",
        );
        let timeouts = aws_config::timeout::TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(settings.timeout_secs))
            .build();

        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(&settings.endpoint)
            .timeout_config(timeouts)
            .load()
            .await;

        let conf = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();

        Self::with_client(Client::from_conf(conf), settings.bucket)
    }

    /// Wrap an existing SDK client.
    pub fn with_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            part_size: PART_SIZE,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn bucket_exists(&self) -> Outcome<bool> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(service)) if service.err().is_not_found() => Ok(false),
            Err(e) => Err(failure_from_sdk("checking bucket existence", e)),
        }
    }

    async fn create_public_bucket(&self) -> Outcome<()> {
        tracing::info!(bucket = %self.bucket, "creating bucket");
        match self.client.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {}
            Err(e) => {
                let failure = failure_from_sdk("creating bucket", e);
                // Someone else created it between our check and create.
                if failure.kind != ErrorKind::Conflict {
                    return Err(failure);
                }
                tracing::info!(bucket = %self.bucket, "bucket already exists");
            }
        }

        self.client
            .put_bucket_policy()
            .bucket(&self.bucket)
            .policy(public_read_policy(&self.bucket))
            .send()
            .await
            .map_err(|e| failure_from_sdk("setting bucket policy", e))?;
        tracing::info!(bucket = %self.bucket, "bucket set to public read");
        Ok(())
    }

    async fn put_single(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Outcome<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| failure_from_sdk("uploading object", e))?;
        Ok(())
    }

    async fn put_multipart(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Outcome<()> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| failure_from_sdk("starting multipart upload", e))?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| Failure::io("Object store returned no upload id"))?
            .to_string();

        match self.upload_parts(key, &upload_id, &bytes).await {
            Ok(parts) => {
                self.client
                    .complete_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .multipart_upload(
                        CompletedMultipartUpload::builder()
                            .set_parts(Some(parts))
                            .build(),
                    )
                    .send()
                    .await
                    .map_err(|e| failure_from_sdk("completing multipart upload", e))?;
                Ok(())
            }
            Err(failure) => {
                if let Err(e) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    tracing::warn!(
                        key,
                        error = %DisplayErrorContext(&e),
                        "failed to abort multipart upload"
                    );
                }
                Err(failure)
            }
        }
    }

    async fn upload_parts(
        &self,
        key: &str,
        upload_id: &str,
        bytes: &[u8],
    ) -> Outcome<Vec<CompletedPart>> {
        let mut parts = Vec::with_capacity(bytes.len().div_ceil(self.part_size));
        for (idx, chunk) in bytes.chunks(self.part_size).enumerate() {
            let part_number = idx as i32 + 1;
            let uploaded = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk.to_vec()))
                .send()
                .await
                .map_err(|e| failure_from_sdk("uploading part", e))?;
            parts.push(
                CompletedPart::builder()
                    .set_e_tag(uploaded.e_tag().map(str::to_string))
                    .part_number(part_number)
                    .build(),
            );
        }
        Ok(parts)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn ensure_bucket(&self) -> Outcome<()> {
        if self.bucket_exists().await? {
            tracing::info!(bucket = %self.bucket, "bucket present");
            return Ok(());
        }
        self.create_public_bucket().await
    }

    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Outcome<()> {
        tracing::info!(
            bucket = %self.bucket,
            key,
            size = bytes.len(),
            content_type,
            "uploading object"
        );
        if bytes.len() > self.part_size {
            self.put_multipart(key, bytes, content_type).await
        } else {
            self.put_single(key, bytes, content_type).await
        }
    }

    async fn presigned_get(&self, key: &str, ttl: Duration) -> Outcome<String> {
        let presigning = PresigningConfig::expires_in(ttl).map_err(|e| {
            Failure::io(format!("Failed to generate presigned URL: {e}")).with("key", key)
        })?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| failure_from_sdk("signing url", e))?;
        Ok(request.uri().to_string())
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}

/// Policy granting anonymous `s3:GetObject` on every key in `bucket`.
fn public_read_policy(bucket: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": {"AWS": "*"},
            "Action": "s3:GetObject",
            "Resource": format!("arn:aws:s3:::{bucket}/*"),
        }]
    })
    .to_string()
}

/// Classify an SDK error into the shared taxonomy.
fn failure_from_sdk<E, R>(operation: &str, err: SdkError<E, R>) -> Failure
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let detail = DisplayErrorContext(&err).to_string();
    let failure = match &err {
        SdkError::ServiceError(service) => store_failure(operation, service.err().code(), &detail),
        SdkError::TimeoutError(_) => Failure::new(
            ErrorKind::Timeout,
            format!("Object store timed out while {operation}"),
        ),
        SdkError::DispatchFailure(dispatch) if dispatch.is_timeout() => Failure::new(
            ErrorKind::Timeout,
            format!("Object store timed out while {operation}"),
        ),
        SdkError::DispatchFailure(_) => Failure::new(
            ErrorKind::Unavailable,
            format!("Object store unreachable while {operation}: {detail}"),
        ),
        SdkError::ResponseError(_) => Failure::io(format!(
            "Invalid response from object store while {operation}: {detail}"
        )),
        _ => Failure::unknown(format!("Unexpected error while {operation}: {detail}")),
    };
    tracing::error!(operation, kind = %failure.kind, error = %detail, "object store call failed");
    failure.with("operation", operation)
}
