// zkvrm-snapshot/src/backup/s3_upload.rs
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::error::DisplayErrorContext;
use s3::primitives::ByteStream;
use std::collections::HashMap;
use tracing::debug;

use crate::config::{EnabledSnapshotConfig, TRACING_TARGET};
use crate::errors::{Result, SnapshotError};

/// A single object write.
#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
    pub content_length: u64,
    pub metadata: HashMap<String, String>,
}

/// Destination for uploaded snapshots.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, request: PutObjectRequest) -> Result<()>;
}

/// [`ObjectStore`] backed by S3 or an S3-compatible service.
///
/// Credentials come from the default AWS provider chain.
pub struct S3ObjectStore {
    client: s3::Client,
}

impl S3ObjectStore {
    pub async fn connect(config: &EnabledSnapshotConfig) -> Self {
        let sdk_config = aws_config::defaults(s3::config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut s3_config =
            s3::config::Builder::from(&sdk_config).force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint {
            s3_config = s3_config.endpoint_url(endpoint);
        }

        S3ObjectStore {
            client: s3::Client::from_conf(s3_config.build()),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, request: PutObjectRequest) -> Result<()> {
        debug!(
            target: TRACING_TARGET,
            bucket = %request.bucket,
            key = %request.key,
            bytes = request.content_length,
            "Putting snapshot object"
        );

        let content_length = i64::try_from(request.content_length).map_err(|_| {
            SnapshotError::Storage(format!(
                "snapshot of {} bytes exceeds the maximum object size",
                request.content_length
            ))
        })?;

        self.client
            .put_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .body(ByteStream::from(request.body))
            .content_type(request.content_type)
            .content_length(content_length)
            .set_metadata(Some(request.metadata))
            .send()
            .await
            .map_err(|e| {
                SnapshotError::Storage(format!(
                    "Failed to upload s3://{}/{}: {}",
                    request.bucket,
                    request.key,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(())
    }
}
