// zkvrm-snapshot/src/backup/logic.rs
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use tokio::time::Instant;
use uuid::Uuid;

use super::local_snapshot::{LocalSnapshot, create_local_snapshot};
use super::s3_upload::{ObjectStore, PutObjectRequest};
use crate::config::EnabledSnapshotConfig;
use crate::errors::Result;

pub const SNAPSHOT_CONTENT_TYPE: &str = "application/x-sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotUploadResult {
    pub object_key: String,
    pub bytes: u64,
    pub duration_ms: u64,
}

/// `{prefix}{app}-{timestamp}-{uuid}.sqlite`, with `:` and `.` in the
/// timestamp replaced by `-`.
pub fn build_object_key(config: &EnabledSnapshotConfig, now: DateTime<Utc>) -> String {
    let timestamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!(
        "{}{}-{}-{}.sqlite",
        config.key_prefix,
        config.app_name,
        timestamp,
        Uuid::new_v4()
    )
}

/// Takes a local snapshot, uploads it as one object and removes the local copy.
///
/// The temporary directory is removed whether or not the upload succeeds.
/// `duration_ms` covers snapshot creation through upload completion.
pub async fn perform_snapshot_upload(
    config: &EnabledSnapshotConfig,
    store: &dyn ObjectStore,
) -> Result<SnapshotUploadResult> {
    let started_at = Instant::now();
    let snapshot = create_local_snapshot(&config.database_path, config.temp_root.as_deref()).await?;

    let outcome = upload_local_snapshot(config, store, &snapshot).await;
    let duration_ms = started_at.elapsed().as_millis() as u64;
    snapshot.cleanup().await;

    let (object_key, bytes) = outcome?;
    Ok(SnapshotUploadResult {
        object_key,
        bytes,
        duration_ms,
    })
}

async fn upload_local_snapshot(
    config: &EnabledSnapshotConfig,
    store: &dyn ObjectStore,
    snapshot: &LocalSnapshot,
) -> Result<(String, u64)> {
    let body = tokio::fs::read(&snapshot.file_path).await?;
    let bytes = body.len() as u64;
    let object_key = build_object_key(config, Utc::now());

    let metadata = HashMap::from([
        (
            "database".to_string(),
            config.database_path.display().to_string(),
        ),
        (
            "created-at".to_string(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
    ]);

    store
        .put_object(PutObjectRequest {
            bucket: config.bucket.clone(),
            key: object_key.clone(),
            body,
            content_type: SNAPSHOT_CONTENT_TYPE.to_string(),
            content_length: bytes,
            metadata,
        })
        .await?;

    Ok((object_key, bytes))
}
