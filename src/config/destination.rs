// zkvrm-snapshot/src/config/destination.rs
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

use super::{EnvVars, TRACING_TARGET};

pub const ENV_SNAPSHOT_URI: &str = "S3_SNAPSHOT_URI";
pub const ENV_SNAPSHOT_URL: &str = "S3_SNAPSHOT_URL";
pub const ENV_SNAPSHOT_BUCKET: &str = "S3_SNAPSHOT_BUCKET";
pub const ENV_SNAPSHOT_PREFIX: &str = "S3_SNAPSHOT_PREFIX";

static S3_URI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^s3://([^/]+)(?:/(.*))?$").expect("s3 uri pattern is valid")
});

/// Bucket and key prefix that snapshots are written under.
///
/// `key_prefix` is either empty or a `/`-terminated path with no leading `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotDestination {
    pub bucket: String,
    pub key_prefix: String,
}

/// Works out where snapshots go.
///
/// A full `s3://bucket/prefix` URI wins over a separately supplied bucket,
/// and `S3_SNAPSHOT_PREFIX` is appended to whatever prefix the URI carries.
/// The error string explains why snapshots are disabled.
pub fn resolve_destination(env: &EnvVars) -> Result<SnapshotDestination, String> {
    let extra_prefix = env.get(ENV_SNAPSHOT_PREFIX);

    if let Some(uri) = env.first_of(&[ENV_SNAPSHOT_URI, ENV_SNAPSHOT_URL]) {
        let (bucket, uri_prefix) = parse_s3_uri(uri).ok_or_else(|| {
            format!(
                "S3 snapshots disabled: {} is not a valid S3 URI. Expected format s3://bucket/optional/prefix.",
                uri
            )
        })?;

        if let Some(bucket_from_env) = env.get(ENV_SNAPSHOT_BUCKET) {
            if bucket_from_env != bucket {
                warn!(
                    target: TRACING_TARGET,
                    ignored_bucket = bucket_from_env,
                    %bucket,
                    "Ignoring S3_SNAPSHOT_BUCKET because S3_SNAPSHOT_URI sets a different bucket"
                );
            }
        }

        return Ok(SnapshotDestination {
            bucket,
            key_prefix: combine_prefixes([Some(uri_prefix.as_str()), extra_prefix]),
        });
    }

    let bucket = env
        .get(ENV_SNAPSHOT_BUCKET)
        .ok_or_else(|| "S3 snapshots disabled: S3_SNAPSHOT_BUCKET is not set.".to_string())?;

    Ok(SnapshotDestination {
        bucket: bucket.to_string(),
        key_prefix: combine_prefixes([extra_prefix]),
    })
}

/// Splits `s3://bucket/some/prefix` into the bucket and the prefix with its
/// outer slashes removed. The prefix is kept exactly as written and may be empty.
fn parse_s3_uri(s3_uri: &str) -> Option<(String, String)> {
    let captures = S3_URI_PATTERN.captures(s3_uri.trim())?;
    let bucket = captures.get(1)?.as_str().to_string();
    let prefix = captures
        .get(2)
        .map(|path| path.as_str().trim().trim_matches('/').to_string())
        .unwrap_or_default();
    Some((bucket, prefix))
}

fn combine_prefixes<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> String {
    let segments: Vec<&str> = parts
        .into_iter()
        .flatten()
        .map(|part| part.trim().trim_matches('/'))
        .filter(|part| !part.is_empty())
        .collect();

    if segments.is_empty() {
        String::new()
    } else {
        format!("{}/", segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> EnvVars {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_uri_prefix_combined_with_extra_prefix() {
        let destination = resolve_destination(&env(&[
            (ENV_SNAPSHOT_URI, "s3://my-bucket/a/b"),
            (ENV_SNAPSHOT_PREFIX, "c"),
        ]))
        .unwrap();

        assert_eq!(destination.bucket, "my-bucket");
        assert_eq!(destination.key_prefix, "a/b/c/");
    }

    #[test]
    fn test_bucket_without_prefix_has_empty_prefix() {
        let destination = resolve_destination(&env(&[(ENV_SNAPSHOT_BUCKET, "my-bucket")])).unwrap();

        assert_eq!(destination.bucket, "my-bucket");
        assert_eq!(destination.key_prefix, "");
    }

    #[test]
    fn test_uri_bucket_overrides_bucket_variable() {
        let destination = resolve_destination(&env(&[
            (ENV_SNAPSHOT_URL, "S3://uri-bucket/"),
            (ENV_SNAPSHOT_BUCKET, "other-bucket"),
        ]))
        .unwrap();

        assert_eq!(destination.bucket, "uri-bucket");
        assert_eq!(destination.key_prefix, "");
    }

    #[test]
    fn test_prefix_slashes_are_normalised() {
        let destination = resolve_destination(&env(&[
            (ENV_SNAPSHOT_BUCKET, "my-bucket"),
            (ENV_SNAPSHOT_PREFIX, " //backups/db// "),
        ]))
        .unwrap();
        assert_eq!(destination.key_prefix, "backups/db/");

        let destination = resolve_destination(&env(&[
            (ENV_SNAPSHOT_URI, "s3://my-bucket//nightly/"),
            (ENV_SNAPSHOT_PREFIX, "/"),
        ]))
        .unwrap();
        assert_eq!(destination.key_prefix, "nightly/");
    }

    #[test]
    fn test_uri_prefix_is_kept_verbatim() {
        let destination =
            resolve_destination(&env(&[(ENV_SNAPSHOT_URI, "s3://my-bucket/my backups/db")])).unwrap();
        assert_eq!(destination.key_prefix, "my backups/db/");

        let destination = resolve_destination(&env(&[(ENV_SNAPSHOT_URI, "s3://my-bucket/café")])).unwrap();
        assert_eq!(destination.key_prefix, "café/");

        let destination =
            resolve_destination(&env(&[(ENV_SNAPSHOT_URI, "s3://bucket:9000/a?v=1#frag")])).unwrap();
        assert_eq!(destination.bucket, "bucket:9000");
        assert_eq!(destination.key_prefix, "a?v=1#frag/");
    }

    #[test]
    fn test_missing_bucket_is_a_disable_reason() {
        let reason = resolve_destination(&env(&[(ENV_SNAPSHOT_PREFIX, "a")])).unwrap_err();
        assert!(reason.contains("S3_SNAPSHOT_BUCKET is not set"));
    }

    #[test]
    fn test_invalid_uri_is_a_disable_reason() {
        for uri in ["https://my-bucket/a", "my-bucket/a", "s3:///a"] {
            let reason = resolve_destination(&env(&[
                (ENV_SNAPSHOT_URI, uri),
                (ENV_SNAPSHOT_BUCKET, "fallback"),
            ]))
            .unwrap_err();
            assert!(reason.contains("is not a valid S3 URI"), "{}", reason);
        }
    }
}
