// zkvrm-snapshot/src/config/mod.rs
pub mod destination;
pub mod duration;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::utils::format::format_duration;
use destination::resolve_destination;
use duration::parse_duration;

/// Tracing target shared by every snapshot log line.
pub const TRACING_TARGET: &str = "zkvrm::db_snapshot";

pub const DEFAULT_INTERVAL_MS: u64 = 60 * 60 * 1000;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 10_000;
pub const MIN_INTERVAL_MS: u64 = 5_000;

const DEFAULT_SQLITE_PATH: &str = "zkvrm.sqlite";
const DEFAULT_APP_NAME: &str = "zkvrm";

const ENV_REGION: [&str; 2] = ["AWS_REGION", "AWS_DEFAULT_REGION"];
const ENV_INTERVAL: [&str; 2] = ["S3_SNAPSHOT_INTERVAL", "S3_SNAPSHOT_INTERVAL_MS"];
const ENV_INITIAL_DELAY: [&str; 2] = ["S3_SNAPSHOT_INITIAL_DELAY", "S3_SNAPSHOT_INITIAL_DELAY_MS"];
const ENV_ENDPOINT: &str = "S3_SNAPSHOT_ENDPOINT";
const ENV_FORCE_PATH_STYLE: &str = "S3_SNAPSHOT_FORCE_PATH_STYLE";
const ENV_SQLITE_PATH: &str = "SQLITE_PATH";
const ENV_APP_NAME: &str = "SNAPSHOT_APP_NAME";
const ENV_TEMP_DIR: &str = "SNAPSHOT_TEMP_DIR";

/// Environment key/value pairs. Empty values count as unset.
#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    vars: HashMap<String, String>,
}

impl EnvVars {
    pub fn from_process() -> Self {
        std::env::vars().collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// First set value among `keys`, in order.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }
}

impl FromIterator<(String, String)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        EnvVars {
            vars: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotConfig {
    Disabled { reason: String },
    Enabled(EnabledSnapshotConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnabledSnapshotConfig {
    pub bucket: String,
    pub region: String,
    pub key_prefix: String,
    pub interval_ms: u64,
    pub initial_delay_ms: u64,
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    pub database_path: PathBuf,
    pub app_name: String,
    /// Parent for the per-run temporary directory; the OS temp dir when unset.
    pub temp_root: Option<PathBuf>,
}

impl EnabledSnapshotConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// One-line description of where and how often snapshots are uploaded.
    pub fn describe(&self) -> String {
        format!(
            "Uploading {} to s3://{}/{} every {} (first run in {}).",
            self.database_path.display(),
            self.bucket,
            self.key_prefix,
            format_duration(self.interval_ms),
            format_duration(self.initial_delay_ms)
        )
    }
}

impl SnapshotConfig {
    /// Builds the configuration from environment values. Never fails: missing
    /// or invalid required settings produce [`SnapshotConfig::Disabled`].
    pub fn from_env(env: &EnvVars) -> Self {
        let destination = match resolve_destination(env) {
            Ok(destination) => destination,
            Err(reason) => return SnapshotConfig::Disabled { reason },
        };

        let Some(region) = env.first_of(&ENV_REGION) else {
            return SnapshotConfig::Disabled {
                reason: "S3 snapshots disabled: AWS_REGION or AWS_DEFAULT_REGION must be set."
                    .to_string(),
            };
        };

        let interval_ms = normalise_interval(resolve_duration(env, &ENV_INTERVAL), DEFAULT_INTERVAL_MS);

        let initial_delay_ms = normalise_interval(
            resolve_duration(env, &ENV_INITIAL_DELAY),
            interval_ms.min(DEFAULT_INITIAL_DELAY_MS),
        );

        SnapshotConfig::Enabled(EnabledSnapshotConfig {
            bucket: destination.bucket,
            region: region.to_string(),
            key_prefix: destination.key_prefix,
            interval_ms,
            initial_delay_ms,
            endpoint: env.get(ENV_ENDPOINT).map(str::to_string),
            force_path_style: env.get(ENV_FORCE_PATH_STYLE) == Some("true"),
            database_path: PathBuf::from(env.get(ENV_SQLITE_PATH).unwrap_or(DEFAULT_SQLITE_PATH)),
            app_name: env.get(ENV_APP_NAME).unwrap_or(DEFAULT_APP_NAME).to_string(),
            temp_root: env.get(ENV_TEMP_DIR).map(PathBuf::from),
        })
    }
}

/// Tries each key in turn; a value that fails to parse is logged and the next
/// key is consulted.
fn resolve_duration(env: &EnvVars, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| {
        let raw = env.get(key)?;
        let parsed = parse_duration(raw);
        if parsed.is_none() {
            warn!(target: TRACING_TARGET, variable = *key, value = raw, "Unable to parse duration value");
        }
        parsed
    })
}

fn normalise_interval(value: Option<u64>, fallback: u64) -> u64 {
    match value {
        None => fallback,
        Some(ms) if ms < MIN_INTERVAL_MS => {
            warn!(
                target: TRACING_TARGET,
                interval_ms = ms,
                fallback_ms = fallback,
                "Interval is too small, using fallback instead"
            );
            fallback
        }
        Some(ms) => ms,
    }
}
