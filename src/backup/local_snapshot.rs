// zkvrm-snapshot/src/backup/local_snapshot.rs
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::TRACING_TARGET;
use crate::errors::Result;

const TEMP_DIR_PREFIX: &str = "zkvrm-snapshot-";

/// A consistent copy of the live database sitting in its own temporary directory.
///
/// Dropping the value removes the directory; [`LocalSnapshot::cleanup`] does the
/// same but reports failures.
#[derive(Debug)]
pub struct LocalSnapshot {
    pub file_path: PathBuf,
    temp_dir: TempDir,
}

impl LocalSnapshot {
    #[cfg(test)]
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Removes the temporary directory off the runtime thread. Failures are
    /// logged and swallowed.
    pub async fn cleanup(self) {
        let temp_path = self.temp_dir.path().to_path_buf();
        let temp_dir = self.temp_dir;
        let outcome = tokio::task::spawn_blocking(move || temp_dir.close())
            .await
            .map_err(io::Error::other)
            .and_then(|closed| closed);

        if let Err(e) = outcome {
            warn!(
                target: TRACING_TARGET,
                path = %temp_path.display(),
                error = %e,
                "Failed to remove snapshot temp directory"
            );
        }
    }
}

/// Copies the database at `database_path` into a fresh temporary directory
/// using `VACUUM INTO`.
///
/// The temporary directory is created under `temp_root` when given, otherwise
/// under the OS temp dir. If the copy fails the directory is removed before the
/// error is returned.
pub async fn create_local_snapshot(
    database_path: &Path,
    temp_root: Option<&Path>,
) -> Result<LocalSnapshot> {
    if let Some(root) = temp_root {
        tokio::fs::create_dir_all(root).await?;
    }
    let temp_dir = create_temp_dir(temp_root.map(Path::to_path_buf)).await?;

    let snapshot = LocalSnapshot {
        file_path: temp_dir
            .path()
            .join(format!("snapshot-{}.sqlite", Uuid::new_v4())),
        temp_dir,
    };

    if let Err(e) = vacuum_into(database_path, &snapshot.file_path).await {
        snapshot.cleanup().await;
        return Err(e);
    }

    Ok(snapshot)
}

async fn create_temp_dir(temp_root: Option<PathBuf>) -> io::Result<TempDir> {
    tokio::task::spawn_blocking(move || {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_DIR_PREFIX);
        match temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    })
    .await
    .map_err(io::Error::other)?
}

async fn vacuum_into(database_path: &Path, output_path: &Path) -> Result<()> {
    debug!(
        target: TRACING_TARGET,
        db = %database_path.display(),
        output = %output_path.display(),
        "Running VACUUM INTO"
    );

    let mut conn = SqliteConnectOptions::new()
        .filename(database_path)
        .read_only(true)
        .connect()
        .await?;

    let statement = format!(
        "VACUUM INTO '{}'",
        escape_sqlite_path(&output_path.to_string_lossy())
    );
    let outcome = sqlx::query(&statement).execute(&mut conn).await;

    if let Err(e) = conn.close().await {
        warn!(target: TRACING_TARGET, error = %e, "Failed to close snapshot database handle");
    }

    outcome?;
    Ok(())
}

fn escape_sqlite_path(path: &str) -> String {
    path.replace('\'', "''")
}
