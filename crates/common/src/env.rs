//! Environment/runtime helpers
//!
//! Sanity checks run once at startup, before the database is touched.

use tracing::{info, warn};

/// Ensure the local data directory exists when a file-backed database is
/// configured (`sqlite://data/hive.db`); in-memory and server databases are
/// left alone.
pub async fn ensure_env(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_file_path(database_url) else {
        return Ok(());
    };
    let parent = std::path::Path::new(path).parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = parent {
        if tokio::fs::metadata(dir).await.is_err() {
            warn!(dir = %dir.display(), "sqlite data directory missing; creating it");
        }
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", dir.display()))?;
    }
    info!(%path, "using sqlite database file");
    Ok(())
}

fn sqlite_file_path(url: &str) -> Option<&str> {
    let rest = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Some(path)
}
