use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Removes regular files in `dir` whose modification time is older than
/// `grace`. A missing directory counts as empty. Returns how many files were
/// removed.
pub async fn sweep_staging(dir: &Path, grace: Duration) -> io::Result<usize> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let metadata = match entry.metadata().await {
            Ok(m) => m,
            // Released by its job between listing and stat.
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        if !metadata.is_file() {
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age <= grace {
            continue;
        }

        match fs::remove_file(entry.path()).await {
            Ok(()) => {
                debug!(path = %entry.path().display(), age_secs = age.as_secs(), "removed stale staged file");
                removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %entry.path().display(), error = %e, "failed to remove stale staged file"),
        }
    }

    Ok(removed)
}

/// Spawns the periodic staging sweep. Returns `None` when `interval` is zero.
pub fn start_staging_janitor(dir: PathBuf, interval: Duration, grace: Duration) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        info!("🧹 Staging janitor disabled");
        return None;
    }

    info!(
        "🧹 Staging janitor sweeping {} every {}s (grace {}s)",
        dir.display(),
        interval.as_secs(),
        grace.as_secs()
    );

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match sweep_staging(&dir, grace).await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "🧹 Removed stale staged files"),
                Err(e) => error!(error = %e, dir = %dir.display(), "staging sweep failed"),
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let removed = sweep_staging(&dir.path().join("tmp"), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn removes_only_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("stale.mp4");
        let fresh = dir.path().join("fresh.mp4");
        std::fs::write(&stale, b"old").unwrap();
        std::fs::write(&fresh, b"new").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let two_hours_ago = SystemTime::now() - Duration::from_secs(2 * 3600);
        std::fs::File::options()
            .write(true)
            .open(&stale)
            .unwrap()
            .set_modified(two_hours_ago)
            .unwrap();

        let removed = sweep_staging(dir.path(), Duration::from_secs(3600)).await.unwrap();

        assert_eq!(removed, 1);
        assert!(!stale.exists());
        assert!(fresh.exists());
        assert!(dir.path().join("nested").exists());
    }

    #[tokio::test]
    async fn zero_interval_disables_the_task() {
        let dir = tempfile::tempdir().unwrap();
        assert!(start_staging_janitor(dir.path().to_path_buf(), Duration::ZERO, Duration::from_secs(1)).is_none());
    }
}
