use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// A remote object whose metadata commit failed after a confirmed upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrphanRecord {
    pub video_id: Uuid,
    pub object_key: String,
    pub url: String,
    pub reason: String,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

impl OrphanRecord {
    pub fn new(video_id: Uuid, object_key: &str, url: &str, reason: impl Into<String>) -> Self {
        Self {
            video_id,
            object_key: object_key.to_string(),
            url: url.to_string(),
            reason: reason.into(),
            recorded_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Append-only JSON-lines ledger read by reconciliation tooling.
#[derive(Debug, Clone)]
pub struct OrphanLedger {
    path: PathBuf,
}

impl OrphanLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn record(&self, entry: &OrphanRecord) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        // One write per line so concurrent appenders never interleave.
        file.write_all(&line).await?;
        file.flush().await
    }

    pub async fn entries(&self) -> io::Result<Vec<OrphanRecord>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(io::Error::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = OrphanLedger::new(dir.path().join("nested/orphans.jsonl"));
        assert!(ledger.entries().await.unwrap().is_empty());

        let id = Uuid::new_v4();
        ledger
            .record(&OrphanRecord::new(id, "landscape/a.mp4", "https://x/landscape/a.mp4", "db down"))
            .await
            .unwrap();
        ledger
            .record(&OrphanRecord::new(id, "landscape/b.mp4", "https://x/landscape/b.mp4", "db down"))
            .await
            .unwrap();

        let entries = ledger.entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].object_key, "landscape/a.mp4");
        assert_eq!(entries[1].video_id, id);
    }
}
