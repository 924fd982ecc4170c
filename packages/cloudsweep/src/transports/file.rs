//! Filesystem transport: artifacts as newline-delimited JSON.
//!
//! A local sink for development and offline runs. Each artifact becomes
//! one JSON line appended to the target file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::TransportResult;
use crate::traits::transport::Transport;
use crate::types::artifact::Artifact;

/// Appends artifacts to an NDJSON file.
pub struct FileTransport {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
}

impl FileTransport {
    /// Open (or create) the target file in append mode.
    pub async fn create(path: impl AsRef<Path>) -> TransportResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path the transport writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Transport for FileTransport {
    async fn send(&self, artifact: &Artifact) -> TransportResult<()> {
        let mut line = serde_json::to_vec(artifact)?;
        line.push(b'\n');
        // One lock per line keeps concurrent batch sends from interleaving
        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        Ok(())
    }

    async fn close(&self) -> TransportResult<()> {
        self.file.lock().await.flush().await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::artifact::CloudProvider;

    #[tokio::test]
    async fn test_appends_one_line_per_artifact() {
        let dir = std::env::temp_dir().join(format!("cloudsweep-test-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("artifacts.ndjson");

        let transport = FileTransport::create(&path).await.unwrap();
        for i in 0..3 {
            let artifact =
                Artifact::new(CloudProvider::Gcp, "gcp:storage:bucket", format!("b-{}", i));
            transport.send(&artifact).await.unwrap();
        }
        transport.close().await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);

        let first: Artifact = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.resource_id(), "b-0");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
