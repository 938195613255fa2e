use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::info;

use super::artifact::Artifact;
use crate::error::{CaptureError, CaptureResult};

/// Receives the finished artifact (the "download" step)
#[async_trait::async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn deliver(&self, artifact: Artifact) -> CaptureResult<()>;

    /// Sink name for logging
    fn name(&self) -> &str;
}

/// Writes artifacts into a directory, with a JSON metadata sidecar
pub struct DirectorySink {
    output_dir: PathBuf,
}

impl DirectorySink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path the artifact will be written to
    pub fn artifact_path(&self, artifact: &Artifact) -> PathBuf {
        self.output_dir.join(&artifact.file_name)
    }

    fn metadata_path(&self, artifact: &Artifact) -> PathBuf {
        self.output_dir
            .join(format!("{}.metadata.json", artifact.file_name))
    }
}

#[async_trait::async_trait]
impl ArtifactSink for DirectorySink {
    async fn deliver(&self, artifact: Artifact) -> CaptureResult<()> {
        let delivery_err = |what: &str, e: std::io::Error| {
            CaptureError::Delivery(format!("{} in {}: {}", what, self.output_dir.display(), e))
        };

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| delivery_err("failed to create output directory", e))?;

        let path = self.artifact_path(&artifact);
        tokio::fs::write(&path, &artifact.bytes)
            .await
            .map_err(|e| delivery_err("failed to write artifact", e))?;

        let metadata = serde_json::to_vec_pretty(&artifact)
            .map_err(|e| CaptureError::Delivery(format!("failed to encode metadata: {}", e)))?;
        tokio::fs::write(self.metadata_path(&artifact), metadata)
            .await
            .map_err(|e| delivery_err("failed to write metadata", e))?;

        info!(
            "Saved {} ({} bytes, {})",
            path.display(),
            artifact.size_bytes,
            artifact.media_type
        );

        Ok(())
    }

    fn name(&self) -> &str {
        "directory"
    }
}

/// Keeps delivered artifacts in memory
#[derive(Default)]
pub struct MemorySink {
    artifacts: Mutex<Vec<Artifact>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn artifacts(&self) -> Vec<Artifact> {
        self.artifacts.lock().await.clone()
    }

    pub async fn delivery_count(&self) -> usize {
        self.artifacts.lock().await.len()
    }
}

#[async_trait::async_trait]
impl ArtifactSink for MemorySink {
    async fn deliver(&self, artifact: Artifact) -> CaptureResult<()> {
        self.artifacts.lock().await.push(artifact);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
