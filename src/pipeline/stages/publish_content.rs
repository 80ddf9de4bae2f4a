//! Publish content stage - atomically replaces the output playlist
//!
//! The document is written to a sibling temporary file and renamed over
//! the target, so readers see either the previous playlist or the new one.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult};

pub struct PublishContentStage {
    target: PathBuf,
}

impl PublishContentStage {
    pub fn new<P: Into<PathBuf>>(target: P) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Temporary file next to the target
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self
            .target
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.target.with_file_name(name)
    }

    /// Write the whole document, then rename it into place
    pub async fn publish(&self, content: &str) -> AppResult<usize> {
        if let Some(parent) = self.target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::output(&self.target, e))?;
        }

        let temp_path = self.temp_path();
        if let Err(e) = write_file(&temp_path, content).await {
            remove_quietly(&temp_path).await;
            return Err(AppError::output(&temp_path, e));
        }
        debug!("Wrote {} bytes to temporary file: {}", content.len(), temp_path.display());

        if let Err(e) = fs::rename(&temp_path, &self.target).await {
            remove_quietly(&temp_path).await;
            return Err(AppError::output(&self.target, e));
        }

        info!(
            "Atomic move completed: {} -> {} ({} bytes)",
            temp_path.display(),
            self.target.display(),
            content.len()
        );
        Ok(content.len())
    }
}

async fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(content.as_bytes()).await?;
    file.sync_all().await?;
    Ok(())
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Failed to clean up temporary file '{}': {}", path.display(), e);
    }
}
