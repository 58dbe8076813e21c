use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// Directory-backed storage rooted at `base_path`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.base_path.join(path);
        let data = tokio::fs::read(full_path).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.base_path.join(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(self.base_path.join(path))
            .await
            .unwrap_or(false)
    }

    async fn reset(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.base_path).await.unwrap_or(false) {
            tracing::info!("🗑️  Removing existing directory: {}", self.base_path.display());
            tokio::fs::remove_dir_all(&self.base_path).await?;
        }
        tokio::fs::create_dir_all(&self.base_path).await?;
        tracing::info!("📁 Created directory: {}", self.base_path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.base_path.display().to_string()
    }
}
