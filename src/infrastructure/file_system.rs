use crate::core::interfaces::FileSystemService;
use crate::utils::{PackError, Result};
use std::path::Path;
use tokio::fs;

pub struct TokioFileSystemService;

#[async_trait::async_trait]
impl FileSystemService for TokioFileSystemService {
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path)
            .await
            .map_err(|e| PackError::file_io(path, e))
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            self.create_directory(parent).await?;
        }

        fs::write(path, content)
            .await
            .map_err(|e| PackError::file_io(path, e))
    }

    async fn create_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| PackError::file_io(path, e))
    }

    async fn clear_directory(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return self.create_directory(path).await;
        }

        let mut entries = fs::read_dir(path)
            .await
            .map_err(|e| PackError::file_io(path, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PackError::file_io(path, e))?
        {
            let entry_path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| PackError::file_io(&entry_path, e))?;

            let removed = if file_type.is_dir() {
                fs::remove_dir_all(&entry_path).await
            } else {
                fs::remove_file(&entry_path).await
            };
            removed.map_err(|e| PackError::file_io(&entry_path, e))?;
        }

        Ok(())
    }
}
