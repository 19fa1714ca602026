use crate::core::models::*;
use crate::utils::Result;
use async_trait::async_trait;
use std::path::Path;

/// File system operations interface
#[async_trait]
pub trait FileSystemService: Send + Sync {
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()>;
    async fn create_directory(&self, path: &Path) -> Result<()>;
    /// Remove everything inside `path`, creating it if missing
    async fn clear_directory(&self, path: &Path) -> Result<()>;
}

/// What a pipeline hands back for one asset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutput {
    pub bytes: Vec<u8>,
    /// Specifiers referenced by the asset, in source order
    pub edges: Vec<String>,
}

impl PipelineOutput {
    pub fn new(bytes: impl Into<Vec<u8>>, edges: Vec<String>) -> Self {
        Self {
            bytes: bytes.into(),
            edges,
        }
    }
}

/// A named transformation over an asset's raw bytes.
///
/// Must be a pure function of `(path, source)`. Errors are reported with
/// `anyhow` so pipelines can carry whatever their underlying tool returns;
/// the executor attaches the asset path and pipeline id.
pub trait Pipeline: Send + Sync {
    fn id(&self) -> &str;
    fn transform(&self, path: &Path, source: &[u8]) -> anyhow::Result<PipelineOutput>;
}

/// Build service interface
#[async_trait]
pub trait BuildService: Send + Sync {
    async fn build(&self) -> Result<BuildResult>;
}
