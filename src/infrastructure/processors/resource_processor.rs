use crate::core::interfaces::{Pipeline, PipelineOutput};
use std::path::Path;

/// Identity pipeline for opaque files (images, fonts, ...)
pub struct ResourcePipeline;

impl ResourcePipeline {
    pub const ID: &'static str = "resource";
}

impl Pipeline for ResourcePipeline {
    fn id(&self) -> &str {
        Self::ID
    }

    fn transform(&self, _path: &Path, source: &[u8]) -> anyhow::Result<PipelineOutput> {
        Ok(PipelineOutput::new(source, Vec::new()))
    }
}
