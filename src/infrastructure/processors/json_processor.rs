use crate::core::interfaces::{Pipeline, PipelineOutput};
use crate::infrastructure::processors::common::decode_utf8;
use crate::utils::Logger;
use std::path::Path;

/// JSON pipeline: validates the document and converts it to an ES module
/// with the data as default export
pub struct JsonPipeline;

impl JsonPipeline {
    pub const ID: &'static str = "json";

    pub fn new() -> Self {
        Self
    }

    pub fn to_module(&self, content: &str, file_path: &Path) -> anyhow::Result<String> {
        // Validate JSON; the serde error keeps line/column for reporting
        let _: serde_json::Value = serde_json::from_str(content)?;

        Logger::debug(&format!("📦 Processing JSON asset: {}", file_path.display()));

        Ok(format!(
            "const data = {};\nexport default data;\n",
            content.trim()
        ))
    }
}

impl Default for JsonPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline for JsonPipeline {
    fn id(&self) -> &str {
        Self::ID
    }

    fn transform(&self, path: &Path, source: &[u8]) -> anyhow::Result<PipelineOutput> {
        let content = decode_utf8(source, path)?;
        let module = self.to_module(content, path)?;
        Ok(PipelineOutput::new(module, Vec::new()))
    }
}
