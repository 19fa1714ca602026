// Manifest Plugin: maps source assets to their fingerprinted outputs

use crate::core::models::{BuildOutput, OutputArtifact};
use crate::core::plugin::{Plugin, PluginContext};
use crate::utils::{PackError, Result};
use std::collections::BTreeMap;

pub const DEFAULT_MANIFEST_FILENAME: &str = "manifest.json";

/// Emits a JSON object from root-relative source paths to output paths
pub struct ManifestPlugin {
    filename: String,
}

impl ManifestPlugin {
    pub fn new(filename: Option<String>) -> Self {
        Self {
            filename: filename.unwrap_or_else(|| DEFAULT_MANIFEST_FILENAME.to_string()),
        }
    }

    pub fn entries(output: &BuildOutput) -> BTreeMap<String, String> {
        output
            .artifacts
            .iter()
            .flat_map(|artifact| {
                let url = artifact.url_path();
                output
                    .source_keys(artifact)
                    .into_iter()
                    .map(move |key| (key, url.clone()))
            })
            .collect()
    }
}

impl Plugin for ManifestPlugin {
    fn name(&self) -> &str {
        "manifest"
    }

    fn apply(&self, _context: &PluginContext, output: &BuildOutput) -> Result<Vec<OutputArtifact>> {
        let mut json = serde_json::to_string_pretty(&Self::entries(output))
            .map_err(|e| PackError::plugin(self.name(), e.to_string()))?;
        json.push('\n');

        Ok(vec![OutputArtifact::generated(self.filename.as_str(), json)])
    }
}
