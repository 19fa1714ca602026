// Plugin system for packline
// Post-build hooks that see the finished artifact set and may add to it

use crate::core::models::{BuildOutput, BuildResult, OutputArtifact};
use crate::utils::{Logger, PackError, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Context provided to plugins during execution
#[derive(Debug, Clone)]
pub struct PluginContext {
    /// Project root directory
    pub root: PathBuf,
    /// Output directory the build writes to
    pub out_dir: PathBuf,
    /// Generation number of the running build
    pub generation: u64,
}

impl PluginContext {
    pub fn new(root: PathBuf, out_dir: PathBuf, generation: u64) -> Self {
        Self {
            root,
            out_dir,
            generation,
        }
    }
}

/// Main plugin trait that all plugins must implement
///
/// Plugins can hook into three stages of the build:
/// - before the dependency walk (`on_build_start`)
/// - after every asset is named, before anything is written (`apply`)
/// - after the output directory is written (`on_build_end`)
pub trait Plugin: Send + Sync {
    /// Unique name for this plugin
    fn name(&self) -> &str;

    /// Called at the start of a build
    ///
    /// Use this to validate configuration or initialize resources.
    fn on_build_start(&self, _context: &PluginContext) -> Result<()> {
        Ok(())
    }

    /// Receives the artifact set built so far and returns extra artifacts
    ///
    /// The returned paths must not collide with existing ones.
    fn apply(&self, _context: &PluginContext, _output: &BuildOutput) -> Result<Vec<OutputArtifact>> {
        Ok(Vec::new())
    }

    /// Called after a successful build has been written
    fn on_build_end(&self, _context: &PluginContext, _result: &BuildResult) -> Result<()> {
        Ok(())
    }
}

/// Manages plugin registration and execution
#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginManager {
    /// Create a new empty plugin manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    /// Get number of registered plugins
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Execute on_build_start hook for all plugins
    pub fn on_build_start(&self, context: &PluginContext) -> Result<()> {
        for plugin in &self.plugins {
            plugin.on_build_start(context)?;
        }
        Ok(())
    }

    /// Run `apply` for every plugin in registration order.
    ///
    /// Each plugin sees the artifacts added by the plugins before it.
    /// Returns only the added artifacts; `output` is extended in place.
    pub fn apply(
        &self,
        context: &PluginContext,
        output: &mut BuildOutput,
    ) -> Result<Vec<OutputArtifact>> {
        let mut added = Vec::new();

        for plugin in &self.plugins {
            let artifacts = plugin.apply(context, output)?;
            Logger::debug(&format!(
                "Plugin '{}' emitted {} artifacts",
                plugin.name(),
                artifacts.len()
            ));

            for artifact in artifacts {
                if output.contains_path(&artifact.path) {
                    return Err(PackError::plugin(
                        plugin.name(),
                        format!("artifact path {} is already taken", artifact.path.display()),
                    ));
                }
                output.artifacts.push(artifact.clone());
                added.push(artifact);
            }
        }

        Ok(added)
    }

    /// Execute on_build_end hook for all plugins
    pub fn on_build_end(&self, context: &PluginContext, result: &BuildResult) -> Result<()> {
        for plugin in &self.plugins {
            plugin.on_build_end(context, result)?;
        }
        Ok(())
    }
}
