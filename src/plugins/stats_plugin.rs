// Stats Plugin: Logs build statistics after the output is written

use crate::core::models::{ArtifactKind, BuildResult};
use crate::core::plugin::{Plugin, PluginContext};
use crate::utils::{format_size, Logger, Result};

/// Plugin that logs build statistics. Emits no artifacts.
///
/// # Example
/// ```no_run
/// use packline::plugins::StatsPlugin;
/// use packline::core::services::PackBuildService;
/// use std::sync::Arc;
///
/// # fn wire(service: PackBuildService) -> PackBuildService {
/// service.with_plugin(Arc::new(StatsPlugin::new(true)))
/// # }
/// ```
pub struct StatsPlugin {
    verbose: bool,
}

impl StatsPlugin {
    /// `verbose` also lists every output file
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Plugin for StatsPlugin {
    fn name(&self) -> &str {
        "stats"
    }

    fn on_build_start(&self, context: &PluginContext) -> Result<()> {
        if self.verbose {
            Logger::info(&format!("📊 Stats: build #{} started", context.generation));
            Logger::info(&format!("  Root: {}", context.root.display()));
            Logger::info(&format!("  Output: {}", context.out_dir.display()));
        }
        Ok(())
    }

    fn on_build_end(&self, context: &PluginContext, result: &BuildResult) -> Result<()> {
        let generated = result
            .output_files
            .iter()
            .filter(|f| f.kind == Some(ArtifactKind::Generated))
            .count();
        let total_size: usize = result.output_files.iter().map(|f| f.size).sum();

        Logger::info("📊 Stats: Build Statistics");
        Logger::info(&format!("  ⚡ Build time: {:?}", result.build_time));
        Logger::info(&format!("  📦 Modules: {}", result.modules_processed));
        Logger::info(&format!("  🖼  Resources: {}", result.resources_processed));
        Logger::info(&format!("  🧩 Plugin files: {}", generated));
        Logger::info(&format!(
            "  📂 Output files: {} ({})",
            result.output_files.len(),
            format_size(total_size)
        ));

        if self.verbose {
            Logger::info("  📄 Output Files:");
            for (i, file) in result.output_files.iter().enumerate() {
                let name = file.path.strip_prefix(&context.out_dir).unwrap_or(&file.path);
                Logger::info(&format!(
                    "     {}. {} ({})",
                    i + 1,
                    name.display(),
                    format_size(file.size)
                ));
            }
        }

        Ok(())
    }
}
