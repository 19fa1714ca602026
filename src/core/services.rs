use crate::core::{interfaces::*, models::*, plugin::{Plugin, PluginContext, PluginManager}};
use crate::infrastructure::{
    DependencyWalker, OutputNamer, OutputWriter, PipelineExecutor, Resolver, RuleTable,
};
use crate::utils::{CompletionStats, Logger, OutputFileInfo, PackError, PackUI, Result, Timer};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared build counter.
///
/// Each build takes the next number when it starts. A build whose number
/// is no longer the latest when it is about to write is stale and gives up.
#[derive(Debug, Clone, Default)]
pub struct BuildGeneration(Arc<AtomicU64>);

impl BuildGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation and return its number
    pub fn begin(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }

    pub fn ensure_current(&self, generation: u64) -> Result<()> {
        let current = self.current();
        if current != generation {
            return Err(PackError::Cancelled {
                generation,
                current,
            });
        }
        Ok(())
    }
}

/// Main build service implementation
pub struct PackBuildService {
    config: BuildConfig,
    fs_service: Arc<dyn FileSystemService>,
    resolver: Resolver,
    rules: RuleTable,
    executor: PipelineExecutor,
    namer: OutputNamer,
    writer: OutputWriter,
    plugin_manager: PluginManager,
    generation: BuildGeneration,
    ui: PackUI,
}

impl PackBuildService {
    /// Service with the built-in pipelines and the configured plugins
    pub fn new(config: BuildConfig, fs_service: Arc<dyn FileSystemService>) -> Result<Self> {
        Self::with_executor(config, fs_service, PipelineExecutor::with_builtin_pipelines())
    }

    /// Validate `config` against `executor` and set up one build service.
    ///
    /// Every configuration problem surfaces here, before any build runs.
    pub fn with_executor(
        mut config: BuildConfig,
        fs_service: Arc<dyn FileSystemService>,
        executor: PipelineExecutor,
    ) -> Result<Self> {
        config.root = config
            .root
            .canonicalize()
            .map_err(|e| PackError::file_io(&config.root, e))?;
        // A relative outdir is taken from the root, joined here only
        config.outdir = absolute_outdir(&config.root, &config.outdir);

        if config.root.starts_with(&config.outdir) {
            return Err(PackError::config(format!(
                "Output directory {} contains the project root; refusing to clear it",
                config.outdir.display()
            )));
        }

        let rules = RuleTable::new(config.rules.clone());
        executor.validate(&rules)?;
        for index in rules.shadowed_rules() {
            Logger::warn(&format!(
                "Rule #{} ('{}') is unreachable: earlier rules match all of its paths",
                index + 1,
                rules.rules()[index].test.source()
            ));
        }

        let namer = OutputNamer::new(
            config.filename.clone(),
            config.asset_filename.clone(),
            config.hash_length,
        )?;

        let resolver = Resolver::new(&config.root, config.extensions.clone())
            .with_alias(config.alias.clone())
            .with_external(config.external.clone());

        let mut plugin_manager = PluginManager::new();
        for spec in &config.plugins {
            plugin_manager.register(crate::plugins::instantiate(spec));
        }

        let writer = OutputWriter::new(fs_service.clone(), config.clean);

        Ok(Self {
            config,
            fs_service,
            resolver,
            rules,
            executor,
            namer,
            writer,
            plugin_manager,
            generation: BuildGeneration::new(),
            ui: PackUI::new(),
        })
    }

    /// Register a plugin after the configured ones
    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugin_manager.register(plugin);
        self
    }

    /// Share a generation counter with other services or a watcher
    pub fn with_generation(mut self, generation: BuildGeneration) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_ui(mut self, ui: PackUI) -> Self {
        self.ui = ui;
        self
    }

    pub fn generation(&self) -> BuildGeneration {
        self.generation.clone()
    }

    /// Configuration with canonical root and absolute output directory
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugin_manager.names()
    }

    fn completion_stats(&self, result: &BuildResult) -> CompletionStats {
        let out_dir_label = self
            .config
            .outdir
            .strip_prefix(&self.config.root)
            .unwrap_or(&self.config.outdir)
            .display()
            .to_string();

        CompletionStats {
            output_files: result
                .output_files
                .iter()
                .map(|file| OutputFileInfo {
                    name: file
                        .path
                        .strip_prefix(&self.config.outdir)
                        .unwrap_or(&file.path)
                        .display()
                        .to_string(),
                    size: file.size,
                    kind: file.kind,
                })
                .collect(),
            out_dir_label,
            modules: result.modules_processed,
            resources: result.resources_processed,
            build_time: result.build_time,
        }
    }
}

#[async_trait::async_trait]
impl BuildService for PackBuildService {
    async fn build(&self) -> Result<BuildResult> {
        let _timer = Timer::start("Build");
        let build_start = Instant::now();
        let generation = self.generation.begin();

        self.ui.show_banner();
        Logger::build_start(
            &self.config.entry,
            &self.config.outdir.display().to_string(),
            generation,
        );

        let context = PluginContext::new(
            self.config.root.clone(),
            self.config.outdir.clone(),
            generation,
        );
        if self.plugin_manager.plugin_count() > 0 {
            Logger::debug(&format!(
                "Running on_build_start hook for {} plugins",
                self.plugin_manager.plugin_count()
            ));
            self.plugin_manager.on_build_start(&context)?;
        }

        let entry = self.resolver.resolve_entry(&self.config.entry)?;
        let walker = DependencyWalker::new(
            self.fs_service.clone(),
            &self.resolver,
            &self.rules,
            &self.executor,
            &self.config.root,
        );
        let graph = walker.walk(entry.clone()).await?;

        let modules = graph.count(AssetClass::Module);
        let resources = graph.count(AssetClass::Resource);
        Logger::walk_complete(graph.len(), modules, resources);

        let artifacts = self.namer.name_all(&graph)?;
        let mut output = BuildOutput {
            root: self.config.root.clone(),
            out_dir: self.config.outdir.clone(),
            entry,
            artifacts,
        };
        self.plugin_manager.apply(&context, &mut output)?;

        // Nothing has touched the output directory yet
        self.generation.ensure_current(generation)?;

        let output_files = self
            .writer
            .write(&self.config.outdir, &output.artifacts)
            .await?;

        let result = BuildResult {
            generation,
            assets_processed: graph.len(),
            modules_processed: modules,
            resources_processed: resources,
            build_time: build_start.elapsed(),
            output_files,
        };

        Logger::build_complete(
            result.output_files.len(),
            result.build_time,
            &self.config.outdir.display().to_string(),
        );
        self.ui.show_completion(&self.completion_stats(&result));

        self.plugin_manager.on_build_end(&context, &result)?;

        Ok(result)
    }
}

/// Absolute output directory. Existing directories are canonicalized;
/// others are normalized lexically.
fn absolute_outdir(root: &Path, outdir: &Path) -> PathBuf {
    let joined = if outdir.is_absolute() {
        outdir.to_path_buf()
    } else {
        root.join(outdir)
    };

    if let Ok(canonical) = joined.canonicalize() {
        return canonical;
    }

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::file_system::TokioFileSystemService;
    use crate::utils::{CliOverrides, ConfigLoader};
    use tempfile::tempdir;

    fn config_for(root: &Path, outdir: &str) -> BuildConfig {
        let cli = CliOverrides {
            entry: Some("src/index.js".to_string()),
            outdir: Some(outdir.to_string()),
            ..Default::default()
        };
        let mut config =
            ConfigLoader::merge_with_cli(None, root.to_path_buf(), &cli).unwrap();
        config.plugins.clear();
        config
    }

    #[test]
    fn test_generation_counter() {
        let generation = BuildGeneration::new();
        let first = generation.begin();
        assert!(generation.ensure_current(first).is_ok());

        let second = generation.clone().begin();
        assert_eq!(second, first + 1);
        assert!(!generation.is_current(first));
        assert!(matches!(
            generation.ensure_current(first),
            Err(PackError::Cancelled { generation: 1, current: 2 })
        ));
    }

    #[test]
    fn test_refuses_outdir_containing_root() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("proj");
        std::fs::create_dir_all(&root).unwrap();

        for outdir in [".", "..", "./sub/../.."] {
            let result = PackBuildService::new(
                config_for(&root, outdir),
                Arc::new(TokioFileSystemService),
            );
            assert!(
                matches!(result, Err(PackError::Config(_))),
                "outdir {outdir} should be refused"
            );
        }

        assert!(PackBuildService::new(config_for(&root, "dist"), Arc::new(TokioFileSystemService)).is_ok());
    }

    #[test]
    fn test_unknown_pipeline_fails_at_construction() {
        let temp = tempdir().unwrap();
        let mut config = config_for(temp.path(), "dist");
        config.rules = vec![crate::infrastructure::Rule::new(
            crate::infrastructure::RulePattern::extensions(&["vue"]),
            "vue",
            AssetClass::Module,
        )];

        let result = PackBuildService::new(config, Arc::new(TokioFileSystemService));
        assert!(matches!(result, Err(PackError::Config(_))));
    }

    #[tokio::test]
    async fn test_build_writes_entry_graph() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/index.js"), "import './app.css';\nimport data from './data.json';\n").unwrap();
        std::fs::write(root.join("src/app.css"), ".app { color: blue; }").unwrap();
        std::fs::write(root.join("src/data.json"), r#"{"ok": true}"#).unwrap();

        let service = PackBuildService::new(config_for(root, "dist"), Arc::new(TokioFileSystemService))
            .unwrap()
            .with_ui(PackUI::silent());
        let result = service.build().await.unwrap();

        assert_eq!(result.generation, 1);
        assert_eq!(result.assets_processed, 3);
        assert_eq!(result.modules_processed, 3);

        let mut names: Vec<String> = std::fs::read_dir(root.join("dist"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names.len(), 3);
        assert!(names[0].starts_with("app.") && names[0].ends_with(".css"));
        assert!(names[1].starts_with("data.") && names[1].ends_with(".js"));
        assert!(names[2].starts_with("index.") && names[2].ends_with(".js"));
    }

    #[tokio::test]
    async fn test_relative_root_writes_inside_root() {
        let temp = tempfile::Builder::new()
            .prefix(".packline-relative-root")
            .tempdir_in(".")
            .unwrap();
        let root = PathBuf::from(".").join(temp.path().file_name().unwrap());
        assert!(root.is_relative());
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/index.js"), "console.log('hi');\n").unwrap();

        let service = PackBuildService::new(config_for(&root, "dist"), Arc::new(TokioFileSystemService))
            .unwrap()
            .with_ui(PackUI::silent());
        let canonical_root = root.canonicalize().unwrap();
        assert_eq!(service.config().outdir, canonical_root.join("dist"));

        service.build().await.unwrap();
        assert!(root.join("dist").is_dir());
        assert!(!root.join(&root).exists());
    }
}
