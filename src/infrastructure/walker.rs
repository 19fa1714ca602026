use crate::core::interfaces::FileSystemService;
use crate::core::models::{Asset, AssetClass};
use crate::infrastructure::processors::PipelineExecutor;
use crate::infrastructure::resolver::{Resolution, Resolver};
use crate::infrastructure::rule_table::RuleTable;
use crate::utils::{Logger, PackError, Result, Timer};
use futures::future::join_all;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Assets reachable from the entry, in discovery order
#[derive(Debug, Clone)]
pub struct AssetGraph {
    pub entry: PathBuf,
    pub assets: Vec<Asset>,
}

impl AssetGraph {
    pub fn get(&self, path: &Path) -> Option<&Asset> {
        self.assets.iter().find(|a| a.path == path)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn count(&self, class: AssetClass) -> usize {
        self.assets.iter().filter(|a| a.class == class).count()
    }
}

/// Breadth-first walk over pipeline-reported edges.
///
/// One walker serves one build: it owns the visited set and is consumed by
/// [`DependencyWalker::walk`]. Each frontier is read and transformed
/// concurrently; edges are resolved and queued in frontier order so the
/// result does not depend on scheduling.
pub struct DependencyWalker<'a> {
    fs_service: Arc<dyn FileSystemService>,
    resolver: &'a Resolver,
    rules: &'a RuleTable,
    executor: &'a PipelineExecutor,
    root: &'a Path,
    visited: HashSet<PathBuf>,
}

impl<'a> DependencyWalker<'a> {
    pub fn new(
        fs_service: Arc<dyn FileSystemService>,
        resolver: &'a Resolver,
        rules: &'a RuleTable,
        executor: &'a PipelineExecutor,
        root: &'a Path,
    ) -> Self {
        Self {
            fs_service,
            resolver,
            rules,
            executor,
            root,
            visited: HashSet::new(),
        }
    }

    /// `entry` must already be resolved and canonical
    pub async fn walk(mut self, entry: PathBuf) -> Result<AssetGraph> {
        let _timer = Timer::start("Dependency walk");

        let mut assets = Vec::new();
        let mut frontier = vec![entry.clone()];
        self.visited.insert(entry.clone());

        while !frontier.is_empty() {
            let processed = join_all(frontier.iter().map(|path| self.process(path))).await;
            let mut next = Vec::new();

            for result in processed {
                let (mut asset, edges) = result?;

                for specifier in edges {
                    let Resolution::File(dependency) = self.resolver.resolve(&specifier, &asset.path)?
                    else {
                        continue;
                    };

                    if !asset.dependencies.contains(&dependency) {
                        asset.dependencies.push(dependency.clone());
                    }
                    if self.visited.insert(dependency.clone()) {
                        next.push(dependency);
                    }
                }

                assets.push(asset);
            }

            frontier = next;
        }

        Ok(AssetGraph { entry, assets })
    }

    /// Read, match and transform one asset. Dependencies are filled in by
    /// the caller once edges are resolved.
    async fn process(&self, path: &Path) -> Result<(Asset, Vec<String>)> {
        let source = self.fs_service.read_file(path).await?;
        let rule = self.rules.match_rule(path);

        if let Some(rule) = rule {
            Logger::visiting_asset(&path.display().to_string(), &rule.pipeline);
        }

        let result = self.executor.run(path, &source, rule)?;
        let rule = rule.ok_or_else(|| PackError::UnsupportedAsset {
            path: path.to_path_buf(),
        })?;

        let asset = Asset {
            path: path.to_path_buf(),
            logical_name: logical_name(self.root, path),
            content: result.bytes,
            dependencies: Vec::new(),
            class: result.class,
            pipeline: rule.pipeline.clone(),
            output_extension: rule.output_extension_for(path),
        };

        Ok((asset, result.edges))
    }
}

/// Root-relative path without its last extension, `/`-separated.
/// Files outside the root are named by file stem alone.
pub fn logical_name(root: &Path, path: &Path) -> String {
    let relative = match path.strip_prefix(root) {
        Ok(relative) => relative.with_extension(""),
        Err(_) => PathBuf::from(path.file_stem().unwrap_or_default()),
    };

    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
