use crate::infrastructure::resolver::ExtensionSearchOrder;
use crate::infrastructure::rule_table::Rule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Terminal type of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    /// Composable code; its edges are followed
    Module,
    /// Opaque content, emitted verbatim with no edges
    Resource,
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetClass::Module => write!(f, "module"),
            AssetClass::Resource => write!(f, "resource"),
        }
    }
}

/// A transformed asset discovered during the walk
#[derive(Debug, Clone)]
pub struct Asset {
    /// Canonical absolute path
    pub path: PathBuf,
    /// Root-relative path without extension, `/`-separated
    pub logical_name: String,
    /// Transformed bytes
    pub content: Vec<u8>,
    /// Resolved dependencies in the order the pipeline reported them
    pub dependencies: Vec<PathBuf>,
    pub class: AssetClass,
    pub pipeline: String,
    /// Extension used for the output file, without the dot
    pub output_extension: String,
}

/// Result of running one pipeline over one asset
#[derive(Debug, Clone, PartialEq)]
pub struct TransformResult {
    pub bytes: Vec<u8>,
    /// Unresolved specifiers, in source order
    pub edges: Vec<String>,
    pub class: AssetClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Module,
    Resource,
    /// Emitted by a plugin rather than by an asset
    Generated,
}

impl From<AssetClass> for ArtifactKind {
    fn from(class: AssetClass) -> Self {
        match class {
            AssetClass::Module => ArtifactKind::Module,
            AssetClass::Resource => ArtifactKind::Resource,
        }
    }
}

/// A file destined for the output directory
#[derive(Debug, Clone, PartialEq)]
pub struct OutputArtifact {
    /// Path relative to the output directory
    pub path: PathBuf,
    pub content: Vec<u8>,
    pub kind: ArtifactKind,
    /// Source assets sharing this file; empty for plugin output
    pub sources: Vec<PathBuf>,
}

impl OutputArtifact {
    pub fn generated(path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            kind: ArtifactKind::Generated,
            sources: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Output path with `/` separators, as used in URLs
    pub fn url_path(&self) -> String {
        self.path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|s| s.to_str())
    }
}

/// Everything a build produced, handed to plugins
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub root: PathBuf,
    pub out_dir: PathBuf,
    /// Canonical path of the entry asset
    pub entry: PathBuf,
    /// Artifacts in discovery order
    pub artifacts: Vec<OutputArtifact>,
}

impl BuildOutput {
    pub fn entry_artifact(&self) -> Option<&OutputArtifact> {
        self.artifacts
            .iter()
            .find(|a| a.sources.iter().any(|s| s == &self.entry))
    }

    /// Whether an artifact already occupies `path`; `./` segments are ignored
    pub fn contains_path(&self, path: &Path) -> bool {
        let wanted = normalize_relative(path);
        self.artifacts
            .iter()
            .any(|a| normalize_relative(&a.path) == wanted)
    }

    /// Root-relative source paths of an artifact, `/`-separated
    pub fn source_keys(&self, artifact: &OutputArtifact) -> Vec<String> {
        artifact
            .sources
            .iter()
            .map(|source| {
                source
                    .strip_prefix(&self.root)
                    .unwrap_or(source)
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .collect()
    }
}

/// Drop `.` components so `./a.js` and `a.js` compare equal
pub fn normalize_relative(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Declarative plugin entry from the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "plugin", rename_all = "lowercase")]
pub enum PluginSpec {
    Html {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Manifest {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
    Stats {
        #[serde(default)]
        verbose: bool,
    },
}

/// Validated, immutable build configuration
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub root: PathBuf,
    /// Entry specifier, resolved against `root`
    pub entry: String,
    /// Output directory; a relative path is taken from `root`
    pub outdir: PathBuf,
    /// Filename template for module artifacts
    pub filename: String,
    /// Filename template for resource artifacts
    pub asset_filename: String,
    pub hash_length: usize,
    pub clean: bool,
    pub extensions: ExtensionSearchOrder,
    pub rules: Vec<Rule>,
    pub alias: BTreeMap<String, String>,
    pub external: Vec<String>,
    pub plugins: Vec<PluginSpec>,
}

pub const DEFAULT_FILENAME: &str = "[name].[contenthash].[ext]";
pub const DEFAULT_HASH_LENGTH: usize = 20;

#[derive(Debug, Default)]
pub struct BuildResult {
    pub generation: u64,
    pub assets_processed: usize,
    pub modules_processed: usize,
    pub resources_processed: usize,
    pub build_time: std::time::Duration,
    pub output_files: Vec<OutputFile>,
}

#[derive(Debug, Clone)]
pub struct OutputFile {
    /// Absolute path on disk
    pub path: PathBuf,
    pub size: usize,
    pub kind: Option<ArtifactKind>,
}
