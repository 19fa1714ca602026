use crate::utils::{Logger, PackError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Ordered list of extensions tried when a specifier has none.
/// Non-empty, unique, every entry starts with a dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSearchOrder(Vec<String>);

impl ExtensionSearchOrder {
    pub fn new<I, S>(extensions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut normalized: Vec<String> = Vec::new();

        for ext in extensions {
            let ext: String = ext.into();
            let ext = ext.trim();
            let ext = if ext.starts_with('.') {
                ext.to_string()
            } else {
                format!(".{}", ext)
            };

            if ext.len() < 2 {
                return Err(PackError::config("Empty entry in extension search order"));
            }
            if normalized.contains(&ext) {
                return Err(PackError::config(format!(
                    "Duplicate extension '{}' in search order",
                    ext
                )));
            }
            normalized.push(ext);
        }

        if normalized.is_empty() {
            return Err(PackError::config("Extension search order must not be empty"));
        }

        Ok(Self(normalized))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Outcome of resolving one specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Canonical path of an existing file
    File(PathBuf),
    /// Left to the runtime; produces no edge
    External,
}

enum AliasTarget {
    Path(PathBuf),
    Specifier(String),
}

#[derive(Debug, Deserialize)]
struct PackageJson {
    #[serde(default)]
    main: Option<String>,
}

/// Maps specifiers to files on disk
#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
    extensions: ExtensionSearchOrder,
    alias: BTreeMap<String, String>,
    external: Vec<String>,
}

impl Resolver {
    pub fn new(root: impl Into<PathBuf>, extensions: ExtensionSearchOrder) -> Self {
        Self {
            root: root.into(),
            extensions,
            alias: BTreeMap::new(),
            external: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: BTreeMap<String, String>) -> Self {
        self.alias = alias;
        self
    }

    pub fn with_external(mut self, external: Vec<String>) -> Self {
        self.external = external;
        self
    }

    pub fn extensions(&self) -> &ExtensionSearchOrder {
        &self.extensions
    }

    /// Resolve the entry specifier against the project root
    pub fn resolve_entry(&self, specifier: &str) -> Result<PathBuf> {
        let candidate = if Path::new(specifier).is_absolute() {
            PathBuf::from(specifier)
        } else {
            self.root.join(specifier.trim_start_matches("./"))
        };

        match self.resolve_candidate(&candidate) {
            Some(found) => canonical(&found),
            None => Err(PackError::NotFound {
                specifier: specifier.to_string(),
                importer: self.root.clone(),
            }),
        }
    }

    /// Resolve `specifier` as referenced from the file `importer`
    pub fn resolve(&self, specifier: &str, importer: &Path) -> Result<Resolution> {
        if self.is_external(specifier) {
            Logger::debug(&format!("Leaving external specifier '{}'", specifier));
            return Ok(Resolution::External);
        }

        let base_dir = importer.parent().unwrap_or(&self.root);

        let found = match self.apply_alias(specifier) {
            AliasTarget::Path(path) => self.resolve_candidate(&path),
            AliasTarget::Specifier(spec) => {
                if spec.starts_with("./") || spec.starts_with("../") {
                    self.resolve_candidate(&base_dir.join(&spec))
                } else if let Some(from_root) = spec.strip_prefix('/') {
                    self.resolve_candidate(&self.root.join(from_root))
                } else {
                    self.resolve_bare(&spec, base_dir)
                }
            }
        };

        match found {
            Some(path) => {
                let path = canonical(&path)?;
                Logger::resolved(specifier, &path.display().to_string());
                Ok(Resolution::File(path))
            }
            None => Err(PackError::NotFound {
                specifier: specifier.to_string(),
                importer: importer.to_path_buf(),
            }),
        }
    }

    fn is_external(&self, specifier: &str) -> bool {
        const URL_PREFIXES: [&str; 4] = ["http://", "https://", "//", "data:"];

        URL_PREFIXES.iter().any(|p| specifier.starts_with(p))
            || self.external.iter().any(|ext| {
                specifier == ext
                    || specifier
                        .strip_prefix(ext.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
    }

    /// Longest matching alias prefix wins. Relative targets are rooted at
    /// the project root.
    fn apply_alias(&self, specifier: &str) -> AliasTarget {
        let best = self
            .alias
            .iter()
            .filter(|(key, _)| {
                specifier == key.as_str()
                    || specifier
                        .strip_prefix(key.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|(key, _)| key.len());

        let Some((key, target)) = best else {
            return AliasTarget::Specifier(specifier.to_string());
        };

        let rest = specifier[key.len()..].trim_start_matches('/');
        if target.starts_with("./") || target.starts_with("../") {
            let base = self.root.join(target);
            AliasTarget::Path(if rest.is_empty() { base } else { base.join(rest) })
        } else if rest.is_empty() {
            AliasTarget::Specifier(target.clone())
        } else {
            AliasTarget::Specifier(format!("{}/{}", target.trim_end_matches('/'), rest))
        }
    }

    /// Exact file, then `candidate + ext` in search order, then directory
    /// index files.
    fn resolve_candidate(&self, candidate: &Path) -> Option<PathBuf> {
        if candidate.is_file() {
            return Some(candidate.to_path_buf());
        }

        if let Some(found) = self.with_extensions(candidate) {
            return Some(found);
        }

        if candidate.is_dir() {
            return self.with_extensions(&candidate.join("index"));
        }

        None
    }

    fn with_extensions(&self, base: &Path) -> Option<PathBuf> {
        self.extensions.iter().find_map(|ext| {
            let mut name = OsString::from(base.as_os_str());
            name.push(ext);
            let path = PathBuf::from(name);
            path.is_file().then_some(path)
        })
    }

    /// Walk up from `start_dir` looking in `node_modules` directories
    fn resolve_bare(&self, specifier: &str, start_dir: &Path) -> Option<PathBuf> {
        let mut current = Some(start_dir);

        while let Some(dir) = current {
            let package_path = dir.join("node_modules").join(specifier);

            if package_path.is_dir() {
                if let Some(main) = read_package_main(&package_path) {
                    if let Some(found) = self.resolve_candidate(&package_path.join(main)) {
                        return Some(found);
                    }
                }
            }

            if let Some(found) = self.resolve_candidate(&package_path) {
                return Some(found);
            }

            current = dir.parent();
        }

        None
    }
}

fn read_package_main(package_dir: &Path) -> Option<String> {
    let content = std::fs::read_to_string(package_dir.join("package.json")).ok()?;
    match serde_json::from_str::<PackageJson>(&content) {
        Ok(package) => package.main,
        Err(e) => {
            Logger::warn(&format!(
                "Ignoring unreadable package.json in {}: {}",
                package_dir.display(),
                e
            ));
            None
        }
    }
}

fn canonical(path: &Path) -> Result<PathBuf> {
    path.canonicalize().map_err(|e| PackError::file_io(path, e))
}
