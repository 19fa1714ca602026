use crate::core::interfaces::FileSystemService;
use crate::core::models::{AssetClass, OutputArtifact, OutputFile};
use crate::infrastructure::walker::AssetGraph;
use crate::utils::{Logger, PackError, Result, Timer};
use rayon::prelude::*;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

pub const MIN_HASH_LENGTH: usize = 4;
pub const MAX_HASH_LENGTH: usize = 64;

const CONTENTHASH: &str = "[contenthash]";

/// Content-addressed output naming.
///
/// Templates understand `[name]`, `[path]`, `[contenthash]` and `[ext]`.
/// The fingerprint is the blake3 hex digest of the final bytes, cut to
/// `hash_length` characters.
#[derive(Debug, Clone)]
pub struct OutputNamer {
    filename: String,
    asset_filename: String,
    hash_length: usize,
}

impl OutputNamer {
    pub fn new(
        filename: impl Into<String>,
        asset_filename: impl Into<String>,
        hash_length: usize,
    ) -> Result<Self> {
        let filename = filename.into();
        let asset_filename = asset_filename.into();

        if !(MIN_HASH_LENGTH..=MAX_HASH_LENGTH).contains(&hash_length) {
            return Err(PackError::config(format!(
                "hashLength must be between {} and {}, got {}",
                MIN_HASH_LENGTH, MAX_HASH_LENGTH, hash_length
            )));
        }
        validate_template("filename", &filename)?;
        validate_template("assetFilename", &asset_filename)?;

        Ok(Self {
            filename,
            asset_filename,
            hash_length,
        })
    }

    pub fn fingerprint(&self, content: &[u8]) -> String {
        let mut hex = blake3::hash(content).to_hex().to_string();
        hex.truncate(self.hash_length);
        hex
    }

    /// Output-relative file name for one asset. Pure in all arguments.
    pub fn name(&self, class: AssetClass, logical_name: &str, ext: &str, content: &[u8]) -> String {
        let template = match class {
            AssetClass::Module => &self.filename,
            AssetClass::Resource => &self.asset_filename,
        };

        let (dir, stem) = match logical_name.rsplit_once('/') {
            Some((dir, stem)) => (format!("{}/", dir), stem),
            None => (String::new(), logical_name),
        };

        let mut name = template.clone();
        if ext.is_empty() {
            name = name.replace(".[ext]", "");
        }

        name.replace("[path]", &dir)
            .replace("[name]", stem)
            .replace(CONTENTHASH, &self.fingerprint(content))
            .replace("[ext]", ext)
    }

    /// Name every asset in discovery order.
    ///
    /// Assets that end up with the same path and the same bytes collapse into
    /// one artifact that lists every source. The same path with different
    /// bytes is refused.
    pub fn name_all(&self, graph: &AssetGraph) -> Result<Vec<OutputArtifact>> {
        let _timer = Timer::start("Naming artifacts");

        let named: Vec<OutputArtifact> = graph
            .assets
            .par_iter()
            .map(|asset| OutputArtifact {
                path: PathBuf::from(self.name(
                    asset.class,
                    &asset.logical_name,
                    &asset.output_extension,
                    &asset.content,
                )),
                content: asset.content.clone(),
                kind: asset.class.into(),
                sources: vec![asset.path.clone()],
            })
            .collect();

        let mut artifacts: Vec<OutputArtifact> = Vec::with_capacity(named.len());
        for artifact in named {
            match artifacts.iter_mut().find(|a| a.path == artifact.path) {
                Some(existing) if existing.content == artifact.content => {
                    Logger::debug(&format!(
                        "Sharing {} between identical assets",
                        artifact.path.display()
                    ));
                    existing.sources.extend(artifact.sources);
                }
                Some(_) => {
                    return Err(PackError::config(format!(
                        "Output name collision: {} is produced by assets with different content",
                        artifact.path.display()
                    )));
                }
                None => artifacts.push(artifact),
            }
        }

        Ok(artifacts)
    }
}

fn validate_template(key: &str, template: &str) -> Result<()> {
    if !template.contains(CONTENTHASH) {
        return Err(PackError::config(format!(
            "{} template '{}' must contain {}",
            key, template, CONTENTHASH
        )));
    }
    if Path::new(template).is_absolute() || template.split('/').any(|part| part == "..") {
        return Err(PackError::config(format!(
            "{} template '{}' must stay inside the output directory",
            key, template
        )));
    }
    Ok(())
}

/// Sole writer of the output directory
pub struct OutputWriter {
    fs_service: Arc<dyn FileSystemService>,
    clean: bool,
}

impl OutputWriter {
    pub fn new(fs_service: Arc<dyn FileSystemService>, clean: bool) -> Self {
        Self { fs_service, clean }
    }

    /// Clear (or create) `out_dir`, then write every artifact once.
    ///
    /// Artifact paths are checked before the directory is touched. Once the
    /// directory has been mutated, any failure is reported as
    /// `OutputIncomplete`.
    pub async fn write(&self, out_dir: &Path, artifacts: &[OutputArtifact]) -> Result<Vec<OutputFile>> {
        let _timer = Timer::start("Writing output");

        for artifact in artifacts {
            check_artifact_path(&artifact.path)?;
        }

        let total = artifacts.len();
        let prepared = if self.clean {
            self.fs_service.clear_directory(out_dir).await
        } else {
            self.fs_service.create_directory(out_dir).await
        };
        prepared.map_err(|e| incomplete(out_dir, 0, total, e))?;

        let mut written = Vec::with_capacity(total);
        for artifact in artifacts {
            let path = out_dir.join(&artifact.path);
            self.fs_service
                .write_file(&path, &artifact.content)
                .await
                .map_err(|e| incomplete(out_dir, written.len(), total, e))?;

            Logger::debug(&format!("📝 {} ({} bytes)", path.display(), artifact.size()));
            written.push(OutputFile {
                path,
                size: artifact.size(),
                kind: Some(artifact.kind),
            });
        }

        Ok(written)
    }
}

fn check_artifact_path(path: &Path) -> Result<()> {
    let escapes = path.as_os_str().is_empty()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(PackError::config(format!(
            "Artifact path '{}' must be relative and stay inside the output directory",
            path.display()
        )));
    }
    Ok(())
}

fn incomplete(dir: &Path, written: usize, total: usize, err: PackError) -> PackError {
    let source = match err {
        PackError::Io(source) | PackError::FileIo { source, .. } => source,
        other => io::Error::other(other.to_string()),
    };
    PackError::OutputIncomplete {
        dir: dir.to_path_buf(),
        written,
        total,
        source,
    }
}
