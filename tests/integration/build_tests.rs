use packline::core::interfaces::BuildService;
use packline::core::models::{BuildOutput, OutputArtifact};
use packline::core::plugin::{Plugin, PluginContext};
use packline::core::services::{BuildGeneration, PackBuildService};
use packline::infrastructure::TokioFileSystemService;
use packline::utils::{CliOverrides, ConfigLoader, PackConfig, PackError, PackUI, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

const MOD_CONFIG: &str = r#"{
  "entry": "index.mod",
  "extensions": [".mod"],
  "rules": [
    { "test": "*.mod", "pipeline": "script", "type": "module", "outputExtension": "mod-out" },
    { "test": "*.png", "type": "resource" }
  ],
  "plugins": []
}"#;

fn service(root: &Path, config_json: &str) -> PackBuildService {
    let file_config: PackConfig = serde_json::from_str(config_json).unwrap();
    let config =
        ConfigLoader::merge_with_cli(Some(file_config), root.to_path_buf(), &CliOverrides::default())
            .unwrap();
    PackBuildService::new(config, Arc::new(TokioFileSystemService))
        .unwrap()
        .with_ui(PackUI::silent())
}

/// File name -> bytes for everything under `dir`
fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let name = path.strip_prefix(dir).unwrap().to_string_lossy().replace('\\', "/");
                files.insert(name, fs::read(&path).unwrap());
            }
        }
    }
    files
}

fn write_mod_project(root: &Path) {
    fs::write(root.join("index.mod"), "import './util';\nimport './logo.png';\n").unwrap();
    fs::write(root.join("util.mod"), "export const answer = 42;\n").unwrap();
    fs::write(root.join("logo.png"), [0x89, b'P', b'N', b'G', 0x0d, 0x0a]).unwrap();
}

fn fingerprint(bytes: &[u8]) -> String {
    let mut hex = blake3::hash(bytes).to_hex().to_string();
    hex.truncate(20);
    hex
}

#[tokio::test]
async fn test_mod_project_emits_three_fingerprinted_files() {
    let temp = tempdir().unwrap();
    write_mod_project(temp.path());

    let result = service(temp.path(), MOD_CONFIG).build().await.unwrap();
    assert_eq!(result.assets_processed, 3);
    assert_eq!(result.modules_processed, 2);
    assert_eq!(result.resources_processed, 1);

    let files = snapshot(&temp.path().join("dist"));
    assert_eq!(files.len(), 3, "unexpected output: {:?}", files.keys());

    let index = "import './util';\nimport './logo.png';\n";
    let util = "export const answer = 42;\n";
    let logo = [0x89, b'P', b'N', b'G', 0x0d, 0x0a];

    let index_name = format!("index.{}.mod-out", fingerprint(index.as_bytes()));
    let util_name = format!("util.{}.mod-out", fingerprint(util.as_bytes()));
    let logo_name = format!("logo.{}.png", fingerprint(&logo));

    assert_eq!(files[&index_name], index.as_bytes());
    assert_eq!(files[&util_name], util.as_bytes());
    assert_eq!(files[&logo_name], logo);
}

#[tokio::test]
async fn test_rebuild_is_byte_identical() {
    let temp = tempdir().unwrap();
    write_mod_project(temp.path());
    let service = service(temp.path(), MOD_CONFIG);

    service.build().await.unwrap();
    let first = snapshot(&temp.path().join("dist"));

    let second_result = service.build().await.unwrap();
    let second = snapshot(&temp.path().join("dist"));

    assert_eq!(second_result.generation, 2);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_stale_artifacts_are_cleared() {
    let temp = tempdir().unwrap();
    write_mod_project(temp.path());
    let service = service(temp.path(), MOD_CONFIG);

    service.build().await.unwrap();
    fs::write(temp.path().join("util.mod"), "export const answer = 43;\n").unwrap();
    service.build().await.unwrap();

    let files = snapshot(&temp.path().join("dist"));
    assert_eq!(files.len(), 3);
    let utils: Vec<&String> = files.keys().filter(|k| k.starts_with("util.")).collect();
    assert_eq!(utils.len(), 1);
    assert_eq!(files[utils[0]], b"export const answer = 43;\n");
}

#[tokio::test]
async fn test_cycle_emits_each_asset_once() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("index.mod"), "import './other';\n").unwrap();
    fs::write(temp.path().join("other.mod"), "import './index';\n").unwrap();

    let result = service(temp.path(), MOD_CONFIG).build().await.unwrap();
    assert_eq!(result.assets_processed, 2);
    assert_eq!(snapshot(&temp.path().join("dist")).len(), 2);
}

#[tokio::test]
async fn test_missing_dependency_leaves_output_untouched() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("index.mod"), "import './missing';\n").unwrap();
    fs::create_dir_all(temp.path().join("dist")).unwrap();
    fs::write(temp.path().join("dist/previous.txt"), "previous build").unwrap();

    let err = service(temp.path(), MOD_CONFIG).build().await.unwrap_err();

    assert_eq!(err.kind(), "NotFound");
    assert!(err.format_detailed().contains("index.mod"));
    let files = snapshot(&temp.path().join("dist"));
    assert_eq!(files.len(), 1);
    assert_eq!(files["previous.txt"], b"previous build");
}

#[tokio::test]
async fn test_unmatched_asset_is_unsupported() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("index.mod"), "import './font.woff2';\n").unwrap();
    fs::write(temp.path().join("font.woff2"), [0u8; 8]).unwrap();

    let err = service(temp.path(), MOD_CONFIG).build().await.unwrap_err();
    assert_eq!(err.kind(), "UnsupportedAsset");
    assert!(err.asset_path().unwrap().ends_with("font.woff2"));
    assert!(!temp.path().join("dist").exists());
}

#[tokio::test]
async fn test_malformed_json_is_transform_error() {
    let temp = tempdir().unwrap();
    fs::create_dir_all(temp.path().join("src")).unwrap();
    fs::write(temp.path().join("src/index.js"), "import data from './data.json';\n").unwrap();
    fs::write(temp.path().join("src/data.json"), "{\n  \"a\": 1,\n}\n").unwrap();

    let config = r#"{ "entry": "src/index.js", "plugins": [] }"#;
    let err = service(temp.path(), config).build().await.unwrap_err();

    match &err {
        PackError::Transform { path, pipeline, .. } => {
            assert!(path.ends_with("src/data.json"));
            assert_eq!(pipeline, "json");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!temp.path().join("dist").exists());
}

#[tokio::test]
async fn test_resolver_prefers_search_order() {
    let temp = tempdir().unwrap();
    fs::create_dir_all(temp.path().join("src")).unwrap();
    fs::write(temp.path().join("src/index.js"), "import './app';\n").unwrap();
    fs::write(temp.path().join("src/app.js"), "export default 1;\n").unwrap();

    let config = r#"{ "entry": "src/index", "extensions": [".ts", ".js"], "plugins": [] }"#;
    let result = service(temp.path(), config).build().await.unwrap();
    assert_eq!(result.assets_processed, 2);

    fs::remove_file(temp.path().join("src/app.js")).unwrap();
    let err = service(temp.path(), config).build().await.unwrap_err();
    assert!(matches!(err, PackError::NotFound { ref specifier, .. } if specifier == "./app"));
}

/// Starts a newer build while this one is still running
struct SupersedePlugin {
    generation: BuildGeneration,
}

impl Plugin for SupersedePlugin {
    fn name(&self) -> &str {
        "supersede"
    }

    fn apply(&self, _context: &PluginContext, _output: &BuildOutput) -> Result<Vec<OutputArtifact>> {
        self.generation.begin();
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_superseded_build_writes_nothing() {
    let temp = tempdir().unwrap();
    write_mod_project(temp.path());
    fs::create_dir_all(temp.path().join("dist")).unwrap();
    fs::write(temp.path().join("dist/previous.txt"), "previous build").unwrap();

    let generation = BuildGeneration::new();
    let service = service(temp.path(), MOD_CONFIG)
        .with_generation(generation.clone())
        .with_plugin(Arc::new(SupersedePlugin {
            generation: generation.clone(),
        }));

    let err = service.build().await.unwrap_err();
    assert!(matches!(
        err,
        PackError::Cancelled {
            generation: 1,
            current: 2
        }
    ));
    assert_eq!(snapshot(&temp.path().join("dist")).len(), 1);
}

#[tokio::test]
async fn test_stylesheet_url_with_query_resolves_to_file() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src/index.js"), "import './app.css';\n").unwrap();
    fs::write(
        root.join("src/app.css"),
        "/* .old { background: url(./removed.png); } */\n.i { background: url(./icon.svg?v=2); }\n",
    )
    .unwrap();
    fs::write(root.join("src/icon.svg"), "<svg xmlns=\"http://www.w3.org/2000/svg\"/>").unwrap();

    let config = r#"{ "entry": "src/index.js", "plugins": [] }"#;
    let result = service(root, config).build().await.unwrap();

    assert_eq!(result.modules_processed, 2);
    assert_eq!(result.resources_processed, 1);
    assert!(snapshot(&root.join("dist"))
        .keys()
        .any(|name| name.starts_with("icon.") && name.ends_with(".svg")));
}
