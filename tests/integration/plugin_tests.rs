use packline::core::interfaces::BuildService;
use packline::core::models::ArtifactKind;
use packline::core::services::PackBuildService;
use packline::infrastructure::TokioFileSystemService;
use packline::utils::{CliOverrides, ConfigLoader, PackConfig, PackError, PackUI};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn service(root: &Path, config_json: &str) -> PackBuildService {
    let file_config: PackConfig = serde_json::from_str(config_json).unwrap();
    let config =
        ConfigLoader::merge_with_cli(Some(file_config), root.to_path_buf(), &CliOverrides::default())
            .unwrap();
    PackBuildService::new(config, Arc::new(TokioFileSystemService))
        .unwrap()
        .with_ui(PackUI::silent())
}

/// A small React-style project laid out the conventional way
fn write_app(root: &Path) {
    fs::create_dir_all(root.join("src/components")).unwrap();
    fs::write(
        root.join("src/index.tsx"),
        "import React from 'react';\nimport App from './components/App';\nimport './index.css';\n",
    )
    .unwrap();
    fs::write(
        root.join("src/components/App.tsx"),
        "import logo from '../logo.svg';\nexport default function App() { return logo; }\n",
    )
    .unwrap();
    fs::write(
        root.join("src/index.css"),
        "body { margin: 0; }\n.logo { background: url(./logo.svg); }\n",
    )
    .unwrap();
    fs::write(root.join("src/logo.svg"), "<svg xmlns=\"http://www.w3.org/2000/svg\"/>").unwrap();
    fs::write(
        root.join("src/index.html"),
        "<!DOCTYPE html>\n<html>\n<head>\n  <title>Template</title>\n</head>\n<body>\n  <div id=\"root\"></div>\n</body>\n</html>\n",
    )
    .unwrap();
}

const APP_CONFIG: &str = r#"{
  "external": ["react"],
  "plugins": [
    { "plugin": "html", "template": "src/index.html", "title": "My App" },
    { "plugin": "manifest" },
    { "plugin": "stats" }
  ]
}"#;

fn file_with_prefix(dir: &Path, prefix: &str, ext: &str) -> String {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .find(|name| name.starts_with(prefix) && name.ends_with(ext))
        .unwrap_or_else(|| panic!("no {prefix}*{ext} in {}", dir.display()))
}

#[tokio::test]
async fn test_html_shell_references_entry_and_styles() {
    let temp = tempdir().unwrap();
    write_app(temp.path());

    let result = service(temp.path(), APP_CONFIG).build().await.unwrap();
    assert_eq!(result.modules_processed, 3);
    assert_eq!(result.resources_processed, 1);

    let dist = temp.path().join("dist");
    let entry = file_with_prefix(&dist, "index.", ".js");
    let css = file_with_prefix(&dist, "index.", ".css");
    file_with_prefix(&dist, "logo.", ".svg");

    let html = fs::read_to_string(dist.join("index.html")).unwrap();
    assert!(html.contains("<title>My App</title>"));
    assert!(html.contains(&format!("<link rel=\"stylesheet\" href=\"{}\">", css)));
    assert!(html.contains(&format!("<script type=\"module\" src=\"{}\"></script>", entry)));
    assert!(html.find(&css).unwrap() < html.find("</head>").unwrap());
    assert!(html.find(&entry).unwrap() < html.find("</body>").unwrap());

    let generated = result
        .output_files
        .iter()
        .filter(|f| f.kind == Some(ArtifactKind::Generated))
        .count();
    assert_eq!(generated, 2);
}

#[tokio::test]
async fn test_manifest_maps_sources_to_outputs() {
    let temp = tempdir().unwrap();
    write_app(temp.path());

    service(temp.path(), APP_CONFIG).build().await.unwrap();

    let dist = temp.path().join("dist");
    let manifest: BTreeMap<String, String> =
        serde_json::from_str(&fs::read_to_string(dist.join("manifest.json")).unwrap()).unwrap();

    let keys: Vec<&str> = manifest.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "src/components/App.tsx",
            "src/index.css",
            "src/index.tsx",
            "src/logo.svg"
        ]
    );
    for output in manifest.values() {
        assert!(dist.join(output).is_file(), "{output} missing from dist");
    }
}

#[tokio::test]
async fn test_default_shell_without_template() {
    let temp = tempdir().unwrap();
    write_app(temp.path());
    fs::remove_file(temp.path().join("src/index.html")).unwrap();

    let config = r#"{ "external": ["react"] }"#;
    service(temp.path(), config).build().await.unwrap();

    let html = fs::read_to_string(temp.path().join("dist/index.html")).unwrap();
    assert!(html.contains("<div id=\"root\"></div>"));
    assert!(html.contains("<script type=\"module\""));
}

#[tokio::test]
async fn test_missing_template_fails_before_output() {
    let temp = tempdir().unwrap();
    write_app(temp.path());
    fs::remove_file(temp.path().join("src/index.html")).unwrap();

    let err = service(temp.path(), APP_CONFIG).build().await.unwrap_err();
    assert!(matches!(err, PackError::NotFound { ref specifier, .. } if specifier == "src/index.html"));
    assert!(!temp.path().join("dist").exists());
}

#[tokio::test]
async fn test_plugin_name_clash_is_plugin_error() {
    let temp = tempdir().unwrap();
    write_app(temp.path());

    let config = r#"{
  "external": ["react"],
  "plugins": [
    { "plugin": "html" },
    { "plugin": "manifest", "filename": "index.html" }
  ]
}"#;
    let err = service(temp.path(), config).build().await.unwrap_err();
    assert!(matches!(err, PackError::Plugin { ref name, .. } if name == "manifest"));
    assert!(!temp.path().join("dist").exists());
}

#[tokio::test]
async fn test_manifest_lists_every_source_of_shared_output() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("src/a")).unwrap();
    fs::create_dir_all(root.join("src/b")).unwrap();
    fs::write(
        root.join("src/index.js"),
        "import a from './a/logo.png';\nimport b from './b/logo.png';\n",
    )
    .unwrap();
    fs::write(root.join("src/a/logo.png"), b"\x89PNG same bytes").unwrap();
    fs::write(root.join("src/b/logo.png"), b"\x89PNG same bytes").unwrap();

    let config = r#"{
  "entry": "src/index.js",
  "plugins": [{ "plugin": "manifest" }]
}"#;
    let result = service(root, config).build().await.unwrap();
    assert_eq!(result.assets_processed, 3);

    let dist = root.join("dist");
    let logo = file_with_prefix(&dist, "logo.", ".png");
    let manifest: BTreeMap<String, String> =
        serde_json::from_str(&fs::read_to_string(dist.join("manifest.json")).unwrap()).unwrap();

    assert_eq!(manifest.len(), 3);
    assert_eq!(manifest["src/a/logo.png"], logo);
    assert_eq!(manifest["src/b/logo.png"], logo);
    assert!(manifest.contains_key("src/index.js"));
}

#[tokio::test]
async fn test_plugin_clash_through_current_dir_prefix() {
    let temp = tempdir().unwrap();
    write_app(temp.path());

    let config = r#"{
  "external": ["react"],
  "plugins": [
    { "plugin": "html" },
    { "plugin": "manifest", "filename": "./index.html" }
  ]
}"#;
    let err = service(temp.path(), config).build().await.unwrap_err();
    assert!(matches!(err, PackError::Plugin { ref name, .. } if name == "manifest"));
    assert!(!temp.path().join("dist").exists());
}
