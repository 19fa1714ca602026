use crate::core::models::{
    AssetClass, BuildConfig, PluginSpec, DEFAULT_FILENAME, DEFAULT_HASH_LENGTH,
};
use crate::infrastructure::resolver::ExtensionSearchOrder;
use crate::infrastructure::rule_table::RuleSpec;
use crate::utils::{Logger, PackError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "packline.config.json";

/// Configuration file format (packline.config.json)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PackConfig {
    /// Entry asset, relative to the root (default: "src/index.tsx")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,

    /// Output directory (default: "dist")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,

    /// Template for module artifacts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Template for resource artifacts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_filename: Option<String>,

    /// Fingerprint width in hex characters (default: 20)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_length: Option<usize>,

    /// Clear the output directory before writing (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean: Option<bool>,

    /// Resolver extension search order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<RuleSpec>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<BTreeMap<String, String>>,

    /// Specifiers that are left to the runtime
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<PluginSpec>>,
}

/// Values given on the command line; `None` defers to the file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub entry: Option<String>,
    pub outdir: Option<String>,
    pub no_clean: bool,
    pub hash_length: Option<usize>,
}

pub fn default_extensions() -> Vec<String> {
    [".ts", ".tsx", ".js", ".jsx"].iter().map(|e| e.to_string()).collect()
}

/// Scripts (outside node_modules), stylesheets, JSON and images
pub fn default_rules() -> Vec<RuleSpec> {
    vec![
        RuleSpec {
            test: r"/\.(ts|tsx|js|jsx)$/".to_string(),
            exclude: Some("/node_modules/".to_string()),
            pipeline: Some("script".to_string()),
            terminal: AssetClass::Module,
            output_extension: Some("js".to_string()),
        },
        RuleSpec {
            test: "*.css".to_string(),
            exclude: None,
            pipeline: Some("style".to_string()),
            terminal: AssetClass::Module,
            output_extension: Some("css".to_string()),
        },
        RuleSpec {
            test: "*.json".to_string(),
            exclude: None,
            pipeline: Some("json".to_string()),
            terminal: AssetClass::Module,
            output_extension: Some("js".to_string()),
        },
        RuleSpec {
            test: "*.{png,jpg,jpeg,gif,svg}".to_string(),
            exclude: None,
            pipeline: None,
            terminal: AssetClass::Resource,
            output_extension: None,
        },
    ]
}

pub fn default_plugins() -> Vec<PluginSpec> {
    vec![PluginSpec::Html {
        template: None,
        filename: None,
        title: None,
    }]
}

/// Config loader that supports config files with CLI override
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `packline.config.json` from the project root if it exists
    pub fn load_from_file(root: &Path) -> Result<Option<PackConfig>> {
        let config_path = root.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            Logger::debug(&format!("No {} found, using defaults", CONFIG_FILE_NAME));
            return Ok(None);
        }

        Self::load_from_path(&config_path).map(Some)
    }

    /// Load a configuration file at an explicit path; it must exist
    pub fn load_from_path(config_path: &Path) -> Result<PackConfig> {
        Logger::debug(&format!("Loading config from {}", config_path.display()));

        let content = std::fs::read_to_string(config_path)
            .map_err(|e| PackError::file_io(config_path, e))?;

        let config: PackConfig = serde_json::from_str(&content).map_err(|e| {
            PackError::config(format!(
                "Failed to parse {}: {}",
                config_path.display(),
                e
            ))
        })?;

        Logger::debug("✅ Config file loaded successfully");
        Ok(config)
    }

    /// Merge file config with CLI arguments (CLI takes precedence) and
    /// validate the result into a `BuildConfig`
    pub fn merge_with_cli(
        file_config: Option<PackConfig>,
        root: PathBuf,
        cli: &CliOverrides,
    ) -> Result<BuildConfig> {
        let base = file_config.unwrap_or_default();

        let entry = cli
            .entry
            .clone()
            .or(base.entry)
            .unwrap_or_else(|| "src/index.tsx".to_string());

        // Determine output directory (CLI > config file > default)
        let outdir_str = cli
            .outdir
            .clone()
            .or(base.output_dir)
            .unwrap_or_else(|| "dist".to_string());

        // Kept as given; the build service resolves it against the canonical root
        let outdir = PathBuf::from(outdir_str);

        let extensions =
            ExtensionSearchOrder::new(base.extensions.unwrap_or_else(default_extensions))?;

        let rules = base
            .rules
            .unwrap_or_else(default_rules)
            .into_iter()
            .map(RuleSpec::into_rule)
            .collect::<Result<Vec<_>>>()?;

        if rules.is_empty() {
            return Err(PackError::config("At least one rule is required"));
        }

        Ok(BuildConfig {
            root,
            entry,
            outdir,
            filename: base.filename.unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
            asset_filename: base
                .asset_filename
                .unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
            hash_length: cli
                .hash_length
                .or(base.hash_length)
                .unwrap_or(DEFAULT_HASH_LENGTH),
            clean: !cli.no_clean && base.clean.unwrap_or(true),
            extensions,
            rules,
            alias: base.alias.unwrap_or_default(),
            external: base.external.unwrap_or_default(),
            plugins: base.plugins.unwrap_or_else(default_plugins),
        })
    }

    /// Effective rule table rendered back into config-file form
    pub fn describe_rules(config: &BuildConfig) -> Vec<RuleSpec> {
        config.rules.iter().map(RuleSpec::from_rule).collect()
    }

    /// Generate example config file
    pub fn generate_example() -> String {
        let example = PackConfig {
            entry: Some("src/index.tsx".to_string()),
            output_dir: Some("dist".to_string()),
            filename: Some(DEFAULT_FILENAME.to_string()),
            asset_filename: Some(DEFAULT_FILENAME.to_string()),
            hash_length: Some(DEFAULT_HASH_LENGTH),
            clean: Some(true),
            extensions: Some(default_extensions()),
            rules: Some(default_rules()),
            alias: Some(BTreeMap::from([("@".to_string(), "./src".to_string())])),
            external: Some(Vec::new()),
            plugins: Some(vec![PluginSpec::Html {
                template: Some(PathBuf::from("src/index.html")),
                filename: None,
                title: None,
            }]),
        };

        serde_json::to_string_pretty(&example).unwrap_or_else(|_| {
            r#"{
  "entry": "src/index.tsx",
  "outputDir": "dist"
}"#
            .to_string()
        })
    }
}
