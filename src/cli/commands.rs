use crate::core::{interfaces::*, services::*};
use crate::infrastructure::TokioFileSystemService;
use crate::utils::{CliOverrides, ConfigLoader, Logger, PackConfig, PackError, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "packline")]
#[command(version)]
#[command(about = "packline - rule-driven asset pipeline with content-hashed output")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Walk the entry's dependency graph and write fingerprinted artifacts
    Build {
        /// Root directory
        #[arg(short, long, default_value = ".")]
        root: String,
        /// Config file (default: <root>/packline.config.json when present)
        #[arg(short, long)]
        config: Option<String>,
        /// Entry asset, relative to the root
        #[arg(short, long)]
        entry: Option<String>,
        /// Output directory
        #[arg(short, long)]
        outdir: Option<String>,
        /// Keep existing files in the output directory
        #[arg(long)]
        no_clean: bool,
        /// Fingerprint width in hex characters
        #[arg(long)]
        hash_length: Option<usize>,
    },
    /// Print an example packline.config.json
    Init,
    /// Show the effective rule table and extension order
    Info {
        /// Root directory
        #[arg(short, long, default_value = ".")]
        root: String,
        /// Config file
        #[arg(short, long)]
        config: Option<String>,
    },
}

pub struct CliHandler;

impl CliHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self) -> Result<()> {
        // Initialize logging
        Logger::init();

        let cli = Cli::parse();

        match cli.command {
            Commands::Build {
                root,
                config,
                entry,
                outdir,
                no_clean,
                hash_length,
            } => {
                let overrides = CliOverrides {
                    entry,
                    outdir,
                    no_clean,
                    hash_length,
                };
                self.handle_build_command(&root, config.as_deref(), &overrides).await
            }
            Commands::Init => self.handle_init_command(),
            Commands::Info { root, config } => self.handle_info_command(&root, config.as_deref()),
        }
    }

    fn load_config(&self, root: &Path, config: Option<&str>) -> Result<Option<PackConfig>> {
        match config {
            Some(path) => {
                let path = PathBuf::from(path);
                let path = if path.is_absolute() { path } else { root.join(path) };
                if !path.is_file() {
                    return Err(PackError::config(format!(
                        "Config file {} does not exist",
                        path.display()
                    )));
                }
                ConfigLoader::load_from_path(&path).map(Some)
            }
            None => ConfigLoader::load_from_file(root),
        }
    }

    async fn handle_build_command(
        &self,
        root: &str,
        config: Option<&str>,
        overrides: &CliOverrides,
    ) -> Result<()> {
        let root = PathBuf::from(root);
        let file_config = self.load_config(&root, config)?;
        let build_config = ConfigLoader::merge_with_cli(file_config, root, overrides)?;

        let fs_service: Arc<dyn FileSystemService> = Arc::new(TokioFileSystemService);
        let build_service = PackBuildService::new(build_config, fs_service)?;

        build_service.build().await?;
        Ok(())
    }

    fn handle_init_command(&self) -> Result<()> {
        println!("{}", ConfigLoader::generate_example());
        Ok(())
    }

    fn handle_info_command(&self, root: &str, config: Option<&str>) -> Result<()> {
        let root = PathBuf::from(root);
        let file_config = self.load_config(&root, config)?;
        let build_config =
            ConfigLoader::merge_with_cli(file_config, root, &CliOverrides::default())?;

        println!(
            "\n  {} {}\n",
            "packline".bright_cyan().bold(),
            env!("CARGO_PKG_VERSION").bright_white()
        );
        println!("  {} {}", "entry:".bright_black(), build_config.entry);
        println!("  {} {}", "output:".bright_black(), build_config.root.join(&build_config.outdir).display());
        println!(
            "  {} {}",
            "extensions:".bright_black(),
            build_config.extensions.as_slice().join(" ")
        );

        println!("\n  {}", "rules (first match wins):".bright_black());
        for (i, rule) in ConfigLoader::describe_rules(&build_config).iter().enumerate() {
            let exclude = rule
                .exclude
                .as_ref()
                .map(|e| format!(" excluding {}", e))
                .unwrap_or_default();
            println!(
                "  {:>3}. {} → {} ({}){}",
                i + 1,
                rule.test.bright_cyan(),
                rule.pipeline.as_deref().unwrap_or("resource"),
                rule.terminal,
                exclude
            );
        }

        let plugins: Vec<String> = build_config
            .plugins
            .iter()
            .map(|spec| crate::plugins::instantiate(spec).name().to_string())
            .collect();
        println!("\n  {} {}\n", "plugins:".bright_black(), plugins.join(", "));

        Ok(())
    }
}

impl Default for CliHandler {
    fn default() -> Self {
        Self::new()
    }
}
