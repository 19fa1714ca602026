use crate::core::models::ArtifactKind;
use crate::utils::PackError;
use colored::*;
use std::time::Duration;

/// Human-facing terminal output. Logging goes through `Logger`; this is
/// only the short summary a user reads after a build.
pub struct PackUI {
    enabled: bool,
}

impl PackUI {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    /// A UI that prints nothing, for embedding and tests
    pub fn silent() -> Self {
        Self { enabled: false }
    }

    pub fn show_banner(&self) {
        if !self.enabled {
            return;
        }
        println!(
            "\n  {} {}",
            "PACKLINE".bright_cyan().bold(),
            concat!("v", env!("CARGO_PKG_VERSION")).bright_white()
        );
        println!();
    }

    pub fn show_completion(&self, stats: &CompletionStats) {
        if !self.enabled {
            return;
        }

        println!();
        for file in &stats.output_files {
            let name = match file.kind {
                Some(ArtifactKind::Resource) => file.name.bright_magenta(),
                Some(ArtifactKind::Generated) => file.name.bright_green(),
                _ => file.name.bright_cyan(),
            };
            println!(
                "  {} {} {}",
                format!("{}/", stats.out_dir_label).bright_black(),
                name,
                format!("({})", format_size(file.size)).bright_black()
            );
        }

        println!();
        println!(
            "  {} {} modules, {} resources",
            "📦".bright_green(),
            stats.modules.to_string().bright_cyan().bold(),
            stats.resources.to_string().bright_cyan().bold()
        );
        println!(
            "  {} built in {}",
            "✓".bright_green(),
            format!("{:.0}ms", stats.build_time.as_secs_f64() * 1000.0)
                .bright_white()
                .bold()
        );
    }

    pub fn show_error(&self, error: &PackError) {
        eprintln!();
        eprintln!("  {} {}", "✗".bright_red(), error.kind().bright_red().bold());
        for line in error.format_detailed().lines() {
            eprintln!("  {}", line);
        }
        eprintln!();
    }
}

impl Default for PackUI {
    fn default() -> Self {
        Self::new()
    }
}

pub fn format_size(size: usize) -> String {
    let size_kb = size as f64 / 1024.0;
    if size_kb < 1.0 {
        format!("{} B", size)
    } else {
        format!("{:.2} kB", size_kb)
    }
}

#[derive(Debug, Clone)]
pub struct CompletionStats {
    /// Output directory as shown to the user
    pub out_dir_label: String,
    pub output_files: Vec<OutputFileInfo>,
    pub modules: usize,
    pub resources: usize,
    pub build_time: Duration,
}

#[derive(Debug, Clone)]
pub struct OutputFileInfo {
    pub name: String,
    pub size: usize,
    pub kind: Option<ArtifactKind>,
}
