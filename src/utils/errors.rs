use std::path::{Path, PathBuf};
use thiserror::Error;

/// Enhanced error with file location context
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub code_snippet: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_snippet(mut self, snippet: String) -> Self {
        self.code_snippet = Some(snippet);
        self
    }
}

#[derive(Error, Debug)]
pub enum PackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error on {}: {source}", path.display())]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot resolve '{specifier}' from {}", importer.display())]
    NotFound { specifier: String, importer: PathBuf },

    #[error("No rule matches asset: {}", path.display())]
    UnsupportedAsset { path: PathBuf },

    #[error("Pipeline '{pipeline}' failed on {}: {message}", path.display())]
    Transform {
        path: PathBuf,
        pipeline: String,
        message: String,
        context: Option<ErrorContext>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Plugin '{name}' failed: {message}")]
    Plugin { name: String, message: String },

    #[error("Build generation {generation} was superseded by generation {current}")]
    Cancelled { generation: u64, current: u64 },

    #[error(
        "Output directory {} is incomplete ({written} of {total} artifacts written): {source}",
        dir.display()
    )]
    OutputIncomplete {
        dir: PathBuf,
        written: usize,
        total: usize,
        #[source]
        source: std::io::Error,
    },
}

impl PackError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn plugin(name: &str, message: impl Into<String>) -> Self {
        Self::Plugin {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Attach a path to a bare IO error
    pub fn file_io(path: &Path, source: std::io::Error) -> Self {
        Self::FileIo {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Short name of the error kind, as shown to users
    pub fn kind(&self) -> &'static str {
        match self {
            PackError::Io(_) | PackError::FileIo { .. } | PackError::OutputIncomplete { .. } => {
                "IOError"
            }
            PackError::NotFound { .. } => "NotFound",
            PackError::UnsupportedAsset { .. } => "UnsupportedAsset",
            PackError::Transform { .. } => "TransformError",
            PackError::Config(_) => "ConfigError",
            PackError::Plugin { .. } => "PluginError",
            PackError::Cancelled { .. } => "Cancelled",
        }
    }

    /// The asset the error is about, if any
    pub fn asset_path(&self) -> Option<&Path> {
        match self {
            PackError::FileIo { path, .. }
            | PackError::UnsupportedAsset { path }
            | PackError::Transform { path, .. } => Some(path),
            PackError::NotFound { importer, .. } => Some(importer),
            PackError::OutputIncomplete { dir, .. } => Some(dir),
            _ => None,
        }
    }

    /// Format error with enhanced context display
    pub fn format_detailed(&self) -> String {
        match self {
            PackError::Transform {
                message, context, ..
            } => self.format_error_with_context(message, context),
            _ => match self.asset_path() {
                Some(path) => format!(
                    "❌ {}: {}\n📁 Asset: {}",
                    self.kind(),
                    self,
                    path.display()
                ),
                None => format!("❌ {}: {}", self.kind(), self),
            },
        }
    }

    fn format_error_with_context(&self, message: &str, context: &Option<ErrorContext>) -> String {
        let mut output = format!("❌ {}: {}", self.kind(), message);

        if let Some(path) = self.asset_path() {
            output.push_str(&format!("\n📁 Asset: {}", path.display()));
        }

        if let Some(ctx) = context {
            if let (Some(line), Some(column)) = (ctx.line, ctx.column) {
                output.push_str(&format!("\n📍 Location: line {}, column {}", line, column));
            }

            if let Some(ref snippet) = ctx.code_snippet {
                output.push_str(&format!(
                    "\n📝 Code:\n{}",
                    Self::format_code_snippet(snippet, ctx.line)
                ));
            }
        }

        output
    }

    /// `snippet` holds the source starting at line 1
    fn format_code_snippet(snippet: &str, error_line: Option<usize>) -> String {
        let mut output = String::new();

        for (i, line) in snippet.lines().enumerate() {
            let line_num = i + 1;

            // Only show a small window around the failing line
            if let Some(target) = error_line {
                if line_num + 2 < target || line_num > target + 2 {
                    continue;
                }
            }

            if error_line == Some(line_num) {
                output.push_str(&format!("→ {:3} │ {}\n", line_num, line));
            } else {
                output.push_str(&format!("  {:3} │ {}\n", line_num, line));
            }
        }

        output
    }
}

pub type Result<T> = std::result::Result<T, PackError>;

impl From<regex::Error> for PackError {
    fn from(err: regex::Error) -> Self {
        PackError::config(format!("Invalid rule pattern: {}", err))
    }
}
