use crate::core::interfaces::{Pipeline, PipelineOutput};
use crate::infrastructure::processors::common::{decode_utf8, normalize_newlines, scan_specifiers};
use crate::utils::Logger;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

// Pre-compiled regex patterns for dependency scanning
static STATIC_IMPORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*(?:import|export)\s+(?:[^'"`;]*?\s+from\s+)?["']([^"'\n]+)["']"#)
        .expect("static import pattern")
});

static CALL_IMPORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(?:import|require)\s*\(\s*["']([^"'\n]+)["']\s*\)"#)
        .expect("call import pattern")
});

static URL_CONSTRUCTOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bnew\s+URL\s*\(\s*["']([^"'\n]+)["']\s*,\s*import\.meta\.url\s*\)"#)
        .expect("url constructor pattern")
});

/// Script pipeline for JavaScript/TypeScript-like sources.
///
/// Edges come from lexical scanning: static `import`/`export … from`,
/// `import()`/`require()` calls and `new URL(…, import.meta.url)`.
pub struct ScriptPipeline;

impl ScriptPipeline {
    pub const ID: &'static str = "script";

    pub fn new() -> Self {
        Self
    }

    pub fn extract_dependencies(&self, code: &str) -> Vec<String> {
        scan_specifiers(
            code,
            &[&STATIC_IMPORT_REGEX, &CALL_IMPORT_REGEX, &URL_CONSTRUCTOR_REGEX],
        )
    }
}

impl Default for ScriptPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline for ScriptPipeline {
    fn id(&self) -> &str {
        Self::ID
    }

    fn transform(&self, path: &Path, source: &[u8]) -> anyhow::Result<PipelineOutput> {
        let code = decode_utf8(source, path)?;
        let edges = self.extract_dependencies(code);

        Logger::debug(&format!(
            "⚡ Script {}: {} dependencies",
            path.display(),
            edges.len()
        ));

        Ok(PipelineOutput::new(normalize_newlines(code), edges))
    }
}
