use crate::core::interfaces::{Pipeline, PipelineOutput};
use crate::infrastructure::processors::common::{decode_utf8, is_local_reference, scan_specifiers};
use crate::utils::Logger;
use anyhow::anyhow;
use lightningcss::{
    printer::PrinterOptions,
    stylesheet::{ParserOptions as CssParserOptions, StyleSheet},
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

// Pre-compiled regex patterns for performance
static CSS_IMPORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"@import\s+(?:url\s*\(\s*)?['"]?([^'")\s;]+)"#).expect("css import pattern")
});

static CSS_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\burl\s*\(\s*['"]?([^'")\s]+)['"]?\s*\)"#).expect("css url pattern")
});

/// Stylesheet pipeline backed by Lightning CSS.
///
/// Malformed CSS fails the asset. Edges are the local `@import` and
/// `url()` references of the printed stylesheet, so commented-out rules
/// contribute nothing.
#[derive(Debug, Default)]
pub struct StylePipeline;

impl StylePipeline {
    pub const ID: &'static str = "style";

    pub fn extract_dependencies(&self, css: &str) -> Vec<String> {
        let mut deps: Vec<String> = Vec::new();
        for reference in scan_specifiers(css, &[&CSS_IMPORT_REGEX, &CSS_URL_REGEX]) {
            if !is_local_reference(&reference) {
                continue;
            }
            let file = strip_query(&reference);
            if file.is_empty() {
                continue;
            }
            let dep = as_relative(file);
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }
        deps
    }
}

/// `icon.svg?v=2` and `font.eot?#iefix` name the files `icon.svg` and `font.eot`
fn strip_query(reference: &str) -> &str {
    match reference.find(['?', '#']) {
        Some(index) => &reference[..index],
        None => reference,
    }
}

/// `url(img/a.png)` means a sibling path in CSS, not a package
fn as_relative(reference: &str) -> String {
    if reference.starts_with("./") || reference.starts_with("../") || reference.starts_with('/') {
        reference.to_string()
    } else {
        format!("./{}", reference)
    }
}

impl Pipeline for StylePipeline {
    fn id(&self) -> &str {
        Self::ID
    }

    fn transform(&self, path: &Path, source: &[u8]) -> anyhow::Result<PipelineOutput> {
        let css = decode_utf8(source, path)?;

        Logger::debug(&format!("🎨 Processing CSS: {}", path.display()));

        let options = CssParserOptions {
            filename: path.display().to_string(),
            ..CssParserOptions::default()
        };

        let stylesheet = StyleSheet::parse(css, options).map_err(|e| anyhow!("{}", e))?;
        let printed = stylesheet
            .to_css(PrinterOptions::default())
            .map_err(|e| anyhow!("{}", e))?;

        let edges = self.extract_dependencies(&printed.code);
        Ok(PipelineOutput::new(printed.code, edges))
    }
}
