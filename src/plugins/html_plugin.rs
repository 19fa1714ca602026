// HTML Plugin: emits the page shell that loads the entry module

use crate::core::models::{ArtifactKind, BuildOutput, OutputArtifact};
use crate::core::plugin::{Plugin, PluginContext};
use crate::utils::{Logger, PackError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const DEFAULT_HTML_FILENAME: &str = "index.html";

const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>packline app</title>
</head>
<body>
  <div id="root"></div>
</body>
</html>
"#;

static TITLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title>.*?</title>").expect("title pattern"));

static HEAD_CLOSE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</head\s*>").expect("head close pattern"));

static BODY_CLOSE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</body\s*>").expect("body close pattern"));

/// Injects stylesheet links and the entry script into an HTML template.
///
/// Links go before `</head>`, the script before `</body>`. Without those
/// tags the markup is prepended or appended instead. The template file is
/// read once per build, in `on_build_start`.
pub struct HtmlPlugin {
    template: Option<PathBuf>,
    filename: String,
    title: Option<String>,
    loaded: Mutex<Option<String>>,
}

impl HtmlPlugin {
    pub fn new(template: Option<PathBuf>, filename: Option<String>, title: Option<String>) -> Self {
        Self {
            template,
            filename: filename.unwrap_or_else(|| DEFAULT_HTML_FILENAME.to_string()),
            title,
            loaded: Mutex::new(None),
        }
    }

    fn load_template(&self, root: &Path) -> Result<String> {
        let Some(template) = &self.template else {
            return Ok(DEFAULT_TEMPLATE.to_string());
        };

        let path = root.join(template);
        Logger::debug(&format!("Using HTML template {}", path.display()));
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PackError::NotFound {
                specifier: template.display().to_string(),
                importer: root.to_path_buf(),
            },
            _ => PackError::file_io(&path, e),
        })
    }

    fn loaded_template(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.loaded
            .lock()
            .map_err(|_| PackError::plugin(self.name(), "template cache is poisoned"))
    }

    /// Prefix that leads from the HTML file back to the output root
    fn base_href(&self) -> String {
        let depth = self.filename.matches('/').count();
        "../".repeat(depth)
    }

    pub fn render(&self, template: &str, output: &BuildOutput) -> String {
        let base = self.base_href();

        let links: String = output
            .artifacts
            .iter()
            .filter(|a| a.kind != ArtifactKind::Generated && a.extension() == Some("css"))
            .map(|a| format!("  <link rel=\"stylesheet\" href=\"{}{}\">\n", base, a.url_path()))
            .collect();

        let script = output
            .entry_artifact()
            .filter(|a| a.kind == ArtifactKind::Module && a.extension() != Some("css"))
            .map(|a| format!("  <script type=\"module\" src=\"{}{}\"></script>\n", base, a.url_path()))
            .unwrap_or_default();

        let mut html = template.to_string();

        if let Some(title) = &self.title {
            let tag = format!("<title>{}</title>", escape_html(title));
            html = if TITLE_REGEX.is_match(&html) {
                TITLE_REGEX.replace(&html, regex::NoExpand(&tag)).into_owned()
            } else {
                insert_before(&html, &HEAD_CLOSE_REGEX, &format!("  {}\n", tag), false)
            };
        }

        if !links.is_empty() {
            html = insert_before(&html, &HEAD_CLOSE_REGEX, &links, false);
        }
        if !script.is_empty() {
            html = insert_before(&html, &BODY_CLOSE_REGEX, &script, true);
        }

        html
    }
}

/// Insert `markup` before the first match of `tag`. Without a match it is
/// appended (`at_end`) or prepended.
fn insert_before(html: &str, tag: &Regex, markup: &str, at_end: bool) -> String {
    match tag.find(html) {
        Some(m) => format!("{}{}{}", &html[..m.start()], markup, &html[m.start()..]),
        None if at_end => format!("{}{}", html, markup),
        None => format!("{}{}", markup, html),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl Plugin for HtmlPlugin {
    fn name(&self) -> &str {
        "html"
    }

    fn on_build_start(&self, context: &PluginContext) -> Result<()> {
        // Fails before the walk if the template is missing
        let template = self.load_template(&context.root)?;
        *self.loaded_template()? = Some(template);
        Ok(())
    }

    fn apply(&self, context: &PluginContext, output: &BuildOutput) -> Result<Vec<OutputArtifact>> {
        let cached = self.loaded_template()?.take();
        let template = match cached {
            Some(template) => template,
            None => self.load_template(&context.root)?,
        };
        let html = self.render(&template, output);
        Ok(vec![OutputArtifact::generated(self.filename.as_str(), html)])
    }
}
