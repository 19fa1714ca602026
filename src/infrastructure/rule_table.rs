use crate::core::models::AssetClass;
use crate::utils::{PackError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pattern a rule is matched with.
///
/// Written either as an extension glob (`*.png`, `*.{ts,tsx}`, `*.d.ts`)
/// or as a regular expression between slashes (`/\.(ts|tsx)$/`). Regexes
/// are tested against the whole path with `/` separators.
#[derive(Debug, Clone)]
pub enum RulePattern {
    Extensions(Vec<String>),
    Regex(Regex),
}

impl RulePattern {
    pub fn parse(source: &str) -> Result<Self> {
        let source = source.trim();

        if source.len() >= 2 && source.starts_with('/') && source.ends_with('/') {
            let regex = Regex::new(&source[1..source.len() - 1])?;
            return Ok(RulePattern::Regex(regex));
        }

        let Some(rest) = source.strip_prefix("*.") else {
            return Err(PackError::config(format!(
                "Rule pattern '{}' must look like `*.ext`, `*.{{a,b}}` or `/regex/`",
                source
            )));
        };

        let extensions: Vec<String> = match rest.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
            Some(list) => list.split(',').map(|e| e.trim().to_string()).collect(),
            None => vec![rest.to_string()],
        };

        if extensions
            .iter()
            .any(|e| e.is_empty() || e.contains(['*', '/', '{', '}']))
        {
            return Err(PackError::config(format!(
                "Rule pattern '{}' has an invalid extension list",
                source
            )));
        }

        Ok(RulePattern::Extensions(extensions))
    }

    pub fn extensions(exts: &[&str]) -> Self {
        RulePattern::Extensions(exts.iter().map(|e| e.trim_start_matches('.').to_string()).collect())
    }

    pub fn matches(&self, path: &Path) -> bool {
        match self {
            RulePattern::Extensions(exts) => {
                let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                    return false;
                };
                exts.iter().any(|ext| {
                    file_name.len() > ext.len() + 1
                        && file_name.ends_with(ext.as_str())
                        && file_name.as_bytes()[file_name.len() - ext.len() - 1] == b'.'
                })
            }
            RulePattern::Regex(regex) => regex.is_match(&normalize_path(path)),
        }
    }

    /// Pattern in configuration syntax
    pub fn source(&self) -> String {
        match self {
            RulePattern::Extensions(exts) if exts.len() == 1 => format!("*.{}", exts[0]),
            RulePattern::Extensions(exts) => format!("*.{{{}}}", exts.join(",")),
            RulePattern::Regex(regex) => format!("/{}/", regex.as_str()),
        }
    }

    /// Whether `self` matches every path that `other` matches.
    /// Only decidable for extension patterns.
    fn covers(&self, other: &RulePattern) -> bool {
        match (self, other) {
            (RulePattern::Extensions(mine), RulePattern::Extensions(theirs)) => {
                theirs.iter().all(|t| {
                    mine.iter()
                        .any(|m| t == m || t.ends_with(&format!(".{}", m)))
                })
            }
            _ => false,
        }
    }
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// An immutable (pattern, pipeline, terminal type) entry
#[derive(Debug, Clone)]
pub struct Rule {
    pub test: RulePattern,
    pub exclude: Option<RulePattern>,
    pub pipeline: String,
    pub terminal: AssetClass,
    /// Output extension for module artifacts, without the dot
    pub output_extension: Option<String>,
}

impl Rule {
    pub fn new(test: RulePattern, pipeline: impl Into<String>, terminal: AssetClass) -> Self {
        Self {
            test,
            exclude: None,
            pipeline: pipeline.into(),
            terminal,
            output_extension: None,
        }
    }

    pub fn excluding(mut self, exclude: RulePattern) -> Self {
        self.exclude = Some(exclude);
        self
    }

    pub fn with_output_extension(mut self, ext: &str) -> Self {
        self.output_extension = Some(ext.trim_start_matches('.').to_string());
        self
    }

    pub fn applies_to(&self, path: &Path) -> bool {
        self.test.matches(path)
            && !self.exclude.as_ref().is_some_and(|ex| ex.matches(path))
    }

    /// Modules take the configured extension (`js` by default); resources
    /// keep their own.
    pub fn output_extension_for(&self, path: &Path) -> String {
        match self.terminal {
            AssetClass::Module => self
                .output_extension
                .clone()
                .unwrap_or_else(|| "js".to_string()),
            AssetClass::Resource => path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Rule as written in the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpec {
    pub test: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<String>,
    #[serde(rename = "type", default = "default_terminal")]
    pub terminal: AssetClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_extension: Option<String>,
}

fn default_terminal() -> AssetClass {
    AssetClass::Module
}

impl RuleSpec {
    pub fn into_rule(self) -> Result<Rule> {
        let pipeline = match (self.pipeline, self.terminal) {
            (Some(p), _) => p,
            (None, AssetClass::Resource) => "resource".to_string(),
            (None, AssetClass::Module) => {
                return Err(PackError::config(format!(
                    "Module rule '{}' needs a pipeline",
                    self.test
                )))
            }
        };

        let mut rule = Rule::new(RulePattern::parse(&self.test)?, pipeline, self.terminal);
        if let Some(exclude) = self.exclude {
            rule = rule.excluding(RulePattern::parse(&exclude)?);
        }
        if let Some(ext) = self.output_extension {
            rule = rule.with_output_extension(&ext);
        }
        Ok(rule)
    }

    pub fn from_rule(rule: &Rule) -> Self {
        Self {
            test: rule.test.source(),
            exclude: rule.exclude.as_ref().map(|e| e.source()),
            pipeline: Some(rule.pipeline.clone()),
            terminal: rule.terminal,
            output_extension: rule.output_extension.clone(),
        }
    }
}

/// Ordered rule list; the first applicable rule wins
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn match_rule(&self, path: &Path) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.applies_to(path))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Indices of rules no path can ever reach, because earlier rules
    /// without exclusions already match all of their extensions
    pub fn shadowed_rules(&self) -> Vec<usize> {
        let mut shadowed = Vec::new();

        for (i, rule) in self.rules.iter().enumerate() {
            let RulePattern::Extensions(exts) = &rule.test else {
                continue;
            };

            let earlier: Vec<&Rule> = self.rules[..i]
                .iter()
                .filter(|r| r.exclude.is_none())
                .collect();

            let all_covered = exts.iter().all(|ext| {
                let single = RulePattern::Extensions(vec![ext.clone()]);
                earlier.iter().any(|r| r.test.covers(&single))
            });

            if all_covered {
                shadowed.push(i);
            }
        }

        shadowed
    }
}
