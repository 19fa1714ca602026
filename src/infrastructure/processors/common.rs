/// Shared functionality between the text pipelines
/// (script, style and json all decode, normalize and scan the same way).

use anyhow::{anyhow, Result};
use regex::Regex;
use std::path::Path;

/// Decode UTF-8 source or fail with a message naming the byte offset
pub fn decode_utf8<'a>(source: &'a [u8], path: &Path) -> Result<&'a str> {
    std::str::from_utf8(source).map_err(|e| {
        anyhow!(
            "{} is not valid UTF-8 (at byte {})",
            path.display(),
            e.valid_up_to()
        )
    })
}

/// `\r\n` and lone `\r` become `\n`; output always ends with a newline
pub fn normalize_newlines(text: &str) -> String {
    let mut normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

/// Collect capture group 1 of every pattern, ordered by position in `text`,
/// keeping the first occurrence of each specifier.
pub fn scan_specifiers(text: &str, patterns: &[&Regex]) -> Vec<String> {
    let mut found: Vec<(usize, String)> = patterns
        .iter()
        .flat_map(|re| {
            re.captures_iter(text).filter_map(|caps| {
                caps.get(1)
                    .map(|m| (m.start(), m.as_str().trim().to_string()))
            })
        })
        .filter(|(_, spec)| !spec.is_empty())
        .collect();

    found.sort_by_key(|(pos, _)| *pos);

    let mut specifiers: Vec<String> = Vec::with_capacity(found.len());
    for (_, spec) in found {
        if !specifiers.contains(&spec) {
            specifiers.push(spec);
        }
    }
    specifiers
}

/// Whether a reference points at another file in the source tree rather
/// than at a URL, a data URI or a fragment
pub fn is_local_reference(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    !(lower.is_empty()
        || lower.starts_with('#')
        || lower.starts_with("data:")
        || lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("//"))
}
