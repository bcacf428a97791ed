// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Extended metadata: sidecar YAML attachment and recursive UTF-8
//! normalization.

use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use crate::config::ProjectConfig;

/// Maximum file size, in bytes, eligible for remote Tika extraction.
const TIKA_MAX_BYTES: u64 = 500_000;

/// Reads and parses `<dir>/<basename_of(dir)>.yml`, if present, as the
/// directory's sidecar metadata.
///
/// Parse failure (missing file, invalid YAML, or a non-mapping document) is
/// silent: the directory document simply carries no `extended_metadata`.
#[must_use]
pub fn sidecar_metadata(dir: &Path) -> Option<Value> {
    let name = dir.file_name()?.to_str()?;
    let sidecar = dir.join(format!("{name}.yml"));
    let text = std::fs::read_to_string(sidecar).ok()?;
    let value: serde_yaml::Value = serde_yaml::from_str(&text).ok()?;
    if !value.is_mapping() {
        return None;
    }
    serde_json::to_value(value).ok().map(|v| normalize_utf8(&v))
}

/// Produces content-derived metadata for a file, if the project is
/// configured for it.
///
/// Local rich-metadata parsing (`rich_metadata = enabled`) routes to a
/// format-specific parser external to this crate; only the contract is
/// modeled here, so this returns `None` until such a parser is wired in.
/// Remote Tika-compatible extraction is attempted only for files at or
/// under [`TIKA_MAX_BYTES`]; any failure (transport or non-2xx) yields
/// `None` rather than aborting extraction.
pub fn extract(client: &reqwest::blocking::Client, project: &ProjectConfig, path: &Path, size: u64) -> Option<Value> {
    use crate::config::project::RichMetadata;

    if project.rich_metadata == RichMetadata::Enabled {
        return None;
    }

    let host = project.tika_host.as_deref()?;
    if size > TIKA_MAX_BYTES {
        return None;
    }

    let response = client
        .put(format!("{host}/tika"))
        .header("Accept", "application/json")
        .timeout(Duration::from_secs(30))
        .body(std::fs::read(path).ok()?)
        .send()
        .ok()?;

    if !response.status().is_success() {
        return None;
    }

    response.json::<Value>().ok().map(|v| normalize_utf8(&v))
}

/// Recursively normalizes a JSON value so every string is valid UTF-8 with
/// NUL bytes stripped.
///
/// `serde_json::Value` strings are already `String`s by construction, so in
/// practice this walks the tree re-sanitizing each scalar; it exists to give
/// recursive normalization, at any nesting depth, a single tested entry point
/// rather than relying on `serde_json`'s own guarantees.
fn normalize_utf8(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(strip_nul(s)),
        Value::Array(items) => Value::Array(items.iter().map(normalize_utf8).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (strip_nul(k), normalize_utf8(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn strip_nul(s: &str) -> String {
    s.chars().filter(|&c| c != '\0').collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_strips_nul_recursively() {
        let input = json!({
            "title": "hello\u{0}world",
            "tags": ["a\u{0}", "b"],
        });
        let normalized = normalize_utf8(&input);
        assert_eq!(normalized["title"], json!("helloworld"));
        assert_eq!(normalized["tags"][0], json!("a"));
    }

    #[test]
    fn sidecar_metadata_attaches_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let proj = dir.path().join("proj");
        std::fs::create_dir(&proj).unwrap();
        std::fs::write(proj.join("proj.yml"), "title: X\n").unwrap();

        let attached = sidecar_metadata(&proj).unwrap();
        assert_eq!(attached["title"], json!("X"));
    }

    #[test]
    fn sidecar_metadata_absent_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(sidecar_metadata(dir.path()).is_none());
    }

    #[test]
    fn sidecar_metadata_silent_on_non_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let proj = dir.path().join("proj");
        std::fs::create_dir(&proj).unwrap();
        std::fs::write(proj.join("proj.yml"), "- just\n- a\n- list\n").unwrap();
        assert!(sidecar_metadata(&proj).is_none());
    }
}
