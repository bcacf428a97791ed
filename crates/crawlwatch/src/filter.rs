// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Path Filter: include/exclude rule matching for files and directories.

use std::path::Path;

use crate::config::PathRules;

/// Returns whether `path` should be excluded as a file under `rules`.
///
/// Whitelist entries in `included_files` always win, checked first.
#[must_use]
pub fn file_excluded(path: &Path, rules: &PathRules) -> bool {
    let Some(name) = base_name(path) else { return false };

    if is_whitelisted(path, name, &rules.included_files) {
        return false;
    }

    if rules.excluded_files.iter().any(|p| p == name) {
        return true;
    }

    let extension = crate::document::extension_of(name);
    if extension.is_none() && rules.excluded_files.iter().any(|p| p == "NULLEXT") {
        return true;
    }
    if let Some(ext) = &extension {
        let wanted = format!("*.{ext}");
        if rules
            .excluded_files
            .iter()
            .any(|p| p.eq_ignore_ascii_case(&wanted))
        {
            return true;
        }
    }

    if name.starts_with('.') && rules.excluded_files.iter().any(|p| p == ".*") {
        return true;
    }
    if name.ends_with('~') && rules.excluded_files.iter().any(|p| p == "*~") {
        return true;
    }
    if name.starts_with("~$") && rules.excluded_files.iter().any(|p| p == "~$*") {
        return true;
    }

    false
}

/// Returns whether `path` should be excluded as a directory under `rules`.
#[must_use]
pub fn dir_excluded(path: &Path, rules: &PathRules) -> bool {
    let Some(name) = base_name(path) else { return false };

    if is_whitelisted(path, name, &rules.included_dirs) {
        return false;
    }

    let full = path.to_string_lossy();
    if rules.excluded_dirs.iter().any(|p| p == name || p == full.as_ref()) {
        return true;
    }

    if name.starts_with('.') && rules.excluded_dirs.iter().any(|p| p == ".*") {
        return true;
    }

    rules
        .excluded_dirs
        .iter()
        .any(|pattern| matches_wildcard(pattern, name, full.as_ref()))
}

/// Returns whether `path`'s base name equals `<parent_basename>.yml`,
/// marking it as a directory sidecar that is never emitted as a file
/// document.
#[must_use]
pub fn is_sidecar_yaml(path: &Path) -> bool {
    let Some(name) = base_name(path) else { return false };
    let Some(parent) = path.parent().and_then(|p| p.file_name()) else { return false };
    name == format!("{}.yml", parent.to_string_lossy())
}

fn base_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

fn is_whitelisted(path: &Path, name: &str, included: &[String]) -> bool {
    let full = path.to_string_lossy();
    included.iter().any(|p| p == name || p == full.as_ref())
}

/// Matches `pattern` (one of the wildcard forms from the path rule grammar)
/// against a candidate's base name or full path.
fn matches_wildcard(pattern: &str, name: &str, full: &str) -> bool {
    if pattern == name || pattern == full {
        return true;
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        if let Some(prefix) = suffix.strip_suffix('*') {
            // `*middle*`
            return !prefix.is_empty() && (name.contains(prefix) || full.contains(prefix));
        }
        // `*suffix`
        return name.ends_with(suffix) || full.ends_with(suffix);
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        // `prefix*`
        return name.starts_with(prefix) || full.starts_with(prefix);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathRules;
    use std::path::PathBuf;

    fn rules(excluded_files: &[&str], excluded_dirs: &[&str]) -> PathRules {
        PathRules {
            included_files: Vec::new(),
            excluded_files: excluded_files.iter().map(|s| s.to_string()).collect(),
            included_dirs: Vec::new(),
            excluded_dirs: excluded_dirs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn s1_extension_filter_is_case_insensitive() {
        let r = rules(&["*.tmp"], &[]);
        assert!(file_excluded(&PathBuf::from("/r/a.tmp"), &r));
        assert!(file_excluded(&PathBuf::from("/r/a.TMP"), &r));
        assert!(!file_excluded(&PathBuf::from("/r/a.txt"), &r));
    }

    #[test]
    fn s2_dotfile_directories_excluded() {
        let r = rules(&[], &[".*"]);
        assert!(dir_excluded(&PathBuf::from("/r/.git"), &r));
        assert!(!dir_excluded(&PathBuf::from("/r/docs"), &r));
    }

    #[test]
    fn whitelist_beats_exclude() {
        let mut r = rules(&["*.tmp"], &[]);
        r.included_files.push("important.tmp".to_string());
        assert!(!file_excluded(&PathBuf::from("/r/important.tmp"), &r));
        assert!(file_excluded(&PathBuf::from("/r/other.tmp"), &r));
    }

    #[test]
    fn nullext_excludes_extensionless_files() {
        let r = rules(&["NULLEXT"], &[]);
        assert!(file_excluded(&PathBuf::from("/r/Makefile"), &r));
        assert!(!file_excluded(&PathBuf::from("/r/Makefile.am"), &r));
    }

    #[test]
    fn backup_and_lock_file_sentinels() {
        let r = rules(&["*~", "~$*"], &[]);
        assert!(file_excluded(&PathBuf::from("/r/notes.txt~"), &r));
        assert!(file_excluded(&PathBuf::from("/r/~$draft.docx"), &r));
    }

    #[test]
    fn sidecar_yaml_detection() {
        assert!(is_sidecar_yaml(&PathBuf::from("/r/proj/proj.yml")));
        assert!(!is_sidecar_yaml(&PathBuf::from("/r/proj/other.yml")));
    }

    #[test]
    fn dir_wildcard_substring_match() {
        let r = rules(&[], &["*cache*"]);
        assert!(dir_excluded(&PathBuf::from("/r/build-cache-dir"), &r));
        assert!(!dir_excluded(&PathBuf::from("/r/src"), &r));
    }
}
