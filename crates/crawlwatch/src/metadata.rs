// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Metadata Extractor: turns a path into a [`Document`], or a reason it
//! wasn't turned into one.

pub mod extended;
pub mod owner;

use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::config::ProjectConfig;
use crate::document::{extension_of, DirectoryDocument, Document, FileDocument, Header};
use crate::filter;

/// Outcome of attempting to extract a document for a path.
#[derive(Debug)]
pub enum Outcome {
    /// A document was produced.
    Document(Document),
    /// The path is excluded by the project's rules, or is a sidecar YAML.
    Excluded,
    /// An I/O error occurred (e.g. the path vanished between enumeration and
    /// stat); distinguishable from `Excluded` so the Crawler can log it.
    Skipped,
}

/// Extracts a document for a directory at `path`.
///
/// Consults the Path Filter first; yields [`Outcome::Excluded`] for excluded
/// paths. `entry_count` and `file_count` are supplied by the caller, which
/// has already enumerated the directory's children.
pub fn extract_dir(
    path: &Path,
    project: &ProjectConfig,
    entry_count: u64,
    file_count: u64,
) -> Outcome {
    if filter::dir_excluded(path, &project.rules) {
        return Outcome::Excluded;
    }

    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(_) => return Outcome::Skipped,
    };

    let Some(header) = build_header(path, project, &meta) else {
        return Outcome::Skipped;
    };

    let extended_metadata = extended::sidecar_metadata(path);

    Outcome::Document(Document::Directory(DirectoryDocument {
        header,
        items: entry_count,
        file_num_in_dir: file_count,
        extended_metadata,
    }))
}

/// Extracts a document for a file at `path`.
///
/// Consults the Path Filter and the sidecar-YAML test first; also applies
/// the project's `minsize`/`mtime_days` admission thresholds.
pub fn extract_file(
    client: &reqwest::blocking::Client,
    path: &Path,
    project: &ProjectConfig,
) -> Outcome {
    if filter::file_excluded(path, &project.rules) || filter::is_sidecar_yaml(path) {
        return Outcome::Excluded;
    }

    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(_) => return Outcome::Skipped,
    };

    if meta.len() < project.minsize {
        return Outcome::Excluded;
    }

    let Some(header) = build_header(path, project, &meta) else {
        return Outcome::Skipped;
    };

    if project.mtime_days > 0 {
        let threshold = project.mtime_days.saturating_mul(86_400);
        let age = Utc::now().signed_duration_since(header.last_modified);
        if age.num_seconds() < threshold as i64 {
            return Outcome::Excluded;
        }
    }

    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let extension = extension_of(name);
    let extended_metadata = extended::extract(client, project, path, meta.len());

    Outcome::Document(Document::File(FileDocument {
        header,
        extension,
        filesize: meta.len(),
        extended_metadata,
    }))
}

/// Builds the shared header from a single `stat` call, resolving owner and
/// group and converting all times once.
fn build_header(path: &Path, project: &ProjectConfig, meta: &fs::Metadata) -> Option<Header> {
    let name = path.file_name()?.to_str()?.to_string();
    let path_parent = path.parent()?.to_path_buf();

    let owner::Owner { owner, group } = resolve_owner(path, meta);

    let last_modified = to_datetime(meta.modified().ok());
    let last_access = to_datetime(meta.accessed().ok());
    let last_change = last_change_time(meta);

    Some(Header {
        name,
        path: path.to_path_buf(),
        path_parent,
        owner: owner.clone(),
        group,
        last_modified,
        last_access,
        last_change,
        indexing_date: Utc::now(),
        indexed_by: owner,
        location: project.location.clone(),
        agent: project.agent.clone(),
    })
}

#[cfg(unix)]
fn resolve_owner(_path: &Path, meta: &fs::Metadata) -> owner::Owner {
    use std::os::unix::fs::MetadataExt;
    owner::resolve(meta.uid(), meta.gid())
}

#[cfg(windows)]
fn resolve_owner(path: &Path, _meta: &fs::Metadata) -> owner::Owner {
    owner::resolve(path)
}

#[cfg(unix)]
fn last_change_time(meta: &fs::Metadata) -> DateTime<Utc> {
    use std::os::unix::fs::MetadataExt;
    DateTime::from_timestamp(meta.ctime(), 0).unwrap_or_else(|| to_datetime(meta.modified().ok()))
}

#[cfg(windows)]
fn last_change_time(meta: &fs::Metadata) -> DateTime<Utc> {
    // Windows has no ctime equivalent; creation time is the closest proxy.
    to_datetime(meta.created().ok())
}

fn to_datetime(time: Option<SystemTime>) -> DateTime<Utc> {
    time.map(DateTime::<Utc>::from).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{project::RichMetadata, PathRules};

    fn project(root: &Path) -> ProjectConfig {
        ProjectConfig {
            name: "test".to_string(),
            root_dir: root.to_path_buf(),
            endpoint: Some("https://idx.example.com/test".to_string()),
            rules: PathRules::default(),
            tika_host: None,
            rich_metadata: RichMetadata::Disabled,
            id: Some("p1".to_string()),
            location: "loc1".to_string(),
            agent: "agent1".to_string(),
            minsize: 0,
            mtime_days: 0,
        }
    }

    #[test]
    fn extract_file_skips_excluded_paths() {
        let dir = tempfile::tempdir().unwrap();
        let mut proj = project(dir.path());
        proj.rules.excluded_files.push("*.tmp".to_string());
        let path = dir.path().join("a.tmp");
        std::fs::write(&path, b"x").unwrap();

        let client = reqwest::blocking::Client::new();
        assert!(matches!(extract_file(&client, &path, &proj), Outcome::Excluded));
    }

    #[test]
    fn extract_file_admits_under_zero_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let proj = project(dir.path());
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hello").unwrap();

        let client = reqwest::blocking::Client::new();
        match extract_file(&client, &path, &proj) {
            Outcome::Document(Document::File(doc)) => {
                assert_eq!(doc.filesize, 5);
                assert_eq!(doc.extension.as_deref(), Some("txt"));
            }
            other => panic!("expected a file document, got {other:?}"),
        }
    }

    #[test]
    fn extract_file_excludes_below_minsize() {
        let dir = tempfile::tempdir().unwrap();
        let mut proj = project(dir.path());
        proj.minsize = 100;
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hi").unwrap();

        let client = reqwest::blocking::Client::new();
        assert!(matches!(extract_file(&client, &path, &proj), Outcome::Excluded));
    }

    #[test]
    fn extract_file_skips_vanished_path() {
        let dir = tempfile::tempdir().unwrap();
        let proj = project(dir.path());
        let path = dir.path().join("gone.txt");

        let client = reqwest::blocking::Client::new();
        assert!(matches!(extract_file(&client, &path, &proj), Outcome::Skipped));
    }

    #[test]
    fn extract_dir_attaches_sidecar_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let proj_dir = dir.path().join("proj");
        std::fs::create_dir(&proj_dir).unwrap();
        std::fs::write(proj_dir.join("proj.yml"), "title: X\n").unwrap();

        let proj = project(dir.path());
        match extract_dir(&proj_dir, &proj, 1, 1) {
            Outcome::Document(Document::Directory(doc)) => {
                assert_eq!(doc.extended_metadata.unwrap()["title"], "X");
            }
            other => panic!("expected a directory document, got {other:?}"),
        }
    }
}
