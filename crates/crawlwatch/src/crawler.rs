// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Crawler: traverses a project root with a durable work queue, submitting
//! documents to the Shipper and building the post-crawl Snapshot.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::cancel::CancelToken;
use crate::config::ProjectConfig;
use crate::error::Result;
use crate::filter;
use crate::metadata::{self, Outcome};
use crate::queue::WorkQueue;
use crate::shipper::Shipper;
use crate::snapshot::Snapshot;

/// Runs a full crawl of `project`'s root directory, returning the set of
/// absolute paths submitted (files and directories both).
///
/// The work queue under `queue_dir` makes this resumable: directories whose
/// documents were fully submitted are acknowledged and never revisited,
/// even across a crash. Permission/OS errors enumerating a given directory
/// are logged and skipped; they never fail the whole crawl.
pub fn full_run(
    client: &reqwest::blocking::Client,
    project: &ProjectConfig,
    shipper: &mut Shipper,
    queue_dir: &Path,
    cancel: &CancelToken,
) -> Result<Snapshot> {
    let queue = WorkQueue::open(queue_dir)?;
    let mut submitted = Snapshot::new();

    if queue.is_empty()? {
        queue.push(&project.root_dir)?;
    }

    while let Some((seq, dir)) = queue.pop()? {
        if cancel.is_cancelled() {
            break;
        }

        match visit_directory(client, project, shipper, &dir, &mut submitted, &queue) {
            Ok(()) => queue.ack(seq)?,
            Err(err) => {
                warn!(path = %dir.display(), error = %err, "failed to enumerate directory, skipping");
                queue.ack(seq)?;
            }
        }
    }

    shipper.flush()?;
    Ok(submitted)
}

/// Enumerates `dir` in one pass: for every non-excluded subdirectory,
/// enqueues it and submits its directory document; for every file, submits
/// its file document if the extractor yields one.
///
/// `dir` itself never gets a document here — it was either documented by
/// its parent's enumeration when it was discovered as a sub-entry, or (for
/// the project root) is never documented at all, since the root is only
/// ever seeded directly onto the queue and is nobody's sub-entry.
fn visit_directory(
    client: &reqwest::blocking::Client,
    project: &ProjectConfig,
    shipper: &mut Shipper,
    dir: &Path,
    submitted: &mut Snapshot,
    queue: &WorkQueue,
) -> Result<()> {
    let entries: Vec<_> = fs::read_dir(dir)
        .map_err(|e| crate::error::Error::io(dir, e))?
        .filter_map(std::result::Result::ok)
        .collect();

    for entry in entries {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else { continue };

        if file_type.is_dir() {
            if !filter::dir_excluded(&path, &project.rules) {
                queue.push(&path)?;
                submit_dir_document(&path, project, shipper, submitted)?;
            }
        } else if file_type.is_file() {
            match metadata::extract_file(client, &path, project) {
                Outcome::Document(doc) => {
                    submitted.insert(path);
                    shipper.submit(doc)?;
                }
                Outcome::Excluded => {}
                Outcome::Skipped => warn!(path = %path.display(), "skipped file: stat failed"),
            }
        }
    }

    Ok(())
}

/// Builds and submits the directory document for a freshly-discovered
/// sub-entry, counting its own children with a dedicated listing (the
/// parent's listing only tells us `path` exists and is a directory).
fn submit_dir_document(
    path: &Path,
    project: &ProjectConfig,
    shipper: &mut Shipper,
    submitted: &mut Snapshot,
) -> Result<()> {
    let (entry_count, file_count) = match fs::read_dir(path) {
        Ok(read) => {
            let mut entries = 0u64;
            let mut files = 0u64;
            for child in read.filter_map(std::result::Result::ok) {
                entries += 1;
                if child.file_type().is_ok_and(|t| t.is_file()) {
                    files += 1;
                }
            }
            (entries, files)
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to stat subdirectory, document not submitted");
            return Ok(());
        }
    };

    match metadata::extract_dir(path, project, entry_count, file_count) {
        Outcome::Document(doc) => {
            submitted.insert(path.to_path_buf());
            shipper.submit(doc)?;
        }
        Outcome::Excluded => {}
        Outcome::Skipped => warn!(path = %path.display(), "skipped directory: stat failed"),
    }
    Ok(())
}

/// Walks `root` using the Path Filter, returning the set of absolute paths
/// (files and non-excluded directories) currently on disk.
///
/// `root` itself is never inserted, matching `full_run`: the project root
/// never gets a document of its own, so it must never appear in either
/// snapshot being compared.
///
/// Used by offline-delta reconciliation to compare against the previous
/// Snapshot without submitting anything.
pub fn walk_current(root: &Path, project: &ProjectConfig) -> Snapshot {
    let mut current = Snapshot::new();

    let walker = WalkDir::new(root).follow_links(false).into_iter().filter_entry(|entry| {
        if entry.file_type().is_dir() && entry.depth() > 0 {
            !filter::dir_excluded(entry.path(), &project.rules)
        } else {
            true
        }
    });

    for entry in walker.filter_map(std::result::Result::ok) {
        if entry.depth() == 0 {
            continue;
        }
        let path = entry.path();
        if entry.file_type().is_dir() {
            current.insert(path.to_path_buf());
        } else if entry.file_type().is_file() && !filter::file_excluded(path, &project.rules) {
            current.insert(path.to_path_buf());
        }
    }

    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::IndexClient;
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
    fn walk_current_collects_files_and_dirs_respecting_excludes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("a.txt"), b"hi").unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git").join("HEAD"), b"ref").unwrap();

        let mut proj = project(dir.path());
        proj.rules.excluded_dirs.push(".*".to_string());

        let current = walk_current(dir.path(), &proj);
        assert!(current.contains(&dir.path().join("sub")));
        assert!(current.contains(&dir.path().join("sub").join("a.txt")));
        assert!(!current.contains(&dir.path().join(".git")));
        assert!(!current.contains(&dir.path().join(".git").join("HEAD")));
    }

    #[test]
    fn full_run_submits_every_path_and_builds_matching_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"hi").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("b.txt"), b"there").unwrap();

        let proj = project(dir.path());
        let queue_dir = tempfile::tempdir().unwrap();
        let http = reqwest::blocking::Client::new();
        let cancel = CancelToken::new();

        // We can't reach a real index service in a unit test; use an
        // endpoint that will fail fast, and only assert on the Snapshot that
        // `full_run` builds locally before ever calling `flush`.
        let index = IndexClient::new("http://127.0.0.1:0", None);
        let mut shipper = Shipper::new(index, proj.endpoint().to_string(), 1_000_000, cancel.clone());

        // Submitting documents into the in-memory buffer doesn't touch the
        // network, so this exercises the walk/submit logic directly without
        // ever calling `flush`.
        let queue = WorkQueue::open(queue_dir.path()).unwrap();
        queue.push(&proj.root_dir).unwrap();
        let mut submitted = Snapshot::new();
        while let Some((seq, d)) = queue.pop().unwrap() {
            visit_directory(&http, &proj, &mut shipper, &d, &mut submitted, &queue).unwrap();
            queue.ack(seq).unwrap();
        }

        assert!(!submitted.contains(&dir.path().to_path_buf()));
        assert!(submitted.contains(&dir.path().join("a.txt")));
        assert!(submitted.contains(&dir.path().join("sub")));
        assert!(submitted.contains(&dir.path().join("sub").join("b.txt")));
        assert_eq!(shipper.buffered(), submitted.len());
    }
}
