// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Snapshot Store: persists and loads the set of indexed paths per project.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// The set of absolute paths indexed as of the last successful crawl or
/// watch-driven update, for a single project.
pub type Snapshot = BTreeSet<PathBuf>;

/// Loads the snapshot for a project from `path`.
///
/// An absent file yields an empty set, which is indistinguishable from "no
/// previous snapshot" for the purposes of offline-delta reconciliation: both
/// cases end up triggering a full crawl, since `previous != current` or the
/// caller treats an empty `previous` as "no snapshot exists".
pub fn load(path: &Path) -> Result<Snapshot> {
    match fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).map_err(|_| Error::CorruptSnapshot(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Snapshot::new()),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Returns whether a snapshot file exists at all, distinguishing "no
/// snapshot" from "snapshot happens to be empty".
#[must_use]
pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// Persists `snapshot` to `path` via atomic replacement: write to a sibling
/// temp file, then rename over the destination.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let text = serde_json::to_string(snapshot)?;
    fs::write(&tmp, text).map_err(|e| Error::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let mut snapshot = Snapshot::new();
        snapshot.insert(PathBuf::from("/r/a"));
        snapshot.insert(PathBuf::from("/r/b"));

        save(&path, &snapshot).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn missing_file_yields_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert!(load(&path).unwrap().is_empty());
        assert!(!exists(&path));
    }

    #[test]
    fn save_is_atomic_no_partial_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        save(&path, &Snapshot::new()).unwrap();
        assert!(!path.with_extension("tmp").exists());
    }
}
