// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! The document shape sent to the remote index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// A single indexed record describing one file or directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Document {
    /// A directory entry.
    Directory(DirectoryDocument),
    /// A file entry.
    File(FileDocument),
}

/// Fields shared by both document variants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Header {
    /// Base name of the entry.
    pub name: String,
    /// Absolute path of the entry.
    pub path: PathBuf,
    /// Absolute path of the entry's parent directory.
    pub path_parent: PathBuf,
    /// Resolved owner name.
    pub owner: String,
    /// Resolved group name.
    pub group: String,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Last access time.
    pub last_access: DateTime<Utc>,
    /// Last metadata change time.
    pub last_change: DateTime<Utc>,
    /// Time this document was produced.
    pub indexing_date: DateTime<Utc>,
    /// Owner at the time of indexing; equals `owner`.
    pub indexed_by: String,
    /// Project location identifier.
    pub location: String,
    /// Project agent identifier.
    pub agent: String,
}

/// A directory document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectoryDocument {
    /// Shared header fields.
    #[serde(flatten)]
    pub header: Header,
    /// Total number of entries directly inside the directory.
    pub items: u64,
    /// Number of files directly inside the directory.
    pub file_num_in_dir: u64,
    /// Metadata attached from a sidecar `<basename>.yml`, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_metadata: Option<Value>,
}

/// A file document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileDocument {
    /// Shared header fields.
    #[serde(flatten)]
    pub header: Header,
    /// Lowercased extension, without the leading dot; absent if there's no
    /// dot in the base name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// File size in bytes.
    pub filesize: u64,
    /// Content-derived metadata, if extraction was configured and succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_metadata: Option<Value>,
}

impl Document {
    /// Returns the absolute path this document describes.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Directory(d) => &d.header.path,
            Self::File(f) => &f.header.path,
        }
    }

    /// Returns the shared header.
    #[must_use]
    pub fn header(&self) -> &Header {
        match self {
            Self::Directory(d) => &d.header,
            Self::File(f) => &f.header,
        }
    }
}

/// Derives the lowercased, dotless extension of a file's base name.
///
/// Returns `None` only if the base name has no dot at all (or the only dot
/// is the leading dot of a dotfile). A trailing dot (`"weird."`) still
/// counts as having an extension — an empty one.
#[must_use]
pub fn extension_of(name: &str) -> Option<String> {
    let dot = name.rfind('.')?;
    if dot == 0 {
        // A leading dot makes the whole name a dotfile, not an extension.
        return None;
    }
    Some(name[dot + 1..].to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_of_lowercases_and_trims_dot() {
        assert_eq!(extension_of("a.TXT"), Some("txt".to_string()));
        assert_eq!(extension_of("a.tar.gz"), Some("gz".to_string()));
    }

    #[test]
    fn extension_of_absent_without_dot() {
        assert_eq!(extension_of("README"), None);
    }

    #[test]
    fn extension_of_dotfile_has_no_extension() {
        assert_eq!(extension_of(".gitignore"), None);
    }

    #[test]
    fn extension_of_trailing_dot_is_empty_not_absent() {
        assert_eq!(extension_of("weird."), Some(String::new()));
    }
}
