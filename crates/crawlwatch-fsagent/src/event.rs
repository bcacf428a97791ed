// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! File system events.

use std::path::PathBuf;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Kind of entry an event refers to.
///
/// The kind is derived from the raw event itself rather than from a fresh
/// `stat` of the path, since by the time an event is processed the path may
/// already have been removed or replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Entry of unknown or unsupported kind.
    Other,
}

/// Normalized file system event.
///
/// This is the event type exposed to callers of [`crate::Agent`]. It is a
/// deliberately small projection of [`notify::Event`]: we keep only the
/// variants a crawler cares about, and we never attempt to follow symlinks or
/// re-derive an entry's kind from a subsequent restat.
#[derive(Debug, Clone)]
pub enum Event {
    /// An entry was created.
    Create {
        /// Kind of entry.
        kind: Kind,
        /// Path of the entry.
        path: PathBuf,
    },
    /// An entry was modified.
    Modify {
        /// Kind of entry.
        kind: Kind,
        /// Path of the entry.
        path: PathBuf,
    },
    /// An entry was removed.
    ///
    /// The kind cannot be recovered for a removal, since the entry is gone by
    /// the time the event is observed.
    Remove {
        /// Path of the entry.
        path: PathBuf,
    },
    /// An entry was renamed or moved.
    Rename {
        /// Previous path of the entry.
        from: PathBuf,
        /// New path of the entry.
        to: PathBuf,
    },
}

impl Event {
    /// Returns the primary path this event refers to.
    ///
    /// For [`Event::Rename`], this returns the new path.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Create { path, .. } | Self::Modify { path, .. } | Self::Remove { path } => path,
            Self::Rename { to, .. } => to,
        }
    }
}
