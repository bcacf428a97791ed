// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Error types.
//!
//! Library-level failure modes are modeled as a [`thiserror`]-derived enum,
//! so callers within the crate can match on specific variants (for example,
//! to decide whether a shipper failure is worth retrying). The supervisor and
//! `main`, which only ever need to report and exit, wrap these in
//! [`anyhow::Error`].

use std::path::PathBuf;

/// Result type, with the crate's [`Error`] as the default error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error, optionally annotated with the path that caused it.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path the operation was performed on.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Bare I/O error with no associated path.
    #[error(transparent)]
    BareIo(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Config(String),

    /// A required configuration value was missing.
    #[error("missing configuration value: {0}")]
    MissingConfig(&'static str),

    /// The index service rejected a request.
    #[error("index service returned {status}: {body}")]
    IndexService {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for readability.
        body: String,
    },

    /// HTTP transport error.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization error.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Directory walk error.
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),

    /// File system watcher error.
    #[error(transparent)]
    Watch(#[from] crawlwatch_fsagent::Error),

    /// Snapshot file is corrupt or from an incompatible version.
    #[error("snapshot at {0} is corrupt or from an incompatible version")]
    CorruptSnapshot(PathBuf),
}

impl Error {
    /// Wraps an I/O error with the path that triggered it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
