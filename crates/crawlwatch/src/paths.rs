// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Per-user data directory layout.

use directories::ProjectDirs;
use std::path::PathBuf;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "crawlwatch", "crawlwatch")
}

/// Default configuration file path, `<data dir>/radiam.txt`.
#[must_use]
pub fn default_config_path() -> PathBuf {
    data_dir().join("radiam.txt")
}

/// Cached auth token path, `<data dir>/token`.
#[must_use]
pub fn token_path() -> PathBuf {
    data_dir().join("token")
}

/// Log file path, `<data dir>/radiam_log.txt`.
#[must_use]
pub fn log_path() -> PathBuf {
    data_dir().join("radiam_log.txt")
}

/// Persisted Snapshot path for `project_name`.
#[must_use]
pub fn snapshot_path(project_name: &str) -> PathBuf {
    data_dir().join(format!("last_crawl_{project_name}.data"))
}

/// Durable work queue directory for `project_name`.
#[must_use]
pub fn queue_dir(project_name: &str) -> PathBuf {
    data_dir().join("radiam_queue").join(project_name)
}

fn data_dir() -> PathBuf {
    let dir = project_dirs().map_or_else(|| PathBuf::from("."), |dirs| dirs.data_dir().to_path_buf());
    let _ = std::fs::create_dir_all(&dir);
    dir
}
