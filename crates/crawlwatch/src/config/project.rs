// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Project configuration and path rules.

use std::path::PathBuf;

/// Whether rich (local parser) metadata extraction is enabled for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RichMetadata {
    /// Rich metadata extraction is enabled.
    Enabled,
    /// Rich metadata extraction is disabled.
    #[default]
    Disabled,
}

/// Include/exclude patterns for files and directories, per the path rule
/// grammar: literal names, literal full paths, `*suffix`, `prefix*`,
/// `*middle*`, and the sentinels `.*`, `NULLEXT`, `*.ext`.
#[derive(Debug, Clone, Default)]
pub struct PathRules {
    /// Files always admitted, regardless of `excluded_files`.
    pub included_files: Vec<String>,
    /// File patterns to exclude.
    pub excluded_files: Vec<String>,
    /// Directories always admitted, regardless of `excluded_dirs`.
    pub included_dirs: Vec<String>,
    /// Directory patterns to exclude.
    pub excluded_dirs: Vec<String>,
}

/// A single project's configuration, as materialized by the Registrar
/// (`id`/`endpoint` are filled in after registration; everything else is
/// immutable for the lifetime of a run).
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// Human-readable project name, also the config section name.
    pub name: String,
    /// Absolute root directory to crawl and watch.
    pub root_dir: PathBuf,
    /// Index service endpoint for this project's documents, once resolved.
    pub endpoint: Option<String>,
    /// Include/exclude path rules.
    pub rules: PathRules,
    /// Optional Tika-compatible remote metadata extractor host.
    pub tika_host: Option<String>,
    /// Whether local rich metadata extraction is enabled.
    pub rich_metadata: RichMetadata,
    /// Remote project id, once registered.
    pub id: Option<String>,
    /// Remote location id shared across projects on this agent.
    pub location: String,
    /// Remote agent id.
    pub agent: String,
    /// Minimum file size in bytes to admit; 0 admits all.
    pub minsize: u64,
    /// Minimum file age in days to admit; 0 admits all.
    pub mtime_days: u64,
}

impl ProjectConfig {
    /// Returns the project's resolved endpoint.
    ///
    /// # Panics
    ///
    /// Panics if called before the Registrar has materialized an endpoint;
    /// by the time the Crawler or Watcher run, this always holds.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().expect("endpoint resolved by Registrar before use")
    }
}
