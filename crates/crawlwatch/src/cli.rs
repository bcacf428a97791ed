// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Command-line interface.

use clap::Parser;
use std::path::PathBuf;

/// Crawl a project directory tree, index it against a remote service, and
/// keep the index in sync by watching for live filesystem changes.
#[derive(Debug, Parser)]
#[command(name = "crawlwatch", version, about)]
pub struct Cli {
    /// Path to the configuration file; defaults to the per-user data
    /// directory's `radiam.txt`.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the root directory to crawl for the first configured
    /// project, bypassing the value on file.
    #[arg(long)]
    pub rootdir: Option<PathBuf>,

    /// Override the minimum file age in days.
    #[arg(long)]
    pub mtime: Option<u64>,

    /// Override the minimum file size in bytes.
    #[arg(long)]
    pub minsize: Option<u64>,

    /// Override the index service host.
    #[arg(long)]
    pub hostname: Option<String>,

    /// Username for password authentication, when no token is on file.
    #[arg(long)]
    pub username: Option<String>,

    /// Password for password authentication, when no token is on file.
    #[arg(long, env = "CRAWLWATCH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Override the name of the first configured project.
    #[arg(long)]
    pub projectname: Option<String>,

    /// Exit after the initial full crawl completes, skipping the Watcher.
    #[arg(long)]
    pub quitafter: bool,

    /// Discard the cached auth token and force re-authentication.
    #[arg(long)]
    pub logout: bool,

    /// Console/file log level, overriding `[agent].loglevel`.
    #[arg(long)]
    pub loglevel: Option<String>,
}
