// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Supervisor: composes the rest of the system into a boot sequence and a
//! signal-safe shutdown.

use anyhow::{Context, Result};
use std::fs;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::cancel::CancelToken;
use crate::cli::Cli;
use crate::client::IndexClient;
use crate::config::Config;
use crate::crawler;
use crate::paths;
use crate::registrar;
use crate::shipper::{Shipper, DEFAULT_BUDGET};
use crate::snapshot::{self, Snapshot};
use crate::watcher::ProjectWatcher;

/// Runs the full boot sequence, blocking until a shutdown signal is
/// received or (when `--quitafter` is set) the initial crawl completes.
pub fn run(cli: &Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(paths::default_config_path);
    let mut config = Config::load(&config_path).context("loading configuration")?;
    apply_overrides(cli, &mut config);

    let base_url = config.api.base_url();
    let token = if cli.logout { None } else { load_token() };
    let mut client = IndexClient::new(base_url.clone(), token);

    let needs_login = cli.logout || client.token().is_none() || client.get_logged_in_user(&base_url).is_err();
    if needs_login {
        let username = cli.username.as_deref().context("no cached token and no --username supplied")?;
        let password = cli.password.as_deref().context("no cached token and no --password supplied")?;
        let token = client.login(&base_url, username, password).context("authenticating with the index service")?;
        save_token(&token);
    }

    registrar::ensure_location(&client, &base_url, &mut config).context("registering location")?;
    registrar::ensure_agent(&client, &base_url, &mut config).context("registering agent")?;
    let location_id = config.location.id.clone().expect("ensure_location always sets this");
    let agent_id = config.agent.id.clone().expect("ensure_agent always sets this");
    registrar::ensure_projects(&client, &base_url, &location_id, &agent_id, &mut config.projects)
        .context("registering projects")?;
    config.save().context("persisting resolved configuration")?;

    let cancel = CancelToken::new();
    install_signal_handler(cancel.clone());

    let mut watchers: Vec<(String, ProjectWatcher)> = Vec::new();

    for project in &config.projects {
        if cancel.is_cancelled() {
            break;
        }

        let snapshot_path = paths::snapshot_path(&project.name);
        let previous = snapshot::load(&snapshot_path).unwrap_or_default();
        let current = crawler::walk_current(&project.root_dir, project);

        let needs_full_crawl = previous != current || !snapshot::exists(&snapshot_path);
        if previous != current {
            reconcile_deletes(&client, project, &previous, &current);
        }

        let http = reqwest::blocking::Client::new();
        let baseline = if needs_full_crawl {
            let queue_dir = paths::queue_dir(&project.name);
            let index = IndexClient::new(base_url.clone(), client.token().map(str::to_string));
            let mut shipper = Shipper::new(index, project.endpoint().to_string(), DEFAULT_BUDGET, cancel.clone());
            let built = crawler::full_run(&http, project, &mut shipper, &queue_dir, &cancel)
                .with_context(|| format!("crawling project {}", project.name))?;
            snapshot::save(&snapshot_path, &built).context("persisting post-crawl snapshot")?;
            built
        } else {
            info!(project = %project.name, "snapshot matches disk, skipping full crawl");
            current
        };

        if cli.quitafter {
            continue;
        }

        let index = IndexClient::new(base_url.clone(), client.token().map(str::to_string));
        let watcher = ProjectWatcher::start(index, project.clone(), snapshot_path, baseline, cancel.clone())
            .with_context(|| format!("starting watcher for project {}", project.name))?;
        watchers.push((project.name.clone(), watcher));
    }

    if !cli.quitafter && !watchers.is_empty() {
        wait_for_shutdown(&cancel);
    }

    for (name, watcher) in &watchers {
        let snapshot_path = paths::snapshot_path(name);
        if let Err(err) = snapshot::save(&snapshot_path, &watcher.live_snapshot()) {
            error!(project = %name, error = %err, "failed to persist snapshot on shutdown");
        }
    }

    Ok(())
}

fn apply_overrides(cli: &Cli, config: &mut Config) {
    if let Some(hostname) = &cli.hostname {
        config.api.host = hostname.clone();
    }
    if let Some(mtime) = cli.mtime {
        config.agent.mtime_days = mtime;
    }
    if let Some(minsize) = cli.minsize {
        config.agent.minsize = minsize;
    }
    if let Some(level) = &cli.loglevel {
        config.agent.loglevel = level.clone();
    }
    if let Some(project) = config.projects.first_mut() {
        if let Some(rootdir) = &cli.rootdir {
            project.root_dir = rootdir.clone();
        }
        if let Some(name) = &cli.projectname {
            project.name = name.clone();
        }
    }
}

/// Emits best-effort deletes for every path present in `previous` but not
/// `current`, swallowing individual failures (per §4.5: offline-delta
/// deletes are best-effort).
fn reconcile_deletes(client: &IndexClient, project: &crate::config::ProjectConfig, previous: &Snapshot, current: &Snapshot) {
    for path in previous.difference(current) {
        let path_str = path.to_string_lossy();
        match client.search_by_path(project.endpoint(), &path_str) {
            Ok(hits) => {
                for hit in &hits.results {
                    if let Err(err) = client.delete_document(project.endpoint(), &hit.id) {
                        warn!(path = %path_str, error = %err, "offline-delta delete failed");
                    }
                }
            }
            Err(err) => warn!(path = %path_str, error = %err, "offline-delta lookup failed"),
        }
    }
}

fn install_signal_handler(cancel: CancelToken) {
    let result = ctrlc::set_handler(move || {
        info!("shutdown signal received, persisting state");
        cancel.cancel();
    });
    if let Err(err) = result {
        warn!(error = %err, "failed to install signal handler; Ctrl-C will not shut down gracefully");
    }
}

fn wait_for_shutdown(cancel: &CancelToken) {
    while !cancel.is_cancelled() {
        cancel.sleep(Duration::from_secs(1));
    }
}

fn load_token() -> Option<String> {
    fs::read_to_string(paths::token_path()).ok().map(|s| s.trim().to_string())
}

fn save_token(token: &str) {
    if let Err(err) = fs::write(paths::token_path(), token) {
        warn!(error = %err, "failed to persist auth token");
    }
}

