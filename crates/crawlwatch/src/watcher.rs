// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Watcher: subscribes to filesystem events for a project's root and keeps
//! the live Snapshot consistent, translating events into index operations
//! via the Metadata Extractor and a dedicated Shipper worker.

use crossbeam::channel::{bounded, Sender};
use crawlwatch_fsagent::{Agent, Event, Kind};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::cancel::CancelToken;
use crate::client::IndexClient;
use crate::config::ProjectConfig;
use crate::document::Document;
use crate::filter;
use crate::metadata::{self, Outcome};
use crate::shipper::Shipper;
use crate::snapshot::{self, Snapshot};

/// Debounce window for coalescing filesystem events before dispatch.
const DEBOUNCE: Duration = Duration::from_millis(200);

/// Interval between live-vs-persisted Snapshot reconciliation checks.
const RECONCILE_INTERVAL: Duration = Duration::from_secs(30);

/// Commands sent from event handlers to the Shipper worker, so a blocking
/// HTTP flush never stalls the event dispatch loop.
enum ShipperCommand {
    Submit(Document),
    EmitSingle { path: String, document: Option<Box<Document>> },
}

/// A running watch over a single project's root directory.
pub struct ProjectWatcher {
    agent: Agent,
    shipper_thread: Option<JoinHandle<()>>,
    reconcile_thread: Option<JoinHandle<()>>,
    live: Arc<Mutex<Snapshot>>,
}

impl ProjectWatcher {
    /// Starts watching `project`'s root, seeded with `initial` as the live
    /// Snapshot (normally the result of the Crawler's last full run, or the
    /// on-disk Snapshot if no full crawl was needed).
    pub fn start(
        client: IndexClient,
        project: ProjectConfig,
        snapshot_path: std::path::PathBuf,
        initial: Snapshot,
        cancel: CancelToken,
    ) -> crate::error::Result<Self> {
        let live = Arc::new(Mutex::new(initial));

        let (shipper_tx, shipper_rx) = bounded::<ShipperCommand>(256);
        let shipper = Shipper::new(client, project.endpoint().to_string(), crate::shipper::DEFAULT_BUDGET, cancel.clone());
        let shipper_thread = {
            let cancel = cancel.clone();
            thread::Builder::new()
                .name(format!("crawlwatch/shipper/{}", project.name))
                .spawn(move || run_shipper_worker(shipper, shipper_rx, cancel))
                .expect("failed to spawn shipper worker thread")
        };

        let reconcile_thread = {
            let live = Arc::clone(&live);
            let cancel = cancel.clone();
            let snapshot_path = snapshot_path.clone();
            thread::Builder::new()
                .name(format!("crawlwatch/reconcile/{}", project.name))
                .spawn(move || run_reconcile_loop(live, snapshot_path, cancel))
                .expect("failed to spawn reconcile loop thread")
        };

        let http = reqwest::blocking::Client::new();
        let project_for_callback = project.clone();
        let live_for_callback = Arc::clone(&live);
        let tx_for_callback = shipper_tx;

        let agent = Agent::new(DEBOUNCE, move |event| {
            match event {
                Ok(event) => handle_event(&http, &project_for_callback, &live_for_callback, &tx_for_callback, event),
                Err(err) => error!(error = %err, project = %project_for_callback.name, "file watcher error"),
            }
            Ok(())
        });
        agent.watch(&project.root_dir)?;

        Ok(Self { agent, shipper_thread: Some(shipper_thread), reconcile_thread: Some(reconcile_thread), live })
    }

    /// Returns a clone of the live in-memory Snapshot, for shutdown
    /// persistence.
    #[must_use]
    pub fn live_snapshot(&self) -> Snapshot {
        self.live.lock().unwrap().clone()
    }

    /// Returns whether the underlying agent thread has terminated
    /// unexpectedly.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.agent.is_terminated()
    }
}

impl Drop for ProjectWatcher {
    fn drop(&mut self) {
        if let Some(thread) = self.shipper_thread.take() {
            let _ = thread.join();
        }
        if let Some(thread) = self.reconcile_thread.take() {
            let _ = thread.join();
        }
    }
}

/// Dispatches one normalized filesystem event: updates the live Snapshot,
/// submits or deletes documents, and refreshes the affected parent(s).
fn handle_event(
    http: &reqwest::blocking::Client,
    project: &ProjectConfig,
    live: &Arc<Mutex<Snapshot>>,
    tx: &Sender<ShipperCommand>,
    event: Event,
) {
    match event {
        Event::Create { kind, path } | Event::Modify { kind, path } => {
            handle_upsert(http, project, live, tx, &path, kind);
        }
        Event::Remove { path } => {
            handle_delete(http, project, live, tx, &path);
        }
        Event::Rename { from, to } => {
            handle_delete(http, project, live, tx, &from);
            let kind = if to.is_dir() { Kind::Directory } else { Kind::File };
            handle_upsert(http, project, live, tx, &to, kind);
        }
    }
}

fn handle_upsert(
    http: &reqwest::blocking::Client,
    project: &ProjectConfig,
    live: &Arc<Mutex<Snapshot>>,
    tx: &Sender<ShipperCommand>,
    path: &std::path::Path,
    kind: Kind,
) {
    if filter::is_sidecar_yaml(path) {
        return;
    }

    let outcome = match kind {
        Kind::Directory => {
            let entry_count = std::fs::read_dir(path).map(Iterator::count).unwrap_or(0) as u64;
            let file_count = std::fs::read_dir(path)
                .map(|entries| entries.filter_map(std::result::Result::ok).filter(|e| e.file_type().is_ok_and(|t| t.is_file())).count())
                .unwrap_or(0) as u64;
            metadata::extract_dir(path, project, entry_count, file_count)
        }
        Kind::File | Kind::Other => metadata::extract_file(http, path, project),
    };

    match outcome {
        Outcome::Document(doc) => {
            live.lock().unwrap().insert(path.to_path_buf());
            send(tx, ShipperCommand::Submit(doc));
            refresh_parent(http, project, live, tx, path);
        }
        Outcome::Excluded => {}
        Outcome::Skipped => warn!(path = %path.display(), "skipped event: stat failed"),
    }
}

/// Handles a delete event unconditionally: a `Remove` event carries no
/// `Kind` (its file/directory type can no longer be stat'd), so there's no
/// basis to apply the file-only Path Filter here the way Created/Modified
/// do. The index is queried by path regardless of whether this run's live
/// Snapshot knew about it, since it may have been indexed in a prior
/// process lifetime.
fn handle_delete(
    http: &reqwest::blocking::Client,
    project: &ProjectConfig,
    live: &Arc<Mutex<Snapshot>>,
    tx: &Sender<ShipperCommand>,
    path: &std::path::Path,
) {
    live.lock().unwrap().remove(path);
    send(tx, ShipperCommand::EmitSingle { path: path.to_string_lossy().into_owned(), document: None });
    refresh_parent(http, project, live, tx, path);
}

/// Re-extracts and resubmits the parent directory's document, reflecting a
/// child-count change.
fn refresh_parent(
    http: &reqwest::blocking::Client,
    project: &ProjectConfig,
    live: &Arc<Mutex<Snapshot>>,
    tx: &Sender<ShipperCommand>,
    path: &std::path::Path,
) {
    let Some(parent) = path.parent() else { return };
    if parent == project.root_dir.parent().unwrap_or(parent) && !parent.exists() {
        return;
    }

    let entry_count = std::fs::read_dir(parent).map(Iterator::count).unwrap_or(0) as u64;
    let file_count = std::fs::read_dir(parent)
        .map(|entries| entries.filter_map(std::result::Result::ok).filter(|e| e.file_type().is_ok_and(|t| t.is_file())).count())
        .unwrap_or(0) as u64;

    match metadata::extract_dir(parent, project, entry_count, file_count) {
        Outcome::Document(doc) => {
            live.lock().unwrap().insert(parent.to_path_buf());
            send(tx, ShipperCommand::Submit(doc));
        }
        Outcome::Excluded | Outcome::Skipped => {
            let _ = http;
        }
    }
}

fn send(tx: &Sender<ShipperCommand>, command: ShipperCommand) {
    if tx.send(command).is_err() {
        warn!("shipper worker is gone, dropping event");
    }
}

/// Drains [`ShipperCommand`]s and applies them to `shipper`, until the
/// channel is disconnected (the [`ProjectWatcher`] was dropped) or
/// cancellation is observed between commands.
fn run_shipper_worker(mut shipper: Shipper, rx: crossbeam::channel::Receiver<ShipperCommand>, cancel: CancelToken) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        match rx.recv_timeout(Duration::from_millis(500)) {
            Ok(ShipperCommand::Submit(doc)) => {
                if let Err(err) = shipper.submit(doc) {
                    error!(error = %err, "failed to submit document");
                }
            }
            Ok(ShipperCommand::EmitSingle { path, document }) => {
                if let Err(err) = shipper.emit_single(&path, document.as_deref()) {
                    error!(error = %err, path, "failed to emit single document");
                }
            }
            Err(crossbeam::channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam::channel::RecvTimeoutError::Disconnected) => break,
        }
    }
    if let Err(err) = shipper.flush() {
        error!(error = %err, "failed to flush shipper on shutdown");
    }
}

/// Every [`RECONCILE_INTERVAL`], compares the live Snapshot against the
/// last-persisted one and writes through on divergence.
fn run_reconcile_loop(live: Arc<Mutex<Snapshot>>, snapshot_path: std::path::PathBuf, cancel: CancelToken) {
    let mut baseline = snapshot::load(&snapshot_path).unwrap_or_default();
    while cancel.sleep(RECONCILE_INTERVAL) {
        let current = live.lock().unwrap().clone();
        if current != baseline {
            if let Err(err) = snapshot::save(&snapshot_path, &current) {
                error!(error = %err, "failed to persist live snapshot");
                continue;
            }
            baseline = current;
            info!(path = %snapshot_path.display(), "persisted reconciled snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{project::RichMetadata, PathRules};

    fn project(root: &std::path::Path) -> ProjectConfig {
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
    fn s6_move_event_deletes_source_and_creates_destination() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();
        let dest = dir.path().join("b").join("x.txt");
        std::fs::write(&dest, b"hi").unwrap();

        let proj = project(dir.path());
        let live = Arc::new(Mutex::new(Snapshot::new()));
        live.lock().unwrap().insert(dir.path().join("a").join("x.txt"));

        let (tx, rx) = bounded(16);
        let http = reqwest::blocking::Client::new();

        handle_event(
            &http,
            &proj,
            &live,
            &tx,
            Event::Rename { from: dir.path().join("a").join("x.txt"), to: dest.clone() },
        );

        assert!(!live.lock().unwrap().contains(&dir.path().join("a").join("x.txt")));
        assert!(live.lock().unwrap().contains(&dest));

        let mut saw_delete = false;
        let mut saw_create = false;
        for command in rx.try_iter() {
            match command {
                ShipperCommand::EmitSingle { document: None, .. } => saw_delete = true,
                ShipperCommand::Submit(Document::File(doc)) if doc.header.path == dest => saw_create = true,
                _ => {}
            }
        }
        assert!(saw_delete, "expected a delete for the source path");
        assert!(saw_create, "expected a create for the destination path");
    }
}
