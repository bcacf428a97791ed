// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! File system monitor.

use crossbeam::channel::{unbounded, Receiver, Sender};
use notify::{Config, EventHandler, RecommendedWatcher, RecursiveMode, Watcher, WatcherKind};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Forwards raw notify events into a crossbeam channel.
struct Forwarder(Sender<notify::Result<notify::Event>>);

impl EventHandler for Forwarder {
    fn handle_event(&mut self, event: notify::Result<notify::Event>) {
        // The receiving end is only ever dropped together with the monitor
        // itself, at which point there's nothing left to forward to.
        let _ = self.0.send(event);
    }
}

/// File system monitor.
///
/// Wraps a [`RecommendedWatcher`] and keeps track of which paths are actively
/// watched versus merely covered by an ancestor's recursive watch, so we
/// never register the same subtree with the backend twice.
pub struct Monitor {
    /// Underlying notify watcher.
    watcher: RecommendedWatcher,
    /// Backend kind, used to work around backend-specific quirks.
    kind: WatcherKind,
    /// Paths we've been asked to watch, mapped to whether they are actively
    /// registered with the backend (`true`) or only covered by a parent
    /// (`false`).
    paths: BTreeMap<PathBuf, bool>,
    /// Receiving end of the forwarding channel.
    receiver: Receiver<notify::Result<notify::Event>>,
}

impl Monitor {
    /// Creates a new file system monitor.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform watcher backend fails to initialize.
    pub fn new() -> Result<Self> {
        let (sender, receiver) = unbounded();
        let watcher = RecommendedWatcher::new(
            Forwarder(sender),
            Config::default().with_follow_symlinks(false),
        )?;
        let kind = RecommendedWatcher::kind();
        Ok(Self { watcher, kind, paths: BTreeMap::new(), receiver })
    }

    /// Returns the receiving end of the event channel.
    #[must_use]
    pub fn as_receiver(&self) -> &Receiver<notify::Result<notify::Event>> {
        &self.receiver
    }

    /// Starts watching the given path, recursively.
    ///
    /// If the path is already covered by an ancestor that's actively watched,
    /// this only records the path, without registering it with the backend.
    pub fn watch(&mut self, path: &Path) -> Result {
        if self.is_covered(path) {
            self.paths.insert(path.to_path_buf(), false);
            return Ok(());
        }
        self.watcher.watch(path, RecursiveMode::Recursive)?;
        self.paths.insert(path.to_path_buf(), true);
        Ok(())
    }

    /// Stops watching the given path.
    pub fn unwatch(&mut self, path: &Path) -> Result {
        if self.paths.remove(path) == Some(true) {
            let res = self.watcher.unwatch(path);
            // Some backends, most notably kqueue, return an error when the
            // watched path no longer exists, which is the common case for an
            // unwatch following a deletion, so we swallow it here.
            if let Err(err) = res {
                if self.kind != WatcherKind::Kqueue {
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }

    /// Returns whether `path` is already covered by an actively watched
    /// ancestor.
    fn is_covered(&self, path: &Path) -> bool {
        self.paths
            .iter()
            .any(|(watched, &active)| active && watched != path && path.starts_with(watched))
    }
}
