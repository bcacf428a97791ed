// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Event handler.

use crossbeam::channel::{after, never, select_biased, Receiver};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::EventKind;
use std::mem;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::event::{Event, Kind};
use crate::monitor::Monitor;
use crate::Action;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Event handler.
///
/// Drives the monitor's event loop: multiplexes the control channel (watch /
/// unwatch requests), the raw backend event channel, and a debounce timer,
/// and forwards normalized [`Event`]s to the callback supplied to
/// [`crate::Agent::new`].
pub struct Handler {
    /// Action receiver.
    receiver: Receiver<Action>,
    /// Event callback.
    callback: Box<dyn FnMut(Result<Event>) -> Result + Send>,
    /// File system monitor.
    monitor: Monitor,
    /// Debounce timeout.
    timeout: Duration,
    /// Queued, already-normalized events awaiting flush.
    queue: Vec<Event>,
    /// Half of a rename pair still waiting for its counterpart.
    pending_rename: Option<PathBuf>,
}

impl Handler {
    /// Creates a new handler.
    pub fn new(
        receiver: Receiver<Action>,
        callback: Box<dyn FnMut(Result<Event>) -> Result + Send>,
        monitor: Monitor,
        timeout: Duration,
    ) -> Self {
        Self { receiver, callback, monitor, timeout, queue: Vec::new(), pending_rename: None }
    }

    /// Handles the next batch of messages, blocking for at most `timeout`
    /// when events are queued and waiting to be debounced.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn handle(&mut self) -> Result {
        let wait = (!self.queue.is_empty() || self.pending_rename.is_some()).then_some(self.timeout);

        select_biased! {
            // Handle requests to watch or unwatch a path.
            recv(self.receiver) -> message => {
                let res = match message? {
                    Action::Watch(path) => self.monitor.watch(&path),
                    Action::Unwatch(path) => self.monitor.unwatch(&path),
                };
                if let Err(err) = res {
                    (self.callback)(Err(err))?;
                }
            }

            // Handle a raw event from the watcher backend.
            recv(self.monitor.as_receiver()) -> message => {
                match message? {
                    Ok(event) => self.queue.extend(normalize(event, &mut self.pending_rename)),
                    Err(err) => (self.callback)(Err(err.into()))?,
                }
            }

            // Flush whatever has settled after the debounce window elapses.
            recv(wait.map_or_else(never, after)) -> _ => {
                if let Some(from) = self.pending_rename.take() {
                    self.queue.push(Event::Remove { path: from });
                }
                for event in mem::take(&mut self.queue) {
                    (self.callback)(Ok(event))?;
                }
            }
        }

        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Normalizes a raw [`notify::Event`] into zero or more [`Event`]s.
///
/// Only creation, modification, removal, and rename events are kept; access
/// and other informational events are dropped. Entry kind is derived from the
/// event itself, never from a subsequent restat of the path.
fn normalize(event: notify::Event, pending_rename: &mut Option<PathBuf>) -> Vec<Event> {
    let kind = to_kind(&event.kind);
    match event.kind {
        EventKind::Create(_) => event
            .paths
            .into_iter()
            .map(|path| Event::Create { kind, path })
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            if let [from, to] = &event.paths[..] {
                vec![Event::Rename { from: from.clone(), to: to.clone() }]
            } else {
                Vec::new()
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            if let Some(path) = event.paths.into_iter().next() {
                *pending_rename = Some(path);
            }
            Vec::new()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            match (pending_rename.take(), event.paths.into_iter().next()) {
                (Some(from), Some(to)) => vec![Event::Rename { from, to }],
                (None, Some(to)) => vec![Event::Create { kind, path: to }],
                _ => Vec::new(),
            }
        }
        EventKind::Modify(_) => event
            .paths
            .into_iter()
            .map(|path| Event::Modify { kind, path })
            .collect(),
        EventKind::Remove(_) => event
            .paths
            .into_iter()
            .map(|path| Event::Remove { path })
            .collect(),
        _ => Vec::new(),
    }
}

/// Maps a raw [`EventKind`] to our [`Kind`].
fn to_kind(kind: &EventKind) -> Kind {
    match kind {
        EventKind::Create(CreateKind::File) | EventKind::Remove(RemoveKind::File) => Kind::File,
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => {
            Kind::Directory
        }
        _ => Kind::Other,
    }
}
