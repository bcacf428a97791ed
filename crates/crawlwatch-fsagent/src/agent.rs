// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! File system agent.

use crossbeam::channel::{unbounded, Sender};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use std::{fmt, fs};

use crate::error::{Error, Result};
use crate::event::Event;
use crate::handler::Handler;
use crate::monitor::Monitor;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Action submitted to a running [`Agent`].
#[derive(Debug)]
pub enum Action {
    /// Start watching a path, recursively.
    Watch(PathBuf),
    /// Stop watching a path.
    Unwatch(PathBuf),
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// File system watching agent.
///
/// Owns a dedicated thread that drives a [`Monitor`] and forwards normalized
/// [`Event`]s to a user-supplied callback. The agent is watched over by the
/// caller's supervisor; dropping it disconnects the action channel, which
/// unwinds the thread on its next iteration.
pub struct Agent {
    /// Debounce timeout, kept for diagnostics.
    timeout: Duration,
    /// Action sender.
    sender: Sender<Action>,
    /// Join handle for the agent thread.
    thread: JoinHandle<Result>,
}

impl Agent {
    /// Spawns a file system agent, calling `callback` for every normalized
    /// event observed on a watched path.
    ///
    /// # Panics
    ///
    /// Panics if the underlying thread cannot be spawned, which can only
    /// happen under extreme resource exhaustion.
    pub fn new<F>(timeout: Duration, mut callback: F) -> Self
    where
        F: FnMut(Result<Event>) -> Result + Send + 'static,
    {
        let (sender, receiver) = unbounded();
        let run = move || -> Result {
            let monitor = Monitor::new()?;
            let mut handler = Handler::new(receiver, Box::new(move |e| callback(e)), monitor, timeout);
            loop {
                handler.handle()?;
            }
        };

        let thread = thread::Builder::new()
            .name(String::from("crawlwatch/fsagent"))
            .spawn(run)
            .expect("failed to spawn file system agent thread");

        Self { timeout, sender, thread }
    }

    /// Starts watching `path`, recursively.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disconnected`] if the agent thread has already
    /// terminated, or an I/O error if `path` cannot be canonicalized.
    pub fn watch<P>(&self, path: P) -> Result
    where
        P: AsRef<Path>,
    {
        self.sender
            .send(Action::Watch(fs::canonicalize(path)?))
            .map_err(|_| Error::Disconnected)
    }

    /// Stops watching `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disconnected`] if the agent thread has already
    /// terminated, or an I/O error if `path` cannot be canonicalized.
    pub fn unwatch<P>(&self, path: P) -> Result
    where
        P: AsRef<Path>,
    {
        self.sender
            .send(Action::Unwatch(fs::canonicalize(path)?))
            .map_err(|_| Error::Disconnected)
    }

    /// Returns whether the agent's thread has terminated.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.thread.is_finished()
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Agent")
            .field("timeout", &self.timeout)
            .field("pending", &self.sender.len())
            .finish_non_exhaustive()
    }
}
