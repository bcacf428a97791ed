// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Channel-based wrapper around [`notify`] for resilient directory watching.
//!
//! This crate provides [`Agent`], a small thread that owns a platform file
//! system watcher and forwards normalized [`Event`]s to a callback. It never
//! follows symlinks, and never re-derives an entry's kind by restating a
//! path after the fact; everything it reports comes straight off the
//! underlying backend event.

mod agent;
mod error;
mod event;
mod handler;
mod monitor;

pub use agent::{Action, Agent};
pub use error::{Error, Result};
pub use event::{Event, Kind};
pub use monitor::Monitor;

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::{after, select};
    use std::fs;
    use std::time::Duration;

    #[test]
    fn watch_reports_file_creation() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = crossbeam::channel::unbounded();

        let agent = Agent::new(Duration::from_millis(50), move |event| {
            tx.send(event).ok();
            Ok(())
        });
        agent.watch(dir.path()).unwrap();

        fs::write(dir.path().join("hello.txt"), b"hi").unwrap();

        let mut saw_create = false;
        for _ in 0..20 {
            select! {
                recv(rx) -> event => {
                    if let Ok(Ok(Event::Create { path, .. })) = event {
                        if path == dir.path().join("hello.txt") {
                            saw_create = true;
                            break;
                        }
                    }
                }
                recv(after(Duration::from_millis(200))) -> _ => break,
            }
        }
        assert!(saw_create, "expected a create event for the new file");
    }

    #[test]
    fn unwatch_stops_reporting_events() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = crossbeam::channel::unbounded();

        let agent = Agent::new(Duration::from_millis(50), move |event| {
            tx.send(event).ok();
            Ok(())
        });
        agent.watch(dir.path()).unwrap();
        agent.unwatch(dir.path()).unwrap();

        // Give the handler a moment to process the unwatch before we act.
        std::thread::sleep(Duration::from_millis(100));
        fs::write(dir.path().join("after-unwatch.txt"), b"hi").unwrap();

        let mut saw_event = false;
        select! {
            recv(rx) -> _ => saw_event = true,
            recv(after(Duration::from_millis(300))) -> _ => {}
        }
        assert!(!saw_event, "no event should be reported after unwatch");
    }

    #[test]
    fn is_terminated_reflects_dropped_agent() {
        let agent = Agent::new(Duration::from_millis(50), |_| Ok(()));
        assert!(!agent.is_terminated());
    }
}
