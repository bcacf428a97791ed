// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Cooperative shutdown signal, observed by every suspension point that can
//! block for a meaningful amount of time.

use crossbeam::channel::{after, select, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A cooperative cancellation token.
///
/// Cloning shares the same underlying signal; calling [`CancelToken::cancel`]
/// on any clone wakes every holder blocked in [`CancelToken::sleep`]. Only
/// one clone actually owns the sending half (shared via `Arc<Mutex<..>>`),
/// so cancellation — dropping that single sender — disconnects the channel
/// for every cloned receiver at once.
#[derive(Clone)]
pub struct CancelToken {
    sender: Arc<Mutex<Option<Sender<()>>>>,
    receiver: Receiver<()>,
}

impl CancelToken {
    /// Creates a new, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam::channel::bounded(0);
        Self { sender: Arc::new(Mutex::new(Some(sender))), receiver }
    }

    /// Signals cancellation to every clone of this token.
    pub fn cancel(&self) {
        // Taking and dropping the one shared sender closes the channel for
        // every receiver clone. Subsequent calls are harmless no-ops.
        self.sender.lock().unwrap().take();
    }

    /// Returns whether cancellation has been signaled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.receiver.try_recv() == Err(crossbeam::channel::TryRecvError::Disconnected)
    }

    /// Sleeps for `duration`, or until cancellation is signaled, whichever
    /// comes first. Returns `true` if the sleep ran to completion, `false`
    /// if it was interrupted by cancellation.
    #[must_use]
    pub fn sleep(&self, duration: Duration) -> bool {
        select! {
            recv(self.receiver) -> _ => false,
            recv(after(duration)) -> _ => true,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_completes_without_cancellation() {
        let token = CancelToken::new();
        assert!(token.sleep(Duration::from_millis(10)));
    }

    #[test]
    fn cancel_interrupts_sleep() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = std::thread::spawn(move || waiter.sleep(Duration::from_secs(5)));
        std::thread::sleep(Duration::from_millis(20));
        token.cancel();
        assert!(!handle.join().unwrap());
    }

    #[test]
    fn is_cancelled_reflects_state() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }
}
