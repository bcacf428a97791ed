// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Durable crawl work queue.
//!
//! There's no off-the-shelf persistent-queue crate in this project's
//! dependency stack, so this is a small hand-rolled FIFO: each enqueued
//! directory becomes one file under `queue_dir`, named by a monotonically
//! increasing sequence number so entries are always dequeued in the order
//! they were pushed. An entry is acknowledged by deleting its file. If the
//! process crashes mid-crawl, reopening the queue picks up every file still
//! on disk — already-acked (deleted) entries are never redone, un-acked ones
//! may be revisited, matching the durability contract.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};

/// A durable FIFO of directory paths awaiting a crawl visit.
pub struct WorkQueue {
    dir: PathBuf,
    next_seq: AtomicU64,
}

impl WorkQueue {
    /// Opens (or creates) a work queue rooted at `dir`.
    ///
    /// Any entry files already present (left over from a crash mid-crawl)
    /// remain pending and will be returned by [`WorkQueue::pop`].
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        let mut max_seq = 0;
        for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
            let entry = entry.map_err(|e| Error::io(dir, e))?;
            if let Some(seq) = parse_seq(&entry.file_name().to_string_lossy()) {
                max_seq = max_seq.max(seq);
            }
        }

        Ok(Self { dir: dir.to_path_buf(), next_seq: AtomicU64::new(max_seq + 1) })
    }

    /// Enqueues `path`, returning the sequence number assigned to it.
    pub fn push(&self, path: &Path) -> Result<u64> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let entry_path = self.entry_path(seq);
        let contents = path.to_string_lossy().into_owned();

        // Write-then-rename keeps a crash from leaving a half-written entry
        // file that would confuse the next `open`.
        let tmp = self.entry_path(seq).with_extension("tmp");
        fs::write(&tmp, contents).map_err(|e| Error::io(&tmp, e))?;
        fs::rename(&tmp, &entry_path).map_err(|e| Error::io(&entry_path, e))?;
        Ok(seq)
    }

    /// Returns the oldest pending entry, without acknowledging it.
    ///
    /// The caller must call [`WorkQueue::ack`] once the entry's work is
    /// fully submitted downstream, or the entry will be revisited on the
    /// next `open`.
    pub fn pop(&self) -> Result<Option<(u64, PathBuf)>> {
        let mut entries: Vec<(u64, PathBuf)> = fs::read_dir(&self.dir)
            .map_err(|e| Error::io(&self.dir, e))?
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                parse_seq(&name).map(|seq| (seq, entry.path()))
            })
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);

        let Some((seq, path)) = entries.into_iter().next() else { return Ok(None) };
        let text = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        Ok(Some((seq, PathBuf::from(text))))
    }

    /// Acknowledges `seq`, removing its entry file so it is never replayed.
    pub fn ack(&self, seq: u64) -> Result<()> {
        let path = self.entry_path(seq);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(&path, e)),
        }
    }

    /// Returns whether the queue has no pending entries.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.pop()?.is_none())
    }

    fn entry_path(&self, seq: u64) -> PathBuf {
        self.dir.join(format!("{seq:020}.entry"))
    }
}

fn parse_seq(file_name: &str) -> Option<u64> {
    file_name.strip_suffix(".entry")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_pop_is_fifo() {
        let dir = tempfile::tempdir().unwrap();
        let queue = WorkQueue::open(dir.path()).unwrap();
        queue.push(Path::new("/r/a")).unwrap();
        queue.push(Path::new("/r/b")).unwrap();

        let (seq1, path1) = queue.pop().unwrap().unwrap();
        assert_eq!(path1, PathBuf::from("/r/a"));
        queue.ack(seq1).unwrap();

        let (_, path2) = queue.pop().unwrap().unwrap();
        assert_eq!(path2, PathBuf::from("/r/b"));
    }

    #[test]
    fn unacked_entry_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let queue = WorkQueue::open(dir.path()).unwrap();
            queue.push(Path::new("/r/a")).unwrap();
        }
        let queue = WorkQueue::open(dir.path()).unwrap();
        let (_, path) = queue.pop().unwrap().unwrap();
        assert_eq!(path, PathBuf::from("/r/a"));
    }

    #[test]
    fn acked_entry_does_not_reappear() {
        let dir = tempfile::tempdir().unwrap();
        let queue = WorkQueue::open(dir.path()).unwrap();
        let (seq, _) = {
            queue.push(Path::new("/r/a")).unwrap();
            queue.pop().unwrap().unwrap()
        };
        queue.ack(seq).unwrap();
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn new_queue_after_crash_continues_sequence() {
        let dir = tempfile::tempdir().unwrap();
        {
            let queue = WorkQueue::open(dir.path()).unwrap();
            let seq = queue.push(Path::new("/r/a")).unwrap();
            queue.ack(seq).unwrap();
            queue.push(Path::new("/r/b")).unwrap();
        }
        let queue = WorkQueue::open(dir.path()).unwrap();
        let (_, path) = queue.pop().unwrap().unwrap();
        assert_eq!(path, PathBuf::from("/r/b"));
    }
}
