// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Dual-sink structured logging: a level-filtered console sink and a file
//! sink under the per-user data directory, both fed by the same records.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber, logging at `level` to both
/// stderr and `log_path`.
///
/// # Errors
///
/// Returns an error if the subscriber has already been installed (once per
/// process), surfaced to `main` as a non-fatal warning.
pub fn init(level: &str, log_path: &Path) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    let console = tracing_subscriber::fmt::layer().with_target(false);
    let file = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(FileMakeWriter(log_path.to_path_buf()));

    tracing_subscriber::registry().with(filter).with(console).with(file).try_init()
}

/// Opens `log_path` fresh on every write, appending. There's no
/// non-blocking file appender in this project's dependency stack, so this
/// accepts the per-write open cost in exchange for never holding a stale
/// file handle across a log rotation.
struct FileMakeWriter(PathBuf);

impl<'a> MakeWriter<'a> for FileMakeWriter {
    type Writer = File;

    fn make_writer(&'a self) -> Self::Writer {
        OpenOptions::new().create(true).append(true).open(&self.0).unwrap_or_else(|_| {
            // If the log directory vanished or permissions changed
            // mid-run, fall back to a writer that silently discards
            // records rather than panicking the logging layer.
            devnull()
        })
    }
}

fn devnull() -> File {
    #[cfg(unix)]
    {
        File::create("/dev/null").expect("/dev/null is always writable")
    }
    #[cfg(windows)]
    {
        File::create("NUL").expect("NUL is always writable")
    }
}
