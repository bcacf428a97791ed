// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Error types.

use crossbeam::channel::RecvError;

// ----------------------------------------------------------------------------
// Types
// ----------------------------------------------------------------------------

/// Result type, with the crate's [`Error`] as the default error type.
pub type Result<T = (), E = Error> = std::result::Result<T, E>;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Notify backend error.
    #[error(transparent)]
    Notify(#[from] notify::Error),

    /// Channel disconnected.
    #[error("channel disconnected")]
    Disconnected,
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl From<RecvError> for Error {
    fn from(_: RecvError) -> Self {
        Self::Disconnected
    }
}
