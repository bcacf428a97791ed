// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Crawls project directories, extracts metadata, and ships it to a remote
//! index, then keeps the index in sync by watching for live filesystem
//! changes.

pub mod cancel;
pub mod cli;
pub mod client;
pub mod config;
pub mod crawler;
pub mod document;
pub mod error;
pub mod filter;
pub mod logging;
pub mod metadata;
pub mod paths;
pub mod queue;
pub mod registrar;
pub mod shipper;
pub mod snapshot;
pub mod supervisor;
pub mod watcher;

pub use cli::Cli;
pub use error::{Error, Result};
