// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

use clap::Parser;
use crawlwatch::{cli::Cli, paths, supervisor};

fn main() {
    let cli = Cli::parse();

    let level = cli.loglevel.clone().unwrap_or_else(|| "info".to_string());
    if let Err(err) = crawlwatch::logging::init(&level, &paths::log_path()) {
        eprintln!("warning: failed to initialize logging: {err}");
    }

    if let Err(err) = supervisor::run(&cli) {
        eprintln!("crawlwatch: {err:#}");
        std::process::exit(1);
    }
}
