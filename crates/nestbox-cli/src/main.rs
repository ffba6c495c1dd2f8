//! # nestbox
//!
//! Runs one command inside fresh UTS, PID and mount namespaces, confined to
//! a substitute root filesystem and a pids cgroup.
//!
//! The binary plays both roles: `nestbox run` supervises, and the hidden
//! `nestbox child` entry point is what the supervisor re-executes inside
//! the new namespaces.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod commands;

use clap::Parser;
use nestbox_common::constants::{APP_NAME, LOG_FORMAT_ENV};
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;

#[allow(clippy::print_stderr)]
fn main() {
    init_tracing();

    let cli = Cli::parse();
    match commands::execute(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            tracing::error!(error = %err, "launch aborted");
            eprintln!("{APP_NAME}: {err:#}");
            std::process::exit(1);
        }
    }
}

/// Logs go to stderr so the contained command owns stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}
