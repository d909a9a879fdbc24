//! # cellc: cell image compiler
//!
//! Compiles component descriptors into Cell documents, binds them to
//! instances, and runs their test suites against a cluster.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

mod commands;
mod kubectl;
mod output;

use cellc_common::config::BuildConfig;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    let default_level = if BuildConfig::from_env().debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let cli = Cli::parse();
    commands::execute(cli)
}
