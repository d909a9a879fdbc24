//! CLI command definitions and dispatch.

pub mod build;
pub mod inspect;
pub mod instantiate;
pub mod test;

use std::path::{Path, PathBuf};

use anyhow::Context;
use cellc_common::config::{BuildConfig, TARGET_DIR_ENV};
use cellc_common::constants::DEFAULT_OUTPUT_DIR;
use cellc_common::types::ImageName;
use cellc_model::dependency::parse_image_name;
use cellc_model::descriptor::CellDescriptor;
use clap::{Parser, Subcommand};

/// cellc: compiles component descriptors into cell images.
#[derive(Parser, Debug)]
#[command(name = "cellc", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Root directory of the build output.
    #[arg(long, global = true, env = TARGET_DIR_ENV, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a descriptor and write the Cell, reference, and metadata documents.
    Build(build::BuildArgs),
    /// Show the gateway, services, and start order a descriptor compiles to.
    Inspect(inspect::InspectArgs),
    /// Bind a compiled Cell to an instance name and its dependency instances.
    Instantiate(instantiate::InstantiateArgs),
    /// Compile a descriptor and run its test suite on the cluster.
    Test(test::TestArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = BuildConfig::new(cli.output_dir);
    match cli.command {
        Command::Build(args) => build::execute(args, &config),
        Command::Inspect(args) => inspect::execute(args),
        Command::Instantiate(args) => instantiate::execute(args),
        Command::Test(args) => test::execute(args, &config),
    }
}

/// Reads a descriptor, as JSON for a `.json` file and as YAML otherwise.
fn load_descriptor(path: &Path) -> anyhow::Result<CellDescriptor> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read descriptor {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let descriptor = if is_json {
        CellDescriptor::from_json(&content)?
    } else {
        CellDescriptor::from_yaml(&content)?
    };
    tracing::debug!(
        path = %path.display(),
        components = descriptor.components.len(),
        "loaded descriptor"
    );
    Ok(descriptor)
}

/// Parses `org/name:version` from the command line.
fn parse_identity(text: &str) -> Result<ImageName, String> {
    parse_image_name(text).map_err(|e| e.to_string())
}
