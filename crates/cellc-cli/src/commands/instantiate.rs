//! `cellc instantiate`: Bind a compiled Cell to an instance.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use cellc_compiler::instance::instantiate;
use cellc_compiler::spec::Cell;
use clap::Args;

use crate::output::write_cell;

/// Arguments for the `instantiate` command.
#[derive(Args, Debug)]
pub struct InstantiateArgs {
    /// Path to a Cell document produced by `cellc build`.
    pub cell: PathBuf,

    /// Name of the instance to create.
    #[arg(short = 'n', long)]
    pub instance: String,

    /// Dependency binding as `alias=instance`. Repeat for each dependency.
    #[arg(short, long = "link", value_parser = parse_link)]
    pub links: Vec<(String, String)>,

    /// Write the instance document to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Executes the `instantiate` command.
///
/// # Errors
///
/// Returns an error if the Cell document cannot be read, a declared
/// dependency has no link, or the output cannot be written.
pub fn execute(args: InstantiateArgs) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&args.cell)
        .with_context(|| format!("failed to read cell {}", args.cell.display()))?;
    let cell = Cell::from_yaml(&content)?;

    let mut links = BTreeMap::new();
    for (alias, instance) in args.links {
        if let Some(previous) = links.insert(alias.clone(), instance) {
            tracing::warn!(alias = %alias, previous = %previous, "dependency linked twice, last link wins");
        }
    }

    let instance = instantiate(&cell, &args.instance, &links)?;
    tracing::info!(instance = %args.instance, links = links.len(), "cell instantiated");

    if let Some(ref out_path) = args.output {
        write_cell(out_path, &instance)?;
        println!("Instantiated {} -> {}", args.instance, out_path.display());
    } else {
        print!("{}", instance.to_yaml()?);
    }
    Ok(())
}

/// Parses `alias=instance`.
fn parse_link(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((alias, instance)) if !alias.trim().is_empty() && !instance.trim().is_empty() => {
            Ok((alias.trim().to_string(), instance.trim().to_string()))
        }
        _ => Err(format!("expected <alias>=<instance>, received {text}")),
    }
}
