//! `cellc test`: Run the test suite of a cell image on the cluster.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cellc_common::config::BuildConfig;
use cellc_common::types::ImageName;
use cellc_compiler::Compiler;
use cellc_image::builder::{DockerCli, ImageBuilder, SkipBuild};
use clap::Args;

use crate::kubectl::{Kubectl, TestOutcome, TestRunner, TestTarget};
use crate::output::ArtifactWriter;

/// Arguments for the `test` command.
#[derive(Args, Debug)]
pub struct TestArgs {
    /// Path to the component descriptor.
    #[arg(default_value = "cell.yaml")]
    pub descriptor: PathBuf,

    /// Image identity as `org/name:version`.
    #[arg(short, long, value_parser = super::parse_identity)]
    pub image: ImageName,

    /// Directory receiving one log file per test.
    #[arg(long, default_value = "logs")]
    pub logs_dir: PathBuf,

    /// Do not build components sourced from a local directory.
    #[arg(long)]
    pub skip_image_build: bool,
}

/// Executes the `test` command.
///
/// Compiles the descriptor, writes one Cell per test, and runs them one
/// at a time. Ctrl+C stops waiting and deletes the running test cell.
///
/// # Errors
///
/// Returns an error if compilation fails, `kubectl` is unavailable, the
/// cluster cannot be reached, or any test fails.
pub fn execute(args: TestArgs, config: &BuildConfig) -> anyhow::Result<()> {
    let descriptor = super::load_descriptor(&args.descriptor)?;
    let builder: &dyn ImageBuilder = if args.skip_image_build {
        &SkipBuild
    } else {
        &DockerCli
    };
    let compilation = Compiler::new(builder).compile(&descriptor, args.image)?;
    if compilation.tests.is_empty() {
        println!("No tests defined for {}.", compilation.image.identity);
        return Ok(());
    }

    let paths = ArtifactWriter::new(config).write_tests(&compilation.tests)?;
    let targets: Vec<TestTarget> = compilation
        .tests
        .iter()
        .zip(paths)
        .map(|(cell, path)| TestTarget {
            cell: cell.metadata.name.clone(),
            service: cell
                .spec
                .services_templates
                .first()
                .map_or_else(|| cell.metadata.name.clone(), |t| t.metadata.name.clone()),
            path,
        })
        .collect();

    let kubectl = Kubectl::locate()?;
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    let runner = TestRunner::new(&kubectl, running.clone(), &args.logs_dir);
    let mut failed = Vec::new();
    for target in &targets {
        println!("Running test {} ...", target.cell);
        let outcome = runner.run(target)?;
        match &outcome {
            TestOutcome::Passed => println!("  {} passed", target.cell),
            TestOutcome::Failed => {
                println!("  {} FAILED", target.cell);
                failed.push(target.cell.clone());
            }
            TestOutcome::Skipped(reason) => println!("  {} skipped: {reason}", target.cell),
            TestOutcome::Cancelled => {
                println!("  {} cancelled", target.cell);
                break;
            }
        }
    }

    println!("Logs saved to {}", args.logs_dir.display());
    if !running.load(Ordering::SeqCst) {
        anyhow::bail!("test run interrupted");
    }
    if !failed.is_empty() {
        anyhow::bail!("{} test(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}
