//! `cellc build`: Compile a descriptor into a cell image.

use std::path::PathBuf;

use cellc_common::config::BuildConfig;
use cellc_common::types::ImageName;
use cellc_compiler::Compiler;
use cellc_image::builder::{DockerCli, ImageBuilder, SkipBuild};
use clap::Args;

use crate::output::ArtifactWriter;

/// Arguments for the `build` command.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Path to the component descriptor (YAML, or JSON with a `.json` extension).
    #[arg(default_value = "cell.yaml")]
    pub descriptor: PathBuf,

    /// Image identity as `org/name:version`.
    #[arg(short, long, value_parser = super::parse_identity)]
    pub image: ImageName,

    /// Do not build components sourced from a local directory.
    #[arg(long)]
    pub skip_image_build: bool,
}

/// Executes the `build` command.
///
/// Compiles the descriptor, building local images with `docker`, and
/// writes every artifact under the output directory.
///
/// # Errors
///
/// Returns an error if the descriptor is invalid, an image build fails,
/// or an artifact cannot be written.
pub fn execute(args: BuildArgs, config: &BuildConfig) -> anyhow::Result<()> {
    tracing::info!(
        descriptor = %args.descriptor.display(),
        image = %args.image,
        "building cell image"
    );
    let descriptor = super::load_descriptor(&args.descriptor)?;
    let builder: &dyn ImageBuilder = if args.skip_image_build {
        &SkipBuild
    } else {
        &DockerCli
    };
    let compilation = Compiler::new(builder).compile(&descriptor, args.image)?;
    let written = ArtifactWriter::new(config).write(&compilation)?;

    println!("Built cell image {}", compilation.image.identity);
    println!("  cell:      {}", written.cell.display());
    println!("  metadata:  {}", written.metadata.display());
    println!("  reference: {}", written.reference.display());
    for resource in &written.resources {
        println!("  resource:  {}", resource.display());
    }
    for test in &written.tests {
        println!("  test:      {}", test.display());
    }
    for image in &compilation.image.docker_images {
        println!("  docker:    {image}");
    }
    Ok(())
}
