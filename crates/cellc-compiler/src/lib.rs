//! # cellc-compiler
//!
//! Compiles a cell descriptor into the Cell document and its side
//! artifacts.
//!
//! Handles:
//! - **Assembly**: descriptor to validated `CellImage`, local image builds.
//! - **Generator**: gateway type selection, service and STS templates.
//! - **Reference**: endpoint placeholders for dependent images.
//! - **Metadata**: image summary for the instantiation tooling.
//! - **Graph**: component-to-component dependency validation.
//! - **Instance**: placeholder substitution at instantiation time.
//! - **Test cells**: job cells running the test suite.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod assemble;
pub mod generator;
pub mod graph;
pub mod instance;
pub mod metadata;
pub mod reference;
pub mod spec;
pub mod test_cell;

use std::path::PathBuf;

use cellc_common::error::Result;
use cellc_common::types::ImageName;
use cellc_image::builder::{DockerCli, ImageBuilder};
use cellc_model::descriptor::CellDescriptor;
use cellc_model::image::CellImage;

use crate::metadata::MetadataDocument;
use crate::reference::ReferenceDocument;
use crate::spec::Cell;

/// Every artifact of one successful compilation.
#[derive(Debug, Clone)]
pub struct Compilation {
    /// The image model the artifacts were derived from.
    pub image: CellImage,
    /// The composite Cell document.
    pub cell: Cell,
    /// Endpoint placeholders for dependent images.
    pub reference: ReferenceDocument,
    /// Image summary for the instantiation tooling.
    pub metadata: MetadataDocument,
    /// Files to ship next to the artifacts.
    pub resources: Vec<PathBuf>,
    /// One job cell per test.
    pub tests: Vec<Cell>,
}

/// Compiles descriptors, building local images with the given builder.
pub struct Compiler<'a> {
    builder: &'a dyn ImageBuilder,
}

impl<'a> Compiler<'a> {
    /// Creates a compiler using `builder` for local image sources.
    pub fn new(builder: &'a dyn ImageBuilder) -> Self {
        Self { builder }
    }

    /// Compiles `descriptor` as image `identity`.
    ///
    /// Nothing is returned unless every artifact could be produced.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid descriptor (including an
    /// image mixing autoscaling and zero-scaling components), or the
    /// first image build failure.
    pub fn compile(&self, descriptor: &CellDescriptor, identity: ImageName) -> Result<Compilation> {
        let assembly = assemble::assemble(descriptor, identity, self.builder)?;
        let image = assembly.image;

        let cell = Cell::new(generator::cell_metadata(&image)?, generator::generate(&image));
        let reference = reference::emit_reference(&image);
        let metadata = metadata::emit_metadata(&image);
        let tests = image
            .test
            .as_ref()
            .map(|suite| test_cell::test_cells(&image.identity, suite))
            .unwrap_or_default();

        tracing::info!(
            image = %image.identity,
            cell = %cell.metadata.name,
            exposed = image.exposed.len(),
            "compilation complete"
        );
        Ok(Compilation {
            image,
            cell,
            reference,
            metadata,
            resources: assembly.resources,
            tests,
        })
    }
}

/// Compiles `descriptor` as image `identity`, building local images
/// with the `docker` command line tool.
///
/// # Errors
///
/// See [`Compiler::compile`].
pub fn compile(descriptor: &CellDescriptor, identity: ImageName) -> Result<Compilation> {
    Compiler::new(&DockerCli).compile(descriptor, identity)
}
