//! Writing compilation artifacts to the build output tree.

use std::fs;
use std::path::{Path, PathBuf};

use cellc_common::config::BuildConfig;
use cellc_common::error::{CellError, Result};
use cellc_compiler::Compilation;
use cellc_compiler::spec::Cell;

/// Paths of everything one build wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrittenArtifacts {
    /// The composite Cell document.
    pub cell: PathBuf,
    /// The metadata descriptor.
    pub metadata: PathBuf,
    /// The reference document.
    pub reference: PathBuf,
    /// Copied resource files.
    pub resources: Vec<PathBuf>,
    /// One Cell document per test.
    pub tests: Vec<PathBuf>,
}

/// Lays out artifacts under a [`BuildConfig`] output root.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactWriter<'a> {
    config: &'a BuildConfig,
}

impl<'a> ArtifactWriter<'a> {
    /// Creates a writer rooted at `config`.
    pub const fn new(config: &'a BuildConfig) -> Self {
        Self { config }
    }

    /// Writes every artifact of `compilation`.
    ///
    /// # Errors
    ///
    /// Returns an error if a document cannot be serialized or a file
    /// cannot be written or copied.
    pub fn write(&self, compilation: &Compilation) -> Result<WrittenArtifacts> {
        let cell = self.config.cell_path(&compilation.image.identity.name);
        write_cell(&cell, &compilation.cell)?;

        let metadata = self.config.metadata_path();
        write_file(&metadata, &compilation.metadata.to_json()?)?;

        let reference = self.config.reference_path();
        write_file(&reference, &compilation.reference.to_json()?)?;

        let resources = self.copy_resources(&compilation.resources)?;
        let tests = self.write_tests(&compilation.tests)?;

        tracing::info!(output = %self.config.output_dir().display(), "artifacts written");
        Ok(WrittenArtifacts {
            cell,
            metadata,
            reference,
            resources,
            tests,
        })
    }

    /// Writes one Cell document per test cell.
    ///
    /// # Errors
    ///
    /// Returns an error if a document cannot be written.
    pub fn write_tests(&self, tests: &[Cell]) -> Result<Vec<PathBuf>> {
        tests
            .iter()
            .map(|cell| {
                let path = self.config.cell_path(&cell.metadata.name);
                write_cell(&path, cell)?;
                Ok(path)
            })
            .collect()
    }

    fn copy_resources(&self, resources: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let dir = self.config.resources_dir();
        let mut copied = Vec::with_capacity(resources.len());
        for source in resources {
            let Some(file_name) = source.file_name() else {
                return Err(CellError::NotFound {
                    kind: "resource file",
                    id: source.display().to_string(),
                });
            };
            let target = dir.join(file_name);
            create_parent(&target)?;
            let _ = fs::copy(source, &target).map_err(|e| io_error(source, e))?;
            tracing::debug!(from = %source.display(), to = %target.display(), "copied resource");
            copied.push(target);
        }
        Ok(copied)
    }
}

/// Writes `cell` as YAML to `path`.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_cell(path: &Path, cell: &Cell) -> Result<()> {
    write_file(path, &cell.to_yaml()?)
}

/// Writes `contents` to `path`, creating missing parent directories.
///
/// # Errors
///
/// Returns [`CellError::Io`] if a directory or the file cannot be written.
pub fn write_file(path: &Path, contents: &str) -> Result<()> {
    create_parent(path)?;
    fs::write(path, contents).map_err(|e| io_error(path, e))?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))
        }
        _ => Ok(()),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CellError {
    CellError::Io {
        path: path.to_path_buf(),
        source,
    }
}
