//! Build output configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    CELLERY_DIR, DEFAULT_OUTPUT_DIR, METADATA_FILE_NAME, REF_DIR, REFERENCE_FILE_NAME,
    RESOURCES_DIR, YAML_EXTENSION,
};

/// Environment variable overriding the output directory.
pub const TARGET_DIR_ENV: &str = "CELLC_TARGET_DIR";
/// Environment variable enabling debug output.
pub const DEBUG_MODE_ENV: &str = "DEBUG_MODE";

/// Where and how build artifacts are produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Root of the build output tree.
    pub output_dir: PathBuf,
    /// Whether debug output was requested.
    pub debug: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            debug: false,
        }
    }
}

impl BuildConfig {
    /// Creates a configuration rooted at `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Reads overrides from `CELLC_TARGET_DIR` and `DEBUG_MODE`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var(TARGET_DIR_ENV) {
            if !dir.is_empty() {
                config.output_dir = PathBuf::from(dir);
            }
        }
        config.debug = std::env::var(DEBUG_MODE_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("true"));
        config
    }

    /// Path of the composite Cell document for `cell_name`.
    #[must_use]
    pub fn cell_path(&self, cell_name: &str) -> PathBuf {
        self.cellery_dir()
            .join(format!("{cell_name}{YAML_EXTENSION}"))
    }

    /// Path of the metadata descriptor.
    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.cellery_dir().join(METADATA_FILE_NAME)
    }

    /// Path of the reference document.
    #[must_use]
    pub fn reference_path(&self) -> PathBuf {
        self.output_dir.join(REF_DIR).join(REFERENCE_FILE_NAME)
    }

    /// Directory receiving copied resource files.
    #[must_use]
    pub fn resources_dir(&self) -> PathBuf {
        self.output_dir.join(RESOURCES_DIR)
    }

    fn cellery_dir(&self) -> PathBuf {
        self.output_dir.join(CELLERY_DIR)
    }

    /// Returns the output root.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}
