//! Domain primitive types used across the cellc workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CellError, Result};

/// Identity of a cell image: organization, name, and version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageName {
    /// Owning organization.
    pub org: String,
    /// Image name.
    pub name: String,
    /// Image version.
    #[serde(rename = "ver")]
    pub version: String,
}

impl ImageName {
    /// Creates an identity from its three parts.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name is empty; the resource
    /// name derived from it would be empty too.
    pub fn new(
        org: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CellError::validation("cell image name must not be empty"));
        }
        Ok(Self {
            org: org.into(),
            name,
            version: version.into(),
        })
    }

    /// Returns the image name as a valid resource name.
    #[must_use]
    pub fn resource_name(&self) -> String {
        valid_name(&self.name)
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.org, self.name, self.version)
    }
}

/// Lowercases `name` and replaces every non-alphanumeric character with `-`.
#[must_use]
pub fn valid_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}
