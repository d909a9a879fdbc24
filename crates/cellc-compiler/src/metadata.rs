//! The metadata document read by the instantiation tooling.

use std::collections::{BTreeMap, BTreeSet};

use cellc_common::error::Result;
use cellc_model::dependency::Dependency;
use cellc_model::image::CellImage;
use serde::{Deserialize, Serialize};

/// Contents of `metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDocument {
    /// Organization.
    pub org: String,
    /// Image name.
    pub name: String,
    /// Image version.
    pub ver: String,
    /// Locally built container images.
    pub docker_images: Vec<String>,
    /// Whether a component scales to zero.
    pub zero_scaling: bool,
    /// Whether a component autoscales on metrics.
    pub auto_scaling: bool,
    /// Labels of all components; a later component wins on conflict.
    pub labels: BTreeMap<String, String>,
    /// Cell dependencies keyed by alias.
    pub dependencies: BTreeMap<String, Dependency>,
    /// Component → components it calls.
    pub component_dep: BTreeMap<String, Vec<String>>,
    /// Components reachable through the gateway.
    pub exposed: BTreeSet<String>,
}

impl MetadataDocument {
    /// Renders the document as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builds the metadata document of `image`.
pub fn emit_metadata(image: &CellImage) -> MetadataDocument {
    let mut labels = BTreeMap::new();
    let mut component_dep = BTreeMap::new();
    for component in image.components() {
        labels.extend(
            component
                .labels
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        if !component.depends_on.is_empty() {
            let _ = component_dep.insert(component.name.clone(), component.depends_on.clone());
        }
    }
    MetadataDocument {
        org: image.identity.org.clone(),
        name: image.identity.name.clone(),
        ver: image.identity.version.clone(),
        docker_images: image.docker_images.clone(),
        zero_scaling: image.zero_scaling,
        auto_scaling: image.auto_scaling,
        labels,
        dependencies: image.dependencies.aliases.clone(),
        component_dep,
        exposed: image.exposed.clone(),
    }
}
