//! Turning a built Cell into a runnable instance.
//!
//! Every `{{instance_name}}` token becomes the instance name and every
//! `{{alias}}` token becomes the name of the instance linked to that
//! dependency alias.

use std::collections::BTreeMap;

use cellc_common::constants::{ANNOTATION_CELL_DEPENDENCIES, INSTANCE_NAME_PLACEHOLDER};
use cellc_common::error::{CellError, Result};
use cellc_model::dependency::Dependency;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::spec::Cell;

/// A dependency annotation entry bound to a running instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedDependency {
    /// The declared dependency.
    #[serde(flatten)]
    pub dependency: Dependency,
    /// Instance satisfying it.
    pub instance_name: String,
}

/// Produces the Cell of instance `instance`, with dependency aliases
/// bound through `links` (alias → instance name).
///
/// # Errors
///
/// Returns a validation error if the instance name is empty or a declared
/// dependency alias has no linked instance.
pub fn instantiate(cell: &Cell, instance: &str, links: &BTreeMap<String, String>) -> Result<Cell> {
    if instance.trim().is_empty() {
        return Err(CellError::validation("instance name must not be empty"));
    }

    let dependencies: Vec<Dependency> = cell
        .metadata
        .annotations
        .get(ANNOTATION_CELL_DEPENDENCIES)
        .map(|raw| serde_json::from_str(raw))
        .transpose()?
        .unwrap_or_default();

    let mut linked = Vec::with_capacity(dependencies.len());
    let mut substitutions = vec![(INSTANCE_NAME_PLACEHOLDER.to_string(), instance.to_string())];
    for dependency in dependencies {
        let Some(target) = links.get(&dependency.alias) else {
            return Err(CellError::validation(format!(
                "no instance linked for dependency alias \"{}\" ({}/{}:{})",
                dependency.alias, dependency.org, dependency.name, dependency.ver
            )));
        };
        substitutions.push((format!("{{{{{}}}}}", dependency.alias), target.clone()));
        linked.push(LinkedDependency {
            dependency,
            instance_name: target.clone(),
        });
    }
    for alias in links.keys() {
        if !linked.iter().any(|l| &l.dependency.alias == alias) {
            tracing::warn!(alias, "link does not match any dependency, ignoring");
        }
    }

    let mut value = serde_json::to_value(cell)?;
    substitute(&mut value, &substitutions);
    let mut instantiated: Cell = serde_json::from_value(value)?;
    instantiated.metadata.name = instance.to_string();
    let _ = instantiated.metadata.annotations.insert(
        ANNOTATION_CELL_DEPENDENCIES.to_string(),
        serde_json::to_string(&linked)?,
    );
    tracing::info!(instance, dependencies = linked.len(), "instantiated cell");
    Ok(instantiated)
}

/// Replaces tokens in every string of `value`.
fn substitute(value: &mut Value, substitutions: &[(String, String)]) {
    match value {
        Value::String(text) => {
            for (token, replacement) in substitutions {
                if text.contains(token.as_str()) {
                    *text = text.replace(token.as_str(), replacement);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                substitute(item, substitutions);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                substitute(item, substitutions);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
