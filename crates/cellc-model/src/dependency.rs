//! Cell image dependencies and alias resolution.
//!
//! A dependency is declared either as the shorthand `org/name:version` or
//! as a structured `{org, name, ver}` record, keyed by the alias the
//! dependent component uses in its environment templates.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use cellc_common::error::{CellError, Result};
use cellc_common::types::ImageName;
use nom::{
    IResult, Parser,
    bytes::complete::take_till,
    character::complete::char,
};
use serde::{Deserialize, Serialize};

/// A dependency as declared, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyDescriptor {
    /// `org/name:version`.
    Shorthand(String),
    /// Explicit coordinates.
    Structured {
        /// Organization.
        org: String,
        /// Image name.
        name: String,
        /// Image version.
        ver: String,
    },
}

/// A resolved dependency on another cell image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Organization.
    pub org: String,
    /// Image name.
    pub name: String,
    /// Image version.
    pub ver: String,
    /// Alias used by the dependent components.
    pub alias: String,
}

impl Dependency {
    /// Resolves a declared dependency under `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::InvalidDependency`] if a shorthand does not
    /// match `org/name:version`.
    pub fn resolve(alias: &str, descriptor: &DependencyDescriptor) -> Result<Self> {
        let (org, name, ver) = match descriptor {
            DependencyDescriptor::Shorthand(text) => parse_shorthand(text)?,
            DependencyDescriptor::Structured { org, name, ver } => {
                (org.clone(), name.clone(), ver.clone())
            }
        };
        Ok(Self {
            org,
            name,
            ver,
            alias: alias.to_string(),
        })
    }
}

/// Segment of a shorthand: anything but the two separators.
fn segment(input: &str) -> IResult<&str, &str> {
    take_till(|c| c == '/' || c == ':')(input)
}

fn shorthand(input: &str) -> IResult<&str, (&str, &str, &str)> {
    let (input, (org, _, name, _, ver)) =
        (segment, char('/'), segment, char(':'), segment).parse(input)?;
    Ok((input, (org, name, ver)))
}

/// Splits `org/name:version` into its three parts.
///
/// Each part may be empty but must not contain `/` or `:`.
///
/// # Errors
///
/// Returns [`CellError::InvalidDependency`] on any other shape.
pub fn parse_shorthand(text: &str) -> Result<(String, String, String)> {
    match shorthand(text) {
        Ok(("", (org, name, ver))) => Ok((org.into(), name.into(), ver.into())),
        _ => Err(CellError::InvalidDependency {
            value: text.to_string(),
        }),
    }
}

/// Parses an image identity written as `org/name:version`.
///
/// # Errors
///
/// Returns an error if the text is malformed or the name is empty.
pub fn parse_image_name(text: &str) -> Result<ImageName> {
    let (org, name, ver) = parse_shorthand(text)?;
    ImageName::new(org, name, ver)
}

/// Alias table and dependency list built from declared dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedDependencies {
    /// Dependencies keyed by alias; a later declaration of an alias wins.
    pub aliases: BTreeMap<String, Dependency>,
    /// Every resolved dependency, in resolution order.
    pub dependencies: Vec<Dependency>,
}

impl ResolvedDependencies {
    /// Appends `other`, letting its aliases override existing ones.
    pub fn merge(&mut self, other: Self) {
        self.aliases.extend(other.aliases);
        self.dependencies.extend(other.dependencies);
    }
}

/// Resolves a raw alias → dependency map, keeping declaration order in
/// the dependency list.
///
/// # Errors
///
/// Returns [`CellError::InvalidDependency`] for the first malformed
/// shorthand; nothing is resolved in that case.
pub fn resolve_dependencies(
    raw: &IndexMap<String, DependencyDescriptor>,
) -> Result<ResolvedDependencies> {
    let mut resolved = ResolvedDependencies::default();
    for (alias, descriptor) in raw {
        let dependency = Dependency::resolve(alias, descriptor)?;
        tracing::debug!(
            alias,
            org = %dependency.org,
            name = %dependency.name,
            ver = %dependency.ver,
            "resolved dependency"
        );
        let _ = resolved.aliases.insert(alias.clone(), dependency.clone());
        resolved.dependencies.push(dependency);
    }
    Ok(resolved)
}
