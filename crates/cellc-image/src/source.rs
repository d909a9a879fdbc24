//! Container image source resolution.
//!
//! A prebuilt reference is used as is. A local build directory is built
//! under the image organization, so its tag must not name a repository.

use std::path::PathBuf;

use cellc_common::error::{CellError, Result};
use cellc_model::descriptor::SourceDescriptor;

use crate::builder::ImageBuilder;

/// Where a component's container image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A prebuilt image reference.
    Prebuilt(String),
    /// A directory to build, tagged `org/<tag>`.
    Local {
        /// Build context.
        dir: PathBuf,
        /// Fully qualified tag.
        tag: String,
    },
}

/// A resolved container image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    /// Reference to put in the service template.
    pub image: String,
    /// Whether the image was built locally.
    pub built: bool,
}

/// Validates `tag` and qualifies it with `org`.
///
/// # Errors
///
/// Returns [`CellError::InvalidImageTag`] if the tag is empty or contains `/`.
pub fn qualify_tag(org: &str, tag: &str) -> Result<String> {
    if tag.is_empty() || tag.contains('/') {
        return Err(CellError::InvalidImageTag {
            tag: tag.to_string(),
        });
    }
    Ok(format!("{org}/{tag}"))
}

impl ImageSource {
    /// Classifies a declared source for an image owned by `org`.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::InvalidImageTag`] for a local source whose tag
    /// names a repository.
    pub fn from_descriptor(source: &SourceDescriptor, org: &str) -> Result<Self> {
        match source {
            SourceDescriptor::Image { image } => Ok(Self::Prebuilt(image.clone())),
            SourceDescriptor::Docker { docker_dir, tag } => Ok(Self::Local {
                dir: docker_dir.clone(),
                tag: qualify_tag(org, tag)?,
            }),
        }
    }

    /// Produces the image reference, building local sources with `builder`.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::NotFound`] if a build directory is missing, or
    /// the builder's error.
    pub fn resolve(&self, builder: &dyn ImageBuilder) -> Result<ResolvedImage> {
        match self {
            Self::Prebuilt(image) => {
                tracing::debug!(image, "using prebuilt image");
                Ok(ResolvedImage {
                    image: image.clone(),
                    built: false,
                })
            }
            Self::Local { dir, tag } => {
                if !dir.is_dir() {
                    return Err(CellError::NotFound {
                        kind: "docker directory",
                        id: dir.display().to_string(),
                    });
                }
                builder.build(tag, dir)?;
                tracing::info!(tag, "built local image");
                Ok(ResolvedImage {
                    image: tag.clone(),
                    built: true,
                })
            }
        }
    }
}
