//! Assembly of a cell image from its descriptor.
//!
//! Everything is validated before any local image is built, so a
//! rejected descriptor never triggers a build.

use std::path::PathBuf;

use cellc_common::error::{CellError, Result};
use cellc_common::types::ImageName;
use cellc_image::builder::ImageBuilder;
use cellc_image::source::ImageSource;
use cellc_model::component::Component;
use cellc_model::dependency::resolve_dependencies;
use cellc_model::descriptor::CellDescriptor;
use cellc_model::image::CellImage;
use cellc_model::test_suite::TestSuite;

use crate::graph::ComponentGraph;

/// A validated image plus the files that ship with it.
#[derive(Debug, Clone)]
pub struct Assembly {
    /// The image model.
    pub image: CellImage,
    /// gRPC proto files to copy next to the artifacts.
    pub resources: Vec<PathBuf>,
}

/// Builds the image model of `descriptor`, then builds its local images.
///
/// # Errors
///
/// Returns the first validation error (duplicate component, conflicting
/// ports, bad tag, bad dependency, undefined component reference, mixed
/// scaling modes), or the first image build failure.
pub fn assemble(
    descriptor: &CellDescriptor,
    identity: ImageName,
    builder: &dyn ImageBuilder,
) -> Result<Assembly> {
    tracing::info!(image = %identity, components = descriptor.components.len(), "assembling cell image");
    let mut image = CellImage::new(identity);
    let mut sources = Vec::with_capacity(descriptor.components.len());
    let mut resources = Vec::new();

    for component_descriptor in &descriptor.components {
        let source = ImageSource::from_descriptor(&component_descriptor.source, &image.identity.org)?;
        let reference = match &source {
            ImageSource::Prebuilt(prebuilt) => prebuilt.clone(),
            ImageSource::Local { tag, .. } => tag.clone(),
        };
        let component = Component::from_descriptor(component_descriptor, reference)?;
        resources.extend(component.grpc.iter().filter_map(|grpc| grpc.proto_file.clone()));

        if let Some(dependencies) = &component_descriptor.dependencies {
            image.dependencies.merge(resolve_dependencies(&dependencies.cells)?);
        }
        image.add_component(component)?;
        sources.push(source);
    }

    if image.has_mixed_scaling() {
        return Err(CellError::validation(
            "an image cannot mix autoscaling and zero-scaling components",
        ));
    }

    let graph = ComponentGraph::from_image(&image)?;
    let _ = graph.warn_on_cycles();

    let suite = TestSuite::from_descriptors(&descriptor.tests)?;
    if !suite.is_empty() {
        image.test = Some(suite);
    }

    for source in &sources {
        let resolved = source.resolve(builder)?;
        if resolved.built {
            image.docker_images.push(resolved.image);
        }
    }

    Ok(Assembly { image, resources })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::Path;

    use super::*;

    #[derive(Default)]
    struct CountingBuilder {
        tags: RefCell<Vec<String>>,
    }

    impl ImageBuilder for CountingBuilder {
        fn build(&self, tag: &str, _context: &Path) -> Result<()> {
            self.tags.borrow_mut().push(tag.to_string());
            Ok(())
        }
    }

    fn identity() -> ImageName {
        ImageName::new("myorg", "shop", "1.0.0").expect("valid")
    }

    #[test]
    fn duplicate_component_fails_before_build() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let input = format!(
            r"
components:
  - name: stock
    source:
      dockerDir: {dir}
      tag: stock:1.0
  - name: stock
    source:
      image: org/stock
",
            dir = dir.path().display()
        );
        let descriptor = CellDescriptor::from_yaml(&input).expect("parse");
        let builder = CountingBuilder::default();
        let err = assemble(&descriptor, identity(), &builder).unwrap_err();
        assert!(matches!(err, CellError::DuplicateComponent { .. }));
        assert!(builder.tags.borrow().is_empty());
    }

    #[test]
    fn mixed_scaling_fails_before_build() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let input = format!(
            r"
components:
  - name: a
    source:
      dockerDir: {dir}
      tag: a:1.0
    scalingPolicy:
      kind: ZeroScalingPolicy
  - name: b
    source:
      image: org/b:1.0
    scalingPolicy:
      kind: AutoScalingPolicy
      minReplicas: 1
      maxReplicas: 3
",
            dir = dir.path().display()
        );
        let descriptor = CellDescriptor::from_yaml(&input).expect("parse");
        let builder = CountingBuilder::default();
        let err = assemble(&descriptor, identity(), &builder).unwrap_err();
        assert!(err.is_validation());
        assert!(builder.tags.borrow().is_empty());
    }

    #[test]
    fn local_sources_are_built_and_recorded() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let input = format!(
            r"
components:
  - name: api
    source:
      dockerDir: {dir}
      tag: api:1.0
    ingresses:
      - kind: Grpc
        gatewayPort: 31400
        backendPort: 50051
        protoFile: proto/api.proto
",
            dir = dir.path().display()
        );
        let descriptor = CellDescriptor::from_yaml(&input).expect("parse");
        let builder = CountingBuilder::default();
        let assembly = assemble(&descriptor, identity(), &builder).expect("assemble");
        assert_eq!(*builder.tags.borrow(), ["myorg/api:1.0"]);
        assert_eq!(assembly.image.docker_images, ["myorg/api:1.0"]);
        assert_eq!(assembly.image.components()[0].image, "myorg/api:1.0");
        assert_eq!(assembly.resources, [PathBuf::from("proto/api.proto")]);
        assert!(assembly.image.exposed.contains("api"));
    }

    #[test]
    fn dependencies_from_all_components_are_merged() {
        let input = r"
components:
  - name: a
    source:
      image: org/a
    dependencies:
      cells:
        pay: myorg/payments:1.0
  - name: b
    source:
      image: org/b
    dependencies:
      cells:
        pay: myorg/payments:2.0
        db: myorg/db:1.0
      components:
        - name: a
";
        let descriptor = CellDescriptor::from_yaml(input).expect("parse");
        let assembly = assemble(&descriptor, identity(), &CountingBuilder::default()).expect("assemble");
        let deps = &assembly.image.dependencies;
        assert_eq!(deps.dependencies.len(), 3);
        assert_eq!(deps.aliases["pay"].ver, "2.0");
    }

    #[test]
    fn malformed_dependency_fails() {
        let input = r"
components:
  - name: a
    source:
      image: org/a
    dependencies:
      cells:
        pay: myorg-payments-1.0
";
        let descriptor = CellDescriptor::from_yaml(input).expect("parse");
        let err = assemble(&descriptor, identity(), &CountingBuilder::default()).unwrap_err();
        assert!(matches!(err, CellError::InvalidDependency { .. }));
    }

    #[test]
    fn undefined_component_dependency_fails() {
        let input = r"
components:
  - name: a
    source:
      image: org/a
    dependencies:
      components:
        - name: ghost
";
        let descriptor = CellDescriptor::from_yaml(input).expect("parse");
        let err = assemble(&descriptor, identity(), &CountingBuilder::default()).unwrap_err();
        assert!(err.is_validation());
    }
}
