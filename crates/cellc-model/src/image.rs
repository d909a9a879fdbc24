//! The cell image aggregate.

use std::collections::BTreeSet;

use cellc_common::error::{CellError, Result};
use cellc_common::types::ImageName;

use crate::component::Component;
use crate::dependency::ResolvedDependencies;
use crate::scaling::{ScalingMode, ScalingPolicy};
use crate::test_suite::TestSuite;

/// A named, versioned set of components plus everything derived from them.
///
/// Component names are unique; components keep insertion order, which is
/// the declaration order of the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellImage {
    /// Organization, name, and version.
    pub identity: ImageName,
    components: Vec<Component>,
    /// Dependencies on other cell images.
    pub dependencies: ResolvedDependencies,
    /// Set when any component scales to zero.
    pub zero_scaling: bool,
    /// Set when any component autoscales on metrics.
    pub auto_scaling: bool,
    /// Names of components reachable through the gateway.
    pub exposed: BTreeSet<String>,
    /// Test suite.
    pub test: Option<TestSuite>,
    /// Container images built locally for this image.
    pub docker_images: Vec<String>,
}

impl CellImage {
    /// Creates an empty image.
    pub fn new(identity: ImageName) -> Self {
        Self {
            identity,
            components: Vec::new(),
            dependencies: ResolvedDependencies::default(),
            zero_scaling: false,
            auto_scaling: false,
            exposed: BTreeSet::new(),
            test: None,
            docker_images: Vec::new(),
        }
    }

    /// Adds a component, recording its scaling mode and exposure.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::DuplicateComponent`] if the name is taken.
    pub fn add_component(&mut self, component: Component) -> Result<()> {
        if self.component(&component.name).is_some() {
            return Err(CellError::DuplicateComponent {
                name: component.name,
            });
        }
        match component.scaling.as_ref().map(ScalingPolicy::mode) {
            Some(ScalingMode::AutoScaling) => self.auto_scaling = true,
            Some(ScalingMode::ZeroScaling) => self.zero_scaling = true,
            None => {}
        }
        if component.is_exposed() {
            let _ = self.exposed.insert(component.name.clone());
        }
        tracing::debug!(component = %component.name, "component added");
        self.components.push(component);
        Ok(())
    }

    /// Components in declaration order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Looks up a component by name.
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Whether both scaling modes are present.
    pub const fn has_mixed_scaling(&self) -> bool {
        self.auto_scaling && self.zero_scaling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaling::ZeroScalingPolicy;

    fn image() -> CellImage {
        CellImage::new(ImageName::new("myorg", "stock", "1.0.0").expect("valid"))
    }

    #[test]
    fn duplicate_component_is_rejected() {
        let mut image = image();
        image
            .add_component(Component::new("stock", 1, "org/stock"))
            .expect("first");
        let err = image
            .add_component(Component::new("stock", 1, "org/other"))
            .unwrap_err();
        assert!(matches!(err, CellError::DuplicateComponent { ref name } if name == "stock"));
        assert_eq!(image.components().len(), 1);
        assert_eq!(image.components()[0].image, "org/stock");
    }

    #[test]
    fn components_keep_insertion_order() {
        let mut image = image();
        for name in ["b", "a", "c"] {
            image
                .add_component(Component::new(name, 1, "org/x"))
                .expect("unique");
        }
        let names: Vec<_> = image.components().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn scaling_flags_follow_components() {
        let mut image = image();
        let mut zero = Component::new("fn", 1, "org/fn");
        zero.scaling = Some(ScalingPolicy::ZeroScaling(ZeroScalingPolicy::default()));
        image.add_component(zero).expect("unique");
        assert!(image.zero_scaling);
        assert!(!image.auto_scaling);
        assert!(!image.has_mixed_scaling());
        assert!(image.exposed.is_empty());
    }
}
