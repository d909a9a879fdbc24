//! Test suite attached to a cell image.

use std::collections::BTreeMap;

use cellc_common::constants::DEFAULT_PARAMETER_VALUE;
use cellc_common::error::{CellError, Result};

use crate::descriptor::{SourceDescriptor, TestDescriptor};

/// One test: a container run to completion against a live instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Test name, also the name of the cell it runs in.
    pub name: String,
    /// Test container image.
    pub image: String,
    /// Environment variables.
    pub env_vars: BTreeMap<String, String>,
}

/// Ordered list of tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSuite {
    /// Tests in execution order.
    pub tests: Vec<TestCase>,
}

impl TestSuite {
    /// Builds the suite from declarations, stopping at the first test
    /// with an empty name.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a test has no prebuilt image source.
    pub fn from_descriptors(descriptors: &[TestDescriptor]) -> Result<Self> {
        let mut tests = Vec::new();
        for descriptor in descriptors {
            if descriptor.name.is_empty() {
                break;
            }
            let Some(SourceDescriptor::Image { image }) = &descriptor.source else {
                return Err(CellError::validation(format!(
                    "test \"{}\" must declare an image source",
                    descriptor.name
                )));
            };
            let env_vars = descriptor
                .env_vars
                .iter()
                .map(|(key, value)| {
                    if value.is_empty() {
                        tracing::warn!(test = %descriptor.name, key, "environment variable has no value");
                        (key.clone(), DEFAULT_PARAMETER_VALUE.to_string())
                    } else {
                        (key.clone(), value.clone())
                    }
                })
                .collect();
            tests.push(TestCase {
                name: descriptor.name.clone(),
                image: image.clone(),
                env_vars,
            });
        }
        Ok(Self { tests })
    }

    /// Whether the suite contains no test.
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}
