//! Cells that run the test suite of an image as jobs.

use cellc_common::constants::{
    ANNOTATION_CELL_IMAGE_NAME, ANNOTATION_CELL_IMAGE_ORG, ANNOTATION_CELL_IMAGE_VERSION,
    SERVICE_TYPE_JOB,
};
use cellc_common::types::{ImageName, valid_name};
use cellc_model::test_suite::{TestCase, TestSuite};

use crate::spec::{
    Cell, CellSpec, Container, EnvVar, ObjectMeta, ServiceTemplate, ServiceTemplateSpec,
    StsTemplate,
};

/// Builds one Cell per test of `suite`, in suite order.
pub fn test_cells(identity: &ImageName, suite: &TestSuite) -> Vec<Cell> {
    suite
        .tests
        .iter()
        .map(|test| test_cell(identity, test))
        .collect()
}

fn test_cell(identity: &ImageName, test: &TestCase) -> Cell {
    let mut metadata = ObjectMeta {
        name: valid_name(&test.name),
        ..ObjectMeta::default()
    };
    for (key, value) in [
        (ANNOTATION_CELL_IMAGE_ORG, &identity.org),
        (ANNOTATION_CELL_IMAGE_NAME, &test.name),
        (ANNOTATION_CELL_IMAGE_VERSION, &identity.version),
    ] {
        let _ = metadata.annotations.insert(key.to_string(), value.clone());
    }

    let template = ServiceTemplate {
        metadata: ObjectMeta {
            name: test.name.clone(),
            ..ObjectMeta::default()
        },
        spec: ServiceTemplateSpec {
            service_type: Some(SERVICE_TYPE_JOB.to_string()),
            container: Container {
                image: test.image.clone(),
                env: test
                    .env_vars
                    .iter()
                    .map(|(name, value)| EnvVar {
                        name: name.clone(),
                        value: value.clone(),
                    })
                    .collect(),
                ..Container::default()
            },
            ..ServiceTemplateSpec::default()
        },
    };
    tracing::debug!(test = %test.name, "created test cell");

    Cell::new(
        metadata,
        CellSpec {
            gateway_template: None,
            services_templates: vec![template],
            sts_template: StsTemplate::default(),
        },
    )
}
