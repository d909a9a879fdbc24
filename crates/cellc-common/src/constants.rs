//! Wire-level constants shared with the instantiation tooling.

use std::time::Duration;

/// API version of the composite Cell resource.
pub const CELL_API_VERSION: &str = "mesh.cellery.io/v1alpha1";

/// Kind of the composite Cell resource.
pub const CELL_KIND: &str = "Cell";

/// Annotation carrying the image organization.
pub const ANNOTATION_CELL_IMAGE_ORG: &str = "mesh.cellery.io/cell-image-org";
/// Annotation carrying the image name.
pub const ANNOTATION_CELL_IMAGE_NAME: &str = "mesh.cellery.io/cell-image-name";
/// Annotation carrying the image version.
pub const ANNOTATION_CELL_IMAGE_VERSION: &str = "mesh.cellery.io/cell-image-version";
/// Annotation carrying the JSON-encoded dependency list.
pub const ANNOTATION_CELL_DEPENDENCIES: &str = "mesh.cellery.io/cell-dependencies";

/// Port every gateway-routed component listens on behind the gateway.
pub const DEFAULT_GATEWAY_PORT: u16 = 80;

/// Scheme used in reference URLs.
pub const DEFAULT_GATEWAY_PROTOCOL: &str = "http";

/// Token replaced by the instance name at instantiation time.
pub const INSTANCE_NAME_PLACEHOLDER: &str = "{{instance_name}}";

/// Suffix of the gateway service host name.
pub const GATEWAY_SERVICE_SUFFIX: &str = "--gateway-service";

/// Value used when a declared environment variable has no value.
pub const DEFAULT_PARAMETER_VALUE: &str = "";

/// Protocol tag for TCP service templates.
pub const PROTOCOL_TCP: &str = "TCP";
/// Protocol tag for gRPC service templates.
pub const PROTOCOL_GRPC: &str = "GRPC";

/// Service template type used for test jobs.
pub const SERVICE_TYPE_JOB: &str = "Job";

/// Metric type for resource-based autoscaling.
pub const AUTO_SCALING_METRIC_RESOURCE: &str = "Resource";

/// Default build output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "target";
/// Sub-directory holding the Cell document and metadata.
pub const CELLERY_DIR: &str = "cellery";
/// Sub-directory holding the reference document.
pub const REF_DIR: &str = "ref";
/// Sub-directory holding copied resource files.
pub const RESOURCES_DIR: &str = "resources";
/// File name of the metadata descriptor.
pub const METADATA_FILE_NAME: &str = "metadata.json";
/// File name of the reference document.
pub const REFERENCE_FILE_NAME: &str = "reference.json";
/// Extension of the Cell document.
pub const YAML_EXTENSION: &str = ".yaml";

/// Interval between two polls of the cluster state.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// How long to wait for a test pod to start.
pub const POD_RUNNING_TIMEOUT: Duration = Duration::from_secs(10 * 60);
/// How long to wait for a test job to finish.
pub const JOB_COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

/// Binary name for the CLI.
pub const BIN_NAME: &str = "cellc";

/// Builds the gateway host for an instance name or placeholder.
#[must_use]
pub fn gateway_host(instance: &str) -> String {
    format!("{instance}{GATEWAY_SERVICE_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_host_uses_suffix() {
        assert_eq!(
            gateway_host(INSTANCE_NAME_PLACEHOLDER),
            "{{instance_name}}--gateway-service"
        );
    }
}
