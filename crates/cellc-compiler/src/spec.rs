//! The composite Cell document and its templates.
//!
//! Field names and nesting are consumed by the instantiation tooling and
//! must not change.

use std::collections::BTreeMap;

use cellc_common::constants::{CELL_API_VERSION, CELL_KIND};
use cellc_common::error::Result;
use cellc_model::ingress::{Grpc, HttpApi, Oidc, Tcp, Tls};
use cellc_model::probe::Probe;
use cellc_model::resources::ResourceRequirements;
use cellc_model::scaling::AutoscalingSpec;
use serde::{Deserialize, Serialize};

/// Top-level `Cell` resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    /// Always `mesh.cellery.io/v1alpha1`.
    pub api_version: String,
    /// Always `Cell`.
    pub kind: String,
    /// Name and annotations.
    pub metadata: ObjectMeta,
    /// Templates.
    pub spec: CellSpec,
}

impl Cell {
    /// Wraps `spec` into a Cell resource.
    pub fn new(metadata: ObjectMeta, spec: CellSpec) -> Self {
        Self {
            api_version: CELL_API_VERSION.into(),
            kind: CELL_KIND.into(),
            metadata,
            spec,
        }
    }

    /// Renders the resource as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Parses a resource from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a Cell document.
    pub fn from_yaml(input: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(input)?)
    }
}

/// Name, labels, and annotations of a resource or template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Resource name.
    pub name: String,
    /// Labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// `spec` of a Cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellSpec {
    /// The single gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_template: Option<GatewayTemplate>,
    /// One template per component, in declaration order.
    pub services_templates: Vec<ServiceTemplate>,
    /// Security token service.
    pub sts_template: StsTemplate,
}

/// Gateway flavour of a cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GatewayType {
    /// No gateway routing.
    #[default]
    None,
    /// API gateway for HTTP APIs.
    MicroGateway,
    /// Proxy gateway for Web, TCP, and gRPC traffic.
    Envoy,
}

impl GatewayType {
    /// Whether no gateway type was selected.
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Wrapper around the gateway spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayTemplate {
    /// Gateway settings.
    pub spec: GatewaySpec,
}

/// Gateway settings aggregated over all components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySpec {
    /// Gateway flavour.
    #[serde(rename = "type", default, skip_serializing_if = "GatewayType::is_none")]
    pub gateway_type: GatewayType,
    /// Virtual host of the Web ingress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// TLS material of the Web ingress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<Tls>,
    /// Routed HTTP APIs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub http: Vec<HttpApi>,
    /// Routed TCP ingresses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tcp: Vec<Tcp>,
    /// Routed gRPC ingresses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grpc: Vec<Grpc>,
    /// OIDC configuration of the Web ingress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oidc: Option<Oidc>,
}

/// Template of one component's service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTemplate {
    /// Service name and labels.
    pub metadata: ObjectMeta,
    /// Service settings.
    pub spec: ServiceTemplateSpec,
}

/// Settings of one service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTemplateSpec {
    /// Replica count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    /// Port the service exposes inside the cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_port: Option<u16>,
    /// `TCP` or `GRPC`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Service type, `Job` for test cells.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    /// Container settings.
    pub container: Container,
    /// Scaling settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoscaling: Option<AutoscalingSpec>,
}

/// Container of a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Image reference.
    pub image: String,
    /// Environment variables.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    /// Exposed container ports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ContainerPort>,
    /// Resource requests and limits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    /// Readiness probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_probe: Option<Probe>,
    /// Liveness probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness_probe: Option<Probe>,
}

/// One environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    /// Variable name.
    pub name: String,
    /// Variable value.
    pub value: String,
}

/// One container port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    /// Port number.
    pub container_port: u16,
}

/// Wrapper around the STS spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StsTemplate {
    /// STS settings.
    pub spec: StsTemplateSpec,
}

/// Security token service settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StsTemplateSpec {
    /// Paths callable without a token, duplicates preserved.
    #[serde(default)]
    pub unsecured_paths: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_type_none_is_omitted() {
        let spec = GatewaySpec::default();
        let json = serde_json::to_value(&spec).expect("serialize");
        assert!(json.get("type").is_none());
        let envoy = GatewaySpec {
            gateway_type: GatewayType::Envoy,
            ..GatewaySpec::default()
        };
        let json = serde_json::to_value(&envoy).expect("serialize");
        assert_eq!(json["type"], "Envoy");
    }

    #[test]
    fn cell_yaml_round_trips() {
        let cell = Cell::new(
            ObjectMeta {
                name: "hello".into(),
                ..ObjectMeta::default()
            },
            CellSpec {
                gateway_template: Some(GatewayTemplate::default()),
                services_templates: vec![ServiceTemplate {
                    metadata: ObjectMeta {
                        name: "hello".into(),
                        ..ObjectMeta::default()
                    },
                    spec: ServiceTemplateSpec {
                        replicas: Some(1),
                        service_port: Some(80),
                        container: Container {
                            image: "org/hello".into(),
                            ports: vec![ContainerPort { container_port: 80 }],
                            ..Container::default()
                        },
                        ..ServiceTemplateSpec::default()
                    },
                }],
                sts_template: StsTemplate::default(),
            },
        );
        let yaml = cell.to_yaml().expect("serialize");
        assert!(yaml.contains("apiVersion: mesh.cellery.io/v1alpha1"), "got: {yaml}");
        assert!(yaml.contains("servicesTemplates:"), "got: {yaml}");
        assert!(yaml.contains("containerPort: 80"), "got: {yaml}");
        let parsed = Cell::from_yaml(&yaml).expect("parse");
        assert_eq!(parsed, cell);
    }
}
