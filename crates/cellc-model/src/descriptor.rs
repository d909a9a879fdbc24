//! Raw component declarations as written by the image author.
//!
//! Descriptors are loaded from YAML or JSON and carry no invariants of
//! their own; the compiler turns them into a validated [`CellImage`].
//!
//! [`CellImage`]: crate::image::CellImage

use std::collections::BTreeMap;
use std::path::PathBuf;

use cellc_common::error::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dependency::DependencyDescriptor;
use crate::ingress::{ApiDefinition, Tls};
use crate::resources::ResourceRequirements;
use crate::scaling::MetricThreshold;

const fn default_replicas() -> u32 {
    1
}

const fn default_true() -> bool {
    true
}

fn default_context() -> String {
    "/".into()
}

/// Root of a descriptor file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellDescriptor {
    /// Components in declaration order.
    #[serde(default)]
    pub components: Vec<ComponentDescriptor>,
    /// Test suite, in execution order.
    #[serde(default)]
    pub tests: Vec<TestDescriptor>,
}

impl CellDescriptor {
    /// Loads a descriptor from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid descriptor.
    pub fn from_yaml(input: &str) -> Result<Self> {
        tracing::debug!("loading yaml descriptor");
        Ok(serde_yaml::from_str(input)?)
    }

    /// Loads a descriptor from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid descriptor.
    pub fn from_json(input: &str) -> Result<Self> {
        tracing::debug!("loading json descriptor");
        Ok(serde_json::from_str(input)?)
    }
}

/// One declared component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    /// Component name, unique within the image.
    pub name: String,
    /// Replica count.
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    /// Container image source.
    pub source: SourceDescriptor,
    /// Ingresses in declaration order.
    #[serde(default)]
    pub ingresses: Vec<IngressDescriptor>,
    /// Labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Scaling policy.
    #[serde(default)]
    pub scaling_policy: Option<ScalingPolicyDescriptor>,
    /// Environment variables.
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
    /// Readiness and liveness probes.
    #[serde(default)]
    pub probes: Option<ProbesDescriptor>,
    /// Resource requests and limits.
    #[serde(default)]
    pub resources: Option<ResourceRequirements>,
    /// Cell and component dependencies.
    #[serde(default)]
    pub dependencies: Option<DependenciesDescriptor>,
}

/// Where the container image of a component comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceDescriptor {
    /// A prebuilt image reference.
    Image {
        /// Image reference.
        image: String,
    },
    /// A local directory built into an image.
    Docker {
        /// Build context directory.
        #[serde(rename = "dockerDir")]
        docker_dir: PathBuf,
        /// Tag without repository, prefixed with the image org when built.
        tag: String,
    },
}

/// Raw ingress declaration, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum IngressDescriptor {
    /// HTTP API ingress.
    HttpApi(HttpApiDescriptor),
    /// TCP ingress.
    Tcp(TcpDescriptor),
    /// gRPC ingress.
    Grpc(GrpcDescriptor),
    /// Web ingress.
    Web(WebDescriptor),
}

/// HTTP API exposure level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exposure {
    /// Reachable from outside the cell.
    Global,
    /// Reachable through the gateway from within the mesh.
    Local,
}

/// Raw HTTP API ingress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpApiDescriptor {
    /// Container port.
    pub port: u16,
    /// Path prefix.
    #[serde(default)]
    pub context: Option<String>,
    /// Exposure level; unexposed when absent.
    #[serde(default)]
    pub expose: Option<Exposure>,
    /// Whether calls must carry a token.
    #[serde(default = "default_true")]
    pub authenticate: bool,
    /// API resource definitions.
    #[serde(default)]
    pub definition: Option<ApiDefinitionSet>,
}

/// Resource list of an HTTP API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDefinitionSet {
    /// Resources in declaration order.
    #[serde(default)]
    pub resources: Vec<ApiDefinition>,
}

/// Raw TCP ingress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpDescriptor {
    /// Gateway-facing port; internal only when absent or 0.
    #[serde(default)]
    pub gateway_port: Option<u16>,
    /// Port the component listens on.
    pub backend_port: u16,
}

/// Raw gRPC ingress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrpcDescriptor {
    /// Gateway-facing port; internal only when absent or 0.
    #[serde(default)]
    pub gateway_port: Option<u16>,
    /// Port the component listens on.
    pub backend_port: u16,
    /// Proto file shipped with the image.
    #[serde(default)]
    pub proto_file: Option<PathBuf>,
}

/// Raw Web ingress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebDescriptor {
    /// Container port.
    pub port: u16,
    /// Gateway settings.
    pub gateway_config: GatewayConfigDescriptor,
}

/// Gateway settings of a Web ingress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfigDescriptor {
    /// Virtual host.
    pub vhost: String,
    /// Path prefix.
    #[serde(default = "default_context")]
    pub context: String,
    /// TLS material.
    #[serde(default)]
    pub tls: Option<Tls>,
    /// OIDC configuration.
    #[serde(default)]
    pub oidc: Option<OidcDescriptor>,
}

/// Raw OIDC configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcDescriptor {
    /// Identity provider URL.
    pub provider_url: String,
    /// Redirect URL after login.
    pub redirect_url: String,
    /// Application base URL.
    pub base_url: String,
    /// OIDC client identifier.
    pub client_id: String,
    /// Paths that skip authentication.
    #[serde(default)]
    pub non_secure_paths: Vec<String>,
    /// Paths that require authentication.
    #[serde(default)]
    pub secure_paths: Vec<String>,
    /// A plain secret or DCR credentials.
    pub client_secret: ClientSecretDescriptor,
    /// Claim used as the subject.
    #[serde(default)]
    pub subject_claim: Option<String>,
}

/// Client secret as declared: a string, or a DCR record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientSecretDescriptor {
    /// Pre-registered secret.
    Secret(String),
    /// Dynamic client registration.
    Dcr(DcrDescriptor),
}

/// Dynamic client registration credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DcrDescriptor {
    /// Registration user.
    pub dcr_user: String,
    /// Registration password.
    pub dcr_password: String,
    /// Registration endpoint.
    #[serde(default)]
    pub dcr_url: Option<String>,
}

/// Raw scaling policy, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ScalingPolicyDescriptor {
    /// Resource-metric autoscaling.
    #[serde(rename = "AutoScalingPolicy")]
    AutoScaling(AutoScalingDescriptor),
    /// Scale-to-zero.
    #[serde(rename = "ZeroScalingPolicy")]
    ZeroScaling(ZeroScalingDescriptor),
}

/// Raw autoscaling policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoScalingDescriptor {
    /// Lower replica bound.
    pub min_replicas: u32,
    /// Upper replica bound.
    pub max_replicas: u32,
    /// Whether the policy may be overridden at instantiation.
    #[serde(default)]
    pub overridable: bool,
    /// Target metrics.
    #[serde(default)]
    pub metrics: MetricsDescriptor,
}

/// Target metrics of an autoscaling policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsDescriptor {
    /// CPU target.
    #[serde(default)]
    pub cpu: Option<MetricDescriptor>,
    /// Memory target.
    #[serde(default)]
    pub memory: Option<MetricDescriptor>,
}

/// One metric target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDescriptor {
    /// Absolute quantity or utilization percentage.
    pub threshold: MetricThreshold,
}

/// Raw zero-scaling policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZeroScalingDescriptor {
    /// Upper replica bound.
    #[serde(default)]
    pub max_replicas: Option<u32>,
    /// Concurrent requests per replica.
    #[serde(default)]
    pub concurrency_target: Option<u32>,
}

/// Readiness and liveness probes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbesDescriptor {
    /// Liveness probe.
    #[serde(default)]
    pub liveness: Option<ProbeDescriptor>,
    /// Readiness probe.
    #[serde(default)]
    pub readiness: Option<ProbeDescriptor>,
}

/// Raw probe with its timing parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeDescriptor {
    /// Probe mechanism.
    pub kind: ProbeKindDescriptor,
    /// Seconds before the first probe.
    #[serde(default)]
    pub initial_delay_seconds: u32,
    /// Seconds between probes.
    #[serde(default = "ProbeDescriptor::default_period")]
    pub period_seconds: u32,
    /// Seconds before a probe times out.
    #[serde(default = "ProbeDescriptor::default_timeout")]
    pub timeout_seconds: u32,
    /// Consecutive successes to be considered healthy.
    #[serde(default = "ProbeDescriptor::default_success")]
    pub success_threshold: u32,
    /// Consecutive failures to be considered unhealthy.
    #[serde(default = "ProbeDescriptor::default_failure")]
    pub failure_threshold: u32,
}

impl ProbeDescriptor {
    const fn default_period() -> u32 {
        10
    }

    const fn default_timeout() -> u32 {
        1
    }

    const fn default_success() -> u32 {
        1
    }

    const fn default_failure() -> u32 {
        3
    }
}

/// Probe mechanism, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProbeKindDescriptor {
    /// Open a TCP connection.
    TcpSocket {
        /// Target port.
        port: u16,
    },
    /// Issue an HTTP GET.
    HttpGet {
        /// Target port.
        port: u16,
        /// Request path.
        path: String,
        /// Extra request headers.
        #[serde(default, rename = "httpHeaders")]
        http_headers: BTreeMap<String, String>,
    },
    /// Run a command in the container.
    Exec {
        /// Command and arguments.
        commands: Vec<String>,
    },
}

/// Dependencies declared by a component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependenciesDescriptor {
    /// Cell image dependencies keyed by alias, in declaration order.
    #[serde(default)]
    pub cells: IndexMap<String, DependencyDescriptor>,
    /// Components of the same image this one calls.
    #[serde(default)]
    pub components: Vec<ComponentRef>,
}

/// Reference to another component of the same image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRef {
    /// Referenced component name.
    pub name: String,
}

/// One test of the test suite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDescriptor {
    /// Test name; an empty name ends the suite.
    #[serde(default)]
    pub name: String,
    /// Test container image.
    #[serde(default)]
    pub source: Option<SourceDescriptor>,
    /// Environment variables.
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
}
