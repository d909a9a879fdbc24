//! One deployable unit of a cell image.

use std::collections::BTreeMap;

use cellc_common::constants::{DEFAULT_PARAMETER_VALUE, PROTOCOL_GRPC, PROTOCOL_TCP};
use cellc_common::error::{CellError, Result};

use crate::descriptor::{ComponentDescriptor, IngressDescriptor};
use crate::ingress::{Grpc, HttpApi, Ingress, Tcp, Web, classify};
use crate::probe::Probe;
use crate::resources::ResourceRequirements;
use crate::scaling::ScalingPolicy;

/// A component with its ingresses classified and its container port bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Unique name within the image.
    pub name: String,
    /// Replica count.
    pub replicas: u32,
    /// Service name the gateway routes to.
    pub service: String,
    /// Resolved container image reference.
    pub image: String,
    /// Container port shared by every ingress, if any declares one.
    pub container_port: Option<u16>,
    /// `TCP` or `GRPC` when the component carries such an ingress.
    pub protocol: Option<&'static str>,
    /// HTTP APIs in declaration order.
    pub apis: Vec<HttpApi>,
    /// TCP ingresses in declaration order.
    pub tcp: Vec<Tcp>,
    /// gRPC ingresses in declaration order.
    pub grpc: Vec<Grpc>,
    /// Web ingresses in declaration order.
    pub web: Vec<Web>,
    /// Environment variables; empty values are replaced by the default.
    pub env_vars: BTreeMap<String, String>,
    /// Readiness probe.
    pub readiness_probe: Option<Probe>,
    /// Liveness probe.
    pub liveness_probe: Option<Probe>,
    /// Resource requests and limits.
    pub resources: Option<ResourceRequirements>,
    /// Labels.
    pub labels: BTreeMap<String, String>,
    /// Scaling policy.
    pub scaling: Option<ScalingPolicy>,
    /// Contexts reachable without authentication, with a leading `/`.
    pub unsecured_paths: Vec<String>,
    /// Other components of the same image this one calls.
    pub depends_on: Vec<String>,
}

impl Component {
    /// Creates a component with no ingresses.
    pub fn new(name: impl Into<String>, replicas: u32, image: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            service: name.clone(),
            name,
            replicas,
            image: image.into(),
            container_port: None,
            protocol: None,
            apis: Vec::new(),
            tcp: Vec::new(),
            grpc: Vec::new(),
            web: Vec::new(),
            env_vars: BTreeMap::new(),
            readiness_probe: None,
            liveness_probe: None,
            resources: None,
            labels: BTreeMap::new(),
            scaling: None,
            unsecured_paths: Vec::new(),
            depends_on: Vec::new(),
        }
    }

    /// Builds a component from its declaration, with `image` as the
    /// already resolved container image.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::ConflictingPorts`] if two ingresses declare
    /// different container ports.
    pub fn from_descriptor(descriptor: &ComponentDescriptor, image: impl Into<String>) -> Result<Self> {
        let mut component = Self::new(&descriptor.name, descriptor.replicas, image);
        let exposed = component.ingest_ingresses(&descriptor.ingresses)?;
        component.labels.clone_from(&descriptor.labels);
        component.scaling = descriptor
            .scaling_policy
            .as_ref()
            .map(|policy| ScalingPolicy::from_descriptor(&descriptor.name, policy));
        for (key, value) in &descriptor.env_vars {
            component.set_env(key, value);
        }
        if let Some(probes) = &descriptor.probes {
            component.readiness_probe = probes.readiness.as_ref().map(Probe::from);
            component.liveness_probe = probes.liveness.as_ref().map(Probe::from);
        }
        component.resources = descriptor.resources.clone().filter(|r| !r.is_empty());
        if let Some(dependencies) = &descriptor.dependencies {
            component.depends_on = dependencies
                .components
                .iter()
                .map(|c| c.name.clone())
                .collect();
        }
        tracing::debug!(
            component = %component.name,
            port = ?component.container_port,
            exposed,
            "component processed"
        );
        Ok(component)
    }

    /// Records `port` as the container port.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::ConflictingPorts`] if a different port is
    /// already bound.
    pub fn bind_container_port(&mut self, port: u16) -> Result<()> {
        match self.container_port {
            Some(existing) if existing != port => Err(CellError::ConflictingPorts {
                component: self.name.clone(),
                existing,
                declared: port,
            }),
            _ => {
                self.container_port = Some(port);
                Ok(())
            }
        }
    }

    /// Classifies and attaches `ingresses` in declaration order.
    ///
    /// Returns whether any of them exposes the component.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::ConflictingPorts`] on a port mismatch.
    pub fn ingest_ingresses(&mut self, ingresses: &[IngressDescriptor]) -> Result<bool> {
        let mut exposed = false;
        for descriptor in ingresses {
            let classified = classify(descriptor, &self.service);
            self.bind_container_port(classified.container_port)?;
            exposed |= classified.ingress.is_exposed();
            if let Some(path) = classified.unsecured_path {
                self.unsecured_paths.push(path);
            }
            match classified.ingress {
                Ingress::HttpApi(api) => self.apis.push(api),
                Ingress::Tcp(tcp) => {
                    self.protocol = Some(PROTOCOL_TCP);
                    self.tcp.push(tcp);
                }
                Ingress::Grpc(grpc) => {
                    self.protocol = Some(PROTOCOL_GRPC);
                    self.grpc.push(grpc);
                }
                Ingress::Web(web) => {
                    if let Some(tls) = &web.tls {
                        if tls.key.trim().is_empty() {
                            tracing::warn!(component = %self.name, "TLS key value is empty");
                        }
                        if tls.cert.trim().is_empty() {
                            tracing::warn!(component = %self.name, "TLS cert value is empty");
                        }
                    }
                    self.web.push(web);
                }
            }
        }
        Ok(exposed)
    }

    /// Sets an environment variable; the last write for a key wins.
    pub fn set_env(&mut self, key: &str, value: &str) {
        let value = if value.is_empty() {
            tracing::warn!(component = %self.name, key, "environment variable has no value");
            DEFAULT_PARAMETER_VALUE
        } else {
            value
        };
        let _ = self.env_vars.insert(key.to_string(), value.to_string());
    }

    /// Whether any ingress makes the component reachable from outside.
    pub fn is_exposed(&self) -> bool {
        !self.web.is_empty()
            || self.apis.iter().any(|api| !api.backend.is_empty())
            || self.tcp.iter().any(|tcp| tcp.port != 0)
            || self.grpc.iter().any(|grpc| grpc.port != 0)
    }
}
