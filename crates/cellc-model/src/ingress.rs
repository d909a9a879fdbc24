//! Typed ingress variants and their classification from descriptors.
//!
//! An ingress describes how a component is reached. HTTP API, TCP, and
//! gRPC ingresses are routed by the cell gateway when exposed; a Web
//! ingress always is.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::descriptor::{
    ClientSecretDescriptor, Exposure, GrpcDescriptor, HttpApiDescriptor, IngressDescriptor,
    OidcDescriptor, TcpDescriptor, WebDescriptor,
};

/// One `{method, path}` resource of an HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDefinition {
    /// Resource path, e.g. `/*`.
    pub path: String,
    /// HTTP method, e.g. `GET`.
    pub method: String,
}

/// An HTTP API routed by the gateway.
///
/// `backend` is only set when the API is exposed (globally or locally);
/// an unexposed API keeps an empty backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpApi {
    /// Path prefix of the API.
    #[serde(default)]
    pub context: String,
    /// Backend service name.
    #[serde(default)]
    pub backend: String,
    /// Exposed outside the cell when true, inside the mesh only otherwise.
    #[serde(default)]
    pub global: bool,
    /// Whether calls must carry a token.
    #[serde(default)]
    pub authenticate: bool,
    /// Resource definitions, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub definitions: Vec<ApiDefinition>,
}

/// A TCP ingress. A `port` of 0 means the ingress is not exposed externally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tcp {
    /// Gateway-facing port.
    #[serde(default)]
    pub port: u16,
    /// Service host the gateway forwards to.
    pub backend_host: String,
    /// Port the component listens on.
    pub backend_port: u16,
}

/// A gRPC ingress. A `port` of 0 means the ingress is not exposed externally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grpc {
    /// Gateway-facing port.
    #[serde(default)]
    pub port: u16,
    /// Service host the gateway forwards to.
    pub backend_host: String,
    /// Port the component listens on.
    pub backend_port: u16,
    /// Proto file shipped alongside the image.
    #[serde(skip)]
    pub proto_file: Option<PathBuf>,
}

/// TLS material of a Web ingress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tls {
    /// Private key.
    pub key: String,
    /// Certificate.
    pub cert: String,
}

/// Client credentials of an OIDC configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientCredentials {
    /// A pre-registered client secret.
    Secret {
        /// The client secret.
        #[serde(rename = "clientSecret")]
        client_secret: String,
    },
    /// Dynamic client registration credentials.
    Dcr {
        /// Registration user.
        #[serde(rename = "dcrUser")]
        dcr_user: String,
        /// Registration password.
        #[serde(rename = "dcrPassword")]
        dcr_password: String,
        /// Registration endpoint, provider default when absent.
        #[serde(rename = "dcrUrl", default, skip_serializing_if = "Option::is_none")]
        dcr_url: Option<String>,
    },
}

/// OIDC configuration attached to the gateway of a Web cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Oidc {
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
    pub non_secure_paths: BTreeSet<String>,
    /// Paths that require authentication.
    #[serde(default)]
    pub secure_paths: BTreeSet<String>,
    /// Client secret or DCR credentials.
    #[serde(flatten)]
    pub credentials: ClientCredentials,
    /// Claim used as the subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_claim: Option<String>,
}

/// A Web ingress: one HTTP backend behind a virtual host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Web {
    /// The routed HTTP API, always global.
    pub http_api: HttpApi,
    /// Virtual host.
    pub vhost: String,
    /// Optional TLS material.
    pub tls: Option<Tls>,
    /// Optional OIDC configuration.
    pub oidc: Option<Oidc>,
}

/// Discriminant of an [`Ingress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngressKind {
    /// HTTP API ingress.
    HttpApi,
    /// TCP ingress.
    Tcp,
    /// gRPC ingress.
    Grpc,
    /// Web ingress.
    Web,
}

/// A typed ingress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingress {
    /// HTTP API ingress.
    HttpApi(HttpApi),
    /// TCP ingress.
    Tcp(Tcp),
    /// gRPC ingress.
    Grpc(Grpc),
    /// Web ingress.
    Web(Web),
}

impl Ingress {
    /// Returns the variant discriminant.
    pub const fn kind(&self) -> IngressKind {
        match self {
            Self::HttpApi(_) => IngressKind::HttpApi,
            Self::Tcp(_) => IngressKind::Tcp,
            Self::Grpc(_) => IngressKind::Grpc,
            Self::Web(_) => IngressKind::Web,
        }
    }

    /// Whether the ingress makes its component reachable from outside.
    pub fn is_exposed(&self) -> bool {
        match self {
            Self::Web(_) => true,
            Self::HttpApi(api) => !api.backend.is_empty(),
            Self::Tcp(tcp) => tcp.port != 0,
            Self::Grpc(grpc) => grpc.port != 0,
        }
    }
}

/// Result of classifying one ingress descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    /// The typed ingress.
    pub ingress: Ingress,
    /// Container port the ingress binds.
    pub container_port: u16,
    /// Context recorded as unsecured, with a leading `/`.
    pub unsecured_path: Option<String>,
}

/// Turns a raw ingress declaration into a typed ingress for `service`.
pub fn classify(descriptor: &IngressDescriptor, service: &str) -> Classified {
    match descriptor {
        IngressDescriptor::HttpApi(http) => classify_http(http, service),
        IngressDescriptor::Tcp(tcp) => classify_tcp(tcp, service),
        IngressDescriptor::Grpc(grpc) => classify_grpc(grpc, service),
        IngressDescriptor::Web(web) => classify_web(web, service),
    }
}

fn classify_http(http: &HttpApiDescriptor, service: &str) -> Classified {
    let mut api = HttpApi {
        context: http.context.clone().unwrap_or_default(),
        ..HttpApi::default()
    };
    let mut unsecured_path = None;

    if let Some(expose) = http.expose {
        api.authenticate = http.authenticate;
        if !api.authenticate {
            unsecured_path = Some(normalize_path(&api.context));
        }
        api.global = expose == Exposure::Global;
        api.backend = service.to_string();
        if let Some(definition) = &http.definition {
            api.definitions.clone_from(&definition.resources);
        }
    }

    Classified {
        ingress: Ingress::HttpApi(api),
        container_port: http.port,
        unsecured_path,
    }
}

fn classify_tcp(tcp: &TcpDescriptor, service: &str) -> Classified {
    Classified {
        ingress: Ingress::Tcp(Tcp {
            port: tcp.gateway_port.unwrap_or(0),
            backend_host: service.to_string(),
            backend_port: tcp.backend_port,
        }),
        container_port: tcp.backend_port,
        unsecured_path: None,
    }
}

fn classify_grpc(grpc: &GrpcDescriptor, service: &str) -> Classified {
    Classified {
        ingress: Ingress::Grpc(Grpc {
            port: grpc.gateway_port.unwrap_or(0),
            backend_host: service.to_string(),
            backend_port: grpc.backend_port,
            proto_file: grpc
                .proto_file
                .clone()
                .filter(|p| !p.as_os_str().is_empty()),
        }),
        container_port: grpc.backend_port,
        unsecured_path: None,
    }
}

fn classify_web(web: &WebDescriptor, service: &str) -> Classified {
    let config = &web.gateway_config;
    Classified {
        ingress: Ingress::Web(Web {
            http_api: HttpApi {
                context: config.context.clone(),
                backend: service.to_string(),
                global: true,
                ..HttpApi::default()
            },
            vhost: config.vhost.clone(),
            tls: config.tls.clone(),
            oidc: config.oidc.as_ref().map(oidc_from_descriptor),
        }),
        container_port: web.port,
        unsecured_path: None,
    }
}

fn oidc_from_descriptor(oidc: &OidcDescriptor) -> Oidc {
    let credentials = match &oidc.client_secret {
        ClientSecretDescriptor::Secret(secret) => ClientCredentials::Secret {
            client_secret: secret.clone(),
        },
        ClientSecretDescriptor::Dcr(dcr) => ClientCredentials::Dcr {
            dcr_user: dcr.dcr_user.clone(),
            dcr_password: dcr.dcr_password.clone(),
            dcr_url: dcr.dcr_url.clone(),
        },
    };
    Oidc {
        provider_url: oidc.provider_url.clone(),
        redirect_url: oidc.redirect_url.clone(),
        base_url: oidc.base_url.clone(),
        client_id: oidc.client_id.clone(),
        non_secure_paths: oidc.non_secure_paths.iter().cloned().collect(),
        secure_paths: oidc.secure_paths.iter().cloned().collect(),
        credentials,
        subject_claim: oidc.subject_claim.clone(),
    }
}

/// Prefixes `path` with `/` unless it already starts with one.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
