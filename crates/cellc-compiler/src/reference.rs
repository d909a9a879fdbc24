//! The reference document: endpoints of an image for the cells that
//! depend on it, with the instance name left as a placeholder.

use std::collections::BTreeMap;

use cellc_common::constants::{
    DEFAULT_GATEWAY_PORT, DEFAULT_GATEWAY_PROTOCOL, INSTANCE_NAME_PLACEHOLDER, gateway_host,
};
use cellc_common::error::Result;
use cellc_model::image::CellImage;
use cellc_model::ingress::HttpApi;
use serde::{Deserialize, Serialize};

/// Value of one reference entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReferenceValue {
    /// A port number.
    Port(u16),
    /// A URL or host name.
    Text(String),
}

/// Flat key → value map written as `reference.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceDocument {
    /// Entries keyed by `<name>_api_url`, `<component>_tcp_port`,
    /// `<component>_grpc_port`, and `gateway_host`.
    pub entries: BTreeMap<String, ReferenceValue>,
}

impl ReferenceDocument {
    /// Looks up an entry.
    pub fn get(&self, key: &str) -> Option<&ReferenceValue> {
        self.entries.get(key)
    }

    /// Renders the document as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn insert(&mut self, key: String, value: ReferenceValue) {
        let _ = self.entries.insert(key, value);
    }
}

/// Builds the reference document of `image`.
pub fn emit_reference(image: &CellImage) -> ReferenceDocument {
    let mut document = ReferenceDocument::default();
    for component in image.components() {
        let apis = component
            .apis
            .iter()
            .chain(component.web.iter().map(|web| &web.http_api));
        for api in apis {
            if let Some((key, url)) = api_entry(&component.name, api) {
                document.insert(key, ReferenceValue::Text(url));
            }
        }
        for tcp in component.tcp.iter().filter(|tcp| tcp.port != 0) {
            document.insert(
                format!("{}_tcp_port", component.name),
                ReferenceValue::Port(tcp.port),
            );
        }
        for grpc in component.grpc.iter().filter(|grpc| grpc.port != 0) {
            document.insert(
                format!("{}_grpc_port", component.name),
                ReferenceValue::Port(grpc.port),
            );
        }
    }
    document.insert(
        "gateway_host".into(),
        ReferenceValue::Text(gateway_host(INSTANCE_NAME_PLACEHOLDER)),
    );
    tracing::debug!(entries = document.entries.len(), "emitted reference");
    document
}

/// Key and URL of an API with a non-empty context.
fn api_entry(component: &str, api: &HttpApi) -> Option<(String, String)> {
    let context = api.context.as_str();
    if context.is_empty() {
        return None;
    }
    let key = if context == "/" {
        format!("{component}_api_url")
    } else {
        format!("{}_api_url", context.trim_start_matches('/'))
    };
    let host = gateway_host(INSTANCE_NAME_PLACEHOLDER);
    let url = format!("{host}:{DEFAULT_GATEWAY_PORT}/{context}");
    Some((key, format!("{DEFAULT_GATEWAY_PROTOCOL}://{}", collapse_slashes(&url))))
}

/// Replaces every run of `/` with a single one.
fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}
