//! Readiness and liveness probes, serialized the way the cluster expects.

use serde::{Deserialize, Serialize};

use crate::descriptor::{ProbeDescriptor, ProbeKindDescriptor};

/// Health probe of a component container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    /// Probe mechanism.
    #[serde(flatten)]
    pub action: ProbeAction,
    /// Seconds before the first probe.
    pub initial_delay_seconds: u32,
    /// Seconds between probes.
    pub period_seconds: u32,
    /// Seconds before a probe times out.
    pub timeout_seconds: u32,
    /// Consecutive successes to be considered healthy.
    pub success_threshold: u32,
    /// Consecutive failures to be considered unhealthy.
    pub failure_threshold: u32,
}

/// How a probe checks the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProbeAction {
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
        #[serde(
            rename = "httpHeaders",
            default,
            skip_serializing_if = "Vec::is_empty"
        )]
        http_headers: Vec<HttpHeader>,
    },
    /// Run a command in the container.
    Exec {
        /// Command and arguments.
        command: Vec<String>,
    },
}

/// One HTTP header of an `httpGet` probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpHeader {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

impl From<&ProbeDescriptor> for Probe {
    fn from(descriptor: &ProbeDescriptor) -> Self {
        let action = match &descriptor.kind {
            ProbeKindDescriptor::TcpSocket { port } => ProbeAction::TcpSocket { port: *port },
            ProbeKindDescriptor::HttpGet {
                port,
                path,
                http_headers,
            } => ProbeAction::HttpGet {
                port: *port,
                path: path.clone(),
                http_headers: http_headers
                    .iter()
                    .map(|(name, value)| HttpHeader {
                        name: name.clone(),
                        value: value.clone(),
                    })
                    .collect(),
            },
            ProbeKindDescriptor::Exec { commands } => ProbeAction::Exec {
                command: commands.clone(),
            },
        };
        Self {
            action,
            initial_delay_seconds: descriptor.initial_delay_seconds,
            period_seconds: descriptor.period_seconds,
            timeout_seconds: descriptor.timeout_seconds,
            success_threshold: descriptor.success_threshold,
            failure_threshold: descriptor.failure_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn descriptor(kind: ProbeKindDescriptor) -> ProbeDescriptor {
        ProbeDescriptor {
            kind,
            initial_delay_seconds: 5,
            period_seconds: 10,
            timeout_seconds: 1,
            success_threshold: 1,
            failure_threshold: 3,
        }
    }

    #[test]
    fn tcp_probe_serializes_nested_action() {
        let probe = Probe::from(&descriptor(ProbeKindDescriptor::TcpSocket { port: 8080 }));
        let json = serde_json::to_value(&probe).expect("serialize");
        assert_eq!(json["tcpSocket"]["port"], 8080);
        assert_eq!(json["initialDelaySeconds"], 5);
        assert_eq!(json["failureThreshold"], 3);
    }

    #[test]
    fn http_probe_carries_headers() {
        let mut headers = BTreeMap::new();
        let _ = headers.insert("X-Probe".to_string(), "1".to_string());
        let probe = Probe::from(&descriptor(ProbeKindDescriptor::HttpGet {
            port: 80,
            path: "/health".into(),
            http_headers: headers,
        }));
        let json = serde_json::to_value(&probe).expect("serialize");
        assert_eq!(json["httpGet"]["path"], "/health");
        assert_eq!(json["httpGet"]["httpHeaders"][0]["name"], "X-Probe");
    }

    #[test]
    fn exec_probe_uses_command_list() {
        let probe = Probe::from(&descriptor(ProbeKindDescriptor::Exec {
            commands: vec!["cat".into(), "/tmp/ready".into()],
        }));
        let json = serde_json::to_value(&probe).expect("serialize");
        assert_eq!(json["exec"]["command"][1], "/tmp/ready");
    }
}
