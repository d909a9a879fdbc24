//! Projection of a cell image into gateway, service, and STS templates.
//!
//! Every component is matched against an ordered table of gateway rules
//! (Web, HTTP API, TCP, gRPC). The first rule a component satisfies
//! decides its service port and what it contributes to the gateway; the
//! gateway type is the type of the highest-priority rule matched by any
//! component.

use cellc_common::constants::{
    ANNOTATION_CELL_DEPENDENCIES, ANNOTATION_CELL_IMAGE_NAME, ANNOTATION_CELL_IMAGE_ORG,
    ANNOTATION_CELL_IMAGE_VERSION, DEFAULT_GATEWAY_PORT,
};
use cellc_common::error::Result;
use cellc_common::types::valid_name;
use cellc_model::component::Component;
use cellc_model::image::CellImage;
use cellc_model::ingress::{Grpc, IngressKind};

use crate::spec::{
    CellSpec, Container, ContainerPort, EnvVar, GatewaySpec, GatewayTemplate, GatewayType,
    ObjectMeta, ServiceTemplate, ServiceTemplateSpec, StsTemplate, StsTemplateSpec,
};

/// One row of the gateway rule table.
struct GatewayRule {
    kind: IngressKind,
    gateway_type: GatewayType,
    /// Adds the component's contribution and returns its service port,
    /// or `None` if the component has no ingress of this kind.
    apply: fn(&Component, &mut GatewayState) -> Option<u16>,
}

/// Rules in priority order.
const GATEWAY_RULES: [GatewayRule; 4] = [
    GatewayRule {
        kind: IngressKind::Web,
        gateway_type: GatewayType::Envoy,
        apply: apply_web,
    },
    GatewayRule {
        kind: IngressKind::HttpApi,
        gateway_type: GatewayType::MicroGateway,
        apply: apply_http,
    },
    GatewayRule {
        kind: IngressKind::Tcp,
        gateway_type: GatewayType::Envoy,
        apply: apply_tcp,
    },
    GatewayRule {
        kind: IngressKind::Grpc,
        gateway_type: GatewayType::Envoy,
        apply: apply_grpc,
    },
];

/// Gateway under construction.
#[derive(Default)]
struct GatewayState {
    spec: GatewaySpec,
    web_owner: Option<String>,
}

fn apply_web(component: &Component, state: &mut GatewayState) -> Option<u16> {
    let web = component.web.first()?;
    if let Some(owner) = &state.web_owner {
        tracing::warn!(
            component = %component.name,
            owner = %owner,
            "only the first web ingress of a cell is routed, ignoring this one"
        );
    } else {
        state.spec.host = Some(web.vhost.clone());
        state.spec.tls.clone_from(&web.tls);
        state.spec.oidc.clone_from(&web.oidc);
        state.spec.http.push(web.http_api.clone());
        state.web_owner = Some(component.name.clone());
    }
    Some(DEFAULT_GATEWAY_PORT)
}

fn apply_http(component: &Component, state: &mut GatewayState) -> Option<u16> {
    if component.apis.is_empty() {
        return None;
    }
    state.spec.http.extend(component.apis.iter().cloned());
    Some(DEFAULT_GATEWAY_PORT)
}

fn apply_tcp(component: &Component, state: &mut GatewayState) -> Option<u16> {
    let first = component.tcp.first()?;
    state
        .spec
        .tcp
        .extend(component.tcp.iter().filter(|tcp| tcp.port != 0).cloned());
    Some(first.backend_port)
}

fn apply_grpc(component: &Component, state: &mut GatewayState) -> Option<u16> {
    let first = component.grpc.first()?;
    // Proto files ship as build resources, not as part of the route.
    state.spec.grpc.extend(
        component
            .grpc
            .iter()
            .filter(|grpc| grpc.port != 0)
            .map(|grpc| Grpc {
                proto_file: None,
                ..grpc.clone()
            }),
    );
    Some(first.backend_port)
}

/// Builds the Cell spec of `image`.
///
/// Service templates follow component declaration order.
pub fn generate(image: &CellImage) -> CellSpec {
    let mut state = GatewayState::default();
    let mut best_rule: Option<usize> = None;
    let mut services_templates = Vec::with_capacity(image.components().len());
    let mut unsecured_paths = Vec::new();

    for component in image.components() {
        let matched = GATEWAY_RULES
            .iter()
            .enumerate()
            .find_map(|(index, rule)| (rule.apply)(component, &mut state).map(|port| (index, port)));

        let service_port = matched.map(|(index, port)| {
            tracing::debug!(
                component = %component.name,
                kind = ?GATEWAY_RULES[index].kind,
                service_port = port,
                "gateway rule matched"
            );
            best_rule = Some(best_rule.map_or(index, |best| best.min(index)));
            port
        });

        unsecured_paths.extend(component.unsecured_paths.iter().cloned());
        services_templates.push(service_template(component, service_port));
    }

    state.spec.gateway_type = best_rule.map_or(GatewayType::None, |i| GATEWAY_RULES[i].gateway_type);
    tracing::info!(
        gateway = ?state.spec.gateway_type,
        services = services_templates.len(),
        "generated cell spec"
    );

    CellSpec {
        gateway_template: Some(GatewayTemplate { spec: state.spec }),
        services_templates,
        sts_template: StsTemplate {
            spec: StsTemplateSpec { unsecured_paths },
        },
    }
}

fn service_template(component: &Component, service_port: Option<u16>) -> ServiceTemplate {
    let env = component
        .env_vars
        .iter()
        .map(|(name, value)| EnvVar {
            name: name.clone(),
            value: value.clone(),
        })
        .collect();
    let ports = component
        .container_port
        .filter(|port| *port != 0)
        .map(|container_port| ContainerPort { container_port })
        .into_iter()
        .collect();

    ServiceTemplate {
        metadata: ObjectMeta {
            name: component.service.clone(),
            labels: component.labels.clone(),
            ..ObjectMeta::default()
        },
        spec: ServiceTemplateSpec {
            replicas: Some(component.replicas),
            service_port,
            protocol: component.protocol.map(str::to_string),
            service_type: None,
            container: Container {
                image: component.image.clone(),
                env,
                ports,
                resources: component.resources.clone(),
                readiness_probe: component.readiness_probe.clone(),
                liveness_probe: component.liveness_probe.clone(),
            },
            autoscaling: component.scaling.as_ref().map(|s| s.to_spec()),
        },
    }
}

/// Builds the Cell metadata: valid name plus identity and dependency
/// annotations.
///
/// # Errors
///
/// Returns an error if the dependency list cannot be encoded.
pub fn cell_metadata(image: &CellImage) -> Result<ObjectMeta> {
    let identity = &image.identity;
    let mut meta = ObjectMeta {
        name: valid_name(&identity.name),
        ..ObjectMeta::default()
    };
    let annotations = [
        (ANNOTATION_CELL_IMAGE_ORG, identity.org.clone()),
        (ANNOTATION_CELL_IMAGE_NAME, identity.name.clone()),
        (ANNOTATION_CELL_IMAGE_VERSION, identity.version.clone()),
        (
            ANNOTATION_CELL_DEPENDENCIES,
            serde_json::to_string(&image.dependencies.dependencies)?,
        ),
    ];
    for (key, value) in annotations {
        let _ = meta.annotations.insert(key.to_string(), value);
    }
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use cellc_common::types::ImageName;
    use cellc_model::descriptor::{
        Exposure, GatewayConfigDescriptor, GrpcDescriptor, HttpApiDescriptor, IngressDescriptor,
        TcpDescriptor, WebDescriptor,
    };

    use super::*;

    fn image(components: Vec<Component>) -> CellImage {
        let mut image = CellImage::new(ImageName::new("myorg", "My_Cell", "1.0.0").expect("valid"));
        for component in components {
            image.add_component(component).expect("unique");
        }
        image
    }

    fn component(name: &str, ingresses: &[IngressDescriptor]) -> Component {
        let mut component = Component::new(name, 1, format!("org/{name}"));
        let _ = component.ingest_ingresses(ingresses).expect("valid ports");
        component
    }

    fn web(vhost: &str) -> IngressDescriptor {
        IngressDescriptor::Web(WebDescriptor {
            port: 80,
            gateway_config: GatewayConfigDescriptor {
                vhost: vhost.into(),
                context: "/".into(),
                tls: None,
                oidc: None,
            },
        })
    }

    fn http(context: &str, expose: Option<Exposure>, authenticate: bool) -> IngressDescriptor {
        IngressDescriptor::HttpApi(HttpApiDescriptor {
            port: 8080,
            context: Some(context.into()),
            expose,
            authenticate,
            definition: None,
        })
    }

    fn tcp(gateway_port: Option<u16>, backend_port: u16) -> IngressDescriptor {
        IngressDescriptor::Tcp(TcpDescriptor {
            gateway_port,
            backend_port,
        })
    }

    fn grpc(gateway_port: Option<u16>, backend_port: u16) -> IngressDescriptor {
        IngressDescriptor::Grpc(GrpcDescriptor {
            gateway_port,
            backend_port,
            proto_file: None,
        })
    }

    #[test]
    fn web_component_selects_envoy_with_host() {
        let spec = generate(&image(vec![component("hello", &[web("hello-world.com")])]));
        let gateway = spec.gateway_template.expect("gateway").spec;
        assert_eq!(gateway.gateway_type, GatewayType::Envoy);
        assert_eq!(gateway.host.as_deref(), Some("hello-world.com"));
        assert_eq!(gateway.http.len(), 1);
        assert_eq!(gateway.http[0].backend, "hello");
        assert_eq!(gateway.http[0].context, "/");
        assert!(gateway.http[0].global);
        assert_eq!(spec.services_templates[0].spec.service_port, Some(DEFAULT_GATEWAY_PORT));
    }

    #[test]
    fn http_components_aggregate_into_micro_gateway() {
        let spec = generate(&image(vec![
            component("reviews", &[http("reviews-1", Some(Exposure::Global), true)]),
            component("ratings", &[http("ratings", Some(Exposure::Local), true)]),
        ]));
        let gateway = spec.gateway_template.expect("gateway").spec;
        assert_eq!(gateway.gateway_type, GatewayType::MicroGateway);
        let contexts: Vec<_> = gateway.http.iter().map(|a| a.context.as_str()).collect();
        assert_eq!(contexts, ["reviews-1", "ratings"]);
        assert!(gateway.host.is_none());
        assert!(spec
            .services_templates
            .iter()
            .all(|t| t.spec.service_port == Some(DEFAULT_GATEWAY_PORT)));
    }

    #[test]
    fn priority_does_not_depend_on_declaration_order() {
        let spec = generate(&image(vec![
            component("db", &[tcp(Some(31406), 3306)]),
            component("api", &[http("api", Some(Exposure::Global), true)]),
        ]));
        let gateway = spec.gateway_template.expect("gateway").spec;
        assert_eq!(gateway.gateway_type, GatewayType::MicroGateway);
        assert_eq!(gateway.tcp.len(), 1);
        assert_eq!(spec.services_templates[0].spec.service_port, Some(3306));
    }

    #[test]
    fn only_first_web_ingress_is_routed() {
        let spec = generate(&image(vec![
            component("a", &[web("a.com")]),
            component("b", &[web("b.com")]),
        ]));
        let gateway = spec.gateway_template.expect("gateway").spec;
        assert_eq!(gateway.host.as_deref(), Some("a.com"));
        assert_eq!(gateway.http.len(), 1);
        assert_eq!(spec.services_templates[1].spec.service_port, Some(DEFAULT_GATEWAY_PORT));
    }

    #[test]
    fn component_contributes_only_highest_priority_kind() {
        let spec = generate(&image(vec![component(
            "mixed",
            &[http("api", Some(Exposure::Global), true), tcp(Some(9000), 8080)],
        )]));
        let gateway = spec.gateway_template.expect("gateway").spec;
        assert_eq!(gateway.gateway_type, GatewayType::MicroGateway);
        assert!(gateway.tcp.is_empty());
        assert_eq!(spec.services_templates[0].spec.protocol.as_deref(), Some("TCP"));
    }

    #[test]
    fn internal_tcp_is_not_routed_but_sets_service_port() {
        let spec = generate(&image(vec![component("mysql", &[tcp(None, 3306)])]));
        let gateway = spec.gateway_template.expect("gateway").spec;
        assert_eq!(gateway.gateway_type, GatewayType::Envoy);
        assert!(gateway.tcp.is_empty());
        assert_eq!(spec.services_templates[0].spec.service_port, Some(3306));
    }

    #[test]
    fn grpc_with_gateway_port_is_routed() {
        let spec = generate(&image(vec![component("grpc", &[grpc(Some(31400), 50051)])]));
        let gateway = spec.gateway_template.expect("gateway").spec;
        assert_eq!(gateway.gateway_type, GatewayType::Envoy);
        assert_eq!(gateway.grpc[0].backend_port, 50051);
        assert_eq!(spec.services_templates[0].spec.service_port, Some(50051));
    }

    #[test]
    fn grpc_route_leaves_proto_file_out_of_the_document() {
        let ingress = IngressDescriptor::Grpc(GrpcDescriptor {
            gateway_port: Some(31400),
            backend_port: 50051,
            proto_file: Some("proto/greeter.proto".into()),
        });
        let greeter = component("greeter", &[ingress]);
        assert!(greeter.grpc[0].proto_file.is_some());

        let spec = generate(&image(vec![greeter]));
        let gateway = &spec.gateway_template.as_ref().expect("gateway").spec;
        assert!(gateway.grpc[0].proto_file.is_none());

        let yaml = serde_yaml::to_string(&spec).expect("yaml");
        let reparsed: CellSpec = serde_yaml::from_str(&yaml).expect("parse");
        assert_eq!(reparsed, spec);
    }

    #[test]
    fn component_without_ingress_gets_no_service_port() {
        let spec = generate(&image(vec![Component::new("worker", 2, "org/worker")]));
        let gateway = spec.gateway_template.expect("gateway").spec;
        assert_eq!(gateway.gateway_type, GatewayType::None);
        let template = &spec.services_templates[0];
        assert!(template.spec.service_port.is_none());
        assert!(template.spec.container.ports.is_empty());
        assert_eq!(template.spec.replicas, Some(2));
    }

    #[test]
    fn unsecured_paths_keep_duplicates() {
        let spec = generate(&image(vec![
            component("a", &[http("shared", Some(Exposure::Global), false)]),
            component("b", &[http("/shared", Some(Exposure::Global), false)]),
        ]));
        assert_eq!(spec.sts_template.spec.unsecured_paths, ["/shared", "/shared"]);
    }

    #[test]
    fn metadata_carries_identity_annotations() {
        let meta = cell_metadata(&image(Vec::new())).expect("metadata");
        assert_eq!(meta.name, "my-cell");
        assert_eq!(meta.annotations[ANNOTATION_CELL_IMAGE_NAME], "My_Cell");
        assert_eq!(meta.annotations[ANNOTATION_CELL_IMAGE_ORG], "myorg");
        assert_eq!(meta.annotations[ANNOTATION_CELL_DEPENDENCIES], "[]");
    }
}
