//! `cellc inspect`: Show what a descriptor compiles to.

use std::path::PathBuf;

use cellc_common::types::ImageName;
use cellc_compiler::Compiler;
use cellc_compiler::graph::ComponentGraph;
use cellc_image::builder::SkipBuild;
use clap::Args;

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the component descriptor.
    #[arg(default_value = "cell.yaml")]
    pub descriptor: PathBuf,

    /// Image identity as `org/name:version`.
    #[arg(short, long, value_parser = super::parse_identity)]
    pub image: ImageName,
}

/// Executes the `inspect` command.
///
/// Compiles the descriptor without building any image and prints the
/// gateway plan, the service templates, and the component start order.
///
/// # Errors
///
/// Returns an error if the descriptor is invalid.
pub fn execute(args: InspectArgs) -> anyhow::Result<()> {
    let descriptor = super::load_descriptor(&args.descriptor)?;
    let compilation = Compiler::new(&SkipBuild).compile(&descriptor, args.image)?;
    let image = &compilation.image;
    let spec = &compilation.cell.spec;

    println!("Cell image: {}", image.identity);
    println!("Cell name:  {}", compilation.cell.metadata.name);
    println!();

    if let Some(gateway) = &spec.gateway_template {
        let gateway = &gateway.spec;
        println!("Gateway: {:?}", gateway.gateway_type);
        if let Some(host) = &gateway.host {
            println!("  host: {host}");
        }
        for api in &gateway.http {
            let scope = if api.global { "global" } else { "local" };
            println!("  http  /{} -> {} ({scope})", api.context.trim_start_matches('/'), api.backend);
        }
        for tcp in &gateway.tcp {
            println!("  tcp   :{} -> {}:{}", tcp.port, tcp.backend_host, tcp.backend_port);
        }
        for grpc in &gateway.grpc {
            println!("  grpc  :{} -> {}:{}", grpc.port, grpc.backend_host, grpc.backend_port);
        }
        println!();
    }

    println!("Services:");
    for template in &spec.services_templates {
        let name = &template.metadata.name;
        let marker = if image.exposed.contains(name) { "*" } else { " " };
        println!("  {marker} {name}");
        println!("      image: {}", template.spec.container.image);
        if let Some(port) = template.spec.service_port {
            println!("      port: {port}");
        }
        if let Some(protocol) = &template.spec.protocol {
            println!("      protocol: {protocol}");
        }
        if template.spec.autoscaling.is_some() {
            println!("      autoscaling: enabled");
        }
    }

    println!();
    match ComponentGraph::from_image(image)?.start_order() {
        Some(order) => println!("Start order: {}", order.join(" -> ")),
        None => println!("Start order: undefined (components depend on each other in a cycle)"),
    }

    if !image.dependencies.aliases.is_empty() {
        println!();
        println!("Dependencies:");
        for (alias, dependency) in &image.dependencies.aliases {
            println!("    {alias}: {}/{}:{}", dependency.org, dependency.name, dependency.ver);
        }
    }

    if !compilation.tests.is_empty() {
        println!();
        println!("  {} test(s) defined.", compilation.tests.len());
    }
    Ok(())
}
