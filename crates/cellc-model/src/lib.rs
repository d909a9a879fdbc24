//! # cellc-model
//!
//! In-memory representation of a cell image.
//!
//! Handles:
//! - **Descriptor**: the raw, serde-loaded component declarations.
//! - **Ingress**: typed HTTP API, TCP, gRPC, and Web ingress variants.
//! - **Component**: one deployable unit and its ingress classification.
//! - **Scaling**: autoscaling and zero-scaling policies.
//! - **Probes** and **resources**: container health checks and quotas.
//! - **Dependency**: shorthand and structured dependency resolution.
//! - **Image**: the `CellImage` aggregate root.
//! - **Test suite**: test containers run against an instance.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod component;
pub mod dependency;
pub mod descriptor;
pub mod image;
pub mod ingress;
pub mod probe;
pub mod resources;
pub mod scaling;
pub mod test_suite;
