//! # cellc-common
//!
//! Shared error definitions, build configuration, constants, and the
//! image identity type used across the cellc workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and every other crate builds on its primitives.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
