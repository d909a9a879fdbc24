//! # cellc-image
//!
//! Container images behind the components of a cell image.
//!
//! Handles:
//! - **Sources**: prebuilt image references and local build directories.
//! - **Builder**: building local directories into tagged images.
//! - **Shell**: running external tools with both output streams drained.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod builder;
pub mod shell;
pub mod source;
