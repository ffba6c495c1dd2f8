//! # nestbox-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the nestbox workspace.
//!
//! This crate is the leaf of the dependency graph. It knows nothing about
//! namespaces or syscalls; it only describes *what* a launch asks for.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
