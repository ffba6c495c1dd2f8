//! # nestbox-core
//!
//! Low-level Linux isolation primitives for the nestbox launcher.
//!
//! This crate provides safe abstractions over:
//! - **Namespaces**: resolving UTS, PID and mount isolation into clone flags,
//!   and setting the hostname of a UTS namespace.
//! - **Cgroups**: a pids-controller limiter for v1 and v2 hierarchies.
//! - **Filesystem**: `chroot`-style root substitution and the in-container
//!   procfs mount.
//!
//! Nothing here decides *when* an operation runs; ordering belongs to the
//! bootstrapper in `nestbox-runtime`.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cgroup;
pub mod filesystem;
pub mod namespace;
