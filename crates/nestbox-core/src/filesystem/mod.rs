//! Filesystem management for container isolation.
//!
//! Root substitution, mount propagation, and the auxiliary procfs mount.

pub mod chroot;
pub mod mount;
