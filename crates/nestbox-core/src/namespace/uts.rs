//! UTS namespace isolation.
//!
//! Allows the container to have its own hostname.

use nestbox_common::error::{NestboxError, Result};

/// Sets the hostname of the calling process's UTS namespace.
///
/// Only call this inside a fresh UTS namespace; otherwise it renames the host.
///
/// # Errors
///
/// Returns an error if `sethostname(2)` fails.
pub fn set_hostname(hostname: &str) -> Result<()> {
    nix::unistd::sethostname(hostname).map_err(|e| NestboxError::setup("hostname", e))?;
    tracing::debug!(hostname, "hostname set");
    Ok(())
}
