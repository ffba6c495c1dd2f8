//! Process-count control via the pids controller.
//!
//! Manages the `pids.max`, `notify_on_release`, and `cgroup.procs` files.

use std::path::Path;

use nestbox_common::error::{NestboxError, Result};

/// Sets the maximum number of processes for a cgroup.
///
/// # Errors
///
/// Returns an error if writing to `pids.max` fails.
pub fn set_pids_max(cgroup_path: &Path, limit: u32) -> Result<()> {
    write_control(cgroup_path, "pids.max", &limit.to_string())?;
    tracing::debug!(limit, "pids max set");
    Ok(())
}

/// Asks a v1 hierarchy to remove the cgroup once its last process exits.
///
/// # Errors
///
/// Returns an error if writing to `notify_on_release` fails.
pub fn set_notify_on_release(cgroup_path: &Path) -> Result<()> {
    write_control(cgroup_path, "notify_on_release", "1")
}

/// Moves `pid` into the cgroup.
///
/// # Errors
///
/// Returns an error if writing to `cgroup.procs` fails.
pub fn add_process(cgroup_path: &Path, pid: u32) -> Result<()> {
    write_control(cgroup_path, "cgroup.procs", &pid.to_string())?;
    tracing::debug!(pid, "added process to cgroup");
    Ok(())
}

fn write_control(cgroup_path: &Path, file: &str, value: &str) -> Result<()> {
    let path = cgroup_path.join(file);
    std::fs::write(&path, value).map_err(|e| NestboxError::ResourceLimit {
        path,
        message: e.to_string(),
    })
}
