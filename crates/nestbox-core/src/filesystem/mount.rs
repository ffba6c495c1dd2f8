//! Mount utilities for container filesystem setup.
//!
//! Handles mount propagation and the procfs mount inside the container's
//! mount namespace, plus [`MountState`], the record of what was mounted.

use std::path::{Path, PathBuf};

use nestbox_common::error::{NestboxError, Result};
use nix::mount::{MntFlags, MsFlags};

/// Marks every mount under `/` as private, recursively.
///
/// Without this, mounts made in a new mount namespace can still propagate
/// back to the host when `/` is a shared mount (the systemd default).
///
/// # Errors
///
/// Returns an error if the `mount(2)` syscall fails.
pub fn make_mounts_private() -> Result<()> {
    nix::mount::mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None::<&str>,
    )
    .map_err(|e| NestboxError::setup("mount-propagation", e))?;
    tracing::debug!("mount propagation set to private");
    Ok(())
}

/// Mounts a fresh procfs at `target`.
///
/// Inside a new PID namespace the mount shows only the contained process tree.
///
/// # Errors
///
/// Returns an error if the `mount(2)` syscall fails.
pub fn mount_proc(target: &Path) -> Result<()> {
    nix::mount::mount(
        Some("proc"),
        target,
        Some("proc"),
        MsFlags::empty(),
        None::<&str>,
    )
    .map_err(|e| NestboxError::setup("proc-mount", format!("{}: {e}", target.display())))?;
    tracing::debug!(target = %target.display(), "procfs mounted");
    Ok(())
}

/// Unmounts the filesystem at `target`.
///
/// # Errors
///
/// Returns an error if the `umount2(2)` syscall fails.
pub fn unmount(target: &Path) -> Result<()> {
    nix::mount::umount2(target, MntFlags::empty())
        .map_err(|e| NestboxError::setup("proc-unmount", format!("{}: {e}", target.display())))?;
    tracing::debug!(target = %target.display(), "unmounted");
    Ok(())
}

/// Auxiliary mounts established during bootstrap, oldest first.
#[derive(Debug, Default)]
pub struct MountState {
    mounts: Vec<PathBuf>,
}

impl MountState {
    /// Creates an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self { mounts: Vec::new() }
    }

    /// Records a mount that must be undone before exit.
    pub fn record(&mut self, target: impl Into<PathBuf>) {
        self.mounts.push(target.into());
    }

    /// Returns `true` if nothing is mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Removes every record, newest first, so nested mounts unwind in order.
    pub fn drain(&mut self) -> impl Iterator<Item = PathBuf> + '_ {
        self.mounts.drain(..).rev()
    }
}
