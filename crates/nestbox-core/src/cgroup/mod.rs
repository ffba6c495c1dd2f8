//! Cgroup resource management.
//!
//! Places the workload in a named pids cgroup with a process-count ceiling.
//! Both hierarchy layouts are supported:
//! - **v1**: `<root>/pids/<name>`, with `notify_on_release` so the kernel
//!   reclaims the group once it empties.
//! - **v2**: `<root>/<name>` on the unified hierarchy.

pub mod pids;

use std::path::{Path, PathBuf};

use nestbox_common::constants::PIDS_CONTROLLER;
use nestbox_common::error::{NestboxError, Result};
use nestbox_common::types::CgroupConstraint;

/// Cgroup hierarchy flavour found under the cgroup root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgroupLayout {
    /// Per-controller hierarchies (`<root>/pids`).
    V1,
    /// Unified hierarchy (`<root>/cgroup.controllers` present).
    V2,
}

impl CgroupLayout {
    /// Detects the layout mounted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`NestboxError::ResourceLimit`] if neither a unified hierarchy
    /// nor a v1 pids controller is found.
    pub fn detect(root: &Path) -> Result<Self> {
        if root.join("cgroup.controllers").is_file() {
            return Ok(Self::V2);
        }
        let controller = root.join(PIDS_CONTROLLER);
        if controller.is_dir() {
            return Ok(Self::V1);
        }
        Err(NestboxError::ResourceLimit {
            path: controller,
            message: "pids controller is not available".into(),
        })
    }
}

/// Handle to a named pids cgroup.
#[derive(Debug)]
pub struct PidsCgroup {
    path: PathBuf,
    layout: CgroupLayout,
}

impl PidsCgroup {
    /// Opens the cgroup `name` under `root`, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller is unavailable or the directory
    /// cannot be created.
    pub fn create(root: &Path, name: &str) -> Result<Self> {
        let layout = CgroupLayout::detect(root)?;
        let path = match layout {
            CgroupLayout::V1 => root.join(PIDS_CONTROLLER).join(name),
            CgroupLayout::V2 => {
                enable_pids_controller(root)?;
                root.join(name)
            }
        };
        std::fs::create_dir_all(&path).map_err(|e| NestboxError::ResourceLimit {
            path: path.clone(),
            message: e.to_string(),
        })?;
        tracing::info!(path = %path.display(), ?layout, "cgroup ready");
        Ok(Self { path, layout })
    }

    /// Writes the process-count ceiling.
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel rejects the control file writes.
    pub fn apply_limit(&self, limit: u32) -> Result<()> {
        pids::set_pids_max(&self.path, limit)?;
        if self.layout == CgroupLayout::V1 {
            pids::set_notify_on_release(&self.path)?;
        }
        Ok(())
    }

    /// Adds `pid` to the cgroup.
    ///
    /// Repeating the call for the same pid leaves a single membership.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `cgroup.procs` fails.
    pub fn add_process(&self, pid: u32) -> Result<()> {
        pids::add_process(&self.path, pid)
    }
}

/// Creates (or reuses) cgroup `name`, limits it, and joins the calling process.
///
/// Must run before the constrained workload starts: membership does not
/// retroactively cover processes already counted elsewhere.
///
/// # Errors
///
/// Returns [`NestboxError::ResourceLimit`] if the controller is unavailable
/// or any control file write is rejected.
pub fn limit_current_process(root: &Path, name: &str, limit: u32) -> Result<CgroupConstraint> {
    let cgroup = PidsCgroup::create(root, name)?;
    cgroup.apply_limit(limit)?;
    let pid = std::process::id();
    cgroup.add_process(pid)?;
    Ok(CgroupConstraint {
        controller_path: cgroup.path,
        limit_value: limit,
        member_pid: pid,
    })
}

/// Makes the pids controller available to children of the v2 root.
fn enable_pids_controller(root: &Path) -> Result<()> {
    let control = root.join("cgroup.subtree_control");
    let enabled =
        std::fs::read_to_string(&control).map_err(|e| NestboxError::ResourceLimit {
            path: control.clone(),
            message: format!("cannot read enabled controllers: {e}"),
        })?;
    if enabled.split_whitespace().any(|c| c == PIDS_CONTROLLER) {
        return Ok(());
    }
    std::fs::write(&control, "+pids").map_err(|e| NestboxError::ResourceLimit {
        path: control,
        message: format!("cannot enable pids controller: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v1_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("pids")).unwrap();
        dir
    }

    fn v2_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cgroup.controllers"), "cpu memory pids").unwrap();
        std::fs::write(dir.path().join("cgroup.subtree_control"), "memory pids").unwrap();
        dir
    }

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn detect_prefers_unified_hierarchy() {
        let root = v2_root();
        std::fs::create_dir(root.path().join("pids")).unwrap();
        assert_eq!(CgroupLayout::detect(root.path()).unwrap(), CgroupLayout::V2);
    }

    #[test]
    fn missing_controller_is_resource_limit_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            limit_current_process(dir.path(), "scratch", 20),
            Err(NestboxError::ResourceLimit { .. })
        ));
    }

    #[test]
    fn v1_writes_limit_release_and_membership() {
        let root = v1_root();
        let constraint = limit_current_process(root.path(), "scratch", 20).unwrap();

        let group = root.path().join("pids/scratch");
        assert_eq!(constraint.controller_path, group);
        assert_eq!(read(&group.join("pids.max")), "20");
        assert_eq!(read(&group.join("notify_on_release")), "1");
        assert_eq!(
            read(&group.join("cgroup.procs")),
            std::process::id().to_string()
        );
    }

    #[test]
    fn v2_places_group_under_root() {
        let root = v2_root();
        let constraint = limit_current_process(root.path(), "scratch", 7).unwrap();

        let group = root.path().join("scratch");
        assert_eq!(constraint.controller_path, group);
        assert_eq!(constraint.limit_value, 7);
        assert_eq!(read(&group.join("pids.max")), "7");
        assert!(!group.join("notify_on_release").exists());
    }

    #[test]
    fn v2_enables_pids_in_subtree_control() {
        let root = v2_root();
        std::fs::write(root.path().join("cgroup.subtree_control"), "memory").unwrap();
        let _ = limit_current_process(root.path(), "scratch", 5).unwrap();
        assert_eq!(read(&root.path().join("cgroup.subtree_control")), "+pids");
    }

    #[test]
    fn repeated_limit_is_idempotent() {
        let root = v1_root();
        let first = limit_current_process(root.path(), "scratch", 20).unwrap();
        let second = limit_current_process(root.path(), "scratch", 20).unwrap();

        assert_eq!(first, second);
        let procs = read(&root.path().join("pids/scratch/cgroup.procs"));
        assert_eq!(procs.lines().count(), 1);
    }

    #[test]
    fn unreadable_subtree_control_is_reported() {
        let root = v2_root();
        let control = root.path().join("cgroup.subtree_control");
        std::fs::remove_file(&control).unwrap();
        std::fs::create_dir(&control).unwrap();
        let err = limit_current_process(root.path(), "scratch", 5).unwrap_err();
        assert!(matches!(err, NestboxError::ResourceLimit { ref path, .. } if *path == control));
        assert!(err.to_string().contains("cannot read"));
    }
}
