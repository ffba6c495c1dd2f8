//! Launcher configuration model.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{NestboxError, Result};
use crate::types::IsolationFlags;

/// Settings shared by every launch.
///
/// Resolved from defaults, an optional JSON file, environment variables
/// and command-line flags, in increasing order of precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LauncherConfig {
    /// Directory used as the contained process's root filesystem.
    pub rootfs: PathBuf,
    /// Hostname set inside the UTS namespace.
    pub hostname: String,
    /// Cgroup filesystem mount point.
    pub cgroup_root: PathBuf,
    /// Name of the pids cgroup the workload joins.
    pub cgroup_name: String,
    /// Maximum number of processes in the cgroup.
    pub pid_limit: u32,
    /// Namespaces created for the workload.
    pub isolation: IsolationFlags,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            rootfs: PathBuf::from(constants::DEFAULT_ROOTFS),
            hostname: constants::DEFAULT_HOSTNAME.to_string(),
            cgroup_root: PathBuf::from(constants::CGROUP_ROOT),
            cgroup_name: constants::DEFAULT_CGROUP_NAME.to_string(),
            pid_limit: constants::DEFAULT_PID_LIMIT,
            isolation: IsolationFlags::all(),
        }
    }
}

impl LauncherConfig {
    /// Loads a configuration file, filling absent keys with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| NestboxError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IsolationFlag;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nestbox.json");
        std::fs::write(&path, r#"{ "hostname": "box", "isolation": ["uts"] }"#).unwrap();

        let config = LauncherConfig::load(&path).unwrap();
        assert_eq!(config.hostname, "box");
        assert_eq!(config.pid_limit, constants::DEFAULT_PID_LIMIT);
        assert!(config.isolation.contains(IsolationFlag::Uts));
        assert!(!config.isolation.contains(IsolationFlag::Pid));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nestbox.json");
        std::fs::write(&path, r#"{ "network": true }"#).unwrap();
        assert!(matches!(
            LauncherConfig::load(&path),
            Err(NestboxError::Serialization { .. })
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = LauncherConfig::load(Path::new("/nonexistent/nestbox.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/nestbox.json"));
    }
}
