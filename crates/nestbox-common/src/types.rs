//! Domain primitive types used across the nestbox workspace.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::LauncherConfig;
use crate::constants::{CHILD_SUBCOMMAND, HOST_NAME_MAX};
use crate::error::{NestboxError, Result};

/// A kind of kernel namespace the launcher knows how to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationFlag {
    /// Hostname and domain name.
    Uts,
    /// Process ID space.
    Pid,
    /// Mount table.
    Mount,
}

impl IsolationFlag {
    /// Every supported flag, in canonical order.
    pub const ALL: [Self; 3] = [Self::Uts, Self::Pid, Self::Mount];

    /// Lowercase name used on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uts => "uts",
            Self::Pid => "pid",
            Self::Mount => "mount",
        }
    }
}

impl fmt::Display for IsolationFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IsolationFlag {
    type Err = NestboxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uts" => Ok(Self::Uts),
            "pid" => Ok(Self::Pid),
            "mount" | "mnt" => Ok(Self::Mount),
            other => Err(NestboxError::Config {
                message: format!("unknown isolation flag '{other}' (expected uts, pid or mount)"),
            }),
        }
    }
}

/// The set of namespaces a launch asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IsolationFlags(BTreeSet<IsolationFlag>);

impl IsolationFlags {
    /// No isolation at all.
    #[must_use]
    pub const fn none() -> Self {
        Self(BTreeSet::new())
    }

    /// UTS, PID and mount isolation.
    #[must_use]
    pub fn all() -> Self {
        IsolationFlag::ALL.into_iter().collect()
    }

    /// Returns `true` if `flag` was requested.
    #[must_use]
    pub fn contains(&self, flag: IsolationFlag) -> bool {
        self.0.contains(&flag)
    }

    /// Returns `true` if no namespace was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the requested flags in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = IsolationFlag> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<IsolationFlag> for IsolationFlags {
    fn from_iter<I: IntoIterator<Item = IsolationFlag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for IsolationFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(IsolationFlag::as_str).collect();
        f.write_str(&names.join(","))
    }
}

/// Parses `uts,pid,mount`, `all` or `none`.
impl FromStr for IsolationFlags {
    type Err = NestboxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "none" => Ok(Self::none()),
            "all" => Ok(Self::all()),
            list => list.split(',').map(str::parse::<IsolationFlag>).collect(),
        }
    }
}

/// An immutable request to run one command in an isolated environment.
///
/// Built once from the caller's invocation and handed to the bootstrapper
/// as a flat argument list, see [`LaunchRequest::to_child_args`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    command: String,
    args: Vec<String>,
    rootfs: PathBuf,
    hostname: String,
    isolation: IsolationFlags,
    cgroup_root: PathBuf,
    cgroup_name: String,
    pid_limit: u32,
}

impl LaunchRequest {
    /// Builds a validated request from resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`NestboxError::InvalidRequest`] if any field fails validation.
    pub fn from_config(config: &LauncherConfig, command: String, args: Vec<String>) -> Result<Self> {
        let request = Self {
            command,
            args,
            rootfs: config.rootfs.clone(),
            hostname: config.hostname.clone(),
            isolation: config.isolation.clone(),
            cgroup_root: config.cgroup_root.clone(),
            cgroup_name: config.cgroup_name.clone(),
            pid_limit: config.pid_limit,
        };
        request.validate()?;
        Ok(request)
    }

    /// Checks the request for values the kernel would reject later.
    ///
    /// # Errors
    ///
    /// Returns [`NestboxError::InvalidRequest`] describing the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.command.is_empty() {
            return Err(invalid("target command is empty"));
        }
        for (field, path) in [("rootfs", &self.rootfs), ("cgroup root", &self.cgroup_root)] {
            if path.to_str().is_none() {
                return Err(invalid(format!(
                    "{field} must be valid UTF-8, got {}",
                    path.display()
                )));
            }
        }
        if !self.rootfs.is_absolute() {
            return Err(invalid(format!(
                "rootfs must be an absolute path, got {}",
                self.rootfs.display()
            )));
        }
        if self.hostname.is_empty() || self.hostname.len() > HOST_NAME_MAX {
            return Err(invalid(format!(
                "hostname must be 1..={HOST_NAME_MAX} bytes, got {}",
                self.hostname.len()
            )));
        }
        if self.cgroup_name.is_empty()
            || self.cgroup_name.contains('/')
            || self.cgroup_name == "."
            || self.cgroup_name == ".."
        {
            return Err(invalid(format!(
                "cgroup name '{}' is not a single path component",
                self.cgroup_name
            )));
        }
        if self.pid_limit == 0 {
            return Err(invalid("pid limit must be at least 1"));
        }
        Ok(())
    }

    /// Serializes the request as arguments for the internal `child` subcommand.
    ///
    /// The target command and its arguments follow a `--` separator so that
    /// flags meant for the target are never interpreted by the launcher.
    /// Paths pass through unchanged since [`LaunchRequest::validate`] only
    /// admits UTF-8 ones.
    #[must_use]
    pub fn to_child_args(&self) -> Vec<String> {
        let mut out = vec![
            CHILD_SUBCOMMAND.to_string(),
            "--rootfs".into(),
            self.rootfs.to_string_lossy().into_owned(),
            "--hostname".into(),
            self.hostname.clone(),
            "--cgroup-root".into(),
            self.cgroup_root.to_string_lossy().into_owned(),
            "--cgroup-name".into(),
            self.cgroup_name.clone(),
            "--pid-limit".into(),
            self.pid_limit.to_string(),
            "--isolate".into(),
            self.isolation.to_string(),
            "--".into(),
            self.command.clone(),
        ];
        out.extend(self.args.iter().cloned());
        out
    }

    /// Target program name or path.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Arguments passed to the target program.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Directory that becomes `/` for the contained process.
    #[must_use]
    pub fn rootfs(&self) -> &Path {
        &self.rootfs
    }

    /// Hostname set inside the UTS namespace.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Requested namespaces.
    #[must_use]
    pub const fn isolation(&self) -> &IsolationFlags {
        &self.isolation
    }

    /// Cgroup filesystem mount point.
    #[must_use]
    pub fn cgroup_root(&self) -> &Path {
        &self.cgroup_root
    }

    /// Name of the pids cgroup joined by the workload.
    #[must_use]
    pub fn cgroup_name(&self) -> &str {
        &self.cgroup_name
    }

    /// Maximum number of processes in the cgroup.
    #[must_use]
    pub const fn pid_limit(&self) -> u32 {
        self.pid_limit
    }
}

fn invalid(message: impl Into<String>) -> NestboxError {
    NestboxError::InvalidRequest {
        message: message.into(),
    }
}

/// A pids limit that has been applied, with the process it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgroupConstraint {
    /// Directory of the cgroup inside the pids controller.
    pub controller_path: PathBuf,
    /// Value written to `pids.max`.
    pub limit_value: u32,
    /// PID written to `cgroup.procs`.
    pub member_pid: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(command: &str, args: &[&str]) -> Result<LaunchRequest> {
        LaunchRequest::from_config(
            &LauncherConfig::default(),
            command.to_string(),
            args.iter().map(ToString::to_string).collect(),
        )
    }

    #[test]
    fn isolation_flags_parse_list() {
        let flags: IsolationFlags = "uts,mount".parse().unwrap();
        assert!(flags.contains(IsolationFlag::Uts));
        assert!(flags.contains(IsolationFlag::Mount));
        assert!(!flags.contains(IsolationFlag::Pid));
    }

    #[test]
    fn isolation_flags_none_is_empty() {
        let flags: IsolationFlags = "none".parse().unwrap();
        assert!(flags.is_empty());
        assert_eq!(flags.to_string(), "none");
    }

    #[test]
    fn isolation_flags_display_is_canonical() {
        let flags: IsolationFlags = "mount,uts,pid".parse().unwrap();
        assert_eq!(flags.to_string(), "uts,pid,mount");
    }

    #[test]
    fn isolation_flags_reject_unknown() {
        assert!("uts,net".parse::<IsolationFlags>().is_err());
    }

    #[test]
    fn default_request_is_valid() {
        let req = request("echo", &["hello"]).unwrap();
        assert_eq!(req.command(), "echo");
        assert_eq!(req.hostname(), "container");
        assert_eq!(req.cgroup_name(), "scratch");
        assert_eq!(req.pid_limit(), 20);
        assert_eq!(req.isolation(), &IsolationFlags::all());
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(matches!(
            request("", &[]),
            Err(NestboxError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn relative_rootfs_is_rejected() {
        let config = LauncherConfig {
            rootfs: PathBuf::from("rootfs"),
            ..LauncherConfig::default()
        };
        let err = LaunchRequest::from_config(&config, "sh".into(), vec![]).unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn cgroup_name_with_slash_is_rejected() {
        let config = LauncherConfig {
            cgroup_name: "../escape".into(),
            ..LauncherConfig::default()
        };
        assert!(LaunchRequest::from_config(&config, "sh".into(), vec![]).is_err());
    }

    #[test]
    fn zero_pid_limit_is_rejected() {
        let config = LauncherConfig {
            pid_limit: 0,
            ..LauncherConfig::default()
        };
        assert!(LaunchRequest::from_config(&config, "sh".into(), vec![]).is_err());
    }

    #[test]
    fn oversized_hostname_is_rejected() {
        let config = LauncherConfig {
            hostname: "h".repeat(HOST_NAME_MAX + 1),
            ..LauncherConfig::default()
        };
        assert!(LaunchRequest::from_config(&config, "sh".into(), vec![]).is_err());
    }

    #[test]
    fn non_utf8_paths_are_rejected() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let bad = PathBuf::from(OsString::from_vec(b"/tmp/root\xff".to_vec()));
        let config = LauncherConfig {
            rootfs: bad.clone(),
            ..LauncherConfig::default()
        };
        let err = LaunchRequest::from_config(&config, "sh".into(), vec![]).unwrap_err();
        assert!(matches!(err, NestboxError::InvalidRequest { .. }));
        assert!(err.to_string().contains("rootfs"));

        let config = LauncherConfig {
            cgroup_root: bad,
            ..LauncherConfig::default()
        };
        let err = LaunchRequest::from_config(&config, "sh".into(), vec![]).unwrap_err();
        assert!(err.to_string().contains("cgroup root"));
    }

    #[test]
    fn child_args_put_target_after_separator() {
        let req = request("ls", &["-l", "--color"]).unwrap();
        let args = req.to_child_args();
        assert_eq!(args[0], "child");
        let sep = args.iter().position(|a| a == "--").unwrap();
        assert_eq!(&args[sep + 1..], ["ls", "-l", "--color"]);
        assert!(args[..sep].contains(&"uts,pid,mount".to_string()));
    }
}
