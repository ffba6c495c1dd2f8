//! System-wide constants and default values.

/// Path the supervisor re-executes to start the bootstrapper.
///
/// Always the running image, never a copy found through `$PATH`.
pub const SELF_EXE: &str = "/proc/self/exe";

/// Internal subcommand used as the re-exec entry point.
pub const CHILD_SUBCOMMAND: &str = "child";

/// Default substitute root filesystem.
pub const DEFAULT_ROOTFS: &str = "/rootfs-ubuntu";

/// Default hostname inside the UTS namespace.
pub const DEFAULT_HOSTNAME: &str = "container";

/// Cgroup filesystem mount point.
pub const CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// Name of the pids controller directory on a v1 hierarchy.
pub const PIDS_CONTROLLER: &str = "pids";

/// Default cgroup name for launched workloads.
pub const DEFAULT_CGROUP_NAME: &str = "scratch";

/// Default maximum process count.
pub const DEFAULT_PID_LIMIT: u32 = 20;

/// Mount point of the in-container procfs, relative to the new root.
pub const PROC_MOUNT_POINT: &str = "/proc";

/// Longest hostname accepted by `sethostname(2)` (`HOST_NAME_MAX`).
pub const HOST_NAME_MAX: usize = 64;

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "NESTBOX_LOG_FORMAT";

/// Application name used in diagnostics.
pub const APP_NAME: &str = "nestbox";
