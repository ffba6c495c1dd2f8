//! In-namespace setup, run by the re-executed child.
//!
//! The setup is an ordered list of named steps. Each step either runs or is
//! skipped by a guard derived from the launch request; [`BootstrapPlan`]
//! computes that list without touching the system, and [`Bootstrapper`]
//! executes it against a [`HostOps`] implementation.
//!
//! Order matters: the cgroup is joined before the target exists, the root is
//! substituted before procfs is mounted (so `/proc` resolves inside the new
//! root), and procfs is unmounted after the target exits.

use std::fmt;
use std::path::Path;

use nestbox_common::constants::PROC_MOUNT_POINT;
use nestbox_common::error::{NestboxError, Result};
use nestbox_common::types::{CgroupConstraint, IsolationFlag, LaunchRequest};
use nestbox_core::filesystem::mount::MountState;

/// One named stage of the bootstrap sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStep {
    /// Set the UTS namespace's hostname.
    SetHostname,
    /// Create the pids cgroup and join it.
    JoinCgroup,
    /// Stop mount events propagating back to the host.
    PrivatizeMounts,
    /// `chroot` into the rootfs and `chdir("/")`.
    ChangeRoot,
    /// Mount procfs at `/proc`.
    MountProc,
    /// Run the target command and wait for it.
    RunCommand,
    /// Unmount everything mounted by earlier steps.
    UnmountProc,
}

impl BootstrapStep {
    /// Stable name used in logs and error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SetHostname => "hostname",
            Self::JoinCgroup => "cgroup",
            Self::PrivatizeMounts => "mount-propagation",
            Self::ChangeRoot => "root",
            Self::MountProc => "proc-mount",
            Self::RunCommand => "run",
            Self::UnmountProc => "proc-unmount",
        }
    }
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a planned step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// The step executes.
    Run,
    /// The step is skipped for the given reason.
    Skip(&'static str),
}

/// A step together with its guard outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedStep {
    /// Which step.
    pub step: BootstrapStep,
    /// Whether it runs.
    pub action: StepAction,
}

/// The full, ordered bootstrap sequence for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPlan {
    steps: Vec<PlannedStep>,
}

impl BootstrapPlan {
    /// Resolves every step's guard against the requested isolation.
    #[must_use]
    pub fn for_request(request: &LaunchRequest) -> Self {
        let isolation = request.isolation();
        let uts = isolation.contains(IsolationFlag::Uts);
        let mount = isolation.contains(IsolationFlag::Mount);

        let guarded = |step: BootstrapStep, run: bool, reason: &'static str| PlannedStep {
            step,
            action: if run { StepAction::Run } else { StepAction::Skip(reason) },
        };

        Self {
            steps: vec![
                guarded(
                    BootstrapStep::SetHostname,
                    uts,
                    "UTS isolation not requested; would rename the host",
                ),
                guarded(BootstrapStep::JoinCgroup, true, ""),
                guarded(
                    BootstrapStep::PrivatizeMounts,
                    mount,
                    "mount isolation not requested",
                ),
                guarded(BootstrapStep::ChangeRoot, true, ""),
                guarded(
                    BootstrapStep::MountProc,
                    mount,
                    "mount isolation not requested",
                ),
                guarded(BootstrapStep::RunCommand, true, ""),
                guarded(BootstrapStep::UnmountProc, mount, "nothing was mounted"),
            ],
        }
    }

    /// All steps in execution order, including skipped ones.
    #[must_use]
    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    /// Only the steps that will execute, in order.
    pub fn runnable(&self) -> impl Iterator<Item = BootstrapStep> + '_ {
        self.steps
            .iter()
            .filter(|p| p.action == StepAction::Run)
            .map(|p| p.step)
    }
}

/// System operations the bootstrapper needs.
///
/// [`LinuxHost`] performs the real syscalls.
pub trait HostOps {
    /// Sets the hostname of the current UTS namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel rejects the hostname.
    fn set_hostname(&mut self, hostname: &str) -> Result<()>;

    /// Creates the pids cgroup if needed, limits it and joins it.
    ///
    /// # Errors
    ///
    /// Returns an error if the cgroup cannot be configured.
    fn join_cgroup(&mut self, root: &Path, name: &str, limit: u32) -> Result<CgroupConstraint>;

    /// Makes all mounts private to the current mount namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the propagation change is rejected.
    fn make_mounts_private(&mut self) -> Result<()>;

    /// Substitutes the filesystem root and moves the cwd to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be changed.
    fn change_root(&mut self, root: &Path) -> Result<()>;

    /// Mounts procfs at `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mount fails.
    fn mount_proc(&mut self, target: &Path) -> Result<()>;

    /// Unmounts `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the unmount fails.
    fn unmount(&mut self, target: &Path) -> Result<()>;

    /// Runs the target command with inherited stdio and returns its exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be found or started.
    fn run_command(&mut self, command: &str, args: &[String]) -> Result<i32>;
}

/// [`HostOps`] backed by the real kernel.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxHost;

impl HostOps for LinuxHost {
    fn set_hostname(&mut self, hostname: &str) -> Result<()> {
        nestbox_core::namespace::uts::set_hostname(hostname)
    }

    fn join_cgroup(&mut self, root: &Path, name: &str, limit: u32) -> Result<CgroupConstraint> {
        nestbox_core::cgroup::limit_current_process(root, name, limit)
    }

    fn make_mounts_private(&mut self) -> Result<()> {
        nestbox_core::filesystem::mount::make_mounts_private()
    }

    fn change_root(&mut self, root: &Path) -> Result<()> {
        nestbox_core::filesystem::chroot::change_root(root)
    }

    fn mount_proc(&mut self, target: &Path) -> Result<()> {
        nestbox_core::filesystem::mount::mount_proc(target)
    }

    fn unmount(&mut self, target: &Path) -> Result<()> {
        nestbox_core::filesystem::mount::unmount(target)
    }

    fn run_command(&mut self, command: &str, args: &[String]) -> Result<i32> {
        crate::process::run_target(command, args)
    }
}

/// Executes a [`BootstrapPlan`] for one request.
#[derive(Debug)]
pub struct Bootstrapper<H> {
    request: LaunchRequest,
    host: H,
    mounts: MountState,
    exit_code: Option<i32>,
}

impl<H: HostOps> Bootstrapper<H> {
    /// Prepares a bootstrapper; nothing happens until [`Bootstrapper::run`].
    #[must_use]
    pub const fn new(request: LaunchRequest, host: H) -> Self {
        Self {
            request,
            host,
            mounts: MountState::new(),
            exit_code: None,
        }
    }

    /// Runs every planned step and returns the target's exit code.
    ///
    /// The first failing step aborts the sequence. Mounts made before the
    /// failure are still unmounted.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step.
    pub fn run(mut self) -> Result<i32> {
        tracing::info!(
            command = self.request.command(),
            args = ?self.request.args(),
            pid = std::process::id(),
            "running target as PID {}",
            std::process::id()
        );

        let plan = BootstrapPlan::for_request(&self.request);
        for planned in plan.steps() {
            if let StepAction::Skip(reason) = planned.action {
                tracing::debug!(step = %planned.step, reason, "step skipped");
                continue;
            }
            tracing::debug!(step = %planned.step, "step starting");
            if let Err(err) = self.execute(planned.step) {
                self.unwind();
                return Err(err);
            }
        }

        self.exit_code.ok_or_else(|| NestboxError::Setup {
            step: BootstrapStep::RunCommand.name(),
            message: "target command never ran".into(),
        })
    }

    fn execute(&mut self, step: BootstrapStep) -> Result<()> {
        let request = &self.request;
        match step {
            BootstrapStep::SetHostname => self.host.set_hostname(request.hostname()),
            BootstrapStep::JoinCgroup => {
                let constraint = self.host.join_cgroup(
                    request.cgroup_root(),
                    request.cgroup_name(),
                    request.pid_limit(),
                )?;
                tracing::info!(
                    cgroup = %constraint.controller_path.display(),
                    limit = constraint.limit_value,
                    pid = constraint.member_pid,
                    "joined cgroup"
                );
                Ok(())
            }
            BootstrapStep::PrivatizeMounts => self.host.make_mounts_private(),
            BootstrapStep::ChangeRoot => self.host.change_root(request.rootfs()),
            BootstrapStep::MountProc => {
                let target = Path::new(PROC_MOUNT_POINT);
                self.host.mount_proc(target)?;
                self.mounts.record(target);
                Ok(())
            }
            BootstrapStep::RunCommand => {
                let code = self.host.run_command(request.command(), request.args())?;
                self.exit_code = Some(code);
                Ok(())
            }
            BootstrapStep::UnmountProc => self.unmount_recorded(),
        }
    }

    /// Unmounts every recorded mount, newest first. A failure does not stop
    /// the remaining unmounts; the first error is returned at the end.
    fn unmount_recorded(&mut self) -> Result<()> {
        let mut first_error = None;
        for target in self.mounts.drain().collect::<Vec<_>>() {
            if let Err(err) = self.host.unmount(&target) {
                tracing::warn!(mount = %target.display(), %err, "unmount failed");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Best-effort unmount of whatever is still recorded after a failure.
    fn unwind(&mut self) {
        for target in self.mounts.drain().collect::<Vec<_>>() {
            if let Err(err) = self.host.unmount(&target) {
                tracing::warn!(mount = %target.display(), %err, "unmount during unwind failed");
            }
        }
    }
}
