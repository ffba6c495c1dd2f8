//! Parent-side launch: namespace creation and exit-status mirroring.
//!
//! The supervisor never touches the hostname, filesystem or cgroups itself.
//! It creates one child with `clone(2)`, attaching every requested namespace
//! at creation time, and that child immediately re-executes the running
//! binary with the internal `child` subcommand.

use std::ffi::CString;

use nestbox_common::constants::SELF_EXE;
use nestbox_common::error::{NestboxError, Result};
use nestbox_common::types::LaunchRequest;
use nestbox_core::namespace::NamespaceSet;
use nix::errno::Errno;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;

/// Stack for the cloned child. It only needs enough room to call `execv`.
const CHILD_STACK_SIZE: usize = 1024 * 1024;

/// Exit status the cloned child reports if `execv` itself fails.
const EXEC_FAILED: isize = 127;

/// Owns one launch from request to exit code.
#[derive(Debug)]
pub struct Supervisor {
    request: LaunchRequest,
}

impl Supervisor {
    /// Wraps a validated launch request.
    #[must_use]
    pub const fn new(request: LaunchRequest) -> Self {
        Self { request }
    }

    /// Namespaces the bootstrapper will be created in.
    #[must_use]
    pub fn namespaces(&self) -> NamespaceSet {
        NamespaceSet::from_flags(self.request.isolation())
    }

    /// Runs the launch to completion and returns the exit code to mirror.
    ///
    /// With no isolation requested, the target runs directly in the caller's
    /// namespaces and no bootstrap step happens.
    ///
    /// # Errors
    ///
    /// Returns [`NestboxError::Spawn`] if the isolated child cannot be created
    /// or waited on, or [`NestboxError::Exec`] if a direct launch fails.
    pub fn launch(&self) -> Result<i32> {
        let namespaces = self.namespaces();
        if namespaces.is_empty() {
            tracing::info!(
                command = self.request.command(),
                "no isolation requested, running directly"
            );
            return crate::process::run_target(self.request.command(), self.request.args());
        }

        let child = spawn_isolated(namespaces, &self.request.to_child_args())?;
        tracing::info!(
            pid = child.as_raw(),
            flags = ?namespaces.clone_flags(),
            "bootstrapper spawned"
        );
        let code = wait_for_exit(child)?;
        tracing::info!(pid = child.as_raw(), code, "bootstrapper exited");
        Ok(code)
    }
}

/// Clones a child into `namespaces` and re-executes this binary in it.
///
/// All allocation happens before `clone(2)`; the child only calls `execv`.
/// Stdio descriptors are inherited unchanged.
fn spawn_isolated(namespaces: NamespaceSet, child_args: &[String]) -> Result<Pid> {
    let exe = to_cstring(SELF_EXE)?;
    let argv = std::iter::once(SELF_EXE)
        .chain(child_args.iter().map(String::as_str))
        .map(to_cstring)
        .collect::<Result<Vec<_>>>()?;

    let mut stack = vec![0_u8; CHILD_STACK_SIZE];
    let callback = Box::new(|| {
        // Only returns on failure.
        let _ = nix::unistd::execv(&exe, &argv);
        EXEC_FAILED
    });

    // SAFETY: the child runs on its own stack without CLONE_VM, so it works
    // on a copy of our memory, and it does nothing but `execv` or return.
    let pid = unsafe {
        nix::sched::clone(
            callback,
            &mut stack,
            namespaces.clone_flags(),
            Some(libc::SIGCHLD),
        )
    }
    .map_err(spawn_error)?;
    Ok(pid)
}

/// Blocks until `pid` terminates and maps its status to an exit code.
fn wait_for_exit(pid: Pid) -> Result<i32> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(code),
            Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(128 + signal as i32),
            Ok(status) => tracing::debug!(?status, "ignoring non-terminal wait status"),
            Err(Errno::EINTR) => {}
            Err(e) => {
                return Err(NestboxError::Spawn {
                    message: format!("waitpid({pid}) failed: {e}"),
                });
            }
        }
    }
}

fn spawn_error(errno: Errno) -> NestboxError {
    let hint = match errno {
        Errno::EPERM => " (creating namespaces requires root or CAP_SYS_ADMIN)",
        Errno::EINVAL => " (namespace type not supported by this kernel)",
        _ => "",
    };
    NestboxError::Spawn {
        message: format!("clone failed: {errno}{hint}"),
    }
}

fn to_cstring(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| NestboxError::Spawn {
        message: format!("argument contains a NUL byte: {s:?}"),
    })
}

#[cfg(test)]
mod tests {
    use nestbox_common::config::LauncherConfig;
    use nestbox_common::types::{IsolationFlag, IsolationFlags};

    use super::*;

    fn supervisor(isolation: IsolationFlags, command: &str, args: &[&str]) -> Supervisor {
        let config = LauncherConfig {
            isolation,
            ..LauncherConfig::default()
        };
        let request = LaunchRequest::from_config(
            &config,
            command.into(),
            args.iter().map(ToString::to_string).collect(),
        )
        .unwrap();
        Supervisor::new(request)
    }

    #[test]
    fn namespaces_follow_isolation_flags() {
        let sup = supervisor([IsolationFlag::Uts].into_iter().collect(), "true", &[]);
        let ns = sup.namespaces();
        assert!(ns.contains(IsolationFlag::Uts));
        assert!(!ns.contains(IsolationFlag::Pid));
    }

    #[test]
    fn no_isolation_runs_target_directly() {
        let sup = supervisor(IsolationFlags::none(), "sh", &["-c", "exit 5"]);
        assert_eq!(sup.launch().unwrap(), 5);
    }

    #[test]
    fn direct_launch_reports_missing_command() {
        let sup = supervisor(IsolationFlags::none(), "nestbox-no-such-command", &[]);
        assert!(matches!(sup.launch(), Err(NestboxError::Exec { .. })));
    }

    #[test]
    fn nul_byte_is_rejected() {
        assert!(to_cstring("bad\0arg").is_err());
    }

    #[test]
    fn eperm_hint_mentions_privilege() {
        let err = spawn_error(Errno::EPERM);
        assert!(err.to_string().contains("CAP_SYS_ADMIN"));
    }
}
