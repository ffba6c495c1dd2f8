//! Target command execution with passthrough stdio.

use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Command, ExitStatus, Stdio};

use nestbox_common::error::{NestboxError, Result};

/// Runs `command` with the caller's stdin, stdout and stderr, and waits for it.
///
/// The program is resolved against `$PATH` as seen from the current root,
/// so after root substitution it is looked up inside the container.
///
/// # Errors
///
/// Returns [`NestboxError::Exec`] if the program cannot be found or started.
pub fn run_target(command: &str, args: &[String]) -> Result<i32> {
    let program = which::which(command).map_err(|e| NestboxError::Exec {
        command: command.to_string(),
        message: e.to_string(),
    })?;
    tracing::debug!(program = %program.display(), ?args, "starting target command");

    let status = Command::new(&program)
        .arg0(command)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| NestboxError::Exec {
            command: command.to_string(),
            message: e.to_string(),
        })?;

    let code = exit_code(status);
    tracing::info!(command, code, "target command exited");
    Ok(code)
}

/// Converts an exit status into a shell-style exit code.
///
/// Death by signal `n` maps to `128 + n`.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| status.signal().map_or(1, |sig| 128 + sig))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_passes_through() {
        assert_eq!(run_target("sh", &["-c".into(), "exit 3".into()]).unwrap(), 3);
    }

    #[test]
    fn success_is_zero() {
        assert_eq!(run_target("true", &[]).unwrap(), 0);
    }

    #[test]
    fn signal_maps_to_128_plus_signo() {
        assert_eq!(exit_code(ExitStatus::from_raw(libc::SIGKILL)), 128 + libc::SIGKILL);
    }

    #[test]
    fn unknown_command_is_exec_error() {
        let err = run_target("nestbox-definitely-missing-binary", &[]).unwrap_err();
        assert!(matches!(err, NestboxError::Exec { .. }));
    }
}
