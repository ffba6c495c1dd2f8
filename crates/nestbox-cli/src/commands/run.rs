//! `nestbox run` — launch a command in an isolated environment.

use clap::Args;
use nestbox_runtime::supervisor::Supervisor;

use super::LaunchArgs;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Launcher settings.
    #[command(flatten)]
    pub launch: LaunchArgs,

    /// Command to run, followed by its arguments.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Executes the `run` command.
///
/// # Errors
///
/// Returns an error if the request is invalid or the isolated process
/// cannot be spawned.
pub fn execute(args: &RunArgs) -> anyhow::Result<i32> {
    let request = args.launch.to_request(&args.command)?;
    tracing::info!(
        command = request.command(),
        isolation = %request.isolation(),
        rootfs = %request.rootfs().display(),
        "launching"
    );
    Ok(Supervisor::new(request).launch()?)
}
