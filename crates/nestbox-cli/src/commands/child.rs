//! `nestbox child` — bootstrapper entry point inside the new namespaces.

use clap::Args;
use nestbox_runtime::bootstrap::{Bootstrapper, LinuxHost};

use super::LaunchArgs;

/// Arguments for the internal `child` command.
///
/// Produced by `LaunchRequest::to_child_args`; every setting is explicit.
#[derive(Args, Debug)]
pub struct ChildArgs {
    /// Launcher settings.
    #[command(flatten)]
    pub launch: LaunchArgs,

    /// Command to run, followed by its arguments.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Executes the `child` command.
///
/// # Errors
///
/// Returns an error naming the bootstrap step that failed.
pub fn execute(args: &ChildArgs) -> anyhow::Result<i32> {
    let request = args.launch.to_request(&args.command)?;
    Ok(Bootstrapper::new(request, LinuxHost).run()?)
}
