//! CLI command definitions and dispatch.

pub mod child;
pub mod run;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use nestbox_common::config::LauncherConfig;
use nestbox_common::types::{IsolationFlags, LaunchRequest};

/// nestbox — run a command in an isolated namespace sandbox.
#[derive(Parser, Debug)]
#[command(name = "nestbox", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command in new namespaces with a substitute root.
    Run(run::RunArgs),
    /// Re-exec entry point used by `run`; not a stable interface.
    #[command(name = "child", hide = true)]
    Child(child::ChildArgs),
}

/// Settings shared by `run` and `child`.
///
/// Each flag overrides the matching environment variable, which overrides
/// the config file, which overrides the built-in default.
#[derive(Args, Debug, Default)]
pub struct LaunchArgs {
    /// JSON file with launcher settings.
    #[arg(long, env = "NESTBOX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory used as the container's root filesystem.
    #[arg(long, env = "NESTBOX_ROOTFS")]
    pub rootfs: Option<PathBuf>,

    /// Hostname inside the UTS namespace.
    #[arg(long, env = "NESTBOX_HOSTNAME")]
    pub hostname: Option<String>,

    /// Cgroup filesystem mount point.
    #[arg(long, env = "NESTBOX_CGROUP_ROOT")]
    pub cgroup_root: Option<PathBuf>,

    /// Name of the pids cgroup to join.
    #[arg(long, env = "NESTBOX_CGROUP_NAME")]
    pub cgroup_name: Option<String>,

    /// Maximum number of processes in the cgroup.
    #[arg(long, env = "NESTBOX_PID_LIMIT")]
    pub pid_limit: Option<u32>,

    /// Namespaces to create: a list of uts,pid,mount, or `all` / `none`.
    #[arg(long, env = "NESTBOX_ISOLATE", value_name = "FLAGS")]
    pub isolate: Option<IsolationFlags>,
}

impl LaunchArgs {
    /// Layers the flags over the config file and defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded.
    pub fn resolve(&self) -> anyhow::Result<LauncherConfig> {
        let mut config = match &self.config {
            Some(path) => LauncherConfig::load(path)?,
            None => LauncherConfig::default(),
        };
        if let Some(rootfs) = &self.rootfs {
            config.rootfs.clone_from(rootfs);
        }
        if let Some(hostname) = &self.hostname {
            config.hostname.clone_from(hostname);
        }
        if let Some(root) = &self.cgroup_root {
            config.cgroup_root.clone_from(root);
        }
        if let Some(name) = &self.cgroup_name {
            config.cgroup_name.clone_from(name);
        }
        if let Some(limit) = self.pid_limit {
            config.pid_limit = limit;
        }
        if let Some(isolation) = &self.isolate {
            config.isolation.clone_from(isolation);
        }
        Ok(config)
    }

    /// Builds the validated request for `command`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails to resolve or the request is
    /// invalid.
    pub fn to_request(&self, command: &[String]) -> anyhow::Result<LaunchRequest> {
        let config = self.resolve()?;
        let (program, args) = command
            .split_first()
            .ok_or_else(|| anyhow::anyhow!("no command given"))?;
        Ok(LaunchRequest::from_config(&config, program.clone(), args.to_vec())?)
    }
}

/// Dispatches the parsed CLI command and returns the exit code to use.
///
/// # Errors
///
/// Returns an error if the launch or bootstrap fails.
pub fn execute(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Command::Run(args) => run::execute(&args),
        Command::Child(args) => child::execute(&args),
    }
}
