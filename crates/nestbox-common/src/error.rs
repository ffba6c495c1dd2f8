//! Unified error types for the nestbox workspace.
//!
//! The variants follow the launch sequence: spawning the isolated child,
//! setting it up from inside, limiting its resources and finally starting
//! the target command.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum NestboxError {
    /// Creating the namespaced child process failed.
    #[error("failed to spawn isolated process: {message}")]
    Spawn {
        /// Description of the failed spawn.
        message: String,
    },

    /// An in-namespace setup step failed inside the bootstrapper.
    #[error("setup step '{step}' failed: {message}")]
    Setup {
        /// Name of the bootstrap step that failed.
        step: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// The cgroup resource limit could not be configured.
    #[error("resource limit error at {path}: {message}")]
    ResourceLimit {
        /// Cgroup file or directory involved.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// The target command could not be found or started.
    #[error("cannot execute '{command}': {message}")]
    Exec {
        /// Command that failed to start.
        command: String,
        /// Description of the failure.
        message: String,
    },

    /// The launch request is malformed.
    #[error("invalid launch request: {message}")]
    InvalidRequest {
        /// Description of the rejected field.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl NestboxError {
    /// Builds a [`NestboxError::Setup`] for the named step.
    pub fn setup(step: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Setup {
            step,
            message: err.to_string(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, NestboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_error_names_the_step() {
        let err = NestboxError::setup("root", "No such file or directory");
        assert_eq!(
            err.to_string(),
            "setup step 'root' failed: No such file or directory"
        );
    }

    #[test]
    fn resource_limit_error_mentions_path() {
        let err = NestboxError::ResourceLimit {
            path: PathBuf::from("/sys/fs/cgroup/pids/scratch/pids.max"),
            message: "Permission denied".into(),
        };
        assert!(err.to_string().contains("pids.max"));
    }
}
