//! # Error types used by the procvd runtime.
//!
//! This module defines two main error enums:
//!
//! - [`ConfigError`] errors raised while loading or validating configuration.
//! - [`ExecError`] errors raised while executing a single child process.
//!
//! Configuration errors are always fatal and surface before any process is
//! spawned. Execution errors are per-invocation: they become `Failed` events
//! and count against the restart budget like a non-zero exit.

use std::path::PathBuf;

use thiserror::Error;

/// # Errors produced while loading or validating configuration.
///
/// These are detected before the supervisor starts and always abort the run.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The procfile could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        /// Path that failed to open.
        path: PathBuf,
        source: std::io::Error,
    },
    /// The procfile is not valid JSON.
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        source: serde_json::Error,
    },
    /// The dependency graph contains a cycle.
    #[error("dependency cycle involving groups: {groups:?}")]
    CycleDetected {
        /// Groups that could not be ordered.
        groups: Vec<String>,
    },
    /// A group depends on a name that is neither a group nor a group set.
    #[error("group '{group}' depends on unknown group '{dependency}'")]
    UnknownDependency { group: String, dependency: String },
    /// A group declares no processes.
    #[error("group '{group}' has no processes")]
    EmptyGroup { group: String },
    /// A process declares both a shell command and an executable path.
    #[error("process '{group}/{process}' sets both 'command' and 'path'")]
    CommandPathConflict { group: String, process: String },
    /// A process declares neither a shell command nor an executable path.
    #[error("process '{group}/{process}' sets neither 'command' nor 'path'")]
    MissingCommand { group: String, process: String },
    /// File output rotation requires at least one file.
    #[error("process '{group}/{process}' enables rotation with maxFiles=0")]
    InvalidRotation { group: String, process: String },
    /// A group and a group set share the same name.
    #[error("name '{name}' is declared as both a group and a group set")]
    DuplicateName { name: String },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "config_read",
            ConfigError::Parse { .. } => "config_parse",
            ConfigError::CycleDetected { .. } => "config_cycle",
            ConfigError::UnknownDependency { .. } => "config_unknown_dependency",
            ConfigError::EmptyGroup { .. } => "config_empty_group",
            ConfigError::CommandPathConflict { .. } => "config_command_path_conflict",
            ConfigError::MissingCommand { .. } => "config_missing_command",
            ConfigError::InvalidRotation { .. } => "config_invalid_rotation",
            ConfigError::DuplicateName { .. } => "config_duplicate_name",
        }
    }
}

/// # Errors produced by a single process execution.
///
/// These represent failures of one executor invocation. The supervisor treats
/// them like a natural exit for restart purposes; they are never fatal to the
/// runtime itself.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ExecError {
    /// The child process could not be spawned.
    #[error("spawn failed: {reason}")]
    Spawn { reason: String },

    /// Preparing file output failed (log directory, rotation, wrapper script).
    #[error("output setup failed for {path}: {reason}")]
    Output { path: PathBuf, reason: String },

    /// Waiting on the child failed after a successful spawn.
    #[error("wait failed: {reason}")]
    Wait { reason: String },
}

impl ExecError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            ExecError::Spawn { .. } => "exec_spawn",
            ExecError::Output { .. } => "exec_output",
            ExecError::Wait { .. } => "exec_wait",
        }
    }

    pub(crate) fn spawn(e: impl std::fmt::Display) -> Self {
        ExecError::Spawn {
            reason: e.to_string(),
        }
    }

    pub(crate) fn output(path: impl Into<PathBuf>, e: impl std::fmt::Display) -> Self {
        ExecError::Output {
            path: path.into(),
            reason: e.to_string(),
        }
    }

    pub(crate) fn wait(e: impl std::fmt::Display) -> Self {
        ExecError::Wait {
            reason: e.to_string(),
        }
    }
}
