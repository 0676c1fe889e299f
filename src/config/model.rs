//! # Resolved configuration model.
//!
//! The immutable input to the runtime: groups of processes, their restart
//! behavior, and their dependency declarations. Values of these types are
//! produced once by the [`loader`](crate::config::loader) (or built by hand in
//! tests) and never mutated afterwards.
//!
//! ## Rules
//! - Exactly one of `shell_command` or a real executable drives each child;
//!   when `shell_command` is set, `executable`/`args` already hold the
//!   platform shell invocation of that command.
//! - When output mode is `File`, the log path is absolute.
//! - Every name in `dependencies` exists as a group in the config.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Identity of one managed process: `(group, process)`.
///
/// Used for event correlation, buffer keying, and console colorization.
/// Group-scoped events use the synthetic process name `"group"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessKey {
    /// Owning group name.
    pub group: String,
    /// Process name within the group.
    pub process: String,
}

impl ProcessKey {
    /// Creates a key from group and process names.
    pub fn new(group: impl Into<String>, process: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            process: process.into(),
        }
    }

    /// Returns the synthetic key for group-scoped events.
    pub fn group_scoped(group: impl Into<String>) -> Self {
        Self::new(group, "group")
    }
}

impl fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.process)
    }
}

/// Where a child's stdout/stderr go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPolicy {
    /// The child inherits the supervisor's stdout/stderr.
    Inherit,
    /// The child's merged output is appended to a rotated log file.
    File {
        /// Absolute path of the active log file.
        path: PathBuf,
        /// Rotation threshold in bytes (0 disables rotation).
        max_bytes: u64,
        /// Total file count including the active file (>= 1 when rotating).
        max_files: u32,
    },
}

impl OutputPolicy {
    /// Returns true for file-backed output.
    pub fn is_file(&self) -> bool {
        matches!(self, OutputPolicy::File { .. })
    }
}

/// One resolved process definition.
#[derive(Debug, Clone)]
pub struct ResolvedProcess {
    /// Identity within the configuration.
    pub key: ProcessKey,
    /// Executable to spawn. For shell commands this is the platform shell.
    pub executable: PathBuf,
    /// Human-facing path or command text used in events and rendering.
    pub display_path: String,
    /// Working directory for the child.
    pub working_dir: PathBuf,
    /// Arguments, in order. For shell commands these are the shell's args.
    pub args: Vec<String>,
    /// Environment overrides; `None` unsets the variable in the child.
    pub env: Vec<(String, Option<String>)>,
    /// Original shell command text, when the process was declared as one.
    pub shell_command: Option<String>,
    /// Output policy for this process.
    pub output: OutputPolicy,
}

/// Whether an exit restarts one process or tears down the whole group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartMode {
    /// Restart only the process that exited; siblings keep running.
    Process,
    /// Any exit stops every process in the group, then the group restarts.
    Group,
}

/// Restart budget and pacing shared by all processes of a group.
#[derive(Debug, Clone, Copy)]
pub struct RestartPolicy {
    /// Maximum restarts per `run` invocation; `None` means unlimited.
    pub max_restarts: Option<u32>,
    /// Delay between an exit and the next start.
    pub restart_delay: Duration,
}

impl Default for RestartPolicy {
    /// Unlimited restarts, one second apart.
    fn default() -> Self {
        Self {
            max_restarts: None,
            restart_delay: Duration::from_secs(1),
        }
    }
}

impl RestartPolicy {
    /// Returns true while `count` restarts are still within the budget.
    pub fn allows(&self, count: u32) -> bool {
        match self.max_restarts {
            None => true,
            Some(limit) => count < limit,
        }
    }
}

/// One resolved group: processes plus shared restart and dependency settings.
#[derive(Debug, Clone)]
pub struct ResolvedProcessGroup {
    /// Group name, unique within the config.
    pub name: String,
    /// Restart mode applied to every process of the group.
    pub restart_mode: RestartMode,
    /// Restart budget and delay.
    pub restart: RestartPolicy,
    /// Names of groups this group depends on (already expanded, cycle-free).
    pub dependencies: Vec<String>,
    /// Processes, non-empty, in declaration order.
    pub processes: Vec<ResolvedProcess>,
}

/// The complete resolved configuration for one supervisor run.
#[derive(Debug, Clone)]
pub struct ResolvedProcessConfig {
    /// Directory all relative paths were resolved against.
    pub base_dir: PathBuf,
    /// Groups by name, deterministically ordered.
    pub groups: BTreeMap<String, ResolvedProcessGroup>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display_is_group_slash_process() {
        let key = ProcessKey::new("api", "web");
        assert_eq!(key.to_string(), "api/web");
        assert_eq!(ProcessKey::group_scoped("api").to_string(), "api/group");
    }

    #[test]
    fn restart_policy_none_is_unlimited() {
        let unlimited = RestartPolicy {
            max_restarts: None,
            restart_delay: Duration::ZERO,
        };
        assert!(unlimited.allows(0));
        assert!(unlimited.allows(u32::MAX));

        let bounded = RestartPolicy {
            max_restarts: Some(2),
            restart_delay: Duration::ZERO,
        };
        assert!(bounded.allows(0));
        assert!(bounded.allows(1));
        assert!(!bounded.allows(2));
    }
}
