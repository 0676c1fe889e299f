//! # Procfile loader: JSON on disk → resolved configuration.
//!
//! Reads a declarative procfile and produces the immutable
//! [`ResolvedProcessConfig`] the runtime consumes. All merging happens here,
//! so the core never sees defaults, group sets, or relative paths.
//!
//! ## Merge order
//! Settings cascade `defaults` → every group set containing the group
//! (alphabetical by set name) → the group → the process. A later layer wins
//! field by field; environment maps merge by key, where an explicit `null`
//! unsets the variable in the child.
//!
//! ## Group sets
//! A group set names a list of groups. It contributes settings to its
//! members, and it can be used in `dependsOn`, where it expands to the
//! member list. Group sets are invisible to the runtime.
//!
//! ## Procfile shape
//! ```json
//! {
//!   "outputDir": "logs",
//!   "defaults": { "restartMode": "group", "restartDelayMs": 1000 },
//!   "groupSets": { "backend": { "groups": ["db", "api"] } },
//!   "groups": {
//!     "db":  { "processes": { "main": { "command": "postgres -D data" } } },
//!     "api": {
//!       "dependsOn": ["db"],
//!       "restartMode": "process",
//!       "maxRestarts": 5,
//!       "processes": {
//!         "web": { "path": "bin/web", "args": ["--port", "8080"], "output": "file" }
//!       }
//!     }
//!   }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;
use crate::exec::script::sanitize;

use super::model::{
    OutputPolicy, ProcessKey, ResolvedProcess, ResolvedProcessConfig, ResolvedProcessGroup,
    RestartMode, RestartPolicy,
};

/// Default log directory, relative to the procfile.
const DEFAULT_OUTPUT_DIR: &str = "logs";
/// Default rotation threshold for file output.
const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;
/// Default total file count for file output.
const DEFAULT_MAX_FILES: u32 = 5;
/// Default delay between an exit and the next start.
const DEFAULT_RESTART_DELAY_MS: u64 = 1000;

/// Loads and resolves a procfile from disk.
///
/// Relative paths inside the file resolve against its parent directory.
pub fn load_file(path: &Path) -> Result<ResolvedProcessConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    load_str_at(&text, &base_dir, path)
}

/// Loads and resolves a procfile from a string, against `base_dir`.
pub fn load_str(text: &str, base_dir: &Path) -> Result<ResolvedProcessConfig, ConfigError> {
    load_str_at(text, base_dir, Path::new("<inline>"))
}

fn load_str_at(
    text: &str,
    base_dir: &Path,
    origin: &Path,
) -> Result<ResolvedProcessConfig, ConfigError> {
    let raw: RawConfig = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
        path: origin.to_path_buf(),
        source,
    })?;
    resolve(raw, base_dir)
}

// ---- Raw (on-disk) shapes ----

/// Present-but-null and absent need to stay distinguishable for fields where
/// `null` is meaningful (`maxRestarts: null` = unlimited).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawRestartMode {
    Process,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawOutputMode {
    Inherit,
    File,
}

/// Settings that cascade defaults → group set → group → process.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
    restart_mode: Option<RawRestartMode>,
    #[serde(default, deserialize_with = "double_option")]
    max_restarts: Option<Option<u32>>,
    restart_delay_ms: Option<u64>,
    output: Option<RawOutputMode>,
    output_max_bytes: Option<u64>,
    output_max_files: Option<u32>,
    #[serde(default)]
    env: HashMap<String, Option<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGroupSet {
    groups: Vec<String>,
    #[serde(flatten)]
    settings: RawSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProcess {
    command: Option<String>,
    path: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    cwd: Option<String>,
    output_path: Option<String>,
    #[serde(flatten)]
    settings: RawSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGroup {
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default)]
    processes: BTreeMap<String, RawProcess>,
    cwd: Option<String>,
    #[serde(flatten)]
    settings: RawSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    output_dir: Option<String>,
    #[serde(default)]
    defaults: RawSettings,
    #[serde(default)]
    group_sets: BTreeMap<String, RawGroupSet>,
    #[serde(default)]
    groups: BTreeMap<String, RawGroup>,
}

// ---- Cascading ----

/// Accumulated effective settings after applying some layers.
#[derive(Debug, Clone)]
struct Effective {
    restart_mode: RestartMode,
    max_restarts: Option<u32>,
    restart_delay: Duration,
    output: RawOutputMode,
    output_max_bytes: u64,
    output_max_files: u32,
    env: BTreeMap<String, Option<String>>,
}

impl Default for Effective {
    fn default() -> Self {
        Self {
            restart_mode: RestartMode::Group,
            max_restarts: None,
            restart_delay: Duration::from_millis(DEFAULT_RESTART_DELAY_MS),
            output: RawOutputMode::Inherit,
            output_max_bytes: DEFAULT_MAX_BYTES,
            output_max_files: DEFAULT_MAX_FILES,
            env: BTreeMap::new(),
        }
    }
}

impl Effective {
    fn apply(&mut self, layer: &RawSettings) {
        if let Some(mode) = layer.restart_mode {
            self.restart_mode = match mode {
                RawRestartMode::Process => RestartMode::Process,
                RawRestartMode::Group => RestartMode::Group,
            };
        }
        if let Some(limit) = layer.max_restarts {
            self.max_restarts = limit;
        }
        if let Some(ms) = layer.restart_delay_ms {
            self.restart_delay = Duration::from_millis(ms);
        }
        if let Some(output) = layer.output {
            self.output = output;
        }
        if let Some(bytes) = layer.output_max_bytes {
            self.output_max_bytes = bytes;
        }
        if let Some(files) = layer.output_max_files {
            self.output_max_files = files;
        }
        for (name, value) in &layer.env {
            self.env.insert(name.clone(), value.clone());
        }
    }
}

// ---- Resolution ----

fn resolve(raw: RawConfig, base_dir: &Path) -> Result<ResolvedProcessConfig, ConfigError> {
    for name in raw.group_sets.keys() {
        if raw.groups.contains_key(name) {
            return Err(ConfigError::DuplicateName { name: name.clone() });
        }
    }

    let base_dir = if base_dir.is_absolute() {
        base_dir.to_path_buf()
    } else {
        match base_dir.canonicalize() {
            Ok(canonical) => canonical,
            Err(_) => std::env::current_dir()
                .map(|cwd| cwd.join(base_dir))
                .unwrap_or_else(|_| base_dir.to_path_buf()),
        }
    };
    let output_dir = absolutize(
        &base_dir,
        Path::new(raw.output_dir.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR)),
    );

    // Sets that contain each group, alphabetical by construction (BTreeMap).
    let mut sets_of_group: BTreeMap<&str, Vec<&RawGroupSet>> = BTreeMap::new();
    for set in raw.group_sets.values() {
        for member in &set.groups {
            sets_of_group.entry(member).or_default().push(set);
        }
    }

    let mut groups = BTreeMap::new();
    for (group_name, raw_group) in &raw.groups {
        if raw_group.processes.is_empty() {
            return Err(ConfigError::EmptyGroup {
                group: group_name.clone(),
            });
        }

        let mut group_settings = Effective::default();
        group_settings.apply(&raw.defaults);
        if let Some(sets) = sets_of_group.get(group_name.as_str()) {
            for set in sets {
                group_settings.apply(&set.settings);
            }
        }
        group_settings.apply(&raw_group.settings);

        let dependencies = expand_dependencies(group_name, &raw_group.depends_on, &raw)?;
        let group_cwd = match &raw_group.cwd {
            Some(cwd) => absolutize(&base_dir, Path::new(cwd)),
            None => base_dir.clone(),
        };

        let mut processes = Vec::with_capacity(raw_group.processes.len());
        for (process_name, raw_process) in &raw_group.processes {
            let mut settings = group_settings.clone();
            settings.apply(&raw_process.settings);
            processes.push(resolve_process(
                group_name,
                process_name,
                raw_process,
                &settings,
                &base_dir,
                &group_cwd,
                &output_dir,
            )?);
        }

        groups.insert(
            group_name.clone(),
            ResolvedProcessGroup {
                name: group_name.clone(),
                restart_mode: group_settings.restart_mode,
                restart: RestartPolicy {
                    max_restarts: group_settings.max_restarts,
                    restart_delay: group_settings.restart_delay,
                },
                dependencies,
                processes,
            },
        );
    }

    Ok(ResolvedProcessConfig { base_dir, groups })
}

/// Expands `dependsOn` entries: group names stay, group-set names expand to
/// their members. Duplicates collapse to the first occurrence.
fn expand_dependencies(
    group: &str,
    declared: &[String],
    raw: &RawConfig,
) -> Result<Vec<String>, ConfigError> {
    let mut expanded = Vec::new();
    let mut push = |name: &str| {
        if name != group && !expanded.iter().any(|n| n == name) {
            expanded.push(name.to_string());
        }
    };
    for name in declared {
        if raw.groups.contains_key(name) {
            push(name);
        } else if let Some(set) = raw.group_sets.get(name) {
            for member in &set.groups {
                if !raw.groups.contains_key(member) {
                    return Err(ConfigError::UnknownDependency {
                        group: group.to_string(),
                        dependency: member.clone(),
                    });
                }
                push(member);
            }
        } else {
            return Err(ConfigError::UnknownDependency {
                group: group.to_string(),
                dependency: name.clone(),
            });
        }
    }
    Ok(expanded)
}

#[allow(clippy::too_many_arguments)]
fn resolve_process(
    group: &str,
    name: &str,
    raw: &RawProcess,
    settings: &Effective,
    base_dir: &Path,
    group_cwd: &Path,
    output_dir: &Path,
) -> Result<ResolvedProcess, ConfigError> {
    let key = ProcessKey::new(group, name);

    let conflict = || ConfigError::CommandPathConflict {
        group: group.to_string(),
        process: name.to_string(),
    };
    let (executable, args, display_path, shell_command) = match (&raw.command, &raw.path) {
        (Some(_), Some(_)) => return Err(conflict()),
        (Some(command), None) => {
            if !raw.args.is_empty() {
                return Err(conflict());
            }
            let (shell, shell_args) = platform_shell(command);
            (shell, shell_args, command.clone(), Some(command.clone()))
        }
        (None, Some(path)) => {
            let resolved = absolutize(base_dir, Path::new(path));
            (resolved, raw.args.clone(), path.clone(), None)
        }
        (None, None) => {
            return Err(ConfigError::MissingCommand {
                group: group.to_string(),
                process: name.to_string(),
            })
        }
    };

    let working_dir = match &raw.cwd {
        Some(cwd) => absolutize(base_dir, Path::new(cwd)),
        None => group_cwd.to_path_buf(),
    };

    let output = match settings.output {
        RawOutputMode::Inherit => OutputPolicy::Inherit,
        RawOutputMode::File => {
            if settings.output_max_bytes > 0 && settings.output_max_files == 0 {
                return Err(ConfigError::InvalidRotation {
                    group: group.to_string(),
                    process: name.to_string(),
                });
            }
            let path = match &raw.output_path {
                Some(path) => absolutize(base_dir, Path::new(path)),
                None => output_dir
                    .join(sanitize(group))
                    .join(format!("{}.log", sanitize(name))),
            };
            OutputPolicy::File {
                path,
                max_bytes: settings.output_max_bytes,
                max_files: settings.output_max_files.max(1),
            }
        }
    };

    let env = settings
        .env
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(ResolvedProcess {
        key,
        executable,
        display_path,
        working_dir,
        args,
        env,
        shell_command,
        output,
    })
}

/// Resolves `path` against `base` unless it is already absolute.
fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        let joined = base.join(path);
        match joined.canonicalize() {
            Ok(canonical) => canonical,
            Err(_) => joined,
        }
    }
}

/// Platform shell invocation for a command string.
fn platform_shell(command: &str) -> (PathBuf, Vec<String>) {
    if cfg!(windows) {
        (
            PathBuf::from("cmd"),
            vec!["/d".to_string(), "/c".to_string(), command.to_string()],
        )
    } else {
        (
            PathBuf::from("/bin/sh"),
            vec!["-c".to_string(), command.to_string()],
        )
    }
}
