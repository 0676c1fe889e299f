//! # Dependency graph: deterministic start order and restart propagation map.
//!
//! Derives from a [`ResolvedProcessConfig`]:
//! - `start_order`: a topological order of the groups, ties broken by
//!   lexicographic ascending name, so identical configs always produce the
//!   same order;
//! - `dependents`: for each group, the sorted list of groups that declare it
//!   as a dependency, which is the fan-out set for restart propagation.
//!
//! ## Algorithm
//! Kahn's algorithm over BTree collections: compute in-degrees, seed the
//! ready set with all zero-in-degree names, repeatedly take the lexicographic
//! minimum, and decrement its dependents. Emitting fewer names than exist
//! means a cycle remains.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::ResolvedProcessConfig;
use crate::error::ConfigError;

/// Start order and reverse adjacency derived from the resolved config.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Groups in dependency-respecting, deterministic order.
    pub start_order: Vec<String>,
    /// For each group, the sorted groups that depend on it.
    pub dependents: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Builds the graph, failing on unknown dependencies or cycles.
    pub fn build(config: &ResolvedProcessConfig) -> Result<Self, ConfigError> {
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

        for name in config.groups.keys() {
            in_degree.insert(name, 0);
            dependents.insert(name, BTreeSet::new());
        }

        for (name, group) in &config.groups {
            for dep in &group.dependencies {
                if !config.groups.contains_key(dep) {
                    return Err(ConfigError::UnknownDependency {
                        group: name.clone(),
                        dependency: dep.clone(),
                    });
                }
                // A self-edge or duplicate edge still counts once per mention;
                // duplicates are already collapsed by the loader.
                *in_degree.get_mut(name.as_str()).expect("group present") += 1;
                dependents
                    .get_mut(dep.as_str())
                    .expect("dependency present")
                    .insert(name);
            }
        }

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut start_order = Vec::with_capacity(config.groups.len());

        while let Some(name) = ready.iter().next().copied() {
            ready.remove(name);
            start_order.push(name.to_string());
            for &dependent in &dependents[name] {
                let deg = in_degree.get_mut(dependent).expect("dependent present");
                *deg -= 1;
                if *deg == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if start_order.len() != config.groups.len() {
            let mut stuck: Vec<String> = in_degree
                .iter()
                .filter(|(_, deg)| **deg > 0)
                .map(|(name, _)| name.to_string())
                .collect();
            stuck.sort();
            return Err(ConfigError::CycleDetected { groups: stuck });
        }

        let dependents = dependents
            .into_iter()
            .map(|(name, set)| {
                (
                    name.to_string(),
                    set.into_iter().map(str::to_string).collect(),
                )
            })
            .collect();

        Ok(Self {
            start_order,
            dependents,
        })
    }

    /// Returns the groups that must be asked to restart when `group` restarts.
    pub fn dependents_of(&self, group: &str) -> &[String] {
        self.dependents.get(group).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ResolvedProcessGroup, RestartMode, RestartPolicy};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn group(name: &str, deps: &[&str]) -> ResolvedProcessGroup {
        ResolvedProcessGroup {
            name: name.to_string(),
            restart_mode: RestartMode::Group,
            restart: RestartPolicy::default(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            processes: vec![crate::config::ResolvedProcess {
                key: crate::config::ProcessKey::new(name, "main"),
                executable: PathBuf::from("/bin/true"),
                display_path: "/bin/true".to_string(),
                working_dir: PathBuf::from("/"),
                args: vec![],
                env: vec![],
                shell_command: None,
                output: crate::config::OutputPolicy::Inherit,
            }],
        }
    }

    fn config(groups: Vec<ResolvedProcessGroup>) -> ResolvedProcessConfig {
        ResolvedProcessConfig {
            base_dir: PathBuf::from("/"),
            groups: groups
                .into_iter()
                .map(|g| (g.name.clone(), g))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn start_order_respects_dependencies() {
        let cfg = config(vec![
            group("api", &["db", "cache"]),
            group("db", &[]),
            group("cache", &["db"]),
        ]);
        let graph = DependencyGraph::build(&cfg).unwrap();
        assert_eq!(graph.start_order, vec!["db", "cache", "api"]);
    }

    #[test]
    fn ties_break_lexicographically() {
        let cfg = config(vec![group("b", &[]), group("a", &[]), group("c", &[])]);
        let graph = DependencyGraph::build(&cfg).unwrap();
        assert_eq!(graph.start_order, vec!["a", "b", "c"]);
    }

    #[test]
    fn order_is_deterministic() {
        let cfg = config(vec![
            group("web", &["core"]),
            group("worker", &["core"]),
            group("core", &[]),
            group("metrics", &[]),
        ]);
        let first = DependencyGraph::build(&cfg).unwrap();
        for _ in 0..10 {
            let again = DependencyGraph::build(&cfg).unwrap();
            assert_eq!(again.start_order, first.start_order);
            assert_eq!(again.dependents, first.dependents);
        }
    }

    #[test]
    fn dependents_are_sorted() {
        let cfg = config(vec![
            group("z", &["core"]),
            group("a", &["core"]),
            group("core", &[]),
        ]);
        let graph = DependencyGraph::build(&cfg).unwrap();
        assert_eq!(graph.dependents_of("core"), ["a", "z"]);
        assert!(graph.dependents_of("a").is_empty());
        assert!(graph.dependents_of("missing").is_empty());
    }

    #[test]
    fn cycle_is_rejected() {
        let cfg = config(vec![
            group("a", &["b"]),
            group("b", &["a"]),
            group("free", &[]),
        ]);
        let err = DependencyGraph::build(&cfg).unwrap_err();
        match err {
            ConfigError::CycleDetected { groups } => {
                assert_eq!(groups, vec!["a", "b"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let cfg = config(vec![group("api", &["ghost"])]);
        let err = DependencyGraph::build(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDependency { .. }));
    }
}
