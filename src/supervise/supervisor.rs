//! # Supervisor: orchestrates group supervisors and restart propagation.
//!
//! Builds one [`GroupSupervisor`] per configured group, derives the
//! [`DependencyGraph`], and wires propagation: when a group announces a
//! restart, every group that depends on it is asked to restart too.
//!
//! ## Architecture
//! ```text
//! ResolvedProcessConfig ──► Supervisor::new()
//!                                │
//!                                ├──► DependencyGraph (start order, dependents)
//!                                ├──► GroupSupervisor per group
//!                                └──► restart hook per group:
//!                                      dependents[g] → request_restart()
//!
//! Supervisor::run(stop)
//!     └──► spawn every GroupSupervisor::run in start order, await all
//! ```
//!
//! ## Rules
//! - Start order is a dispatch hint for deterministic start-up and logs;
//!   supervisors do not wait on each other's readiness.
//! - Propagation is one hop per emission: a restarting dependent emits its
//!   own `Restarting`, which reaches its own dependents in turn.
//! - Hooks fire synchronously from the restarting group's loop; the actual
//!   teardown and re-spawn they trigger is asynchronous.
//! - `run` returns when every group supervisor has returned.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::ResolvedProcessConfig;
use crate::error::ConfigError;
use crate::events::SinkRef;
use crate::exec::Executor;
use crate::graph::DependencyGraph;

use super::group::GroupSupervisor;

/// Top-level supervisor for one resolved configuration.
pub struct Supervisor {
    graph: DependencyGraph,
    groups: BTreeMap<String, Arc<GroupSupervisor>>,
}

impl Supervisor {
    /// Builds the graph and one group supervisor per group, wiring restart
    /// propagation. Fails on cycles or unknown dependencies.
    pub fn new(
        config: &ResolvedProcessConfig,
        executor: Arc<dyn Executor>,
        sink: SinkRef,
    ) -> Result<Self, ConfigError> {
        let graph = DependencyGraph::build(config)?;

        let mut groups: BTreeMap<String, Arc<GroupSupervisor>> = BTreeMap::new();
        for (name, group) in &config.groups {
            groups.insert(
                name.clone(),
                Arc::new(GroupSupervisor::new(
                    group.clone(),
                    Arc::clone(&executor),
                    sink.clone(),
                )),
            );
        }

        // Weak references break the supervisor-to-supervisor cycle that
        // mutual dependents would otherwise create.
        for (name, supervisor) in &groups {
            let dependents: Vec<Weak<GroupSupervisor>> = graph
                .dependents_of(name)
                .iter()
                .filter_map(|dep| groups.get(dep).map(Arc::downgrade))
                .collect();
            supervisor.set_restart_hook(Box::new(move |_group, _reason| {
                for dependent in &dependents {
                    if let Some(dependent) = dependent.upgrade() {
                        dependent.request_restart();
                    }
                }
            }));
        }

        Ok(Self { graph, groups })
    }

    /// Deterministic topological start order of the groups.
    pub fn start_order(&self) -> &[String] {
        &self.graph.start_order
    }

    /// The dependency graph this supervisor runs with.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Requests a restart of one group, as dependency propagation would.
    ///
    /// Returns false when the group does not exist.
    pub fn request_restart(&self, group: &str) -> bool {
        match self.groups.get(group) {
            Some(supervisor) => {
                supervisor.request_restart();
                true
            }
            None => false,
        }
    }

    /// Runs every group supervisor concurrently until `stop` trips or every
    /// group reaches a terminal state.
    pub async fn run(&self, stop: CancellationToken) {
        let mut set = JoinSet::new();
        for name in &self.graph.start_order {
            let supervisor = Arc::clone(&self.groups[name]);
            let stop = stop.clone();
            set.spawn(async move { supervisor.run(stop).await });
        }
        while set.join_next().await.is_some() {}
    }
}
