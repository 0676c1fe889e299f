//! Supervision runtime: per-group state machines and the top-level
//! supervisor that wires restart propagation across the dependency graph.

mod group;
mod supervisor;

pub use group::{GroupSupervisor, RestartHook, RestartReason, RESTART_LIMIT_MESSAGE};
pub use supervisor::Supervisor;
