//! # procvd
//!
//! **Procvd** is a process-group supervisor for local multi-process
//! development and operations workflows: a foreman-style runner with
//! dependency-ordered startup, per-group restart policies, and restart
//! propagation across the dependency graph.
//!
//! ## Features
//!
//! | Area            | Description                                                        | Key types / traits                          |
//! |-----------------|--------------------------------------------------------------------|---------------------------------------------|
//! | **Config**      | Declarative groups, processes, dependencies, output policies.      | [`ResolvedProcessConfig`], [`loader`]       |
//! | **Graph**       | Deterministic topological start order, restart fan-out map.        | [`DependencyGraph`]                         |
//! | **Supervision** | Per-group run/restart state machines and cross-group propagation.  | [`Supervisor`], [`GroupSupervisor`]         |
//! | **Execution**   | Pluggable process execution with file-output rotation and tailing. | [`Executor`], [`DefaultExecutor`]           |
//! | **Output**      | Lines and lifecycle events multiplexed to pluggable sinks.         | [`Sink`], [`ConsoleSink`], [`BufferSink`]   |
//! | **Errors**      | Typed errors for configuration and execution.                      | [`ConfigError`], [`ExecError`]              |
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use procvd::{loader, ConsoleSink, DefaultExecutor, Supervisor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = loader::load_file(Path::new("procfile.json"))?;
//!     let supervisor = Supervisor::new(
//!         &config,
//!         Arc::new(DefaultExecutor::new()),
//!         Arc::new(ConsoleSink::new()),
//!     )?;
//!
//!     let stop = CancellationToken::new();
//!     tokio::spawn(procvd::signal::trip_on_shutdown_signal(stop.clone()));
//!
//!     supervisor.run(stop).await;
//!     Ok(())
//! }
//! ```
//!
//! ---

mod config;
mod error;
mod events;
mod exec;
mod graph;
pub mod signal;
mod sinks;
mod supervise;

// ---- Public re-exports ----

pub use config::{
    loader, sample, OutputPolicy, ProcessKey, ResolvedProcess, ResolvedProcessConfig,
    ResolvedProcessGroup, RestartMode, RestartPolicy,
};
pub use error::{ConfigError, ExecError};
pub use events::{EventKind, NullSink, OutputEvent, OutputLine, Sink, SinkRef, StreamKind};
pub use exec::{
    DefaultExecutor, ExecutionRequest, ExecutionResult, Executor, FileTailer,
    DEFAULT_POLL_INTERVAL,
};
pub use graph::DependencyGraph;
pub use sinks::{BufferSink, ConsoleSink, FanoutSink};
pub use supervise::{GroupSupervisor, RestartHook, RestartReason, Supervisor, RESTART_LIMIT_MESSAGE};
