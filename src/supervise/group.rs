//! # GroupSupervisor: one group's run/restart state machine.
//!
//! Owns the lifecycle of a single process group: spawns its processes,
//! watches for exits, applies the group's restart mode and budget, accepts
//! external restart requests, and announces restarts through a callback hook.
//!
//! ## Main loop
//! ```text
//! loop while stop token untripped {
//!   ├─► derive fresh run token (child of stop token)
//!   ├─► consume pending restart request (trips the new token immediately)
//!   ├─► dispatch by restart mode:
//!   │     Group   → race all processes, first non-cancelled completion
//!   │               tears down the siblings
//!   │     Process → independent per-process restart loops
//!   ├─► reason == None → terminal, break
//!   ├─► budget exhausted → Failed "restart limit reached", break
//!   └─► Restarting event + hook → sleep restart delay (abortable) → repeat
//! }
//! ```
//!
//! ## Rules
//! - The mutex guards only the token swap and the pending-restart flag; it is
//!   never held across an await.
//! - Tripping the stop token trips the current run token (parent/child chain)
//!   and ends the loop without a restart.
//! - Tripping only the run token restarts the group without terminating it.
//! - Restart counters are local to one `run` invocation.

use std::sync::{Arc, Mutex, OnceLock};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::{ProcessKey, ResolvedProcessGroup, RestartMode, RestartPolicy};
use crate::events::{EventKind, OutputEvent, SinkRef};
use crate::exec::{ExecutionRequest, Executor};

/// Message attached to `Failed` events when a restart budget runs out.
pub const RESTART_LIMIT_MESSAGE: &str = "restart limit reached";

/// Why a group is about to restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    /// A process of the group exited (or faulted) on its own.
    ProcessExit,
    /// `request_restart` was invoked, typically by dependency propagation.
    ExternalRequest,
}

/// Callback invoked when the group announces a restart.
pub type RestartHook = Box<dyn Fn(&str, RestartReason) + Send + Sync>;

/// Token-swap state shared between the run loop and `request_restart`.
struct RunState {
    /// Cancellation handle of the current run, when one is active.
    run_token: Option<CancellationToken>,
    /// Restart was requested while the supervisor was between runs.
    restart_requested: bool,
}

/// Supervises one process group until its stop token trips or its restart
/// budget is exhausted.
pub struct GroupSupervisor {
    group: Arc<ResolvedProcessGroup>,
    requests: Vec<ExecutionRequest>,
    executor: Arc<dyn Executor>,
    sink: SinkRef,
    state: Mutex<RunState>,
    on_restarting: OnceLock<RestartHook>,
}

impl GroupSupervisor {
    /// Creates a supervisor for `group`, driving processes through `executor`.
    pub fn new(group: ResolvedProcessGroup, executor: Arc<dyn Executor>, sink: SinkRef) -> Self {
        let requests = group
            .processes
            .iter()
            .map(|p| ExecutionRequest::new(Arc::new(p.clone())))
            .collect();
        Self {
            group: Arc::new(group),
            requests,
            executor,
            sink,
            state: Mutex::new(RunState {
                run_token: None,
                restart_requested: false,
            }),
            on_restarting: OnceLock::new(),
        }
    }

    /// Returns the supervised group's name.
    pub fn name(&self) -> &str {
        &self.group.name
    }

    /// Installs the restart callback. One hook per supervisor, fixed before
    /// `run`; later calls are ignored.
    pub fn set_restart_hook(&self, hook: RestartHook) {
        let _ = self.on_restarting.set(hook);
    }

    /// Requests a restart of the group.
    ///
    /// If a run is active its token is tripped; otherwise the request is
    /// remembered and consumed at the start of the next iteration. Safe to
    /// call from any thread, returns immediately.
    pub fn request_restart(&self) {
        let mut state = self.state.lock().expect("supervisor state poisoned");
        match &state.run_token {
            Some(token) => token.cancel(),
            None => state.restart_requested = true,
        }
    }

    /// Runs the group until `stop` trips or the restart budget is exhausted.
    pub async fn run(&self, stop: CancellationToken) {
        let mut restarts: u32 = 0;

        while !stop.is_cancelled() {
            let run_token = stop.child_token();
            {
                let mut state = self.state.lock().expect("supervisor state poisoned");
                state.run_token = Some(run_token.clone());
                if state.restart_requested {
                    state.restart_requested = false;
                    run_token.cancel();
                }
            }

            let reason = match self.group.restart_mode {
                RestartMode::Group => self.run_group_mode(&run_token, &stop).await,
                RestartMode::Process => self.run_process_mode(&run_token, &stop).await,
            };

            {
                let mut state = self.state.lock().expect("supervisor state poisoned");
                state.run_token = None;
            }

            let reason = match reason {
                Some(reason) if !stop.is_cancelled() => reason,
                _ => break,
            };

            if !self.group.restart.allows(restarts) {
                self.sink.write_event(
                    self.group_event(EventKind::Failed)
                        .with_message(RESTART_LIMIT_MESSAGE),
                );
                break;
            }
            restarts += 1;

            self.sink.write_event(self.group_event(EventKind::Restarting));
            if let Some(hook) = self.on_restarting.get() {
                hook(&self.group.name, reason);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.group.restart.restart_delay) => {}
                _ = stop.cancelled() => break,
            }
        }
    }

    /// Group mode: every exit tears the whole group down.
    ///
    /// Races the processes; the first non-cancelled completion trips the run
    /// token to stop the siblings. Cancelled completions while the token is
    /// untripped (per-attempt noise) keep the race going.
    async fn run_group_mode(
        &self,
        run_token: &CancellationToken,
        stop: &CancellationToken,
    ) -> Option<RestartReason> {
        let mut set = JoinSet::new();
        for request in &self.requests {
            let executor = Arc::clone(&self.executor);
            let sink = self.sink.clone();
            let request = request.clone();
            let token = run_token.clone();
            set.spawn(async move { executor.run(&request, &sink, &token).await });
        }

        let mut reason = None;
        while let Some(joined) = set.join_next().await {
            if stop.is_cancelled() {
                reason = None;
                break;
            }
            let finished_naturally = match joined {
                Ok(result) => !result.cancelled,
                // A panicked execution counts as a process exit.
                Err(_) => true,
            };
            if finished_naturally {
                reason = Some(RestartReason::ProcessExit);
                run_token.cancel();
                break;
            }
            if run_token.is_cancelled() {
                reason = Some(RestartReason::ExternalRequest);
                break;
            }
        }

        run_token.cancel();
        while set.join_next().await.is_some() {}

        if stop.is_cancelled() {
            None
        } else {
            reason.or(Some(RestartReason::ExternalRequest))
        }
    }

    /// Process mode: each process restarts independently under the shared
    /// run token; the group level only acts on external requests.
    async fn run_process_mode(
        &self,
        run_token: &CancellationToken,
        stop: &CancellationToken,
    ) -> Option<RestartReason> {
        let mut set = JoinSet::new();
        for request in &self.requests {
            let executor = Arc::clone(&self.executor);
            let sink = self.sink.clone();
            let request = request.clone();
            let token = run_token.clone();
            let policy = self.group.restart;
            set.spawn(process_loop(executor, sink, request, policy, token));
        }
        while set.join_next().await.is_some() {}

        if stop.is_cancelled() {
            None
        } else if run_token.is_cancelled() {
            Some(RestartReason::ExternalRequest)
        } else {
            None
        }
    }

    fn group_event(&self, kind: EventKind) -> OutputEvent {
        OutputEvent::now(
            kind,
            ProcessKey::group_scoped(&self.group.name),
            &self.group.name,
        )
    }
}

/// One process's restart loop in process mode.
async fn process_loop(
    executor: Arc<dyn Executor>,
    sink: SinkRef,
    request: ExecutionRequest,
    policy: RestartPolicy,
    token: CancellationToken,
) {
    let mut restarts: u32 = 0;
    loop {
        let result = executor.run(&request, &sink, &token).await;
        if token.is_cancelled() || result.cancelled {
            return;
        }
        if !policy.allows(restarts) {
            sink.write_event(
                OutputEvent::now(
                    EventKind::Failed,
                    request.process.key.clone(),
                    &request.process.display_path,
                )
                .with_message(RESTART_LIMIT_MESSAGE),
            );
            return;
        }
        restarts += 1;

        tokio::select! {
            _ = tokio::time::sleep(policy.restart_delay) => {}
            _ = token.cancelled() => return,
        }
    }
}
