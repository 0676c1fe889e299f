//! # Execution request and result types.
//!
//! One [`ExecutionRequest`] describes a single attempt to run one process to
//! completion; one [`ExecutionResult`] reports how that attempt ended. The
//! supervisor never inspects the child directly: this pair is the whole
//! contract between supervision and execution.

use std::sync::Arc;

use crate::config::ResolvedProcess;
use crate::error::ExecError;

/// Everything an executor needs to run one process instance.
#[derive(Clone)]
pub struct ExecutionRequest {
    /// The process to spawn, including its output policy.
    pub process: Arc<ResolvedProcess>,
}

impl ExecutionRequest {
    /// Wraps a resolved process for execution.
    pub fn new(process: Arc<ResolvedProcess>) -> Self {
        Self { process }
    }
}

/// How one execution attempt ended.
///
/// Exactly one of three shapes:
/// - exited: `exit_code` may be set, `cancelled == false`, no failure;
/// - cancelled: `cancelled == true`, no exit code;
/// - faulted: `failure` set, no exit code.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Exit code of the child, when it terminated on its own with one.
    pub exit_code: Option<i32>,
    /// True when the attempt ended through cooperative cancellation.
    pub cancelled: bool,
    /// The error, when the attempt faulted before or after spawn.
    pub failure: Option<ExecError>,
}

impl ExecutionResult {
    /// A natural termination. `code` is `None` when the OS reported no code
    /// (e.g. the child died to an external signal).
    pub fn exited(code: Option<i32>) -> Self {
        Self {
            exit_code: code,
            cancelled: false,
            failure: None,
        }
    }

    /// A cooperative cancellation.
    pub fn stopped() -> Self {
        Self {
            exit_code: None,
            cancelled: true,
            failure: None,
        }
    }

    /// A faulted attempt.
    pub fn faulted(err: ExecError) -> Self {
        Self {
            exit_code: None,
            cancelled: false,
            failure: Some(err),
        }
    }

    /// True when the attempt ended in an error rather than an exit.
    pub fn is_faulted(&self) -> bool {
        self.failure.is_some()
    }
}
