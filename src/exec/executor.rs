//! # Executor: the seam between supervision and the OS.
//!
//! The supervisor drives processes exclusively through this trait, which
//! makes the run/restart state machine testable with scripted doubles and
//! keeps platform details out of the supervision logic.
//!
//! ## Contract
//! - Emit a `Starting` event before spawning.
//! - Emit exactly one terminal event per invocation: `Exited` on natural
//!   termination (with the exit code when known), `Stopped` on cooperative
//!   cancellation, `Failed` on any other error.
//! - Honor cancellation promptly: best-effort stop the child, drain any
//!   in-flight tailer output, and return a cancelled result.
//! - Never swallow output: in file mode every line appended to the log
//!   between spawn and drain appears as at least one `OutputLine`.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::events::SinkRef;

use super::request::{ExecutionRequest, ExecutionResult};

/// Runs one process instance to completion.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Executes the request, reporting lines and events to `sink`.
    ///
    /// Returns when the child has terminated, the attempt has faulted, or
    /// `cancel` was honored.
    async fn run(
        &self,
        request: &ExecutionRequest,
        sink: &SinkRef,
        cancel: &CancellationToken,
    ) -> ExecutionResult;
}
