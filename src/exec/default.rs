//! # Default executor: spawns real OS processes.
//!
//! Two modes, selected by the process's output policy:
//!
//! - **Inherit**: the child shares the supervisor's stdout/stderr; no
//!   `OutputLine` records are produced.
//! - **File**: the child is launched through a generated wrapper script that
//!   appends both streams to a rotated log file, and a [`FileTailer`]
//!   republishes appended lines while the child runs.
//!
//! ## File-mode sequence
//! ```text
//! ensure log dir → rotate (start-time only) → record tail position
//!   → write wrapper script → spawn wrapper → start tailer
//!   → await child exit → signal tailer → await tailer drain → Exited
//! ```
//!
//! ## Cancellation
//! The wait races against the cancel token. On cancel the child's process
//! group gets SIGTERM, then SIGKILL after a short grace (plain `kill` off
//! Unix); the tailer is drained before the cancelled result is returned.

use std::process::Stdio;
#[cfg(unix)]
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::config::{OutputPolicy, ResolvedProcess};
use crate::error::ExecError;
use crate::events::{EventKind, OutputEvent, SinkRef};

use super::executor::Executor;
use super::request::{ExecutionRequest, ExecutionResult};
use super::rotate::rotate_at_start;
use super::script::write_wrapper;
use super::tailer::FileTailer;

/// Time between SIGTERM and SIGKILL when stopping a child.
#[cfg(unix)]
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Executor that launches real children via `tokio::process`.
pub struct DefaultExecutor;

impl DefaultExecutor {
    /// Creates the default executor.
    pub fn new() -> Self {
        Self
    }

    fn base_command(&self, process: &ResolvedProcess) -> Command {
        let mut cmd = Command::new(&process.executable);
        cmd.args(&process.args);
        cmd.current_dir(&process.working_dir);
        apply_env(&mut cmd, process);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd.kill_on_drop(true);
        cmd
    }

    async fn run_inherit(
        &self,
        process: &ResolvedProcess,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let mut cmd = self.base_command(process);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return ExecutionResult::faulted(ExecError::spawn(e)),
        };
        self.wait_or_cancel(&mut child, cancel).await
    }

    async fn run_file(
        &self,
        process: &ResolvedProcess,
        sink: &SinkRef,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let (log_path, max_bytes, max_files) = match &process.output {
            OutputPolicy::File {
                path,
                max_bytes,
                max_files,
            } => (path.clone(), *max_bytes, *max_files),
            OutputPolicy::Inherit => unreachable!("file mode requires a file policy"),
        };

        if let Some(dir) = log_path.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                return ExecutionResult::faulted(ExecError::output(&log_path, e));
            }
        }

        // Rotation failures are logged but do not stop the run; the child can
        // still append to the oversized file.
        if let Err(e) = rotate_at_start(&log_path, max_bytes, max_files) {
            sink.write_event(
                OutputEvent::now(
                    EventKind::Failed,
                    process.key.clone(),
                    &process.display_path,
                )
                .with_message(format!("rotation failed for {}: {e}", log_path.display())),
            );
        }

        let tail_start = match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&log_path)
            .and_then(|f| f.metadata())
        {
            Ok(meta) => meta.len(),
            Err(e) => return ExecutionResult::faulted(ExecError::output(&log_path, e)),
        };

        let wrapper = match write_wrapper(process, &log_path) {
            Ok(path) => path,
            Err(e) => return ExecutionResult::faulted(ExecError::output(&log_path, e)),
        };

        let mut cmd = self.wrapper_command(process, &wrapper);
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return ExecutionResult::faulted(ExecError::spawn(e)),
        };

        let child_done = CancellationToken::new();
        let tailer = FileTailer::new(
            log_path,
            process.key.clone(),
            process.display_path.clone(),
            tail_start,
        );
        let tailer_handle = tokio::spawn(tailer.run(
            sink.clone(),
            child_done.clone(),
            cancel.child_token(),
        ));

        let result = self.wait_or_cancel(&mut child, cancel).await;

        // The child is gone either way; let the tailer drain to EOF.
        child_done.cancel();
        let _ = tailer_handle.await;
        result
    }

    fn wrapper_command(&self, process: &ResolvedProcess, wrapper: &std::path::Path) -> Command {
        // Shell commands carry their whole command line inside the script;
        // only direct executables take runtime arguments.
        let runtime_args: &[String] = if process.shell_command.is_none() {
            &process.args
        } else {
            &[]
        };
        let mut cmd;
        if cfg!(windows) {
            cmd = Command::new("cmd");
            cmd.arg("/d").arg("/c").arg(wrapper).args(runtime_args);
        } else {
            cmd = Command::new(wrapper);
            cmd.args(runtime_args);
        }
        cmd.current_dir(&process.working_dir);
        apply_env(&mut cmd, process);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        cmd.process_group(0);
        cmd.kill_on_drop(true);
        cmd
    }

    async fn wait_or_cancel(
        &self,
        child: &mut Child,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        tokio::select! {
            status = child.wait() => match status {
                Ok(status) => ExecutionResult::exited(status.code()),
                Err(e) => ExecutionResult::faulted(ExecError::wait(e)),
            },
            _ = cancel.cancelled() => {
                terminate(child).await;
                ExecutionResult::stopped()
            }
        }
    }
}

impl Default for DefaultExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for DefaultExecutor {
    async fn run(
        &self,
        request: &ExecutionRequest,
        sink: &SinkRef,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let process = request.process.as_ref();
        sink.write_event(OutputEvent::now(
            EventKind::Starting,
            process.key.clone(),
            &process.display_path,
        ));

        let result = match &process.output {
            OutputPolicy::Inherit => self.run_inherit(process, cancel).await,
            OutputPolicy::File { .. } => self.run_file(process, sink, cancel).await,
        };

        let event = if result.cancelled {
            OutputEvent::now(
                EventKind::Stopped,
                process.key.clone(),
                &process.display_path,
            )
        } else if let Some(failure) = &result.failure {
            OutputEvent::now(
                EventKind::Failed,
                process.key.clone(),
                &process.display_path,
            )
            .with_message(failure.to_string())
        } else {
            let mut ev = OutputEvent::now(
                EventKind::Exited,
                process.key.clone(),
                &process.display_path,
            );
            if let Some(code) = result.exit_code {
                ev = ev.with_exit_code(code);
            }
            ev
        };
        sink.write_event(event);
        result
    }
}

/// An env value of `None` unsets the variable in the child.
fn apply_env(cmd: &mut Command, process: &ResolvedProcess) {
    for (name, value) in &process.env {
        match value {
            Some(v) => {
                cmd.env(name, v);
            }
            None => {
                cmd.env_remove(name);
            }
        }
    }
}

/// Best-effort stop: SIGTERM to the child's process group, SIGKILL after the
/// grace period. Falls back to a plain kill off Unix.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            let pgid = Pid::from_raw(pid as i32);
            let _ = killpg(pgid, Signal::SIGTERM);
            if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_ok() {
                return;
            }
            let _ = killpg(pgid, Signal::SIGKILL);
        }
    }
    let _ = child.kill().await;
    let _ = child.wait().await;
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::{OutputPolicy, ProcessKey};
    use crate::sinks::BufferSink;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn shell_process(key: ProcessKey, command: &str, output: OutputPolicy) -> ResolvedProcess {
        ResolvedProcess {
            key,
            executable: PathBuf::from("/bin/sh"),
            display_path: command.to_string(),
            working_dir: std::env::temp_dir(),
            args: vec!["-c".to_string(), command.to_string()],
            env: vec![],
            shell_command: Some(command.to_string()),
            output,
        }
    }

    #[tokio::test]
    async fn inherit_mode_reports_exit_code() {
        let key = ProcessKey::new("main", "exit");
        let process = shell_process(key.clone(), "exit 7", OutputPolicy::Inherit);
        let sink: SinkRef = Arc::new(BufferSink::new());

        let result = DefaultExecutor::new()
            .run(
                &ExecutionRequest::new(Arc::new(process)),
                &sink,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(result.exit_code, Some(7));
        assert!(!result.cancelled);
        assert!(!result.is_faulted());
    }

    #[tokio::test]
    async fn spawn_failure_is_faulted_and_reported() {
        let key = ProcessKey::new("main", "ghost");
        let process = ResolvedProcess {
            key: key.clone(),
            executable: PathBuf::from("/nonexistent/definitely-not-here"),
            display_path: "ghost".to_string(),
            working_dir: std::env::temp_dir(),
            args: vec![],
            env: vec![],
            shell_command: None,
            output: OutputPolicy::Inherit,
        };
        let buffer = Arc::new(BufferSink::new());
        let sink: SinkRef = buffer.clone();

        let result = DefaultExecutor::new()
            .run(
                &ExecutionRequest::new(Arc::new(process)),
                &sink,
                &CancellationToken::new(),
            )
            .await;

        assert!(result.is_faulted());
        let snap = buffer.snapshot(&key).unwrap();
        assert!(snap.contains("starting"));
        assert!(snap.contains("failed"));
    }

    #[tokio::test]
    async fn cancellation_stops_a_blocked_child() {
        let key = ProcessKey::new("main", "sleep");
        let process = shell_process(key.clone(), "sleep 30", OutputPolicy::Inherit);
        let sink: SinkRef = Arc::new(BufferSink::new());
        let cancel = CancellationToken::new();

        let executor = DefaultExecutor::new();
        let request = ExecutionRequest::new(Arc::new(process));
        let run = executor.run(&request, &sink, &cancel);
        tokio::pin!(run);

        tokio::select! {
            _ = &mut run => panic!("child finished before cancel"),
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
        cancel.cancel();
        let result = run.await;
        assert!(result.cancelled);
        assert_eq!(result.exit_code, None);
    }

    #[tokio::test]
    async fn file_mode_captures_output_through_the_tailer() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("main").join("echo.log");
        let key = ProcessKey::new("main", "echo");
        let process = shell_process(
            key.clone(),
            "echo captured-line",
            OutputPolicy::File {
                path: log.clone(),
                max_bytes: 0,
                max_files: 1,
            },
        );
        let buffer = Arc::new(BufferSink::new());
        let sink: SinkRef = buffer.clone();

        let result = DefaultExecutor::new()
            .run(
                &ExecutionRequest::new(Arc::new(process)),
                &sink,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(result.exit_code, Some(0));
        assert!(std::fs::read_to_string(&log)
            .unwrap()
            .contains("captured-line"));
        assert!(buffer.snapshot(&key).unwrap().contains("captured-line"));
    }
}
