//! # Output records emitted by executors and supervisors.
//!
//! Two record shapes flow to the sink:
//! - [`OutputLine`]: one line of child output, captured in file mode;
//! - [`OutputEvent`]: a lifecycle event for a process or a group.
//!
//! ## Ordering guarantees
//! For a given process within a given run, `Starting` precedes all of its
//! `OutputLine`s, which precede the terminal event (`Exited`, `Stopped`, or
//! `Failed`). Nothing is guaranteed across different processes.
//!
//! ## Event flow examples
//!
//! ### Normal exit and group restart
//! ```text
//! Starting (core/a) → Exited code=1 (core/a)
//! Stopped (core/b)                      ← sibling torn down in group mode
//! Restarting (core/group)
//! Starting (core/a) → ...
//! ```
//!
//! ### Budget exhaustion
//! ```text
//! Starting → Exited → Restarting → ... → Failed "restart limit reached"
//! ```

use std::time::SystemTime;

use crate::config::ProcessKey;

/// Which stream a captured line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Standard output (also used for the merged log file).
    StdOut,
    /// Standard error.
    StdErr,
}

impl StreamKind {
    /// Short tag used in the reference text rendering.
    pub fn tag(&self) -> &'static str {
        match self {
            StreamKind::StdOut => "out",
            StreamKind::StdErr => "err",
        }
    }
}

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A process is about to be spawned.
    Starting,
    /// A process terminated on its own; carries the exit code when known.
    Exited,
    /// A group is tearing down to restart; emitted on the synthetic group key.
    Restarting,
    /// A process was stopped by cooperative cancellation.
    Stopped,
    /// A spawn/runtime failure, or a restart budget exhaustion.
    Failed,
}

impl EventKind {
    /// Short stable tag used in the reference text rendering.
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::Starting => "starting",
            EventKind::Exited => "exited",
            EventKind::Restarting => "restarting",
            EventKind::Stopped => "stopped",
            EventKind::Failed => "failed",
        }
    }
}

/// One captured line of child output, without its trailing newline.
#[derive(Debug, Clone)]
pub struct OutputLine {
    /// Process the line belongs to.
    pub key: ProcessKey,
    /// Human-facing path or command text of the process.
    pub display_path: String,
    /// Stream the line came from.
    pub stream: StreamKind,
    /// Line text, newline stripped.
    pub line: String,
    /// Wall-clock capture time.
    pub at: SystemTime,
}

impl OutputLine {
    /// Creates a line record stamped with the current time.
    pub fn now(
        key: ProcessKey,
        display_path: impl Into<String>,
        stream: StreamKind,
        line: impl Into<String>,
    ) -> Self {
        Self {
            key,
            display_path: display_path.into(),
            stream,
            line: line.into(),
            at: SystemTime::now(),
        }
    }
}

/// A lifecycle event with optional metadata.
#[derive(Debug, Clone)]
pub struct OutputEvent {
    /// Process (or synthetic group) the event belongs to.
    pub key: ProcessKey,
    /// Human-facing path or command text of the process.
    pub display_path: String,
    /// The kind of event.
    pub kind: EventKind,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Exit code, when the event represents a normal termination.
    pub exit_code: Option<i32>,
    /// Free-form message, when the event carries one.
    pub message: Option<String>,
}

impl OutputEvent {
    /// Creates an event of the given kind stamped with the current time.
    pub fn now(kind: EventKind, key: ProcessKey, display_path: impl Into<String>) -> Self {
        Self {
            key,
            display_path: display_path.into(),
            kind,
            at: SystemTime::now(),
            exit_code: None,
            message: None,
        }
    }

    /// Attaches an exit code.
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Attaches a message.
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }
}
