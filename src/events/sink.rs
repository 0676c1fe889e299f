//! # Sink: the consumer side of the output stream.
//!
//! Everything the runtime observes (child output lines and lifecycle
//! events) flows through one [`Sink`]. The core treats the sink as opaque:
//! both methods must return quickly and must be safe to call from many tasks
//! at once; buffering and back-pressure are the implementation's concern.
//!
//! Built-in implementations live in [`sinks`](crate::sinks):
//! [`ConsoleSink`](crate::sinks::ConsoleSink),
//! [`BufferSink`](crate::sinks::BufferSink), and
//! [`FanoutSink`](crate::sinks::FanoutSink).

use std::sync::Arc;

use super::record::{OutputEvent, OutputLine};

/// Shared handle to a sink.
pub type SinkRef = Arc<dyn Sink>;

/// Consumer of output lines and lifecycle events.
///
/// ## Rules
/// - Both methods are called concurrently from executor, tailer, and
///   supervisor tasks; implementations serialize internally.
/// - Neither method may block the caller; queue or drop instead.
pub trait Sink: Send + Sync {
    /// Consumes one captured output line.
    fn write(&self, line: OutputLine);

    /// Consumes one lifecycle event.
    fn write_event(&self, event: OutputEvent);
}

/// Sink that discards everything. Useful as a default and in tests.
pub struct NullSink;

impl Sink for NullSink {
    fn write(&self, _line: OutputLine) {}
    fn write_event(&self, _event: OutputEvent) {}
}
