//! Output records and the sink interface they flow into.

mod record;
mod sink;

pub use record::{EventKind, OutputEvent, OutputLine, StreamKind};
pub use sink::{NullSink, Sink, SinkRef};
