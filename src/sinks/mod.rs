//! # Built-in sink implementations.
//!
//! - [`ConsoleSink`]: colorized reference text rendering to stdout.
//! - [`BufferSink`]: bounded per-process in-memory retention.
//! - [`FanoutSink`]: non-blocking distribution to several sinks at once.
//!
//! All of them satisfy the [`Sink`](crate::events::Sink) contract: concurrent
//! writes are serialized internally and never block the producer for long.

mod buffer;
mod console;
mod fanout;

pub use buffer::BufferSink;
pub use console::ConsoleSink;
pub use fanout::FanoutSink;
