//! # Non-blocking fan-out to multiple sinks.
//!
//! [`FanoutSink`] distributes every record to several downstream sinks without
//! blocking the producer:
//!
//! ```text
//! write(record)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► sink1.write()
//!     │    (bounded)         └──────► panic caught, worker continues
//!     ├──► [queue 2] ──► worker 2 ──► sink2.write()
//!     └──► [queue N] ──► worker N ──► sinkN.write()
//! ```
//!
//! ## Rules
//! - `write`/`write_event` use `try_send` and return immediately.
//! - A full queue drops the record for that sink only; the drop counter
//!   advances so the loss is observable.
//! - A panicking sink is isolated: the panic is caught and its worker keeps
//!   consuming subsequent records.
//! - Per-sink FIFO holds; no ordering across sinks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::events::{OutputEvent, OutputLine, Sink, SinkRef};

/// Queue depth per downstream sink.
const QUEUE_CAPACITY: usize = 1024;

enum Record {
    Line(OutputLine),
    Event(OutputEvent),
}

/// Fans records out to several sinks through bounded per-sink queues.
pub struct FanoutSink {
    senders: Vec<mpsc::Sender<Arc<Record>>>,
    workers: Vec<JoinHandle<()>>,
    dropped: AtomicU64,
}

impl FanoutSink {
    /// Creates the fan-out and spawns one worker task per downstream sink.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(sinks: Vec<SinkRef>) -> Self {
        let mut senders = Vec::with_capacity(sinks.len());
        let mut workers = Vec::with_capacity(sinks.len());

        for sink in sinks {
            let (tx, mut rx) = mpsc::channel::<Arc<Record>>(QUEUE_CAPACITY);
            let handle = tokio::spawn(async move {
                while let Some(record) = rx.recv().await {
                    let deliver = std::panic::AssertUnwindSafe(async {
                        match record.as_ref() {
                            Record::Line(line) => sink.write(line.clone()),
                            Record::Event(event) => sink.write_event(event.clone()),
                        }
                    });
                    let _ = deliver.catch_unwind().await;
                }
            });
            senders.push(tx);
            workers.push(handle);
        }

        Self {
            senders,
            workers,
            dropped: AtomicU64::new(0),
        }
    }

    fn dispatch(&self, record: Record) {
        let record = Arc::new(record);
        for sender in &self.senders {
            if sender.try_send(Arc::clone(&record)).is_err() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Number of records dropped because a queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Closes the queues and waits for the workers to drain.
    pub async fn shutdown(self) {
        drop(self.senders);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

impl Sink for FanoutSink {
    fn write(&self, line: OutputLine) {
        self.dispatch(Record::Line(line));
    }

    fn write_event(&self, event: OutputEvent) {
        self.dispatch(Record::Event(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessKey;
    use crate::events::{EventKind, StreamKind};
    use crate::sinks::BufferSink;

    #[tokio::test]
    async fn records_reach_every_sink() {
        let a = Arc::new(BufferSink::new());
        let b = Arc::new(BufferSink::new());
        let fanout = FanoutSink::new(vec![a.clone() as SinkRef, b.clone() as SinkRef]);

        let key = ProcessKey::new("api", "web");
        fanout.write(OutputLine::now(
            key.clone(),
            "bin/web",
            StreamKind::StdOut,
            "hello",
        ));
        fanout.write_event(OutputEvent::now(EventKind::Stopped, key.clone(), "bin/web"));
        fanout.shutdown().await;

        for sink in [a, b] {
            let snap = sink.snapshot(&key).unwrap();
            assert!(snap.contains("hello"));
            assert!(snap.contains("stopped"));
        }
    }

    #[tokio::test]
    async fn panicking_sink_does_not_stop_its_worker() {
        struct Panicky;
        impl Sink for Panicky {
            fn write(&self, line: OutputLine) {
                if line.line == "boom" {
                    panic!("sink blew up");
                }
            }
            fn write_event(&self, _event: OutputEvent) {}
        }

        let buffer = Arc::new(BufferSink::new());
        let fanout = FanoutSink::new(vec![Arc::new(Panicky) as SinkRef, buffer.clone() as SinkRef]);

        let key = ProcessKey::new("api", "web");
        fanout.write(OutputLine::now(
            key.clone(),
            "bin/web",
            StreamKind::StdOut,
            "boom",
        ));
        fanout.write(OutputLine::now(
            key.clone(),
            "bin/web",
            StreamKind::StdOut,
            "after",
        ));
        fanout.shutdown().await;

        assert!(buffer.snapshot(&key).unwrap().contains("after"));
    }
}
