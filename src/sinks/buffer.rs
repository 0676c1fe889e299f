//! # Buffer sink: bounded per-process output retention.
//!
//! Keeps the most recent output of every process in memory, chunked so that
//! eviction is cheap: each process owns a deque of fixed-size chunks, and
//! when the total byte budget is exceeded whole chunks fall off the front.
//!
//! Events are recorded as synthetic lines (`== <kind> ==`), so a snapshot
//! reads like the process's console history.

use std::collections::VecDeque;
use std::sync::Mutex;

use dashmap::DashMap;

use crate::config::ProcessKey;
use crate::events::{OutputEvent, OutputLine, Sink};

/// Default per-process retention budget.
const DEFAULT_MAX_BYTES: usize = 64 * 1024;
/// Upper bound for one chunk before a new one is started.
const CHUNK_BYTES: usize = 4 * 1024;

/// Per-process chunked history.
struct ChunkBuffer {
    chunks: VecDeque<String>,
    total: usize,
    max_bytes: usize,
}

impl ChunkBuffer {
    fn new(max_bytes: usize) -> Self {
        Self {
            chunks: VecDeque::new(),
            total: 0,
            max_bytes,
        }
    }

    fn push_line(&mut self, line: &str) {
        let needed = line.len() + 1;
        match self.chunks.back_mut() {
            Some(chunk) if chunk.len() + needed <= CHUNK_BYTES => {
                chunk.push_str(line);
                chunk.push('\n');
            }
            _ => {
                let mut chunk = String::with_capacity(CHUNK_BYTES.min(needed));
                chunk.push_str(line);
                chunk.push('\n');
                self.chunks.push_back(chunk);
            }
        }
        self.total += needed;
        while self.total > self.max_bytes {
            match self.chunks.pop_front() {
                Some(evicted) => self.total -= evicted.len(),
                None => break,
            }
        }
    }

    fn snapshot(&self) -> String {
        self.chunks.iter().map(String::as_str).collect()
    }
}

/// Retains recent output per process, bounded and concurrently writable.
pub struct BufferSink {
    buffers: DashMap<ProcessKey, Mutex<ChunkBuffer>>,
    max_bytes: usize,
}

impl BufferSink {
    /// Creates a sink with the default per-process budget.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_BYTES)
    }

    /// Creates a sink retaining at most `max_bytes` per process.
    pub fn with_capacity(max_bytes: usize) -> Self {
        Self {
            buffers: DashMap::new(),
            max_bytes: max_bytes.max(CHUNK_BYTES),
        }
    }

    fn push(&self, key: &ProcessKey, line: &str) {
        let entry = self
            .buffers
            .entry(key.clone())
            .or_insert_with(|| Mutex::new(ChunkBuffer::new(self.max_bytes)));
        let mut buf = entry.lock().expect("buffer mutex poisoned");
        buf.push_line(line);
    }

    /// Returns the retained output of one process, oldest first.
    pub fn snapshot(&self, key: &ProcessKey) -> Option<String> {
        self.buffers
            .get(key)
            .map(|entry| entry.lock().expect("buffer mutex poisoned").snapshot())
    }

    /// Returns the keys that have retained output, sorted.
    pub fn keys(&self) -> Vec<ProcessKey> {
        let mut keys: Vec<ProcessKey> = self.buffers.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

impl Default for BufferSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for BufferSink {
    fn write(&self, line: OutputLine) {
        self.push(&line.key, &line.line);
    }

    fn write_event(&self, event: OutputEvent) {
        let mut text = format!("== {}", event.kind.tag());
        if let Some(code) = event.exit_code {
            text.push_str(&format!(" code={code}"));
        }
        if let Some(msg) = &event.message {
            text.push_str(&format!(" {msg}"));
        }
        text.push_str(" ==");
        self.push(&event.key, &text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventKind, StreamKind};

    fn key() -> ProcessKey {
        ProcessKey::new("api", "web")
    }

    #[test]
    fn snapshot_returns_lines_in_order() {
        let sink = BufferSink::new();
        sink.write(OutputLine::now(key(), "bin/web", StreamKind::StdOut, "one"));
        sink.write(OutputLine::now(key(), "bin/web", StreamKind::StdOut, "two"));
        assert_eq!(sink.snapshot(&key()).unwrap(), "one\ntwo\n");
        assert!(sink.snapshot(&ProcessKey::new("api", "other")).is_none());
    }

    #[test]
    fn retention_is_bounded() {
        let sink = BufferSink::with_capacity(CHUNK_BYTES);
        let long = "x".repeat(100);
        for _ in 0..200 {
            sink.write(OutputLine::now(
                key(),
                "bin/web",
                StreamKind::StdOut,
                long.clone(),
            ));
        }
        let snap = sink.snapshot(&key()).unwrap();
        assert!(snap.len() <= 2 * CHUNK_BYTES);
        assert!(snap.ends_with(&format!("{long}\n")));
    }

    #[test]
    fn events_become_marker_lines() {
        let sink = BufferSink::new();
        sink.write_event(
            crate::events::OutputEvent::now(EventKind::Exited, key(), "bin/web").with_exit_code(0),
        );
        assert_eq!(sink.snapshot(&key()).unwrap(), "== exited code=0 ==\n");
    }
}
