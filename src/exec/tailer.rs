//! # File tailer: republishes appended log lines as output records.
//!
//! Polls the log file that the wrapper script appends to, emitting each new
//! line as an [`OutputLine`]. Termination condition: the owning child has
//! exited and the file has been read to end-of-file, at which point a partial
//! trailing line (no newline yet) is flushed as a final line.
//!
//! ## Rules
//! - Reading starts at the position recorded before the child was spawned,
//!   so a pre-existing log body is not replayed.
//! - A UTF-8 BOM at offset 0 is skipped.
//! - Lines are emitted with the `StdOut` stream tag; the wrapper merges both
//!   streams into one file.
//! - I/O errors become a `Failed` event on the process key and end the
//!   tailer; they never propagate to the owner.
//! - Cancellation drains what is already on disk, then terminates cleanly.

use std::path::PathBuf;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tokio_util::sync::CancellationToken;

use crate::config::ProcessKey;
use crate::events::{EventKind, OutputEvent, OutputLine, SinkRef, StreamKind};

/// Default delay between polls of the log file.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

const READ_CHUNK: usize = 8 * 1024;
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Polls one log file and republishes appended lines.
pub struct FileTailer {
    path: PathBuf,
    key: ProcessKey,
    display_path: String,
    start_pos: u64,
    poll_interval: Duration,
}

impl FileTailer {
    /// Creates a tailer seeded at `start_pos` with the default poll interval.
    pub fn new(
        path: PathBuf,
        key: ProcessKey,
        display_path: impl Into<String>,
        start_pos: u64,
    ) -> Self {
        Self {
            path,
            key,
            display_path: display_path.into(),
            start_pos,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Overrides the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Runs until the child is done and the file is drained, or `cancel`
    /// trips. Never returns an error; failures surface as `Failed` events.
    pub async fn run(self, sink: SinkRef, child_done: CancellationToken, cancel: CancellationToken) {
        if let Err(e) = self.tail(&sink, &child_done, &cancel).await {
            sink.write_event(
                OutputEvent::now(EventKind::Failed, self.key.clone(), &self.display_path)
                    .with_message(format!("tailer error on {}: {e}", self.path.display())),
            );
        }
    }

    async fn tail(
        &self,
        sink: &SinkRef,
        child_done: &CancellationToken,
        cancel: &CancellationToken,
    ) -> std::io::Result<()> {
        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.start_pos)).await?;

        let mut pending: Vec<u8> = Vec::new();
        let mut buf = vec![0u8; READ_CHUNK];
        let mut at_file_start = self.start_pos == 0;
        let mut draining = false;

        loop {
            let n = file.read(&mut buf).await?;
            if n > 0 {
                pending.extend_from_slice(&buf[..n]);
                if at_file_start && pending.len() >= UTF8_BOM.len() {
                    if pending.starts_with(&UTF8_BOM) {
                        pending.drain(..UTF8_BOM.len());
                    }
                    at_file_start = false;
                }
                self.emit_complete_lines(sink, &mut pending);
                continue;
            }

            // At end-of-file. Done once the child has exited (or we are
            // tearing down): flush the held partial line and stop.
            if draining || child_done.is_cancelled() {
                if at_file_start && pending.starts_with(&UTF8_BOM) {
                    pending.drain(..UTF8_BOM.len());
                }
                self.emit_complete_lines(sink, &mut pending);
                if !pending.is_empty() {
                    self.emit_line(sink, &pending);
                }
                return Ok(());
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = child_done.cancelled() => {}
                _ = cancel.cancelled() => { draining = true; }
            }
        }
    }

    fn emit_complete_lines(&self, sink: &SinkRef, pending: &mut Vec<u8>) {
        while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            self.emit_line(sink, &line);
        }
    }

    fn emit_line(&self, sink: &SinkRef, raw: &[u8]) {
        sink.write(OutputLine::now(
            self.key.clone(),
            &self.display_path,
            StreamKind::StdOut,
            String::from_utf8_lossy(raw),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::BufferSink;
    use std::sync::Arc;

    fn key() -> ProcessKey {
        ProcessKey::new("main", "tail")
    }

    #[tokio::test]
    async fn emits_lines_appended_after_start_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tail.log");
        std::fs::write(&path, "old content\n").unwrap();
        let start = std::fs::metadata(&path).unwrap().len();

        let sink = Arc::new(BufferSink::new());
        let child_done = CancellationToken::new();
        let tailer = FileTailer::new(path.clone(), key(), "tail", start)
            .with_poll_interval(Duration::from_millis(10));
        let handle = tokio::spawn(tailer.run(
            sink.clone() as SinkRef,
            child_done.clone(),
            CancellationToken::new(),
        ));

        tokio::time::sleep(Duration::from_millis(30)).await;
        {
            use std::io::Write;
            let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(f, "fresh line").unwrap();
            write!(f, "partial tail").unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        child_done.cancel();
        handle.await.unwrap();

        let snap = sink.snapshot(&key()).unwrap();
        assert!(!snap.contains("old content"));
        assert!(snap.contains("fresh line\n"));
        assert!(snap.contains("partial tail\n"));
    }

    #[tokio::test]
    async fn skips_bom_and_strips_crlf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.log");
        std::fs::write(&path, b"\xEF\xBB\xBFfirst\r\nsecond\n").unwrap();

        let sink = Arc::new(BufferSink::new());
        let child_done = CancellationToken::new();
        child_done.cancel();
        FileTailer::new(path, key(), "tail", 0)
            .with_poll_interval(Duration::from_millis(5))
            .run(
                sink.clone() as SinkRef,
                child_done,
                CancellationToken::new(),
            )
            .await;

        assert_eq!(sink.snapshot(&key()).unwrap(), "first\nsecond\n");
    }

    #[tokio::test]
    async fn missing_file_reports_failed_event() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(BufferSink::new());
        let child_done = CancellationToken::new();
        child_done.cancel();
        FileTailer::new(dir.path().join("absent.log"), key(), "tail", 0)
            .run(
                sink.clone() as SinkRef,
                child_done,
                CancellationToken::new(),
            )
            .await;

        let snap = sink.snapshot(&key()).unwrap();
        assert!(snap.contains("failed"));
        assert!(snap.contains("tailer error"));
    }
}
