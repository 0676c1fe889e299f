//! # Console sink: colorized reference text rendering.
//!
//! Renders records to stdout in the reference format:
//! ```text
//! [12:04:31] [group:api] [proc:web] [path:bin/web] [out] listening on :8080
//! [12:04:32] [group:api] [proc:web] [path:bin/web] [event:exited] [code:0]
//! ```
//!
//! Each process gets a stable color derived from its key, so interleaved
//! output from many children stays readable.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use owo_colors::{AnsiColors, OwoColorize};

use crate::config::ProcessKey;
use crate::events::{OutputEvent, OutputLine, Sink};

/// Palette cycled through by key hash. Red is reserved for failures.
const PALETTE: [AnsiColors; 6] = [
    AnsiColors::Cyan,
    AnsiColors::Green,
    AnsiColors::Yellow,
    AnsiColors::Magenta,
    AnsiColors::Blue,
    AnsiColors::BrightCyan,
];

/// Writes records to stdout, colorized per process.
pub struct ConsoleSink {
    colored: bool,
}

impl ConsoleSink {
    /// Creates a colorizing console sink.
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Creates a console sink that emits plain text.
    pub fn plain() -> Self {
        Self { colored: false }
    }

    fn color_for(key: &ProcessKey) -> AnsiColors {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        PALETTE[(hasher.finish() % PALETTE.len() as u64) as usize]
    }

    fn prefix(at: SystemTime, key: &ProcessKey, display_path: &str) -> String {
        format!(
            "[{}] [group:{}] [proc:{}] [path:{}]",
            format_clock(at),
            key.group,
            key.process,
            display_path
        )
    }

    fn emit(&self, key: &ProcessKey, text: String, failure: bool) {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        let res = if !self.colored {
            writeln!(out, "{text}")
        } else if failure {
            writeln!(out, "{}", text.color(AnsiColors::Red))
        } else {
            writeln!(out, "{}", text.color(Self::color_for(key)))
        };
        let _ = res;
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn write(&self, line: OutputLine) {
        let text = format!(
            "{} [{}] {}",
            Self::prefix(line.at, &line.key, &line.display_path),
            line.stream.tag(),
            line.line
        );
        self.emit(&line.key, text, false);
    }

    fn write_event(&self, event: OutputEvent) {
        let mut text = format!(
            "{} [event:{}]",
            Self::prefix(event.at, &event.key, &event.display_path),
            event.kind.tag()
        );
        if let Some(code) = event.exit_code {
            text.push_str(&format!(" [code:{code}]"));
        }
        if let Some(msg) = &event.message {
            text.push(' ');
            text.push_str(msg);
        }
        let failure = matches!(event.kind, crate::events::EventKind::Failed);
        self.emit(&event.key, text, failure);
    }
}

/// Formats a wall-clock time as `HH:MM:SS` (UTC).
fn format_clock(at: SystemTime) -> String {
    let secs = at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let time_of_day = secs % 86400;
    format!(
        "{:02}:{:02}:{:02}",
        time_of_day / 3600,
        (time_of_day % 3600) / 60,
        time_of_day % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_formats_midnight_and_noon() {
        assert_eq!(format_clock(UNIX_EPOCH), "00:00:00");
        let noon = UNIX_EPOCH + std::time::Duration::from_secs(12 * 3600 + 34 * 60 + 56);
        assert_eq!(format_clock(noon), "12:34:56");
    }

    #[test]
    fn color_is_stable_per_key() {
        let key = ProcessKey::new("api", "web");
        assert_eq!(ConsoleSink::color_for(&key), ConsoleSink::color_for(&key));
    }

    #[test]
    fn prefix_follows_reference_format() {
        let key = ProcessKey::new("api", "web");
        let at = UNIX_EPOCH + std::time::Duration::from_secs(45296);
        assert_eq!(
            ConsoleSink::prefix(at, &key, "bin/web"),
            "[12:34:56] [group:api] [proc:web] [path:bin/web]"
        );
    }
}
