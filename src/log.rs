//! The per-run processing log.
//!
//! Distinct from `tracing` diagnostics: the run log is a functional output
//! of the tool — one line per processed file or failure, indented two
//! spaces per nesting depth so recursive archive processing reads as a
//! tree. It is tee'd to every attached sink (typically the persistent
//! `log.txt` and stdout).
//!
//! Nesting depth is an explicit parameter threaded through the recursive
//! dispatch calls, not shared mutable state: the walker passes `depth + 1`
//! into each nested call and the indentation falls out of the call shape.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::ShelfError;

/// An append-only, indentation-aware log over any number of sinks.
pub struct RunLog {
    sinks: Vec<Box<dyn Write>>,
}

impl RunLog {
    /// A log with no sinks; every line is dropped. Useful in tests that
    /// only care about outcomes.
    pub fn discard() -> Self {
        Self { sinks: Vec::new() }
    }

    /// A log writing to an arbitrary sink (tests pass a `Vec<u8>`).
    pub fn to_sink(sink: Box<dyn Write>) -> Self {
        Self { sinks: vec![sink] }
    }

    /// The standard run configuration: truncate-and-write `path`, echo
    /// every line to stdout.
    pub fn to_file_and_stdout(path: &Path) -> Result<Self, ShelfError> {
        let file = File::create(path).map_err(|source| ShelfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            sinks: vec![
                Box::new(BufWriter::new(file)),
                Box::new(std::io::stdout()),
            ],
        })
    }

    /// Attach one more sink; subsequent lines go to it too.
    pub fn tee(mut self, sink: Box<dyn Write>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Write one log line at the given nesting depth.
    ///
    /// Sink failures here are not worth aborting a batch over; they are
    /// swallowed after the write attempt (stdout gone, disk full — the
    /// processing outcome still stands).
    pub fn line(&mut self, depth: usize, msg: &str) {
        let entry = format!("{}{}\n", "  ".repeat(depth), msg);
        for sink in &mut self.sinks {
            let _ = sink.write_all(entry.as_bytes());
        }
    }

    /// Flush all sinks. Called once at the end of a run.
    pub fn flush(&mut self) {
        for sink in &mut self.sinks {
            let _ = sink.flush();
        }
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        self.flush();
    }
}
