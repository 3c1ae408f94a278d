//! Output sinks
//!
//! A sink is the pluggable destination for rendered entries. Sinks may buffer
//! internally but must preserve arrival order for entries written from a
//! single logger. Write failures are reported to the logger through the
//! `Result`; the logger decides whether to surface or drop them.

use std::io::Write;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::SinkError;
use crate::events::Level;
use crate::format::{EntryKind, LogEntry};

/// Default number of entries retained by [`MemorySink`]
pub const DEFAULT_MEMORY_CAPACITY: usize = 1000;

/// Destination for rendered log entries
pub trait Sink: Send + Sync {
    /// Write one entry
    fn write(&self, entry: &LogEntry) -> Result<(), SinkError>;
}

/// Writes each entry line to the standard diagnostic stream, synchronously
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    /// Create a console sink
    pub fn new() -> Self {
        Self
    }
}

impl Sink for ConsoleSink {
    fn write(&self, entry: &LogEntry) -> Result<(), SinkError> {
        let stderr = std::io::stderr();
        let mut handle = stderr.lock();
        for line in &entry.lines {
            writeln!(handle, "{}", line)?;
        }
        Ok(())
    }
}

/// Bounded in-memory buffer of entries, oldest evicted first
///
/// Intended for tests and programmatic inspection of recent activity.
#[derive(Debug)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
    capacity: usize,
}

impl MemorySink {
    /// Create a sink retaining at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            capacity,
        }
    }

    /// Snapshot of the retained entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// All retained lines, flattened in arrival order
    pub fn lines(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .flat_map(|entry| entry.lines.iter().cloned())
            .collect()
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no entries are retained
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop all retained entries
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

impl Sink for MemorySink {
    fn write(&self, entry: &LogEntry) -> Result<(), SinkError> {
        let mut entries = self.entries.lock();
        entries.push(entry.clone());
        if entries.len() > self.capacity {
            let overflow = entries.len() - self.capacity;
            entries.drain(0..overflow);
        }
        Ok(())
    }
}

/// Routes entries through the `tracing` macros
///
/// Unmatched-finish diagnostics become warnings; everything else maps to the
/// level the entry was rendered at.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Create a tracing sink
    pub fn new() -> Self {
        Self
    }
}

impl Sink for TracingSink {
    fn write(&self, entry: &LogEntry) -> Result<(), SinkError> {
        for line in &entry.lines {
            match (entry.kind, entry.level) {
                (EntryKind::UnmatchedFinish, _) => warn!("{}", line),
                (_, Level::Debug) => debug!("{}", line),
                _ => info!("{}", line),
            }
        }
        Ok(())
    }
}
