//! Line journal.
//!
//! Every consumed line is appended as one JSON object, together with the
//! motion snapshot it produced, so a session can be replayed or audited
//! after the fact.

use serde::{Deserialize, Serialize};
use stage_core::{Command, Dispatched};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("journal entry could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("journal writer poisoned by a panicking thread")]
    Poisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalEventType {
    SystemStart,
    /// A line matched a command and the outputs changed.
    CommandApplied,
    /// A line matched nothing and was discarded.
    LineIgnored,
    SystemShutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp_unix_us: u64,
    pub event_type: JournalEventType,
    pub details: serde_json::Value,
}

/// Thread-safe JSONL writer
pub struct Journal {
    writer: Mutex<BufWriter<File>>,
}

impl Journal {
    /// Opens `path` for appending, creating parent directories as needed.
    pub fn open(path: &Path) -> Result<Self, JournalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::with_capacity(8192, file)),
        })
    }

    pub fn append(&self, entry: &JournalEntry) -> Result<(), JournalError> {
        let mut writer = self.writer.lock().map_err(|_| JournalError::Poisoned)?;
        serde_json::to_writer(&mut *writer, entry)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    pub fn record(
        &self,
        event_type: JournalEventType,
        details: serde_json::Value,
    ) -> Result<(), JournalError> {
        self.append(&JournalEntry {
            timestamp_unix_us: unix_now_us(),
            event_type,
            details,
        })
    }

    pub fn record_dispatch(&self, dispatched: &Dispatched) -> Result<(), JournalError> {
        let event_type = match dispatched.command {
            Command::Unrecognized => JournalEventType::LineIgnored,
            _ => JournalEventType::CommandApplied,
        };
        self.record(event_type, serde_json::to_value(dispatched)?)
    }
}

fn unix_now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
