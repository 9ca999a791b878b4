//! Message Recorder
//!
//! Ordered `(timestamp, bytes)` recorder with a playback cursor. Saved as a
//! versioned bincode document; loading a saved log yields exactly the
//! entries that were recorded.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CoreError, Result};

/// Persisted document version.
pub const PROTO_LOG_VERSION: u32 = 1;

/// Playback status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogState {
    /// Loaded, not playing.
    #[default]
    Ready,
    /// Appending live messages.
    Recording,
    /// Advancing the cursor.
    Playing,
    /// Playback suspended.
    Paused,
}

/// One recorded message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp (ms).
    pub timestamp: i64,
    /// Raw message bytes.
    pub data: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct PersistedLog {
    version: u32,
    saved_at: DateTime<Utc>,
    cursor: usize,
    entries: Vec<LogEntry>,
}

/// Recorder with a movable cursor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProtoLog {
    entries: Vec<LogEntry>,
    cursor: usize,
    state: LogState,
}

impl ProtoLog {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message stamped with the current wall time.
    pub fn add(&mut self, data: Vec<u8>) {
        self.add_at(Utc::now().timestamp_millis(), data);
    }

    /// Record a message with an explicit timestamp.
    pub fn add_at(&mut self, timestamp: i64, data: Vec<u8>) {
        self.entries.push(LogEntry { timestamp, data });
    }

    /// Drop every entry and reset the cursor and state.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        self.state = LogState::Ready;
    }

    /// Recorded entries in insertion order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Playback status.
    pub fn state(&self) -> LogState {
        self.state
    }

    /// Set the playback status.
    pub fn set_state(&mut self, state: LogState) {
        self.state = state;
    }

    /// Cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Entry under the cursor.
    pub fn current(&self) -> Option<&LogEntry> {
        self.entries.get(self.cursor)
    }

    /// Move to the first entry.
    pub fn home(&mut self) {
        self.cursor = 0;
    }

    /// Move to the last entry.
    pub fn end(&mut self) {
        self.cursor = self.entries.len().saturating_sub(1);
    }

    /// Advance one entry. Returns false at the end.
    pub fn next(&mut self) -> bool {
        if self.cursor + 1 < self.entries.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Step back one entry. Returns false at the start.
    pub fn prev(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to `index`. Out-of-range positions are refused.
    pub fn set(&mut self, index: usize) -> bool {
        if index < self.entries.len() {
            self.cursor = index;
            true
        } else {
            false
        }
    }

    /// Timestamp at `index`.
    pub fn timestamp(&self, index: usize) -> Option<i64> {
        self.entries.get(index).map(|e| e.timestamp)
    }

    /// Bytes at `index`.
    pub fn data(&self, index: usize) -> Option<&[u8]> {
        self.entries.get(index).map(|e| e.data.as_slice())
    }

    /// Milliseconds until the entry after the cursor; 1 at the end.
    pub fn time_delta(&self) -> i64 {
        match (self.entries.get(self.cursor), self.entries.get(self.cursor + 1)) {
            (Some(current), Some(next)) => next.timestamp - current.timestamp,
            _ => 1,
        }
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let document = PersistedLog {
            version: PROTO_LOG_VERSION,
            saved_at: Utc::now(),
            cursor: self.cursor,
            entries: self.entries.clone(),
        };
        bincode::serialize(&document).map_err(|e| CoreError::Persistence(e.to_string()))
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document: PersistedLog =
            bincode::deserialize(data).map_err(|e| CoreError::Persistence(e.to_string()))?;
        if document.version != PROTO_LOG_VERSION {
            return Err(CoreError::Persistence(format!(
                "unsupported recorder version {}",
                document.version
            )));
        }
        let cursor = document.cursor.min(document.entries.len().saturating_sub(1));
        Ok(Self {
            entries: document.entries,
            cursor,
            state: LogState::Ready,
        })
    }

    /// Write to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes).map_err(|e| CoreError::Persistence(e.to_string()))?;
        info!("Saved {} recorded messages to {}", self.len(), path.as_ref().display());
        Ok(())
    }

    /// Read from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| CoreError::Persistence(e.to_string()))?;
        let log = Self::from_bytes(&bytes)?;
        info!("Loaded {} recorded messages from {}", log.len(), path.as_ref().display());
        Ok(log)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> ProtoLog {
        let mut log = ProtoLog::new();
        log.add_at(100, vec![1]);
        log.add_at(116, vec![2, 2]);
        log.add_at(140, vec![3, 3, 3]);
        log
    }

    #[test]
    fn test_cursor_movement() {
        let mut log = sample();
        assert_eq!(log.cursor(), 0);
        assert!(!log.prev());
        assert!(log.next());
        assert_eq!(log.current().map(|e| e.timestamp), Some(116));
        log.end();
        assert_eq!(log.cursor(), 2);
        assert!(!log.next());
        log.home();
        assert_eq!(log.cursor(), 0);
        assert!(log.set(2));
        assert!(!log.set(3));
        assert_eq!(log.cursor(), 2);
    }

    #[test]
    fn test_time_delta() {
        let mut log = sample();
        assert_eq!(log.time_delta(), 16);
        log.next();
        assert_eq!(log.time_delta(), 24);
        log.end();
        assert_eq!(log.time_delta(), 1);
        assert_eq!(ProtoLog::new().time_delta(), 1);
    }

    #[test]
    fn test_duplicate_timestamps_keep_order() {
        let mut log = ProtoLog::new();
        log.add_at(5, vec![1]);
        log.add_at(5, vec![2]);
        assert_eq!(log.len(), 2);
        assert_eq!(log.data(1), Some(&[2u8][..]));
    }

    #[test]
    fn test_clear_resets() {
        let mut log = sample();
        log.end();
        log.set_state(LogState::Playing);
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.cursor(), 0);
        assert_eq!(log.state(), LogState::Ready);
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("proto-log-{}.bin", std::process::id()));
        let mut log = sample();
        log.set(1);
        log.save(&path).unwrap();
        let loaded = ProtoLog::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.entries(), log.entries());
        assert_eq!(loaded.cursor(), 1);
    }

    #[test]
    fn test_garbage_is_persistence_error() {
        assert!(matches!(ProtoLog::from_bytes(&[1, 2, 3]), Err(CoreError::Persistence(_))));
    }

    proptest! {
        #[test]
        fn prop_save_load_round_trip(
            entries in proptest::collection::vec((any::<i64>(), proptest::collection::vec(any::<u8>(), 0..64)), 0..32)
        ) {
            let mut log = ProtoLog::new();
            for (timestamp, data) in &entries {
                log.add_at(*timestamp, data.clone());
            }
            let reloaded = ProtoLog::from_bytes(&log.to_bytes().unwrap()).unwrap();
            prop_assert_eq!(reloaded.entries(), log.entries());
        }
    }
}
