//! Vision Log Reader
//!
//! Decodes an `SSL_LOG_FILE` stream into a fixed-rate sequence of
//! [`LogFrame`]s. Messages are folded into one accumulating frame; every
//! time the summed inter-message time crosses the frame interval the
//! accumulator is ghost-pruned and copied out, and the overflow carries
//! into the next window.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::frame::{merge, remove_ghosts, Accumulator, LogFrame, SharedFrame, Tracking};
use super::log_file::{LogFileReader, LogRecord, MessageType};
use super::messages::{RefereePacket, TeamInfo, WrapperPacket};
use super::proto_log::ProtoLog;
use crate::config::Config;
use crate::error::{CoreError, Result};
use crate::world::{Field, TeamColor};

/// Default frame window (ns).
pub const FRAME_INTERVAL_NS: i64 = 16_000_000;

const NANOS_PER_MILLI: i64 = 1_000_000;

/// Decoding options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogReaderConfig {
    /// Colours kept in the emitted frames.
    pub tracking: Tracking,
    /// Goalie id written into the referee info of untracked colours.
    pub keeper_id: u8,
    /// Frame window (ns).
    pub frame_interval_ns: i64,
}

impl Default for LogReaderConfig {
    fn default() -> Self {
        Self {
            tracking: Tracking::BOTH,
            keeper_id: 0,
            frame_interval_ns: FRAME_INTERVAL_NS,
        }
    }
}

impl From<&Config> for LogReaderConfig {
    fn from(config: &Config) -> Self {
        Self {
            tracking: Tracking {
                blue: config.track_blue,
                yellow: config.track_yellow,
            },
            keeper_id: config.keeper_id,
            frame_interval_ns: config.tick_interval_ms as i64 * NANOS_PER_MILLI,
        }
    }
}

/// Decoded vision log.
#[derive(Debug, Default)]
pub struct LogReader {
    frames: Vec<SharedFrame>,
    field: Option<Field>,
    blue_goals: Vec<i64>,
    yellow_goals: Vec<i64>,
    duration_ms: i64,
    records: u64,
    frame_interval_ns: i64,
}

/// In-progress decoding state.
struct Decoder {
    config: LogReaderConfig,
    accumulator: Accumulator,
    referee: Option<RefereePacket>,
    update_count: u64,
    start_time: Option<i64>,
    old_time: i64,
    window: i64,
    out: LogReader,
}

impl Decoder {
    fn new(config: LogReaderConfig) -> Self {
        Self {
            config,
            accumulator: Accumulator::default(),
            referee: None,
            update_count: 0,
            start_time: None,
            old_time: 0,
            window: 0,
            out: LogReader {
                frame_interval_ns: config.frame_interval_ns,
                ..LogReader::default()
            },
        }
    }

    fn push(&mut self, record: LogRecord) -> Result<()> {
        let start = *self.start_time.get_or_insert(record.timestamp_ns);
        if self.out.records == 0 {
            self.old_time = record.timestamp_ns;
        }
        self.window += record.timestamp_ns - self.old_time;
        self.old_time = record.timestamp_ns;
        self.out.records += 1;
        let elapsed_ms = (record.timestamp_ns - start) / NANOS_PER_MILLI;
        self.out.duration_ms = self.out.duration_ms.max(elapsed_ms);

        match record.message_type {
            MessageType::Blank => debug!("Blank message at {}", record.timestamp_ns),
            MessageType::Unknown => debug!("Unknown message at {}", record.timestamp_ns),
            MessageType::Vision => {
                self.vision(&WrapperPacket::from_bytes(&record.payload)?);
                self.update_count += 1;
            }
            MessageType::Referee => {
                self.referee(RefereePacket::from_bytes(&record.payload)?, elapsed_ms);
            }
        }

        if self.window >= self.config.frame_interval_ns {
            let (pruned, removed) = remove_ghosts(&self.accumulator, self.update_count);
            if removed > 0 {
                debug!("Removed {} ghost robots at update {}", removed, self.update_count);
            }
            self.accumulator = pruned;
            self.out.frames.push(Arc::new(LogFrame {
                index: self.out.frames.len(),
                timestamp_ns: record.timestamp_ns,
                elapsed_ms,
                detection: self.accumulator.frame.clone(),
                referee: self.referee.clone(),
            }));
            self.window -= self.config.frame_interval_ns;
        }
        Ok(())
    }

    fn vision(&mut self, packet: &WrapperPacket) {
        if self.out.field.is_none() {
            if let Some(geometry) = &packet.geometry {
                self.out.field = Some(geometry.to_field());
            }
        }
        if let Some(detection) = &packet.detection {
            self.accumulator = merge(&self.accumulator, detection, self.update_count, self.config.tracking);
        }
    }

    fn referee(&mut self, mut packet: RefereePacket, elapsed_ms: i64) {
        let keeper = self.config.keeper_id as u32;
        if !self.config.tracking.blue {
            packet.blue.goalie = keeper;
        }
        if !self.config.tracking.yellow {
            packet.yellow.goalie = keeper;
        }
        record_goal(&mut self.out.blue_goals, &packet.blue, elapsed_ms);
        record_goal(&mut self.out.yellow_goals, &packet.yellow, elapsed_ms);
        self.referee = Some(packet);
    }
}

fn record_goal(goals: &mut Vec<i64>, info: &TeamInfo, elapsed_ms: i64) {
    if info.score as usize > goals.len() {
        goals.push(elapsed_ms);
    }
}

impl LogReader {
    /// Decode a log file from disk.
    pub fn open(path: impl AsRef<Path>, config: LogReaderConfig) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(CoreError::LogIo)?;
        info!("Reading vision log {}", path.as_ref().display());
        Self::read(BufReader::new(file), config)
    }

    /// Decode an in-memory log.
    pub fn from_bytes(bytes: &[u8], config: LogReaderConfig) -> Result<Self> {
        Self::read(bytes, config)
    }

    /// Decode a log stream. Any malformed record aborts the whole read.
    pub fn read<R: Read>(reader: R, config: LogReaderConfig) -> Result<Self> {
        let mut records = LogFileReader::new(reader)?;
        let mut decoder = Decoder::new(config);
        while let Some(record) = records.next_record()? {
            decoder.push(record)?;
        }
        let out = decoder.out;
        info!(
            "Decoded {} records into {} frames ({} ms)",
            out.records,
            out.frames.len(),
            out.duration_ms
        );
        Ok(out)
    }

    /// Emitted frames in replay order.
    pub fn frames(&self) -> &[SharedFrame] {
        &self.frames
    }

    /// Frame at `index`.
    pub fn frame(&self, index: usize) -> Option<&SharedFrame> {
        self.frames.get(index)
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when no frame was emitted.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Referee snapshot attached to each frame.
    pub fn referees(&self) -> impl Iterator<Item = Option<&RefereePacket>> + '_ {
        self.frames.iter().map(|f| f.referee.as_ref())
    }

    /// Wall time between frame `index` and the next one.
    ///
    /// The last frame (and any index past it) reports one frame interval.
    pub fn time_delta(&self, index: usize) -> Duration {
        let nanos = match (self.frames.get(index), self.frames.get(index + 1)) {
            (Some(current), Some(next)) => next.timestamp_ns - current.timestamp_ns,
            _ => self.frame_interval_ns,
        };
        Duration::from_nanos(nanos.max(0) as u64)
    }

    /// First field geometry in the log.
    pub fn field(&self) -> Option<Field> {
        self.field
    }

    /// Milliseconds since the first message at which each goal was scored.
    pub fn goal_times(&self, color: TeamColor) -> &[i64] {
        match color {
            TeamColor::Blue => &self.blue_goals,
            TeamColor::Yellow => &self.yellow_goals,
        }
    }

    /// Goals a team had scored by `millis`.
    pub fn goals_before(&self, color: TeamColor, millis: i64) -> usize {
        self.goal_times(color).iter().filter(|&&t| t <= millis).count()
    }

    /// Time of the last message (ms since the first).
    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    /// Records consumed.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Record every frame into a recorder, keyed by elapsed milliseconds.
    pub fn to_proto_log(&self) -> Result<ProtoLog> {
        let mut log = ProtoLog::new();
        for frame in &self.frames {
            log.add_at(frame.elapsed_ms, frame.to_bytes()?);
        }
        Ok(log)
    }

    /// Decode frames back out of a recorder.
    pub fn frames_from_proto_log(log: &ProtoLog) -> Result<Vec<LogFrame>> {
        log.entries()
            .iter()
            .map(|entry| LogFrame::from_bytes(&entry.data))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
