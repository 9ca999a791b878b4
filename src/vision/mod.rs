//! Vision input.
//!
//! Detection and referee records, the binary log codec, the recorder and
//! replay into the world model.

pub mod messages;
mod wire;
pub mod frame;
pub mod log_file;
pub mod log_reader;
pub mod proto_log;
pub mod replay;

pub use messages::{DetectionBall, DetectionFrame, DetectionRobot, GeometryData, RefereePacket, TeamInfo, WrapperPacket};
pub use frame::{merge, remove_ghosts, Accumulator, LogFrame, SharedFrame, Tracking, GHOST_TICKS};
pub use log_file::{LogFileReader, LogRecord, LogWriter, MessageType};
pub use log_reader::{LogReader, LogReaderConfig, FRAME_INTERVAL_NS};
pub use proto_log::{LogEntry, LogState, ProtoLog};
pub use replay::Replayer;
