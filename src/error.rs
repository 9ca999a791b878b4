//! Error Types
//!
//! Error taxonomy shared by the log codec, the wire protocol, the
//! planners and the executors.

/// Core error.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Bad magic header or otherwise unreadable log file.
    #[error("Malformed log file: {0}")]
    MalformedLogFile(String),

    /// Log file version other than the supported one.
    #[error("Unsupported log version: {0}")]
    UnsupportedVersion(i32),

    /// Stream ended in the middle of a record.
    #[error("Truncated record: expected {expected} bytes, got {actual}")]
    TruncatedRecord {
        /// Bytes the record announced.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// Message type outside the known set.
    #[error("Unsupported message type: {0}")]
    UnsupportedMessageType(i32),

    /// Payload or packet failed to decode.
    #[error("Protocol decode error: {0}")]
    ProtocolDecodeError(String),

    /// Socket send or receive failure.
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(#[from] std::io::Error),

    /// Log file could not be opened or read.
    #[error("Log file I/O error: {0}")]
    LogIo(#[source] std::io::Error),

    /// Setting outside the range the core can run with.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Robot id outside `[0, TEAM_SIZE)`.
    #[error("Invalid robot id: {0}")]
    InvalidRobotId(u8),

    /// No free shot or no path.
    #[error("Planner unreachable: {0}")]
    PlannerUnreachable(&'static str),

    /// Recorder could not be saved or loaded.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<bincode::Error> for CoreError {
    fn from(err: bincode::Error) -> Self {
        CoreError::ProtocolDecodeError(err.to_string())
    }
}

impl From<prost::DecodeError> for CoreError {
    fn from(err: prost::DecodeError) -> Self {
        CoreError::ProtocolDecodeError(err.to_string())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
