//! SSL Log File Records
//!
//! Big-endian container format written by the league's log recorder:
//!
//! ```text
//! "SSL_LOG_FILE"            12 bytes
//! version                   i32 (must be 1)
//! repeat {
//!     timestamp (ns)        i64
//!     message type          i32
//!     payload length N      i32
//!     payload               N bytes
//! }
//! ```

use std::io::{Read, Write};

use crate::error::{CoreError, Result};
use super::messages::{RefereePacket, WrapperPacket};

/// File magic.
pub const LOG_MAGIC: &[u8; 12] = b"SSL_LOG_FILE";

/// Only supported format version.
pub const LOG_VERSION: i32 = 1;

/// Record header length (timestamp, type, length).
pub const RECORD_HEADER_LEN: usize = 16;

/// Record payload type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MessageType {
    /// Empty record.
    Blank = 0,
    /// Unknown payload.
    Unknown = 1,
    /// Vision wrapper packet.
    Vision = 2,
    /// Referee packet.
    Referee = 3,
}

impl TryFrom<i32> for MessageType {
    type Error = CoreError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(MessageType::Blank),
            1 => Ok(MessageType::Unknown),
            2 => Ok(MessageType::Vision),
            3 => Ok(MessageType::Referee),
            other => Err(CoreError::UnsupportedMessageType(other)),
        }
    }
}

/// One raw record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    /// Receive time (ns).
    pub timestamp_ns: i64,
    /// Payload type.
    pub message_type: MessageType,
    /// Encoded payload.
    pub payload: Vec<u8>,
}

/// Streaming record reader.
pub struct LogFileReader<R> {
    inner: R,
    records: u64,
}

/// Fill `buf` as far as the stream allows. Returns the bytes read.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CoreError::LogIo(e)),
        }
    }
    Ok(filled)
}

impl<R: Read> LogFileReader<R> {
    /// Validate the header and position at the first record.
    pub fn new(mut inner: R) -> Result<Self> {
        let mut magic = [0u8; 12];
        let read = read_up_to(&mut inner, &mut magic)?;
        if read < magic.len() || &magic != LOG_MAGIC {
            return Err(CoreError::MalformedLogFile(format!(
                "bad magic {:?}",
                String::from_utf8_lossy(&magic[..read])
            )));
        }

        let mut version = [0u8; 4];
        let read = read_up_to(&mut inner, &mut version)?;
        if read < version.len() {
            return Err(CoreError::MalformedLogFile("missing version".to_string()));
        }
        let version = i32::from_be_bytes(version);
        if version != LOG_VERSION {
            return Err(CoreError::UnsupportedVersion(version));
        }

        Ok(Self { inner, records: 0 })
    }

    /// Records read so far.
    pub fn records_read(&self) -> u64 {
        self.records
    }

    /// Next record, or `None` at a clean end of stream.
    pub fn next_record(&mut self) -> Result<Option<LogRecord>> {
        let mut header = [0u8; RECORD_HEADER_LEN];
        let read = read_up_to(&mut self.inner, &mut header)?;
        if read == 0 {
            return Ok(None);
        }
        if read < RECORD_HEADER_LEN {
            return Err(CoreError::TruncatedRecord {
                expected: RECORD_HEADER_LEN,
                actual: read,
            });
        }

        let mut word = [0u8; 8];
        word.copy_from_slice(&header[0..8]);
        let timestamp_ns = i64::from_be_bytes(word);
        let message_type = i32::from_be_bytes([header[8], header[9], header[10], header[11]]);
        let length = i32::from_be_bytes([header[12], header[13], header[14], header[15]]);
        let length = usize::try_from(length)
            .map_err(|_| CoreError::MalformedLogFile(format!("negative payload length {}", length)))?;

        let mut payload = Vec::new();
        (&mut self.inner)
            .take(length as u64)
            .read_to_end(&mut payload)
            .map_err(CoreError::LogIo)?;
        if payload.len() < length {
            return Err(CoreError::TruncatedRecord {
                expected: length,
                actual: payload.len(),
            });
        }

        let message_type = MessageType::try_from(message_type)?;
        self.records += 1;
        Ok(Some(LogRecord {
            timestamp_ns,
            message_type,
            payload,
        }))
    }
}

impl<R: Read> Iterator for LogFileReader<R> {
    type Item = Result<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Record writer producing the same format.
pub struct LogWriter<W: Write> {
    inner: W,
}

impl<W: Write> LogWriter<W> {
    /// Write the header.
    pub fn new(mut inner: W) -> Result<Self> {
        inner.write_all(LOG_MAGIC).map_err(CoreError::LogIo)?;
        inner.write_all(&LOG_VERSION.to_be_bytes()).map_err(CoreError::LogIo)?;
        Ok(Self { inner })
    }

    /// Append a raw record.
    pub fn write_record(&mut self, timestamp_ns: i64, message_type: i32, payload: &[u8]) -> Result<()> {
        let length = i32::try_from(payload.len())
            .map_err(|_| CoreError::MalformedLogFile(format!("payload of {} bytes", payload.len())))?;
        let mut header = [0u8; RECORD_HEADER_LEN];
        header[0..8].copy_from_slice(&timestamp_ns.to_be_bytes());
        header[8..12].copy_from_slice(&message_type.to_be_bytes());
        header[12..16].copy_from_slice(&length.to_be_bytes());
        self.inner.write_all(&header).map_err(CoreError::LogIo)?;
        self.inner.write_all(payload).map_err(CoreError::LogIo)
    }

    /// Append a vision wrapper.
    pub fn write_vision(&mut self, timestamp_ns: i64, packet: &WrapperPacket) -> Result<()> {
        self.write_record(timestamp_ns, MessageType::Vision as i32, &packet.to_bytes())
    }

    /// Append a referee packet.
    pub fn write_referee(&mut self, timestamp_ns: i64, packet: &RefereePacket) -> Result<()> {
        self.write_record(timestamp_ns, MessageType::Referee as i32, &packet.to_bytes())
    }

    /// Flush and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush().map_err(CoreError::LogIo)?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header() -> Vec<u8> {
        let mut bytes = LOG_MAGIC.to_vec();
        bytes.extend_from_slice(&LOG_VERSION.to_be_bytes());
        bytes
    }

    #[test]
    fn test_reads_written_records() {
        let mut writer = LogWriter::new(Vec::new()).unwrap();
        writer.write_record(1_000, 0, &[]).unwrap();
        writer.write_record(2_000, 3, &[1, 2, 3]).unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = LogFileReader::new(Cursor::new(bytes)).unwrap();
        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.message_type, MessageType::Blank);
        assert_eq!(first.timestamp_ns, 1_000);
        let second = reader.next_record().unwrap().unwrap();
        assert_eq!(second.message_type, MessageType::Referee);
        assert_eq!(second.payload, vec![1, 2, 3]);
        assert!(reader.next_record().unwrap().is_none());
        assert_eq!(reader.records_read(), 2);
    }

    #[test]
    fn test_header_is_big_endian() {
        let bytes = LogWriter::new(Vec::new()).unwrap().finish().unwrap();
        assert_eq!(&bytes[..12], b"SSL_LOG_FILE");
        assert_eq!(&bytes[12..16], &[0, 0, 0, 1]);
    }

    #[test]
    fn test_bad_magic() {
        let result = LogFileReader::new(Cursor::new(b"NOT_A_LOG_FILE\0\0\0\x01".to_vec()));
        assert!(matches!(result, Err(CoreError::MalformedLogFile(_))));
        let result = LogFileReader::new(Cursor::new(b"SSL".to_vec()));
        assert!(matches!(result, Err(CoreError::MalformedLogFile(_))));
    }

    #[test]
    fn test_bad_version() {
        let mut bytes = LOG_MAGIC.to_vec();
        bytes.extend_from_slice(&2i32.to_be_bytes());
        let result = LogFileReader::new(Cursor::new(bytes));
        assert!(matches!(result, Err(CoreError::UnsupportedVersion(2))));
    }

    #[test]
    fn test_truncated_header_and_payload() {
        let mut bytes = header();
        bytes.extend_from_slice(&[0u8; 7]);
        let mut reader = LogFileReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(
            reader.next_record(),
            Err(CoreError::TruncatedRecord { expected: 16, actual: 7 })
        ));

        let mut bytes = header();
        bytes.extend_from_slice(&0i64.to_be_bytes());
        bytes.extend_from_slice(&2i32.to_be_bytes());
        bytes.extend_from_slice(&10i32.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        let mut reader = LogFileReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(
            reader.next_record(),
            Err(CoreError::TruncatedRecord { expected: 10, actual: 4 })
        ));
    }

    #[test]
    fn test_unknown_message_type() {
        let mut writer = LogWriter::new(Vec::new()).unwrap();
        writer.write_record(0, 7, &[9]).unwrap();
        let mut reader = LogFileReader::new(Cursor::new(writer.finish().unwrap())).unwrap();
        assert!(matches!(reader.next(), Some(Err(CoreError::UnsupportedMessageType(7)))));
    }
}
