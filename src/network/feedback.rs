//! Robot Feedback
//!
//! Fixed 10-byte little-endian status packet reported back by each robot.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Encoded packet length.
pub const FEEDBACK_PACKET_LEN: usize = 10;

/// Status reported by a robot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Feedback {
    /// Packet type.
    pub message_type: i8,
    /// Reporting robot.
    pub robot_id: i8,
    /// Current strafe direction (degrees).
    pub direction: i16,
    /// Current strafe speed.
    pub direction_speed: i16,
    /// Current rotation speed.
    pub rotation_speed: i16,
    /// Kicker state.
    pub shoot_kicker: i8,
    /// Dribbler running.
    pub dribble: bool,
}

impl Feedback {
    /// Decode from a datagram.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != FEEDBACK_PACKET_LEN {
            return Err(CoreError::ProtocolDecodeError(format!(
                "feedback packet must be {} bytes, got {}",
                FEEDBACK_PACKET_LEN,
                bytes.len()
            )));
        }
        let word = |i: usize| i16::from_le_bytes([bytes[i], bytes[i + 1]]);
        Ok(Self {
            message_type: bytes[0] as i8,
            robot_id: bytes[1] as i8,
            direction: word(2),
            direction_speed: word(4),
            rotation_speed: word(6),
            shoot_kicker: bytes[8] as i8,
            dribble: bytes[9] != 0,
        })
    }

    /// Encode to a datagram.
    pub fn encode(&self) -> [u8; FEEDBACK_PACKET_LEN] {
        let mut packet = [0u8; FEEDBACK_PACKET_LEN];
        packet[0] = self.message_type as u8;
        packet[1] = self.robot_id as u8;
        packet[2..4].copy_from_slice(&self.direction.to_le_bytes());
        packet[4..6].copy_from_slice(&self.direction_speed.to_le_bytes());
        packet[6..8].copy_from_slice(&self.rotation_speed.to_le_bytes());
        packet[8] = self.shoot_kicker as u8;
        packet[9] = u8::from(self.dribble);
        packet
    }
}
