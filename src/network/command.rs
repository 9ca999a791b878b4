//! Outbound Robot Commands
//!
//! One command per robot per tick, encoded as a fixed 15-byte
//! little-endian packet with a trailing XOR checksum.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::planner::movement::Motion;

/// Encoded packet length.
pub const COMMAND_PACKET_LEN: usize = 15;

/// Packet type byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PacketKind {
    /// Command for a physical robot.
    Robot = 1,
    /// Command for the simulator.
    Simulation = 3,
}

impl TryFrom<u8> for PacketKind {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(PacketKind::Robot),
            3 => Ok(PacketKind::Simulation),
            other => Err(CoreError::ProtocolDecodeError(format!("unknown packet type {}", other))),
        }
    }
}

/// Instruction for one robot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Command {
    /// Target robot.
    pub robot_id: u8,
    /// Strafe direction relative to the robot's facing (degrees).
    pub direction: i16,
    /// Strafe speed (mm/s).
    pub speed: i16,
    /// Distance to travel (mm), 0 for continuous motion.
    pub travel_distance: i16,
    /// Angle to rotate (degrees), 0 for continuous rotation.
    pub rotation_angle: i16,
    /// Rotation speed.
    pub rotation_speed: i16,
    /// Kicker power: negative kicks flat, positive chips.
    pub kick: i8,
    /// Dribbler on.
    pub dribble: bool,
}

fn saturate(value: f64) -> i16 {
    value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

impl Command {
    /// All-zero command for one robot.
    pub fn stop(robot_id: u8) -> Self {
        Self {
            robot_id,
            ..Self::default()
        }
    }

    /// Reserved broadcast: robot 0, every field zero.
    pub fn stop_all() -> Self {
        Self::stop(0)
    }

    /// True when the command asks for no motion, kick or dribble.
    pub fn is_zero(&self) -> bool {
        *self == Self::stop(self.robot_id)
    }

    /// Command that follows a planned motion.
    pub fn from_motion(robot_id: u8, motion: &Motion) -> Self {
        Self {
            robot_id,
            direction: saturate(motion.direction),
            speed: saturate(motion.speed),
            rotation_speed: saturate(motion.rotation_speed),
            ..Self::default()
        }
    }

    /// Flat kick with the given power.
    pub fn with_kick(mut self, power: u8) -> Self {
        self.kick = -(power.min(i8::MAX as u8) as i8);
        self
    }

    /// Chip kick with the given power.
    pub fn with_chip(mut self, power: u8) -> Self {
        self.kick = power.min(i8::MAX as u8) as i8;
        self
    }

    /// Set the dribbler.
    pub fn with_dribble(mut self, dribble: bool) -> Self {
        self.dribble = dribble;
        self
    }

    /// Encode to the wire packet.
    pub fn encode(&self, kind: PacketKind) -> [u8; COMMAND_PACKET_LEN] {
        let mut packet = [0u8; COMMAND_PACKET_LEN];
        packet[0] = kind as u8;
        packet[1] = self.robot_id;
        packet[2..4].copy_from_slice(&self.direction.to_le_bytes());
        packet[4..6].copy_from_slice(&self.speed.to_le_bytes());
        packet[6..8].copy_from_slice(&self.travel_distance.to_le_bytes());
        packet[8..10].copy_from_slice(&self.rotation_angle.to_le_bytes());
        packet[10..12].copy_from_slice(&self.rotation_speed.to_le_bytes());
        packet[12] = self.kick as u8;
        packet[13] = u8::from(self.dribble);
        packet[14] = checksum(&packet[..14]);
        packet
    }

    /// Decode a wire packet.
    pub fn decode(bytes: &[u8]) -> Result<(PacketKind, Self)> {
        if bytes.len() != COMMAND_PACKET_LEN {
            return Err(CoreError::ProtocolDecodeError(format!(
                "command packet must be {} bytes, got {}",
                COMMAND_PACKET_LEN,
                bytes.len()
            )));
        }
        if checksum(&bytes[..14]) != bytes[14] {
            return Err(CoreError::ProtocolDecodeError("command checksum mismatch".to_string()));
        }
        let kind = PacketKind::try_from(bytes[0])?;
        let word = |i: usize| i16::from_le_bytes([bytes[i], bytes[i + 1]]);
        Ok((
            kind,
            Self {
                robot_id: bytes[1],
                direction: word(2),
                speed: word(4),
                travel_distance: word(6),
                rotation_angle: word(8),
                rotation_speed: word(10),
                kick: bytes[12] as i8,
                dribble: bytes[13] != 0,
            },
        ))
    }
}

/// XOR of every byte.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}
