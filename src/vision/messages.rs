//! Vision and Referee Messages
//!
//! Records carried inside log-file payloads and live vision datagrams.
//! On the wire they are the league's protobuf messages (see `wire`); here
//! they are plain serde records. Positions are in millimetres.

use prost::Message;
use serde::{Deserialize, Serialize};

use super::wire;
use crate::error::Result;
use crate::world::field::Field;
use crate::world::referee::{RefereeCommand, Stage};

// =============================================================================
// DETECTION
// =============================================================================

/// One detected ball candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionBall {
    /// Detection confidence in [0, 1].
    pub confidence: f32,
    /// X (mm).
    pub x: f32,
    /// Y (mm).
    pub y: f32,
    /// Height (mm), when the camera estimates it.
    pub z: Option<f32>,
}

/// One detected robot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionRobot {
    /// Detection confidence in [0, 1].
    pub confidence: f32,
    /// Pattern id.
    pub robot_id: u32,
    /// X (mm).
    pub x: f32,
    /// Y (mm).
    pub y: f32,
    /// Facing (radians), when the pattern resolves it.
    pub orientation: Option<f32>,
}

/// One camera frame, or the merged accumulation of several.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionFrame {
    /// Camera frame counter.
    pub frame_number: u32,
    /// Capture time (s).
    pub t_capture: f64,
    /// Send time (s).
    pub t_sent: f64,
    /// Camera that produced the frame.
    pub camera_id: u32,
    /// Ball candidates.
    pub balls: Vec<DetectionBall>,
    /// Yellow robots.
    pub robots_yellow: Vec<DetectionRobot>,
    /// Blue robots.
    pub robots_blue: Vec<DetectionRobot>,
}

/// Field geometry as broadcast by the vision system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryData {
    /// Touch line length (mm).
    pub field_length: f32,
    /// Goal line length (mm).
    pub field_width: f32,
    /// Goal mouth width (mm).
    pub goal_width: f32,
    /// Goal depth (mm).
    pub goal_depth: f32,
}

impl GeometryData {
    /// Field dimensions.
    pub fn to_field(&self) -> Field {
        Field {
            length: self.field_length as f64,
            width: self.field_width as f64,
            goal_width: self.goal_width as f64,
            goal_depth: self.goal_depth as f64,
        }
    }
}

/// Vision wrapper: detection and/or geometry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WrapperPacket {
    /// Detection frame, if present.
    pub detection: Option<DetectionFrame>,
    /// Geometry, if present.
    pub geometry: Option<GeometryData>,
}

impl WrapperPacket {
    /// Wrap a detection frame.
    pub fn detection(frame: DetectionFrame) -> Self {
        Self {
            detection: Some(frame),
            geometry: None,
        }
    }

    /// Encode as an `SSL_WrapperPacket`.
    pub fn to_bytes(&self) -> Vec<u8> {
        wire::SslWrapperPacket {
            detection: self.detection.as_ref().map(DetectionFrame::to_wire),
            geometry: self.geometry.map(|geometry| wire::SslGeometryData {
                field: Some(geometry.to_wire()),
            }),
        }
        .encode_to_vec()
    }

    /// Decode an `SSL_WrapperPacket`.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let packet = wire::SslWrapperPacket::decode(data)?;
        Ok(Self {
            detection: packet.detection.map(DetectionFrame::from_wire),
            geometry: packet
                .geometry
                .and_then(|geometry| geometry.field)
                .map(GeometryData::from_wire),
        })
    }
}

impl DetectionBall {
    fn to_wire(&self) -> wire::SslDetectionBall {
        wire::SslDetectionBall {
            confidence: self.confidence,
            x: self.x,
            y: self.y,
            z: self.z,
            pixel_x: 0.0,
            pixel_y: 0.0,
        }
    }

    fn from_wire(ball: wire::SslDetectionBall) -> Self {
        Self {
            confidence: ball.confidence,
            x: ball.x,
            y: ball.y,
            z: ball.z,
        }
    }
}

impl DetectionRobot {
    fn to_wire(&self) -> wire::SslDetectionRobot {
        wire::SslDetectionRobot {
            confidence: self.confidence,
            robot_id: Some(self.robot_id),
            x: self.x,
            y: self.y,
            orientation: self.orientation,
            pixel_x: 0.0,
            pixel_y: 0.0,
        }
    }

    fn from_wire(robot: wire::SslDetectionRobot) -> Self {
        Self {
            confidence: robot.confidence,
            robot_id: robot.robot_id.unwrap_or_default(),
            x: robot.x,
            y: robot.y,
            orientation: robot.orientation,
        }
    }
}

impl DetectionFrame {
    fn to_wire(&self) -> wire::SslDetectionFrame {
        wire::SslDetectionFrame {
            frame_number: self.frame_number,
            t_capture: self.t_capture,
            t_sent: self.t_sent,
            camera_id: self.camera_id,
            balls: self.balls.iter().map(DetectionBall::to_wire).collect(),
            robots_yellow: self.robots_yellow.iter().map(DetectionRobot::to_wire).collect(),
            robots_blue: self.robots_blue.iter().map(DetectionRobot::to_wire).collect(),
        }
    }

    fn from_wire(frame: wire::SslDetectionFrame) -> Self {
        Self {
            frame_number: frame.frame_number,
            t_capture: frame.t_capture,
            t_sent: frame.t_sent,
            camera_id: frame.camera_id,
            balls: frame.balls.into_iter().map(DetectionBall::from_wire).collect(),
            robots_yellow: frame.robots_yellow.into_iter().map(DetectionRobot::from_wire).collect(),
            robots_blue: frame.robots_blue.into_iter().map(DetectionRobot::from_wire).collect(),
        }
    }
}

impl GeometryData {
    fn to_wire(&self) -> wire::SslGeometryFieldSize {
        wire::SslGeometryFieldSize {
            field_length: self.field_length.round() as i32,
            field_width: self.field_width.round() as i32,
            goal_width: self.goal_width.round() as i32,
            goal_depth: self.goal_depth.round() as i32,
            boundary_width: 0,
        }
    }

    fn from_wire(size: wire::SslGeometryFieldSize) -> Self {
        Self {
            field_length: size.field_length as f32,
            field_width: size.field_width as f32,
            goal_width: size.goal_width as f32,
            goal_depth: size.goal_depth as f32,
        }
    }
}

// =============================================================================
// REFEREE
// =============================================================================

/// Per-team referee bookkeeping.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TeamInfo {
    /// Team name.
    pub name: String,
    /// Goals scored.
    pub score: u32,
    /// Red cards received.
    pub red_cards: u32,
    /// Yellow cards received.
    pub yellow_cards: u32,
    /// Remaining time (µs) of each active yellow card.
    pub yellow_card_times: Vec<u32>,
    /// Timeouts left.
    pub timeouts: u32,
    /// Timeout time left (µs).
    pub timeout_time: u32,
    /// Keeper robot id.
    pub goalie: u32,
}

/// Referee box packet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RefereePacket {
    /// Send time (µs).
    pub packet_timestamp: u64,
    /// Match stage.
    pub stage: Stage,
    /// Time left in the stage (µs).
    pub stage_time_left: i64,
    /// Current command.
    pub command: RefereeCommand,
    /// Command counter.
    pub command_counter: u32,
    /// Command issue time (µs).
    pub command_timestamp: u64,
    /// Yellow team info.
    pub yellow: TeamInfo,
    /// Blue team info.
    pub blue: TeamInfo,
}

impl TeamInfo {
    fn to_wire(&self) -> wire::SslTeamInfo {
        wire::SslTeamInfo {
            name: self.name.clone(),
            score: self.score,
            red_cards: self.red_cards,
            yellow_card_times: self.yellow_card_times.clone(),
            yellow_cards: self.yellow_cards,
            timeouts: self.timeouts,
            timeout_time: self.timeout_time,
            goalkeeper: self.goalie,
        }
    }

    fn from_wire(info: wire::SslTeamInfo) -> Self {
        Self {
            name: info.name,
            score: info.score,
            red_cards: info.red_cards,
            yellow_cards: info.yellow_cards,
            yellow_card_times: info.yellow_card_times,
            timeouts: info.timeouts,
            timeout_time: info.timeout_time,
            goalie: info.goalkeeper,
        }
    }
}

impl RefereePacket {
    /// Encode as a referee box `Referee` message.
    pub fn to_bytes(&self) -> Vec<u8> {
        let stage_time_left = self.stage_time_left.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        wire::SslReferee {
            packet_timestamp: self.packet_timestamp,
            stage: self.stage as i32,
            stage_time_left: Some(stage_time_left),
            command: self.command as i32,
            command_counter: self.command_counter,
            command_timestamp: self.command_timestamp,
            yellow: Some(self.yellow.to_wire()),
            blue: Some(self.blue.to_wire()),
        }
        .encode_to_vec()
    }

    /// Decode a referee box `Referee` message. Stage and command values
    /// outside the known enums are decode errors.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let packet = wire::SslReferee::decode(data)?;
        Ok(Self {
            packet_timestamp: packet.packet_timestamp,
            stage: Stage::try_from(packet.stage)?,
            stage_time_left: packet.stage_time_left.map(i64::from).unwrap_or_default(),
            command: RefereeCommand::try_from(packet.command)?,
            command_counter: packet.command_counter,
            command_timestamp: packet.command_timestamp,
            yellow: packet.yellow.map(TeamInfo::from_wire).unwrap_or_default(),
            blue: packet.blue.map(TeamInfo::from_wire).unwrap_or_default(),
        })
    }
}
