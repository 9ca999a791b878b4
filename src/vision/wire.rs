//! SSL Wire Messages
//!
//! Protobuf layouts of the SSL-Vision wrapper and the referee box packet,
//! as broadcast by the league software and stored in `SSL_LOG_FILE`
//! payloads. Only the fields the control core reads are declared; prost
//! skips everything else on decode.

// =============================================================================
// VISION
// =============================================================================

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct SslDetectionBall {
    #[prost(float, required, tag = "1")]
    pub confidence: f32,
    #[prost(float, required, tag = "3")]
    pub x: f32,
    #[prost(float, required, tag = "4")]
    pub y: f32,
    #[prost(float, optional, tag = "5")]
    pub z: Option<f32>,
    #[prost(float, required, tag = "6")]
    pub pixel_x: f32,
    #[prost(float, required, tag = "7")]
    pub pixel_y: f32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct SslDetectionRobot {
    #[prost(float, required, tag = "1")]
    pub confidence: f32,
    #[prost(uint32, optional, tag = "2")]
    pub robot_id: Option<u32>,
    #[prost(float, required, tag = "3")]
    pub x: f32,
    #[prost(float, required, tag = "4")]
    pub y: f32,
    #[prost(float, optional, tag = "5")]
    pub orientation: Option<f32>,
    #[prost(float, required, tag = "6")]
    pub pixel_x: f32,
    #[prost(float, required, tag = "7")]
    pub pixel_y: f32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct SslDetectionFrame {
    #[prost(uint32, required, tag = "1")]
    pub frame_number: u32,
    #[prost(double, required, tag = "2")]
    pub t_capture: f64,
    #[prost(double, required, tag = "3")]
    pub t_sent: f64,
    #[prost(uint32, required, tag = "4")]
    pub camera_id: u32,
    #[prost(message, repeated, tag = "5")]
    pub balls: Vec<SslDetectionBall>,
    #[prost(message, repeated, tag = "6")]
    pub robots_yellow: Vec<SslDetectionRobot>,
    #[prost(message, repeated, tag = "7")]
    pub robots_blue: Vec<SslDetectionRobot>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct SslGeometryFieldSize {
    #[prost(int32, required, tag = "1")]
    pub field_length: i32,
    #[prost(int32, required, tag = "2")]
    pub field_width: i32,
    #[prost(int32, required, tag = "3")]
    pub goal_width: i32,
    #[prost(int32, required, tag = "4")]
    pub goal_depth: i32,
    #[prost(int32, required, tag = "5")]
    pub boundary_width: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct SslGeometryData {
    #[prost(message, optional, tag = "1")]
    pub field: Option<SslGeometryFieldSize>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct SslWrapperPacket {
    #[prost(message, optional, tag = "1")]
    pub detection: Option<SslDetectionFrame>,
    #[prost(message, optional, tag = "2")]
    pub geometry: Option<SslGeometryData>,
}

// =============================================================================
// REFEREE
// =============================================================================

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct SslTeamInfo {
    #[prost(string, required, tag = "1")]
    pub name: String,
    #[prost(uint32, required, tag = "2")]
    pub score: u32,
    #[prost(uint32, required, tag = "3")]
    pub red_cards: u32,
    #[prost(uint32, repeated, packed = "true", tag = "4")]
    pub yellow_card_times: Vec<u32>,
    #[prost(uint32, required, tag = "5")]
    pub yellow_cards: u32,
    #[prost(uint32, required, tag = "6")]
    pub timeouts: u32,
    #[prost(uint32, required, tag = "7")]
    pub timeout_time: u32,
    #[prost(uint32, required, tag = "8")]
    pub goalkeeper: u32,
}

/// Enum fields travel as plain varints; `stage` and `command` are checked
/// against the known values when converted.
#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct SslReferee {
    #[prost(uint64, required, tag = "1")]
    pub packet_timestamp: u64,
    #[prost(int32, required, tag = "2")]
    pub stage: i32,
    #[prost(sint32, optional, tag = "3")]
    pub stage_time_left: Option<i32>,
    #[prost(int32, required, tag = "4")]
    pub command: i32,
    #[prost(uint32, required, tag = "5")]
    pub command_counter: u32,
    #[prost(uint64, required, tag = "6")]
    pub command_timestamp: u64,
    #[prost(message, optional, tag = "7")]
    pub yellow: Option<SslTeamInfo>,
    #[prost(message, optional, tag = "8")]
    pub blue: Option<SslTeamInfo>,
}
