//! Runtime Configuration
//!
//! Immutable settings for the control core, read once at startup and
//! cloned into each component.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::world::{FieldSide, TeamColor, TEAM_SIZE};

/// Control core configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Vision multicast group.
    pub input_ip: IpAddr,
    /// Vision port.
    pub input_port: u16,
    /// Robot radio / simulator address.
    pub output_ip: IpAddr,
    /// Robot radio / simulator port.
    pub output_port: u16,
    /// Referee multicast group.
    pub referee_ip: IpAddr,
    /// Referee port.
    pub referee_port: u16,
    /// Planner speed limit (mm/s).
    pub robot_speed: f64,
    /// Speed gain the planner allows per second (mm/s²).
    pub robot_acceleration: f64,
    /// Ally goalkeeper id.
    pub keeper_id: u8,
    /// Ally team colour.
    pub ally_color: TeamColor,
    /// Half of the field the ally defends.
    pub ally_side: FieldSide,
    /// Keep blue robots during log replay.
    pub track_blue: bool,
    /// Keep yellow robots during log replay.
    pub track_yellow: bool,
    /// Executor tick interval (ms).
    pub tick_interval_ms: u64,
    /// Vision log to replay instead of listening live.
    pub log_path: Option<PathBuf>,
    /// Address the simulator rather than real robots.
    pub simulation: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_ip: IpAddr::V4(Ipv4Addr::new(224, 5, 23, 2)),
            input_port: 10002,
            output_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            output_port: 20011,
            referee_ip: IpAddr::V4(Ipv4Addr::new(224, 5, 23, 1)),
            referee_port: 10003,
            robot_speed: 3000.0,
            robot_acceleration: 1000.0,
            keeper_id: 0,
            ally_color: TeamColor::Blue,
            ally_side: FieldSide::West,
            track_blue: true,
            track_yellow: true,
            tick_interval_ms: 16,
            log_path: None,
            simulation: false,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|v| v == "true" || v == "1")
}

impl Config {
    /// Create config from `SSL_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            input_ip: env_parse("SSL_INPUT_IP").unwrap_or(defaults.input_ip),
            input_port: env_parse("SSL_INPUT_PORT").unwrap_or(defaults.input_port),
            output_ip: env_parse("SSL_OUTPUT_IP").unwrap_or(defaults.output_ip),
            output_port: env_parse("SSL_OUTPUT_PORT").unwrap_or(defaults.output_port),
            referee_ip: env_parse("SSL_REFEREE_IP").unwrap_or(defaults.referee_ip),
            referee_port: env_parse("SSL_REFEREE_PORT").unwrap_or(defaults.referee_port),
            robot_speed: env_parse("SSL_ROBOT_SPEED").unwrap_or(defaults.robot_speed),
            robot_acceleration: env_parse("SSL_ROBOT_ACCELERATION")
                .unwrap_or(defaults.robot_acceleration),
            keeper_id: env_parse("SSL_KEEPER_ID").unwrap_or(defaults.keeper_id),
            ally_color: std::env::var("SSL_ALLY_COLOR")
                .ok()
                .and_then(|v| parse_color(&v))
                .unwrap_or(defaults.ally_color),
            ally_side: std::env::var("SSL_ALLY_SIDE")
                .ok()
                .and_then(|v| parse_side(&v))
                .unwrap_or(defaults.ally_side),
            track_blue: env_flag("SSL_TRACK_BLUE").unwrap_or(defaults.track_blue),
            track_yellow: env_flag("SSL_TRACK_YELLOW").unwrap_or(defaults.track_yellow),
            tick_interval_ms: env_parse("SSL_TICK_INTERVAL_MS")
                .unwrap_or(defaults.tick_interval_ms),
            log_path: std::env::var("SSL_LOG_PATH").ok().map(PathBuf::from),
            simulation: env_flag("SSL_SIMULATION").unwrap_or(defaults.simulation),
        }
    }

    /// Reject settings the control core cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.keeper_id >= TEAM_SIZE {
            return Err(CoreError::InvalidRobotId(self.keeper_id));
        }
        if self.tick_interval_ms == 0 {
            return Err(CoreError::InvalidConfig("tick interval must be at least 1 ms".to_string()));
        }
        if !(self.robot_speed.is_finite() && self.robot_speed > 0.0) {
            return Err(CoreError::InvalidConfig(format!("robot speed {} is not positive", self.robot_speed)));
        }
        if !(self.robot_acceleration.is_finite() && self.robot_acceleration > 0.0) {
            return Err(CoreError::InvalidConfig(format!(
                "robot acceleration {} is not positive",
                self.robot_acceleration
            )));
        }
        Ok(())
    }

    /// Vision socket address.
    pub fn input_addr(&self) -> SocketAddr {
        SocketAddr::new(self.input_ip, self.input_port)
    }

    /// Command destination address.
    pub fn output_addr(&self) -> SocketAddr {
        SocketAddr::new(self.output_ip, self.output_port)
    }

    /// Referee socket address.
    pub fn referee_addr(&self) -> SocketAddr {
        SocketAddr::new(self.referee_ip, self.referee_port)
    }

    /// Executor tick period.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

fn parse_color(value: &str) -> Option<TeamColor> {
    match value.to_ascii_lowercase().as_str() {
        "blue" => Some(TeamColor::Blue),
        "yellow" => Some(TeamColor::Yellow),
        _ => None,
    }
}

fn parse_side(value: &str) -> Option<FieldSide> {
    match value.to_ascii_lowercase().as_str() {
        "east" => Some(FieldSide::East),
        "west" => Some(FieldSide::West),
        _ => None,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.input_addr(), "224.5.23.2:10002".parse().unwrap());
        assert_eq!(config.output_addr(), "127.0.0.1:20011".parse().unwrap());
        assert_eq!(config.referee_addr(), "224.5.23.1:10003".parse().unwrap());
        assert_eq!(config.tick_interval(), Duration::from_millis(16));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_keeper_id() {
        let config = Config {
            keeper_id: TEAM_SIZE,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::InvalidRobotId(11))));
    }

    #[test]
    fn test_validate_rejects_unusable_limits() {
        let zero_tick = Config {
            tick_interval_ms: 0,
            ..Config::default()
        };
        assert!(matches!(zero_tick.validate(), Err(CoreError::InvalidConfig(_))));

        for speed in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = Config {
                robot_speed: speed,
                ..Config::default()
            };
            assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))), "{}", speed);
        }

        let no_acceleration = Config {
            robot_acceleration: -5.0,
            ..Config::default()
        };
        assert!(matches!(no_acceleration.validate(), Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_color("Yellow"), Some(TeamColor::Yellow));
        assert_eq!(parse_color("red"), None);
        assert_eq!(parse_side("EAST"), Some(FieldSide::East));
        assert_eq!(parse_side(""), None);
    }

    #[test]
    fn test_from_env_falls_back_on_garbage() {
        std::env::set_var("SSL_OUTPUT_PORT", "not-a-port");
        std::env::set_var("SSL_KEEPER_ID", "3");
        let config = Config::from_env();
        std::env::remove_var("SSL_OUTPUT_PORT");
        std::env::remove_var("SSL_KEEPER_ID");

        assert_eq!(config.output_port, 20011);
        assert_eq!(config.keeper_id, 3);
    }
}
