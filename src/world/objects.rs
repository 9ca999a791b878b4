//! Field Objects
//!
//! Ball, robots, teams and static obstructions as tracked by the world model.

use serde::{Deserialize, Serialize};

use crate::core::geometry::rotated_rectangle;
use crate::core::point::Point;

/// Robots per team; ids are dense in `[0, TEAM_SIZE)`.
pub const TEAM_SIZE: u8 = 11;

/// Robot diameter (mm).
pub const ROBOT_DIAMETER: f64 = 180.0;

/// Robot radius (mm).
pub const ROBOT_RADIUS: f64 = ROBOT_DIAMETER / 2.0;

/// Team colour as assigned by the referee.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TeamColor {
    /// Blue team.
    Blue,
    /// Yellow team.
    Yellow,
}

impl TeamColor {
    /// The other colour.
    pub fn opposite(self) -> Self {
        match self {
            TeamColor::Blue => TeamColor::Yellow,
            TeamColor::Yellow => TeamColor::Blue,
        }
    }
}

/// Check a robot id against `[0, TEAM_SIZE)`.
pub fn valid_robot_id(id: u8) -> bool {
    id < TEAM_SIZE
}

/// Tracking state shared by everything on the field.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldObject {
    /// Position (mm).
    pub position: Point,
    /// Heading of travel (degrees).
    pub direction: f64,
    /// Speed (mm/s).
    pub speed: f64,
    /// Tick of the last vision update.
    pub last_update_tick: u64,
    /// Seen by vision in the latest frame.
    pub on_sight: bool,
}

impl FieldObject {
    /// Object at rest at a position, visible.
    pub fn at(position: Point) -> Self {
        Self {
            position,
            on_sight: true,
            ..Self::default()
        }
    }

    /// Velocity vector (mm/s).
    pub fn velocity(&self) -> Point {
        Point::from_degrees(self.direction).scale(self.speed)
    }

    /// Move to a new position observed at `tick`, deriving direction and speed.
    ///
    /// `dt` is the elapsed time in seconds since the previous observation.
    pub fn observe(&mut self, position: Point, tick: u64, dt: f64) {
        let moved = position - self.position;
        if dt > 0.0 && moved.length_squared() > 0.0 {
            self.direction = self.position.angle_to(position);
            self.speed = moved.length() / dt;
        } else if dt > 0.0 {
            self.speed = 0.0;
        }
        self.position = position;
        self.last_update_tick = tick;
        self.on_sight = true;
    }
}

/// Reference to a robot by team and id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RobotRef {
    /// Team colour.
    pub color: TeamColor,
    /// Robot id.
    pub id: u8,
}

/// One robot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Robot {
    /// Robot id in `[0, TEAM_SIZE)`.
    pub id: u8,
    /// Team colour.
    pub color: TeamColor,
    /// Facing (degrees).
    pub orientation: f64,
    /// Tracking state.
    pub object: FieldObject,
}

impl Robot {
    /// Off-sight robot at the origin.
    pub fn new(id: u8, color: TeamColor) -> Self {
        Self {
            id,
            color,
            orientation: 0.0,
            object: FieldObject::default(),
        }
    }

    /// Current position.
    pub fn position(&self) -> Point {
        self.object.position
    }

    /// Visible in the latest frame.
    pub fn is_visible(&self) -> bool {
        self.object.on_sight
    }

    /// Team/id reference.
    pub fn reference(&self) -> RobotRef {
        RobotRef { color: self.color, id: self.id }
    }
}

/// The match ball.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Ball {
    /// Tracking state.
    pub object: FieldObject,
    /// Robot currently controlling the ball.
    pub owner: Option<RobotRef>,
}

impl Ball {
    /// Current position.
    pub fn position(&self) -> Point {
        self.object.position
    }
}

/// Team roster and referee bookkeeping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    /// Team name as reported by the referee.
    pub name: String,
    /// Team colour.
    pub color: TeamColor,
    /// Goals scored.
    pub score: u32,
    /// Keeper robot id.
    pub goalie: u8,
    /// Robots indexed by id.
    pub robots: Vec<Robot>,
}

impl Team {
    /// Team with `TEAM_SIZE` off-sight robots.
    pub fn new(color: TeamColor) -> Self {
        Self {
            name: String::new(),
            color,
            score: 0,
            goalie: 0,
            robots: (0..TEAM_SIZE).map(|id| Robot::new(id, color)).collect(),
        }
    }

    /// Robot by id.
    pub fn robot(&self, id: u8) -> Option<&Robot> {
        self.robots.get(id as usize)
    }

    /// Mutable robot by id.
    pub fn robot_mut(&mut self, id: u8) -> Option<&mut Robot> {
        self.robots.get_mut(id as usize)
    }

    /// Robots visible in the latest frame.
    pub fn robots_on_sight(&self) -> impl Iterator<Item = &Robot> {
        self.robots.iter().filter(|r| r.is_visible())
    }
}

/// Static or slow obstacle, modelled as a rotated rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstruction {
    /// Extent across the orientation axis (mm).
    pub width: f64,
    /// Extent along the orientation axis (mm).
    pub length: f64,
    /// Rotation (degrees).
    pub orientation: f64,
    /// Centre (mm).
    pub position: Point,
}

impl Obstruction {
    /// Polygon corners.
    pub fn polygon(&self) -> [Point; 4] {
        rotated_rectangle(self.position, self.length, self.width, self.orientation)
    }
}
