//! Match world.
//!
//! Field geometry, tracked objects, the referee state machine and the
//! snapshot store executors read from.

pub mod field;
pub mod objects;
pub mod referee;
pub mod model;
pub mod store;

pub use field::{Field, FieldSide, FieldZone, Goal};
pub use objects::{Ball, FieldObject, Obstruction, Robot, RobotRef, Team, TeamColor, ROBOT_DIAMETER, TEAM_SIZE};
pub use referee::{GameState, Referee, RefereeCommand, RefereeStateMachine, Stage};
pub use model::{WorldModel, WorldSnapshot};
pub use store::{WorldReader, WorldStore};
