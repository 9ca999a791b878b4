//! Geometric planners.
//!
//! Free-shot lane search and obstacle-aware movement. Both read one
//! `WorldSnapshot` and never mutate it.

pub mod free_shot;
pub mod dijkstra;
pub mod movement;

pub use free_shot::FreeShotPlanner;
pub use dijkstra::{AvoidOptions, Obstacle};
pub use movement::{Motion, MovementPlanner, MAX_VELOCITY};
