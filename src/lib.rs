//! # SSL Control Core
//!
//! Control core for a RoboCup Small-Size-League team: shared world state,
//! geometric planners, one control loop per robot and the vision log codec.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SSL CONTROL CORE                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Geometry kernel                           │
//! │  ├── point.rs    - 2D point / vector in mm                   │
//! │  └── geometry.rs - Polygon, circle and angle helpers         │
//! │                                                              │
//! │  world/          - Match state (single writer)               │
//! │  ├── field.rs    - Field, goals and zones                    │
//! │  ├── objects.rs  - Ball, robots, teams, obstructions         │
//! │  ├── referee.rs  - Referee feed and game state machine       │
//! │  ├── model.rs    - Snapshot building and queries             │
//! │  └── store.rs    - Atomic snapshot publication               │
//! │                                                              │
//! │  planner/        - Read-only planners                        │
//! │  ├── free_shot.rs- Open shooting lane                        │
//! │  ├── dijkstra.rs - Visibility graph search                   │
//! │  └── movement.rs - Bounded motion with route cache           │
//! │                                                              │
//! │  executor/       - One control loop per ally robot           │
//! │  network/        - Command / feedback packets, UDP           │
//! │  vision/         - Log codec, recorder, replay               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//!
//! Vision log or live feed → `WorldModel` → `WorldStore` snapshot →
//! each `RobotExecutor` → `Behavior` → `Command` → `CommandSink`.
//!
//! Executors read exactly one `Arc<WorldSnapshot>` per tick, so a tick
//! never mixes fields from two vision frames.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod error;
pub mod executor;
pub mod network;
pub mod planner;
pub mod vision;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use core::point::Point;
pub use error::{CoreError, Result};
pub use executor::{Behavior, ExecutorPool, RobotExecutor, TickSource};
pub use network::{Command, CommandSink, Feedback, UdpTransport};
pub use vision::{LogFrame, LogReader, ProtoLog};
pub use world::{GameState, WorldModel, WorldSnapshot, WorldStore, TEAM_SIZE};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default executor tick interval (ms)
pub const TICK_INTERVAL_MS: u64 = 16;
