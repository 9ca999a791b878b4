//! Robot executors.
//!
//! Behaviors, the per-robot control loop and the pool that owns one loop
//! per ally robot.

pub mod behavior;
pub mod robot;
pub mod pool;

pub use behavior::{Behavior, GotoPosition, Idle, ShootAtGoal};
pub use robot::{ExecutorStatus, RobotExecutor, TickSource};
pub use pool::ExecutorPool;
