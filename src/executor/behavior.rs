//! Robot Behaviors
//!
//! A behavior turns one world snapshot into one command for its robot.
//! Strategy code swaps behaviors in and out of executors at any time.

use crate::core::point::Point;
use crate::error::{CoreError, Result};
use crate::network::command::Command;
use crate::planner::free_shot::FreeShotPlanner;
use crate::planner::movement::{rotation_to, MovementPlanner};
use crate::world::model::WorldSnapshot;
use crate::world::objects::RobotRef;

/// Heading error (degrees) within which a shot is released.
pub const SHOOT_ANGLE_TOLERANCE: f64 = 5.0;

/// Default kicker power.
pub const DEFAULT_KICK_POWER: u8 = 100;

/// Per-tick command source for one robot.
pub trait Behavior: Send + 'static {
    /// Command for `robot_id` given the current snapshot.
    ///
    /// An error means "no result this tick"; the executor sends a stop.
    fn calculate(&mut self, robot_id: u8, world: &WorldSnapshot) -> Result<Command>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Stand still.
#[derive(Clone, Copy, Debug, Default)]
pub struct Idle;

impl Behavior for Idle {
    fn calculate(&mut self, robot_id: u8, _world: &WorldSnapshot) -> Result<Command> {
        Ok(Command::stop(robot_id))
    }

    fn name(&self) -> &'static str {
        "idle"
    }
}

/// Drive to a point, optionally facing another.
#[derive(Clone, Debug, Default)]
pub struct GotoPosition {
    /// Where to go; `None` holds position.
    pub target: Option<Point>,
    /// What to face.
    pub aim: Option<Point>,
    /// Run the dribbler on the way.
    pub dribble: bool,
    planner: MovementPlanner,
}

impl GotoPosition {
    /// Go to `target`.
    pub fn new(target: Option<Point>, aim: Option<Point>) -> Self {
        Self {
            target,
            aim,
            dribble: false,
            planner: MovementPlanner::default(),
        }
    }

    /// Drive with `planner` instead of the default limits.
    pub fn with_planner(mut self, planner: MovementPlanner) -> Self {
        self.planner = planner;
        self
    }

    /// Move the target.
    pub fn set_target(&mut self, target: Option<Point>, aim: Option<Point>) {
        self.target = target;
        self.aim = aim;
    }

    /// Cached route of the underlying planner.
    pub fn route(&self) -> &[Point] {
        self.planner.route()
    }
}

impl Behavior for GotoPosition {
    fn calculate(&mut self, robot_id: u8, world: &WorldSnapshot) -> Result<Command> {
        if !world.robot_may_move(robot_id) {
            self.planner.reset();
            return Ok(Command::stop(robot_id));
        }
        let me = RobotRef {
            color: world.ally_color,
            id: robot_id,
        };
        let motion = self.planner.plan(world, me, self.target, self.aim)?;
        Ok(Command::from_motion(robot_id, &motion).with_dribble(self.dribble))
    }

    fn name(&self) -> &'static str {
        "goto-position"
    }
}

/// Fetch the ball and shoot it into the widest open lane.
#[derive(Clone, Debug)]
pub struct ShootAtGoal {
    /// Flat kick power.
    pub kick_power: u8,
    shot: FreeShotPlanner,
    movement: MovementPlanner,
}

impl Default for ShootAtGoal {
    fn default() -> Self {
        Self::new(FreeShotPlanner::default())
    }
}

impl ShootAtGoal {
    /// Shooter using `shot` to pick its aim.
    pub fn new(shot: FreeShotPlanner) -> Self {
        Self {
            kick_power: DEFAULT_KICK_POWER,
            shot,
            movement: MovementPlanner::default(),
        }
    }

    /// Drive with `planner` instead of the default limits.
    pub fn with_planner(mut self, planner: MovementPlanner) -> Self {
        self.movement = planner;
        self
    }
}

impl Behavior for ShootAtGoal {
    fn calculate(&mut self, robot_id: u8, world: &WorldSnapshot) -> Result<Command> {
        if !world.robot_may_move(robot_id) {
            self.movement.reset();
            return Ok(Command::stop(robot_id));
        }
        let me = RobotRef {
            color: world.ally_color,
            id: robot_id,
        };
        let robot = world.robot(me).ok_or(CoreError::InvalidRobotId(robot_id))?;
        let ball = world.ball.position();

        if world.ball.owner != Some(me) {
            let motion = self.movement.plan(world, me, Some(ball), Some(ball))?;
            return Ok(Command::from_motion(robot_id, &motion).with_dribble(true));
        }

        let aim = self.shot.plan(world).ok_or(CoreError::PlannerUnreachable("no free shot"))?;
        let motion = self.movement.plan(world, me, None, Some(aim))?;
        let command = Command::from_motion(robot_id, &motion).with_dribble(true);
        if rotation_to(robot.orientation, robot.position(), aim).abs() <= SHOOT_ANGLE_TOLERANCE {
            Ok(command.with_kick(self.kick_power).with_dribble(false))
        } else {
            Ok(command)
        }
    }

    fn name(&self) -> &'static str {
        "shoot-at-goal"
    }
}
