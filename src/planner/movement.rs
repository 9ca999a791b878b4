//! Movement Planner
//!
//! Turns a destination and an optional aim point into a bounded motion
//! command. Routes come from the visibility-graph planner and are cached
//! until the destination or the obstacle set changes materially.

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Config;
use crate::core::geometry::normalize_degrees;
use crate::core::point::Point;
use crate::error::{CoreError, Result};
use crate::world::model::WorldSnapshot;
use crate::world::objects::RobotRef;
use super::dijkstra::{collect_obstacles, find_route, AvoidOptions, Obstacle};

/// Default speed limit (mm/s).
pub const MAX_VELOCITY: f64 = 3000.0;
/// Distance (mm) over which the robot decelerates into a waypoint.
pub const DISTANCE_TO_SLOW_DOWN: f64 = 450.0;
/// Offset added to every nonzero speed to overcome motor dead band.
pub const START_UP_MOVEMENT_SPEED: f64 = 200.0;
/// Rotation speed for a half turn.
pub const MAX_ROTATION_SPEED: f64 = 1000.0;
/// Offset added to every rotation speed.
pub const START_UP_ROTATION_SPEED: f64 = 200.0;
/// Destination or obstacle movement (mm) that forces a replan.
pub const REPLAN_DISTANCE: f64 = 100.0;
/// A waypoint within this distance (mm) counts as reached.
pub const WAYPOINT_TOLERANCE: f64 = 50.0;

/// Motion command in robot terms.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Motion {
    /// Strafe direction relative to the robot's facing (degrees, clockwise positive).
    pub direction: f64,
    /// Strafe speed (mm/s), never above the planner's limit.
    pub speed: f64,
    /// Rotation speed; positive turns clockwise.
    pub rotation_speed: f64,
    /// Field-frame velocity (mm/s).
    pub velocity: Point,
    /// Heading the robot is turning towards (degrees), if any.
    pub heading: Option<f64>,
}

impl Motion {
    /// Stand still.
    pub const STOP: Self = Self {
        direction: 0.0,
        speed: 0.0,
        rotation_speed: 0.0,
        velocity: Point::ZERO,
        heading: None,
    };
}

/// Speed profile: full speed far out, linear ramp inside `slow_down`.
pub fn shaped_speed(distance: f64, slow_down: f64, max_speed: f64) -> f64 {
    if distance > slow_down {
        max_speed + START_UP_MOVEMENT_SPEED
    } else {
        distance / slow_down * max_speed + START_UP_MOVEMENT_SPEED
    }
}

/// Rotation profile: proportional to the heading error, damped while driving fast.
pub fn shaped_rotation(rotation: f64, speed: f64, max_velocity: f64) -> f64 {
    let mut rotation_speed = rotation / 180.0 * MAX_ROTATION_SPEED;
    if rotation_speed < 0.0 {
        rotation_speed -= START_UP_ROTATION_SPEED;
    } else {
        rotation_speed += START_UP_ROTATION_SPEED;
    }
    rotation_speed * (1.0 - speed.abs() / (max_velocity * 1.5))
}

/// Heading error between the robot's facing and the bearing `from` -> `to`.
pub fn rotation_to(orientation: f64, from: Point, to: Point) -> f64 {
    normalize_degrees(orientation - from.angle_to(to))
}

fn moved_materially(previous: &[Obstacle], current: &[Obstacle]) -> bool {
    if previous.len() != current.len() {
        return true;
    }
    previous.iter().zip(current).any(|pair| match pair {
        (Obstacle::Danger { center: a, .. }, Obstacle::Danger { center: b, .. }) => {
            a.distance(*b) > REPLAN_DISTANCE
        }
        (a, b) => a != b,
    })
}

/// Per-robot movement planner with a cached route.
#[derive(Clone, Debug)]
pub struct MovementPlanner {
    /// Optional obstacles to keep clear of.
    pub avoid: AvoidOptions,
    max_velocity: f64,
    speed_step: Option<f64>,
    last_speed: f64,
    route: Vec<Point>,
    planned_for: Option<Point>,
    planned_around: Vec<Obstacle>,
    replans: u64,
}

impl Default for MovementPlanner {
    fn default() -> Self {
        Self::new(MAX_VELOCITY)
    }
}

impl MovementPlanner {
    /// Planner with a speed limit. A limit that is not a positive finite
    /// number falls back to `MAX_VELOCITY`.
    pub fn new(max_velocity: f64) -> Self {
        let max_velocity = if max_velocity.is_finite() && max_velocity > 0.0 {
            max_velocity
        } else {
            warn!("Ignoring speed limit {}, using {}", max_velocity, MAX_VELOCITY);
            MAX_VELOCITY
        };
        Self {
            avoid: AvoidOptions::default(),
            max_velocity,
            speed_step: None,
            last_speed: 0.0,
            route: Vec::new(),
            planned_for: None,
            planned_around: Vec::new(),
            replans: 0,
        }
    }

    /// Planner limited by the configured robot speed and acceleration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.robot_speed).with_acceleration(config.robot_acceleration, config.tick_interval())
    }

    /// Cap speed gains at `acceleration` (mm/s²) over one `tick`. Braking is
    /// never limited. Non-positive values leave the gain unbounded.
    pub fn with_acceleration(mut self, acceleration: f64, tick: Duration) -> Self {
        let step = acceleration * tick.as_secs_f64();
        self.speed_step = (step.is_finite() && step > 0.0).then_some(step);
        self
    }

    /// Speed limit (mm/s).
    pub fn max_velocity(&self) -> f64 {
        self.max_velocity
    }

    /// Remaining waypoints.
    pub fn route(&self) -> &[Point] {
        &self.route
    }

    /// Number of route computations so far.
    pub fn replans(&self) -> u64 {
        self.replans
    }

    /// Forget the cached route.
    pub fn reset(&mut self) {
        self.last_speed = 0.0;
        self.route.clear();
        self.planned_for = None;
        self.planned_around.clear();
    }

    /// Motion for robot `me` towards `destination`, facing `aim` when given.
    ///
    /// No destination means hold position (still turning towards `aim`).
    pub fn plan(
        &mut self,
        world: &WorldSnapshot,
        me: RobotRef,
        destination: Option<Point>,
        aim: Option<Point>,
    ) -> Result<Motion> {
        let robot = world.robot(me).ok_or(CoreError::InvalidRobotId(me.id))?;
        let position = robot.position();
        let heading = aim.map(|a| position.angle_to(a));

        let Some(destination) = destination else {
            self.reset();
            let rotation_speed = match aim {
                Some(a) => shaped_rotation(rotation_to(robot.orientation, position, a), 0.0, self.max_velocity),
                None => 0.0,
            };
            return Ok(Motion { rotation_speed, heading, ..Motion::STOP });
        };

        let obstacles = collect_obstacles(world, me, self.avoid, self.max_velocity);
        let target_moved = self
            .planned_for
            .map_or(true, |p| p.distance(destination) > REPLAN_DISTANCE);
        let leg_blocked = self
            .route
            .first()
            .is_some_and(|&next| obstacles.iter().any(|o| o.blocks(position, next)));

        if self.route.is_empty() || target_moved || leg_blocked || moved_materially(&self.planned_around, &obstacles) {
            self.route = match find_route(position, destination, &obstacles) {
                Ok(route) => route,
                Err(e) => {
                    self.reset();
                    return Err(e);
                }
            };
            self.planned_for = Some(destination);
            self.planned_around = obstacles;
            self.replans += 1;
            debug!("Robot {:?} replanned: {} waypoints", me, self.route.len());
        }

        while self.route.len() > 1 && position.distance(self.route[0]) < WAYPOINT_TOLERANCE {
            self.route.remove(0);
        }
        let next = self.route[0];
        let distance = position.distance(next);

        let mut speed = match self.route.get(1) {
            Some(&after) => {
                let turn = (position.angle_to(next) - next.angle_to(after)).abs();
                shaped_speed(
                    distance + DISTANCE_TO_SLOW_DOWN * (1.0 - turn / 360.0),
                    DISTANCE_TO_SLOW_DOWN,
                    self.max_velocity,
                )
            }
            None if distance < WAYPOINT_TOLERANCE => 0.0,
            None => shaped_speed(distance, DISTANCE_TO_SLOW_DOWN, self.max_velocity),
        };
        speed = speed.clamp(0.0, self.max_velocity);
        if let Some(step) = self.speed_step {
            speed = speed.min(self.last_speed + step);
        }
        self.last_speed = speed;

        let rotation_speed = match aim {
            Some(a) => shaped_rotation(rotation_to(robot.orientation, position, a), speed, self.max_velocity),
            None => 0.0,
        };
        let bearing = position.angle_to(next);

        Ok(Motion {
            direction: normalize_degrees(robot.orientation - bearing),
            speed,
            rotation_speed,
            velocity: Point::from_degrees(bearing).scale(speed),
            heading,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use crate::world::field::FieldSide;
    use crate::world::objects::TeamColor;

    const ME: RobotRef = RobotRef { color: TeamColor::Blue, id: 0 };

    fn world_with_me(position: Point, orientation: f64) -> WorldSnapshot {
        let mut world = WorldSnapshot::new(TeamColor::Blue, FieldSide::West);
        let me = world.blue.robot_mut(0).unwrap();
        me.object.position = position;
        me.object.on_sight = true;
        me.orientation = orientation;
        world
    }

    fn place(world: &mut WorldSnapshot, id: u8, position: Point) {
        let robot = world.yellow.robot_mut(id).unwrap();
        robot.object.position = position;
        robot.object.on_sight = true;
    }

    #[test]
    fn test_no_destination_is_zero_velocity() {
        let world = world_with_me(Point::ZERO, 0.0);
        let mut planner = MovementPlanner::default();
        let motion = planner.plan(&world, ME, None, None).unwrap();
        assert_eq!(motion, Motion::STOP);

        // Turning towards an aim point is still zero velocity
        let motion = planner.plan(&world, ME, None, Some(Point::new(0.0, 1000.0))).unwrap();
        assert_eq!(motion.speed, 0.0);
        assert_eq!(motion.velocity, Point::ZERO);
        assert!(motion.rotation_speed < 0.0);
    }

    #[test]
    fn test_straight_line_at_full_speed() {
        let world = world_with_me(Point::ZERO, 90.0);
        let mut planner = MovementPlanner::default();
        let motion = planner.plan(&world, ME, Some(Point::new(2000.0, 0.0)), None).unwrap();
        assert_eq!(motion.speed, MAX_VELOCITY);
        // Facing north, moving east: 90 degrees clockwise
        assert_eq!(motion.direction, 90.0);
        assert!(motion.velocity.approx_eq(Point::new(MAX_VELOCITY, 0.0), 1e-9));
    }

    #[test]
    fn test_slows_down_near_destination() {
        let world = world_with_me(Point::ZERO, 0.0);
        let mut planner = MovementPlanner::default();
        let motion = planner.plan(&world, ME, Some(Point::new(225.0, 0.0)), None).unwrap();
        assert_eq!(motion.speed, 225.0 / 450.0 * MAX_VELOCITY + START_UP_MOVEMENT_SPEED);

        let arrived = planner.plan(&world, ME, Some(Point::new(10.0, 0.0)), None).unwrap();
        assert_eq!(arrived.speed, 0.0);
    }

    #[test]
    fn test_route_is_cached_until_world_changes() {
        let mut world = world_with_me(Point::ZERO, 0.0);
        place(&mut world, 1, Point::new(1000.0, 0.0));
        let mut planner = MovementPlanner::default();
        let destination = Some(Point::new(2000.0, 0.0));

        planner.plan(&world, ME, destination, None).unwrap();
        planner.plan(&world, ME, destination, None).unwrap();
        assert_eq!(planner.replans(), 1);
        assert!(planner.route().len() >= 2);

        // Small jitter keeps the route
        place(&mut world, 1, Point::new(1020.0, 0.0));
        planner.plan(&world, ME, destination, None).unwrap();
        assert_eq!(planner.replans(), 1);

        // Obstacle leaves the lane
        place(&mut world, 1, Point::new(1000.0, 2000.0));
        planner.plan(&world, ME, destination, None).unwrap();
        assert_eq!(planner.replans(), 2);
        assert_eq!(planner.route(), &[Point::new(2000.0, 0.0)]);
    }

    #[test]
    fn test_unknown_robot() {
        let world = world_with_me(Point::ZERO, 0.0);
        let mut planner = MovementPlanner::default();
        let bad = RobotRef { color: TeamColor::Blue, id: 42 };
        let err = planner.plan(&world, bad, Some(Point::ZERO), None).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRobotId(42)));
    }

    #[test]
    fn test_unusable_limit_falls_back() {
        let world = world_with_me(Point::ZERO, 0.0);
        for limit in [-1.0, 0.0, f64::NAN] {
            let mut planner = MovementPlanner::new(limit);
            assert_eq!(planner.max_velocity(), MAX_VELOCITY);
            let motion = planner.plan(&world, ME, Some(Point::new(2000.0, 0.0)), None).unwrap();
            assert_eq!(motion.speed, MAX_VELOCITY);
        }
    }

    #[test]
    fn test_acceleration_ramps_speed_up() {
        let world = world_with_me(Point::ZERO, 0.0);
        let destination = Some(Point::new(3000.0, 0.0));
        let mut planner = MovementPlanner::new(MAX_VELOCITY).with_acceleration(1000.0, Duration::from_millis(500));

        let speeds: Vec<f64> = (0..4)
            .map(|_| planner.plan(&world, ME, destination, None).unwrap().speed)
            .collect();
        assert_eq!(speeds, vec![500.0, 1000.0, 1500.0, 2000.0]);

        // Braking is immediate
        let arrived = planner.plan(&world, ME, Some(Point::new(10.0, 0.0)), None).unwrap();
        assert_eq!(arrived.speed, 0.0);
        let restart = planner.plan(&world, ME, destination, None).unwrap();
        assert_eq!(restart.speed, 500.0);
    }

    #[test]
    fn test_from_config_uses_robot_limits() {
        let config = Config {
            robot_speed: 1500.0,
            robot_acceleration: 2000.0,
            tick_interval_ms: 100,
            ..Config::default()
        };
        let world = world_with_me(Point::ZERO, 0.0);
        let mut planner = MovementPlanner::from_config(&config);
        assert_eq!(planner.max_velocity(), 1500.0);
        let motion = planner.plan(&world, ME, Some(Point::new(3000.0, 0.0)), None).unwrap();
        assert!((motion.speed - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_shaped_rotation() {
        assert_eq!(shaped_rotation(90.0, 0.0, MAX_VELOCITY), 700.0);
        assert_eq!(shaped_rotation(-90.0, 0.0, MAX_VELOCITY), -700.0);
        assert_eq!(shaped_rotation(90.0, 4500.0, MAX_VELOCITY), 0.0);
    }

    #[test]
    fn test_rotation_to_wraps() {
        let r = rotation_to(170.0, Point::ZERO, Point::new(0.0, -1000.0));
        assert_eq!(r, -100.0);
    }

    proptest! {
        #[test]
        fn prop_speed_never_exceeds_limit(
            x in -4000.0f64..4000.0,
            y in -2500.0f64..2500.0,
            orientation in -180.0f64..180.0,
            limit in 100.0f64..5000.0,
            ox in -4000.0f64..4000.0,
        ) {
            let mut world = world_with_me(Point::ZERO, orientation);
            place(&mut world, 1, Point::new(ox, 0.0));
            let mut planner = MovementPlanner::new(limit);
            if let Ok(motion) = planner.plan(&world, ME, Some(Point::new(x, y)), Some(Point::new(x, y))) {
                prop_assert!(motion.speed <= limit);
                prop_assert!(motion.velocity.length() <= limit + 1e-6);
            }
        }
    }
}
