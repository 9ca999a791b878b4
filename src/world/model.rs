//! World Model
//!
//! `WorldSnapshot` is the immutable view of the match that planners and
//! executors read. `WorldModel` is the single writer: it folds detection
//! frames and referee packets into a working copy and publishes whole
//! snapshots through a [`WorldStore`].

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::geometry::area_contains_circle;
use crate::core::point::Point;
use crate::vision::messages::{DetectionFrame, DetectionRobot, RefereePacket, TeamInfo};
use super::field::{Field, FieldSide, FieldZone, Goal};
use super::objects::{Ball, Obstruction, Robot, RobotRef, Team, TeamColor, ROBOT_RADIUS, TEAM_SIZE};
use super::referee::{robot_may_move, GameState, Referee, RefereeStateMachine};
use super::store::WorldStore;

/// A robot this close to the ball (mm) owns it.
pub const BALL_OWNERSHIP_DISTANCE: f64 = 200.0;

/// Immutable match snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Publication counter, strictly increasing.
    pub version: u64,
    /// Vision tick the snapshot was built from.
    pub tick: u64,
    /// Capture time of the last detection (s).
    pub timestamp: f64,
    /// Field geometry.
    pub field: Field,
    /// The ball.
    pub ball: Ball,
    /// Blue team.
    pub blue: Team,
    /// Yellow team.
    pub yellow: Team,
    /// Colour we play as.
    pub ally_color: TeamColor,
    /// Half we defend.
    pub ally_side: FieldSide,
    /// Referee feed.
    pub referee: Referee,
    /// Current match phase.
    pub game_state: GameState,
    /// Externally added obstacles.
    pub obstructions: Vec<Obstruction>,
}

impl WorldSnapshot {
    /// Empty field, every robot off sight.
    pub fn new(ally_color: TeamColor, ally_side: FieldSide) -> Self {
        Self {
            version: 0,
            tick: 0,
            timestamp: 0.0,
            field: Field::default(),
            ball: Ball::default(),
            blue: Team::new(TeamColor::Blue),
            yellow: Team::new(TeamColor::Yellow),
            ally_color,
            ally_side,
            referee: Referee::default(),
            game_state: GameState::default(),
            obstructions: Vec::new(),
        }
    }

    /// Team by colour.
    pub fn team(&self, color: TeamColor) -> &Team {
        match color {
            TeamColor::Blue => &self.blue,
            TeamColor::Yellow => &self.yellow,
        }
    }

    fn team_mut(&mut self, color: TeamColor) -> &mut Team {
        match color {
            TeamColor::Blue => &mut self.blue,
            TeamColor::Yellow => &mut self.yellow,
        }
    }

    /// Our team.
    pub fn ally(&self) -> &Team {
        self.team(self.ally_color)
    }

    /// Their team.
    pub fn enemy(&self) -> &Team {
        self.team(self.ally_color.opposite())
    }

    /// Robot by reference.
    pub fn robot(&self, reference: RobotRef) -> Option<&Robot> {
        self.team(reference.color).robot(reference.id)
    }

    /// Ally robot by id.
    pub fn ally_robot(&self, id: u8) -> Option<&Robot> {
        self.ally().robot(id)
    }

    /// Every robot of both teams.
    pub fn all_robots(&self) -> impl Iterator<Item = &Robot> {
        self.blue.robots.iter().chain(self.yellow.robots.iter())
    }

    /// Every visible robot of both teams.
    pub fn robots_on_sight(&self) -> impl Iterator<Item = &Robot> {
        self.all_robots().filter(|r| r.is_visible())
    }

    /// Visible robots whose footprint touches the polygon.
    pub fn robots_in_area<'a>(&'a self, polygon: &'a [Point]) -> impl Iterator<Item = &'a Robot> + 'a {
        self.robots_on_sight()
            .filter(move |r| area_contains_circle(r.position(), polygon, ROBOT_RADIUS))
    }

    /// Goal we attack.
    pub fn enemy_goal(&self) -> Goal {
        self.field.goal(self.ally_side.opposite())
    }

    /// Goal we defend.
    pub fn own_goal(&self) -> Goal {
        self.field.goal(self.ally_side)
    }

    /// Movement legality for an ally robot under the current referee command.
    /// Unknown ids may not move.
    pub fn robot_may_move(&self, id: u8) -> bool {
        match self.ally_robot(id) {
            Some(robot) => robot_may_move(self.referee.command, robot.position(), self.ball.position()),
            None => false,
        }
    }

    /// Visible robot closest to the ball.
    pub fn closest_robot_to_ball(&self) -> Option<&Robot> {
        let ball = self.ball.position();
        self.robots_on_sight()
            .min_by(|a, b| a.position().distance(ball).total_cmp(&b.position().distance(ball)))
    }

    fn team_distance_to_ball(&self, team: &Team) -> f64 {
        let ball = self.ball.position();
        team.robots_on_sight()
            .map(|r| r.position().distance(ball))
            .fold(f64::INFINITY, f64::min)
    }

    /// True when our nearest robot is at least as close to the ball as theirs.
    pub fn ally_has_ball(&self) -> bool {
        self.team_distance_to_ball(self.ally()) <= self.team_distance_to_ball(self.enemy())
    }

    /// Zone of the current field containing a point.
    pub fn locate(&self, point: Point) -> Option<FieldZone> {
        FieldZone::locate(&self.field, point)
    }
}

/// Single-writer world state.
pub struct WorldModel {
    working: WorldSnapshot,
    state_machine: RefereeStateMachine,
    store: Arc<WorldStore>,
    field_from_vision: bool,
}

impl WorldModel {
    /// Create a model publishing into `store`.
    pub fn new(ally_color: TeamColor, ally_side: FieldSide, store: Arc<WorldStore>) -> Self {
        Self {
            working: WorldSnapshot::new(ally_color, ally_side),
            state_machine: RefereeStateMachine::new(),
            store,
            field_from_vision: false,
        }
    }

    /// Store this model publishes into.
    pub fn store(&self) -> &Arc<WorldStore> {
        &self.store
    }

    /// Working copy (not yet published).
    pub fn working(&self) -> &WorldSnapshot {
        &self.working
    }

    /// Replace the field geometry. Only the first geometry seen is kept.
    pub fn set_field(&mut self, field: Field) {
        if !self.field_from_vision {
            self.working.field = field;
            self.field_from_vision = true;
        }
    }

    /// Add a static obstacle.
    pub fn add_obstruction(&mut self, obstruction: Obstruction) {
        self.working.obstructions.push(obstruction);
    }

    /// Remove every static obstacle.
    pub fn clear_obstructions(&mut self) {
        self.working.obstructions.clear();
    }

    /// Fold a detection frame into the working copy.
    ///
    /// Robots missing from the frame keep their stale position but go off sight.
    pub fn ingest_detection(&mut self, frame: &DetectionFrame, tick: u64) {
        let dt = if self.working.timestamp > 0.0 {
            frame.t_capture - self.working.timestamp
        } else {
            0.0
        };
        self.working.tick = tick;
        self.working.timestamp = frame.t_capture;

        if let Some(ball) = frame
            .balls
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        {
            self.working
                .ball
                .object
                .observe(Point::new(ball.x as f64, ball.y as f64), tick, dt);
        } else {
            self.working.ball.object.on_sight = false;
        }

        Self::ingest_robots(self.working.team_mut(TeamColor::Blue), &frame.robots_blue, tick, dt);
        Self::ingest_robots(self.working.team_mut(TeamColor::Yellow), &frame.robots_yellow, tick, dt);

        self.working.ball.owner = self.ball_owner();
    }

    fn ingest_robots(team: &mut Team, detected: &[DetectionRobot], tick: u64, dt: f64) {
        for robot in team.robots.iter_mut() {
            robot.object.on_sight = false;
        }
        for detection in detected {
            if detection.robot_id >= TEAM_SIZE as u32 {
                debug!("Ignoring detection of robot id {}", detection.robot_id);
                continue;
            }
            if let Some(robot) = team.robot_mut(detection.robot_id as u8) {
                robot
                    .object
                    .observe(Point::new(detection.x as f64, detection.y as f64), tick, dt);
                if let Some(orientation) = detection.orientation {
                    robot.orientation = (orientation as f64).to_degrees();
                }
            }
        }
    }

    fn ball_owner(&self) -> Option<RobotRef> {
        let ball = self.working.ball.position();
        self.working
            .closest_robot_to_ball()
            .filter(|r| r.position().distance(ball) <= BALL_OWNERSHIP_DISTANCE)
            .map(Robot::reference)
    }

    /// Fold a referee packet into the working copy.
    pub fn ingest_referee(&mut self, packet: &RefereePacket) {
        self.working.referee.update(
            packet.command,
            packet.command_counter,
            packet.command_timestamp,
            packet.stage,
            packet.stage_time_left,
        );
        Self::apply_team_info(self.working.team_mut(TeamColor::Yellow), &packet.yellow);
        Self::apply_team_info(self.working.team_mut(TeamColor::Blue), &packet.blue);
    }

    fn apply_team_info(team: &mut Team, info: &TeamInfo) {
        team.name.clone_from(&info.name);
        team.score = info.score;
        if info.goalie < TEAM_SIZE as u32 {
            team.goalie = info.goalie as u8;
        }
    }

    /// Run the referee state machine and publish the working copy.
    ///
    /// Returns the published version.
    pub fn publish(&mut self) -> u64 {
        let ball = self.working.ball.position();
        self.working.game_state =
            self.state_machine
                .update(&self.working.referee, self.working.ally_color, ball);
        self.working.version += 1;
        self.store.publish(self.working.clone());
        self.working.version
    }
}
