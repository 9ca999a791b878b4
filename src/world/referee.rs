//! Referee State Machine
//!
//! Tracks the referee feed and derives the match phase the robots act on.
//! `update_state` is a pure transition function; `RefereeStateMachine`
//! wraps it with the ball reference captured on entry to a kickoff state.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::point::Point;
use crate::error::CoreError;
use super::objects::TeamColor;

/// Ball travel (mm) that ends a kickoff / free-kick phase.
pub const KICKOFF_BALL_DISPLACEMENT: f64 = 500.0;

/// Clearance (mm) robots must keep from the ball during STOP.
pub const STOP_BALL_DISTANCE: f64 = 500.0;

/// Referee box command.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RefereeCommand {
    Halt,
    #[default]
    Stop,
    NormalStart,
    ForceStart,
    PrepareKickoffYellow,
    PrepareKickoffBlue,
    PreparePenaltyYellow,
    PreparePenaltyBlue,
    DirectFreeYellow,
    DirectFreeBlue,
    IndirectFreeYellow,
    IndirectFreeBlue,
    TimeoutYellow,
    TimeoutBlue,
    GoalYellow,
    GoalBlue,
    BallPlacementYellow,
    BallPlacementBlue,
}

impl RefereeCommand {
    /// Every command, indexed by its wire value.
    pub const ALL: [RefereeCommand; 18] = [
        RefereeCommand::Halt,
        RefereeCommand::Stop,
        RefereeCommand::NormalStart,
        RefereeCommand::ForceStart,
        RefereeCommand::PrepareKickoffYellow,
        RefereeCommand::PrepareKickoffBlue,
        RefereeCommand::PreparePenaltyYellow,
        RefereeCommand::PreparePenaltyBlue,
        RefereeCommand::DirectFreeYellow,
        RefereeCommand::DirectFreeBlue,
        RefereeCommand::IndirectFreeYellow,
        RefereeCommand::IndirectFreeBlue,
        RefereeCommand::TimeoutYellow,
        RefereeCommand::TimeoutBlue,
        RefereeCommand::GoalYellow,
        RefereeCommand::GoalBlue,
        RefereeCommand::BallPlacementYellow,
        RefereeCommand::BallPlacementBlue,
    ];

    /// Colour awarded a direct or indirect free kick.
    pub fn free_kick_color(self) -> Option<TeamColor> {
        match self {
            RefereeCommand::DirectFreeBlue | RefereeCommand::IndirectFreeBlue => Some(TeamColor::Blue),
            RefereeCommand::DirectFreeYellow | RefereeCommand::IndirectFreeYellow => {
                Some(TeamColor::Yellow)
            }
            _ => None,
        }
    }

    /// Colour a kickoff or penalty is being prepared for.
    pub fn preparation_color(self) -> Option<TeamColor> {
        match self {
            RefereeCommand::PrepareKickoffBlue | RefereeCommand::PreparePenaltyBlue => Some(TeamColor::Blue),
            RefereeCommand::PrepareKickoffYellow | RefereeCommand::PreparePenaltyYellow => {
                Some(TeamColor::Yellow)
            }
            _ => None,
        }
    }

    /// Just-scored goal command.
    pub fn is_goal(self) -> bool {
        matches!(self, RefereeCommand::GoalBlue | RefereeCommand::GoalYellow)
    }
}

/// Match stage as reported by the referee box.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Stage {
    #[default]
    NormalFirstHalfPre,
    NormalFirstHalf,
    NormalHalfTime,
    NormalSecondHalfPre,
    NormalSecondHalf,
    ExtraTimeBreak,
    ExtraFirstHalfPre,
    ExtraFirstHalf,
    ExtraHalfTime,
    ExtraSecondHalfPre,
    ExtraSecondHalf,
    PenaltyShootoutBreak,
    PenaltyShootout,
    PostGame,
}

impl Stage {
    /// Every stage, indexed by its wire value.
    pub const ALL: [Stage; 14] = [
        Stage::NormalFirstHalfPre,
        Stage::NormalFirstHalf,
        Stage::NormalHalfTime,
        Stage::NormalSecondHalfPre,
        Stage::NormalSecondHalf,
        Stage::ExtraTimeBreak,
        Stage::ExtraFirstHalfPre,
        Stage::ExtraFirstHalf,
        Stage::ExtraHalfTime,
        Stage::ExtraSecondHalfPre,
        Stage::ExtraSecondHalf,
        Stage::PenaltyShootoutBreak,
        Stage::PenaltyShootout,
        Stage::PostGame,
    ];
}

impl TryFrom<i32> for RefereeCommand {
    type Error = CoreError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or_else(|| CoreError::ProtocolDecodeError(format!("unknown referee command {}", value)))
    }
}

impl TryFrom<i32> for Stage {
    type Error = CoreError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or_else(|| CoreError::ProtocolDecodeError(format!("unknown referee stage {}", value)))
    }
}

/// Latest referee feed state.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Referee {
    /// Current command.
    pub command: RefereeCommand,
    /// Command before the current one.
    pub previous_command: RefereeCommand,
    /// Current stage.
    pub stage: Stage,
    /// Microseconds left in the stage.
    pub stage_time_left: i64,
    /// Increments on every new command.
    pub command_counter: u32,
    /// Timestamp of the current command (µs).
    pub command_timestamp: u64,
}

impl Referee {
    /// Apply a referee packet. The previous command only shifts when the
    /// counter shows a genuinely new command.
    pub fn update(&mut self, command: RefereeCommand, counter: u32, timestamp: u64, stage: Stage, stage_time_left: i64) {
        if counter != self.command_counter || command != self.command {
            self.previous_command = self.command;
        }
        self.command = command;
        self.command_counter = counter;
        self.command_timestamp = timestamp;
        self.stage = stage;
        self.stage_time_left = stage_time_left;
    }
}

/// Match phase the team acts on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameState {
    /// Every robot must stand still.
    Halted,
    /// Robots keep clear of the ball.
    #[default]
    Stopped,
    /// Free play.
    NormalPlay,
    /// Ally takes the kickoff / free kick.
    TakingKickoff,
    /// Enemy takes the kickoff / free kick.
    WaitingForKickoff,
    /// Kickoff or penalty prepared, waiting for NORMAL_START.
    WaitingForNormalStart,
}

fn kickoff_for(color: TeamColor, ally: TeamColor) -> GameState {
    if color == ally {
        GameState::TakingKickoff
    } else {
        GameState::WaitingForKickoff
    }
}

/// Pure transition function.
///
/// `ball_displacement` is the ball's distance (mm) from the reference captured
/// on entry to the current kickoff state; it is ignored elsewhere.
pub fn update_state(
    state: GameState,
    command: RefereeCommand,
    previous_command: RefereeCommand,
    ally: TeamColor,
    ball_displacement: f64,
) -> GameState {
    use RefereeCommand as C;
    match state {
        GameState::Halted => match command {
            C::Stop => GameState::Stopped,
            _ => state,
        },
        GameState::NormalPlay => match command {
            C::Stop => GameState::Stopped,
            C::Halt => GameState::Halted,
            _ => state,
        },
        GameState::Stopped => match command {
            C::ForceStart => GameState::NormalPlay,
            C::Halt => GameState::Halted,
            C::PrepareKickoffBlue | C::PrepareKickoffYellow | C::PreparePenaltyBlue | C::PreparePenaltyYellow => {
                GameState::WaitingForNormalStart
            }
            other => match other.free_kick_color() {
                Some(color) => kickoff_for(color, ally),
                None => state,
            },
        },
        GameState::TakingKickoff | GameState::WaitingForKickoff => match command {
            C::Stop => GameState::Stopped,
            C::Halt => GameState::Halted,
            _ if ball_displacement > KICKOFF_BALL_DISPLACEMENT => GameState::NormalPlay,
            _ => state,
        },
        GameState::WaitingForNormalStart => match command {
            C::Stop => GameState::Stopped,
            C::Halt => GameState::Halted,
            C::NormalStart => match previous_command.preparation_color() {
                Some(color) => kickoff_for(color, ally),
                None => state,
            },
            _ => state,
        },
    }
}

/// Movement legality for a robot at `robot` given the ball at `ball`.
pub fn robot_may_move(command: RefereeCommand, robot: Point, ball: Point) -> bool {
    match command {
        RefereeCommand::Halt => false,
        RefereeCommand::Stop => robot.distance(ball) >= STOP_BALL_DISTANCE,
        c if c.is_goal() => false,
        _ => true,
    }
}

/// Stateful wrapper holding the current phase and the kickoff ball reference.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct RefereeStateMachine {
    state: GameState,
    ball_reference: Option<Point>,
}

impl RefereeStateMachine {
    /// Machine in the initial `Stopped` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn state(&self) -> GameState {
        self.state
    }

    /// Ball position captured on entry to the current kickoff state.
    pub fn ball_reference(&self) -> Option<Point> {
        self.ball_reference
    }

    /// Advance with the latest referee state and ball position.
    pub fn update(&mut self, referee: &Referee, ally: TeamColor, ball: Point) -> GameState {
        let displacement = self
            .ball_reference
            .map(|reference| reference.distance(ball))
            .unwrap_or(0.0);
        let next = update_state(self.state, referee.command, referee.previous_command, ally, displacement);

        if next != self.state {
            info!("Game state {:?} -> {:?} on {:?}", self.state, next, referee.command);
            self.ball_reference = match next {
                GameState::TakingKickoff | GameState::WaitingForKickoff => Some(ball),
                _ => None,
            };
            self.state = next;
        }
        self.state
    }
}
