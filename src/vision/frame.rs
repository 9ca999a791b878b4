//! Frame Accumulation
//!
//! Camera messages arrive faster and more fragmented than the control
//! clock. Each detection is folded into an accumulated frame; robots that
//! stop being refreshed are pruned as ghosts before a frame is emitted.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::messages::{DetectionFrame, DetectionRobot, RefereePacket};
use crate::world::TeamColor;

/// A robot not refreshed for more than this many updates is a ghost.
pub const GHOST_TICKS: u64 = 200;

/// Which team colours are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracking {
    /// Keep blue robots.
    pub blue: bool,
    /// Keep yellow robots.
    pub yellow: bool,
}

impl Tracking {
    /// Track both colours.
    pub const BOTH: Self = Self { blue: true, yellow: true };

    /// Whether a colour is kept.
    pub fn tracks(&self, color: TeamColor) -> bool {
        match color {
            TeamColor::Blue => self.blue,
            TeamColor::Yellow => self.yellow,
        }
    }
}

impl Default for Tracking {
    fn default() -> Self {
        Self::BOTH
    }
}

/// Accumulated detection state plus per-robot freshness.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Accumulator {
    /// Merged detection frame.
    pub frame: DetectionFrame,
    /// Update count at which each blue robot was last seen.
    pub blue_seen: BTreeMap<u32, u64>,
    /// Update count at which each yellow robot was last seen.
    pub yellow_seen: BTreeMap<u32, u64>,
    /// Set once the first detection has been merged.
    pub initialised: bool,
}

impl Accumulator {
    /// Update count at which a robot was last seen.
    pub fn last_seen(&self, color: TeamColor, id: u32) -> Option<u64> {
        match color {
            TeamColor::Blue => self.blue_seen.get(&id).copied(),
            TeamColor::Yellow => self.yellow_seen.get(&id).copied(),
        }
    }
}

fn merge_robots(
    existing: &[DetectionRobot],
    incoming: &[DetectionRobot],
    seen: &mut BTreeMap<u32, u64>,
    tick: u64,
) -> Vec<DetectionRobot> {
    let mut robots = existing.to_vec();
    for robot in incoming {
        if let Some(index) = robots.iter().position(|r| r.robot_id == robot.robot_id) {
            robots.remove(index);
        }
        robots.push(*robot);
        seen.insert(robot.robot_id, tick);
    }
    robots
}

/// Fold `incoming` into `old`, returning the new accumulator.
///
/// A non-empty ball list replaces the old one. Each incoming robot replaces
/// the robot with the same id and moves to the end of its list. Frame
/// number and timestamps are taken from `incoming`. Robots of untracked
/// colours are never added.
pub fn merge(old: &Accumulator, incoming: &DetectionFrame, tick: u64, tracking: Tracking) -> Accumulator {
    let mut next = if old.initialised {
        old.clone()
    } else {
        Accumulator {
            initialised: true,
            ..Accumulator::default()
        }
    };

    if !old.initialised {
        next.frame.camera_id = incoming.camera_id;
    }
    if !incoming.balls.is_empty() || !old.initialised {
        next.frame.balls = incoming.balls.clone();
    }
    if tracking.blue {
        next.frame.robots_blue =
            merge_robots(&next.frame.robots_blue, &incoming.robots_blue, &mut next.blue_seen, tick);
    }
    if tracking.yellow {
        next.frame.robots_yellow = merge_robots(
            &next.frame.robots_yellow,
            &incoming.robots_yellow,
            &mut next.yellow_seen,
            tick,
        );
    }
    next.frame.frame_number = incoming.frame_number;
    next.frame.t_capture = incoming.t_capture;
    next.frame.t_sent = incoming.t_sent;
    next
}

fn is_fresh(seen: &BTreeMap<u32, u64>, id: u32, tick: u64) -> bool {
    seen.get(&id).map_or(true, |&last| last + GHOST_TICKS >= tick)
}

/// Drop every robot last seen more than [`GHOST_TICKS`] updates before `tick`.
///
/// Returns the pruned accumulator and the number of robots removed.
pub fn remove_ghosts(acc: &Accumulator, tick: u64) -> (Accumulator, usize) {
    let mut next = acc.clone();
    next.frame.robots_blue = acc
        .frame
        .robots_blue
        .iter()
        .filter(|r| is_fresh(&acc.blue_seen, r.robot_id, tick))
        .copied()
        .collect();
    next.frame.robots_yellow = acc
        .frame
        .robots_yellow
        .iter()
        .filter(|r| is_fresh(&acc.yellow_seen, r.robot_id, tick))
        .copied()
        .collect();
    let removed = acc.frame.robots_blue.len() + acc.frame.robots_yellow.len()
        - next.frame.robots_blue.len()
        - next.frame.robots_yellow.len();
    (next, removed)
}

/// One replay tick. Never mutated once emitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogFrame {
    /// Position in the replay sequence.
    pub index: usize,
    /// Timestamp (ns) of the message that closed the window.
    pub timestamp_ns: i64,
    /// Milliseconds since the first message of the log.
    pub elapsed_ms: i64,
    /// Merged detection state.
    pub detection: DetectionFrame,
    /// Latest referee packet, if one has been seen.
    pub referee: Option<RefereePacket>,
}

impl LogFrame {
    /// Serialize to binary.
    pub fn to_bytes(&self) -> crate::error::Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> crate::error::Result<Self> {
        Ok(bincode::deserialize(data)?)
    }
}

/// Shared handle to an emitted frame.
pub type SharedFrame = Arc<LogFrame>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::messages::DetectionBall;

    fn robot(id: u32, x: f32) -> DetectionRobot {
        DetectionRobot {
            confidence: 1.0,
            robot_id: id,
            x,
            y: 0.0,
            orientation: None,
        }
    }

    fn frame(blue: Vec<DetectionRobot>, yellow: Vec<DetectionRobot>) -> DetectionFrame {
        DetectionFrame {
            robots_blue: blue,
            robots_yellow: yellow,
            ..DetectionFrame::default()
        }
    }

    #[test]
    fn test_first_merge_drops_untracked_colour() {
        let tracking = Tracking { blue: true, yellow: false };
        let acc = merge(
            &Accumulator::default(),
            &frame(vec![robot(1, 0.0)], vec![robot(2, 0.0)]),
            0,
            tracking,
        );
        assert!(acc.initialised);
        assert_eq!(acc.frame.robots_blue.len(), 1);
        assert!(acc.frame.robots_yellow.is_empty());
        assert_eq!(acc.last_seen(TeamColor::Blue, 1), Some(0));
        assert_eq!(acc.last_seen(TeamColor::Yellow, 2), None);
    }

    #[test]
    fn test_merge_replaces_then_appends() {
        let acc = merge(
            &Accumulator::default(),
            &frame(vec![robot(1, 0.0), robot(2, 0.0)], vec![]),
            0,
            Tracking::BOTH,
        );
        let acc = merge(&acc, &frame(vec![robot(1, 50.0)], vec![]), 1, Tracking::BOTH);

        let ids: Vec<u32> = acc.frame.robots_blue.iter().map(|r| r.robot_id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(acc.frame.robots_blue[1].x, 50.0);
        assert_eq!(acc.last_seen(TeamColor::Blue, 1), Some(1));
        assert_eq!(acc.last_seen(TeamColor::Blue, 2), Some(0));
    }

    #[test]
    fn test_empty_ball_list_keeps_previous_balls() {
        let mut first = frame(vec![], vec![]);
        first.balls = vec![DetectionBall { confidence: 1.0, x: 10.0, y: 20.0, z: None }];
        let acc = merge(&Accumulator::default(), &first, 0, Tracking::BOTH);

        let mut second = frame(vec![], vec![]);
        second.frame_number = 9;
        let acc = merge(&acc, &second, 1, Tracking::BOTH);
        assert_eq!(acc.frame.balls.len(), 1);
        assert_eq!(acc.frame.frame_number, 9);
    }

    #[test]
    fn test_merge_leaves_old_untouched() {
        let old = merge(&Accumulator::default(), &frame(vec![robot(1, 0.0)], vec![]), 0, Tracking::BOTH);
        let snapshot = old.clone();
        let _ = merge(&old, &frame(vec![robot(1, 99.0)], vec![]), 1, Tracking::BOTH);
        assert_eq!(old, snapshot);
    }

    #[test]
    fn test_remove_ghosts_threshold() {
        let acc = merge(
            &Accumulator::default(),
            &frame(vec![robot(1, 0.0)], vec![robot(3, 0.0)]),
            0,
            Tracking::BOTH,
        );
        let acc = merge(&acc, &frame(vec![], vec![robot(3, 10.0)]), 150, Tracking::BOTH);

        let (kept, removed) = remove_ghosts(&acc, GHOST_TICKS);
        assert_eq!(removed, 0);
        assert_eq!(kept.frame.robots_blue.len(), 1);

        let (pruned, removed) = remove_ghosts(&acc, GHOST_TICKS + 1);
        assert_eq!(removed, 1);
        assert!(pruned.frame.robots_blue.is_empty());
        assert_eq!(pruned.frame.robots_yellow.len(), 1);
    }
}
