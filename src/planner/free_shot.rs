//! Free Shot Planner
//!
//! Finds the widest unobstructed lane from the ball into the enemy goal.
//! Each robot inside the (ball, post, post) triangle shadows a Y-interval of
//! the goal line; the planner aims at the middle of the widest gap.

use crate::core::point::Point;
use crate::world::field::FieldZone;
use crate::world::model::WorldSnapshot;
use crate::world::objects::ROBOT_RADIUS;

/// Obstacle count at which a shot is no longer attempted.
pub const DEFAULT_MAX_OBSTACLES: usize = 5;

/// Closed interval on the goal line, (start, end) in mm.
pub type Interval = (f64, f64);

/// Free shot planner configuration.
#[derive(Clone, Debug)]
pub struct FreeShotPlanner {
    /// Give up when this many robots stand in the shooting triangle.
    pub max_obstacles: usize,
    /// Zones the ball must be in for a shot to be considered.
    pub zones: Vec<FieldZone>,
}

impl Default for FreeShotPlanner {
    fn default() -> Self {
        Self {
            max_obstacles: DEFAULT_MAX_OBSTACLES,
            zones: FieldZone::SHOOTABLE.to_vec(),
        }
    }
}

impl FreeShotPlanner {
    /// Planner with a custom obstacle limit.
    pub fn with_max_obstacles(max_obstacles: usize) -> Self {
        Self {
            max_obstacles,
            ..Self::default()
        }
    }

    /// Aim point on the enemy goal line, or `None` when there is no shot.
    pub fn plan(&self, world: &WorldSnapshot) -> Option<Point> {
        let owner = world.ball.owner?;
        if owner.color != world.ally_color {
            return None;
        }

        let ball = world.ball.position();
        let zone = FieldZone::locate(&world.field, ball)?;
        if !self.zones.contains(&zone) {
            return None;
        }

        let goal = world.enemy_goal();
        let triangle = [goal.front_south, goal.front_north, ball];
        // The shooter stands behind the ball and never blocks its own lane.
        let obstacles: Vec<Point> = world
            .robots_in_area(&triangle)
            .filter(|r| r.reference() != owner)
            .map(|r| r.position())
            .collect();

        if obstacles.len() >= self.max_obstacles {
            return None;
        }
        if obstacles.is_empty() {
            return Some(goal.center());
        }

        let range = goal.y_range();
        let shadows: Vec<Interval> = obstacles
            .iter()
            .filter_map(|&obstacle| clamp_interval(shadow_interval(ball, obstacle, goal.line_x()), range))
            .collect();

        let merged = merge_intervals(shadows);
        let free = free_intervals(&merged, range);
        widest_interval(&free).map(|(start, end)| Point::new(goal.line_x(), (start + end) / 2.0))
    }
}

/// Y-interval of the goal line at `goal_x` hidden from `ball` by a robot at `obstacle`.
pub fn shadow_interval(ball: Point, obstacle: Point, goal_x: f64) -> Interval {
    let distance = ball.distance(obstacle);
    if distance <= ROBOT_RADIUS {
        return (f64::NEG_INFINITY, f64::INFINITY);
    }
    let divert = (ROBOT_RADIUS / distance).atan().to_degrees();
    let bearing = ball.angle_to(obstacle);
    let dx = goal_x - ball.x;
    let project = |angle: f64| ball.y + angle.to_radians().tan() * dx;
    let (a, b) = (project(bearing - divert), project(bearing + divert));
    (a.min(b), a.max(b))
}

/// Clip to `range`; `None` if nothing remains.
pub fn clamp_interval(interval: Interval, range: Interval) -> Option<Interval> {
    let start = interval.0.max(range.0);
    let end = interval.1.min(range.1);
    (start <= end).then_some((start, end))
}

/// Sort by start and merge overlapping or touching intervals.
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Complement of sorted, disjoint `blocked` intervals within `range`.
/// Zero-width gaps are dropped.
pub fn free_intervals(blocked: &[Interval], range: Interval) -> Vec<Interval> {
    let mut free = Vec::new();
    let mut cursor = range.0;
    for &(start, end) in blocked {
        if start > cursor {
            free.push((cursor, start));
        }
        cursor = cursor.max(end);
    }
    if cursor < range.1 {
        free.push((cursor, range.1));
    }
    free
}

/// Widest interval; ties go to the lowest start.
pub fn widest_interval(intervals: &[Interval]) -> Option<Interval> {
    let mut best: Option<Interval> = None;
    for &candidate in intervals {
        best = match best {
            Some(current) => {
                let (cw, bw) = (candidate.1 - candidate.0, current.1 - current.0);
                if cw > bw || (cw == bw && candidate.0 < current.0) {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
            None => Some(candidate),
        };
    }
    best
}
