//! Visibility Graph Planner
//!
//! Shortest obstacle-free route between two points. Graph nodes are the
//! source, the destination and waypoint rings placed just outside every
//! obstacle; edges join node pairs whose straight segment touches no
//! obstacle. Dijkstra runs over the resulting graph.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::geometry::{bounding_box, point_in_polygon, point_to_segment_distance, segment_intersects_polygon};
use crate::core::point::Point;
use crate::error::{CoreError, Result};
use crate::world::field::{FieldSide, FieldZone};
use crate::world::model::WorldSnapshot;
use crate::world::objects::RobotRef;

/// Danger radius (mm) around a robot at rest.
pub const MIN_DISTANCE_TO_ROBOT: f64 = 195.0;
/// Danger radius (mm) around a robot at full speed.
pub const MAX_DISTANCE_TO_ROBOT: f64 = 270.0;
/// Clearance (mm) kept from the ball when avoiding it.
pub const DISTANCE_TO_BALL: f64 = 120.0;
/// Offset (mm) of polygon waypoints beyond each corner.
pub const DISTANCE_TO_POLYGON: f64 = 120.0;
/// Waypoint ring radius (mm) around a robot at rest.
pub const MIN_VERTEX_DISTANCE_TO_ROBOT: f64 = 200.0;
/// Waypoint ring radius (mm) around a fast robot; also the escape distance.
pub const MAX_VERTEX_DISTANCE_TO_ROBOT: f64 = 450.0;

/// Speed (mm/s) at which the waypoint ring reaches its maximum radius.
const RING_SPEED_SCALE: f64 = 5000.0;
const RING_VERTICES: usize = 16;
const ESCAPE_VERTICES: usize = 8;

/// Danger radius for an object moving at `speed`, growing linearly up to `max_velocity`.
pub fn danger_radius(speed: f64, max_velocity: f64) -> f64 {
    let span = MAX_DISTANCE_TO_ROBOT - MIN_DISTANCE_TO_ROBOT;
    let grown = MIN_DISTANCE_TO_ROBOT + speed.abs() * span / max_velocity.max(1.0);
    grown.min(MAX_DISTANCE_TO_ROBOT)
}

/// Waypoint ring radius for an object moving at `speed`.
pub fn ring_radius(speed: f64) -> f64 {
    let span = MAX_VERTEX_DISTANCE_TO_ROBOT - MIN_VERTEX_DISTANCE_TO_ROBOT;
    (MIN_VERTEX_DISTANCE_TO_ROBOT + span * speed.abs() / RING_SPEED_SCALE).min(MAX_VERTEX_DISTANCE_TO_ROBOT)
}

/// Something the route must not cross.
#[derive(Clone, Debug, PartialEq)]
pub enum Obstacle {
    /// Circular danger zone around a moving object.
    Danger {
        /// Centre of the zone.
        center: Point,
        /// Clearance radius.
        radius: f64,
        /// Radius of the waypoint ring around it.
        ring: f64,
    },
    /// Static polygon.
    Polygon(Vec<Point>),
}

impl Obstacle {
    /// Danger zone for an object at `center` moving at `speed`.
    pub fn danger(center: Point, speed: f64, max_velocity: f64) -> Self {
        Obstacle::Danger {
            center,
            radius: danger_radius(speed, max_velocity),
            ring: ring_radius(speed),
        }
    }

    /// True if the point lies strictly inside.
    pub fn contains(&self, point: Point) -> bool {
        match self {
            Obstacle::Danger { center, radius, .. } => center.distance(point) < *radius,
            Obstacle::Polygon(corners) => point_in_polygon(point, corners),
        }
    }

    /// True if the segment `a`-`b` crosses the obstacle.
    pub fn blocks(&self, a: Point, b: Point) -> bool {
        match self {
            Obstacle::Danger { center, radius, .. } => point_to_segment_distance(a, b, *center) < *radius,
            Obstacle::Polygon(corners) => segment_intersects_polygon(a, b, corners),
        }
    }

    /// Candidate graph nodes around the obstacle.
    pub fn waypoints(&self) -> Vec<Point> {
        match self {
            Obstacle::Danger { center, ring, .. } => (0..RING_VERTICES)
                .map(|i| center.project(i as f64 * 360.0 / RING_VERTICES as f64, *ring))
                .collect(),
            Obstacle::Polygon(corners) => {
                let Some((min, max)) = bounding_box(corners) else {
                    return Vec::new();
                };
                let middle = min.lerp(max, 0.5);
                corners
                    .iter()
                    .map(|&corner| middle.project(middle.angle_to(corner), middle.distance(corner) + DISTANCE_TO_POLYGON))
                    .collect()
            }
        }
    }
}

/// Which optional obstacles to include.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AvoidOptions {
    /// Keep clear of the ball.
    pub ball: bool,
    /// Stay out of the east goal area.
    pub east_goal_area: bool,
    /// Stay out of the west goal area.
    pub west_goal_area: bool,
}

fn goal_area_zones(side: FieldSide) -> [FieldZone; 2] {
    match side {
        FieldSide::East => [FieldZone::EastNorthGoal, FieldZone::EastSouthGoal],
        FieldSide::West => [FieldZone::WestNorthGoal, FieldZone::WestSouthGoal],
    }
}

/// Every obstacle robot `me` must route around.
pub fn collect_obstacles(world: &WorldSnapshot, me: RobotRef, avoid: AvoidOptions, max_velocity: f64) -> Vec<Obstacle> {
    let mut obstacles: Vec<Obstacle> = world
        .robots_on_sight()
        .filter(|r| r.reference() != me)
        .map(|r| Obstacle::danger(r.position(), r.object.speed, max_velocity))
        .collect();

    for side in [FieldSide::East, FieldSide::West] {
        let goal = world.field.goal(side);
        let back = Point::new(side.sign() * goal.depth, 0.0);
        obstacles.push(Obstacle::Polygon(vec![
            goal.front_north,
            goal.front_north + back,
            goal.front_south + back,
            goal.front_south,
        ]));
    }
    if avoid.east_goal_area {
        obstacles.extend(goal_area_zones(FieldSide::East).map(|z| Obstacle::Polygon(z.vertices(&world.field))));
    }
    if avoid.west_goal_area {
        obstacles.extend(goal_area_zones(FieldSide::West).map(|z| Obstacle::Polygon(z.vertices(&world.field))));
    }

    obstacles.extend(world.obstructions.iter().map(|o| Obstacle::Polygon(o.polygon().to_vec())));

    if avoid.ball {
        obstacles.push(Obstacle::Danger {
            center: world.ball.position(),
            radius: DISTANCE_TO_BALL,
            ring: ring_radius(world.ball.object.speed),
        });
    }
    obstacles
}

#[derive(Clone, Copy, PartialEq)]
struct Frontier {
    cost: f64,
    node: usize,
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on cost
        other.cost.total_cmp(&self.cost).then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn is_free(point: Point, obstacles: &[Obstacle]) -> bool {
    !obstacles.iter().any(|o| o.contains(point))
}

fn is_clear(a: Point, b: Point, obstacles: &[Obstacle]) -> bool {
    !obstacles.iter().any(|o| o.blocks(a, b))
}

/// Shortest route from `source` to `destination`, excluding the source.
///
/// A destination inside an obstacle is moved to the nearest free waypoint.
/// A source inside an obstacle leaves through one of eight escape points.
pub fn find_route(source: Point, destination: Point, obstacles: &[Obstacle]) -> Result<Vec<Point>> {
    let waypoints: Vec<Point> = obstacles
        .iter()
        .flat_map(Obstacle::waypoints)
        .filter(|&p| is_free(p, obstacles))
        .collect();

    let destination = if is_free(destination, obstacles) {
        destination
    } else {
        waypoints
            .iter()
            .copied()
            .min_by(|a, b| a.distance(destination).total_cmp(&b.distance(destination)))
            .ok_or(CoreError::PlannerUnreachable("destination enclosed"))?
    };

    if is_clear(source, destination, obstacles) {
        return Ok(vec![destination]);
    }

    let mut nodes = vec![source, destination];
    let trapped = !is_free(source, obstacles);
    let mut escapes = Vec::new();
    if trapped {
        for i in 0..ESCAPE_VERTICES {
            let escape = source.project(i as f64 * 360.0 / ESCAPE_VERTICES as f64, MAX_VERTEX_DISTANCE_TO_ROBOT);
            if is_free(escape, obstacles) {
                escapes.push(nodes.len());
                nodes.push(escape);
            }
        }
        if escapes.is_empty() {
            return Err(CoreError::PlannerUnreachable("robot is locked in"));
        }
    }
    nodes.extend(waypoints);

    let n = nodes.len();
    let mut neighbours: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            let linked = if i == 0 && trapped {
                escapes.contains(&j)
            } else {
                is_clear(nodes[i], nodes[j], obstacles)
            };
            if linked {
                let d = nodes[i].distance(nodes[j]);
                neighbours[i].push((j, d));
                neighbours[j].push((i, d));
            }
        }
    }

    let mut dist = vec![f64::INFINITY; n];
    let mut previous: Vec<Option<usize>> = vec![None; n];
    let mut heap = BinaryHeap::new();
    dist[0] = 0.0;
    heap.push(Frontier { cost: 0.0, node: 0 });

    while let Some(Frontier { cost, node }) = heap.pop() {
        if node == 1 {
            break;
        }
        if cost > dist[node] {
            continue;
        }
        for &(next, weight) in &neighbours[node] {
            let alt = cost + weight;
            if alt < dist[next] {
                dist[next] = alt;
                previous[next] = Some(node);
                heap.push(Frontier { cost: alt, node: next });
            }
        }
    }

    if dist[1].is_infinite() {
        return Err(CoreError::PlannerUnreachable("no path to destination"));
    }

    let mut route = Vec::new();
    let mut cursor = 1;
    while cursor != 0 {
        route.push(nodes[cursor]);
        cursor = match previous[cursor] {
            Some(p) => p,
            None => break,
        };
    }
    route.reverse();
    Ok(route)
}
