//! Field Geometry
//!
//! Field dimensions, goals and the named zones the planners reason about.
//! The origin is the centre spot; east is +X, north is +Y.

use serde::{Deserialize, Serialize};

use crate::core::geometry::point_in_polygon;
use crate::core::point::Point;

/// Half of the field, named by compass direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldSide {
    /// Positive X half.
    East,
    /// Negative X half.
    West,
}

impl FieldSide {
    /// The other half.
    pub fn opposite(self) -> Self {
        match self {
            FieldSide::East => FieldSide::West,
            FieldSide::West => FieldSide::East,
        }
    }

    /// +1 for east, -1 for west.
    pub fn sign(self) -> f64 {
        match self {
            FieldSide::East => 1.0,
            FieldSide::West => -1.0,
        }
    }
}

/// Playing field dimensions (mm).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Touch line length (along X).
    pub length: f64,
    /// Goal line length (along Y).
    pub width: f64,
    /// Inner width of each goal mouth.
    pub goal_width: f64,
    /// Inner depth of each goal.
    pub goal_depth: f64,
}

impl Default for Field {
    fn default() -> Self {
        Self {
            length: 9000.0,
            width: 6000.0,
            goal_width: 1000.0,
            goal_depth: 180.0,
        }
    }
}

impl Field {
    /// Goal on the given side.
    pub fn goal(&self, side: FieldSide) -> Goal {
        let x = side.sign() * self.length / 2.0;
        Goal {
            side,
            front_north: Point::new(x, self.goal_width / 2.0),
            front_south: Point::new(x, -self.goal_width / 2.0),
            depth: self.goal_depth,
        }
    }

    /// True if the point lies on the field (lines included).
    pub fn contains(&self, point: Point) -> bool {
        point.x.abs() <= self.length / 2.0 && point.y.abs() <= self.width / 2.0
    }
}

/// A goal mouth.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Side of the field the goal stands on.
    pub side: FieldSide,
    /// North post, on the goal line.
    pub front_north: Point,
    /// South post, on the goal line.
    pub front_south: Point,
    /// Inner depth.
    pub depth: f64,
}

impl Goal {
    /// X coordinate of the goal line.
    pub fn line_x(&self) -> f64 {
        self.front_north.x
    }

    /// Midpoint of the goal line.
    pub fn center(&self) -> Point {
        self.front_north.lerp(self.front_south, 0.5)
    }

    /// (south, north) Y range of the mouth.
    pub fn y_range(&self) -> (f64, f64) {
        (self.front_south.y, self.front_north.y)
    }
}

// =============================================================================
// FIELD ZONES
// =============================================================================

/// Corner points of the north-east quadrant; other quadrants mirror them.
///
/// X is in ninths of the half length and Y in quarters of the half width,
/// so zones follow whatever field the vision system reports.
struct Palette {
    a: Point,
    b: Point,
    c: Point,
    d: Point,
    e: Point,
    f: Point,
    g: Point,
    h: Point,
    i: Point,
    j: Point,
}

impl Palette {
    fn for_field(field: &Field) -> Self {
        let hx = field.length / 2.0;
        let hy = field.width / 2.0;
        let at = |ninths: f64, quarters: f64| Point::new(hx * ninths / 9.0, hy * quarters / 4.0);
        Self {
            a: at(9.0, 4.0),
            b: at(5.0, 4.0),
            c: at(0.0, 4.0),
            d: at(9.0, 2.0),
            e: at(8.0, 2.0),
            f: at(7.0, 1.0),
            g: at(5.0, 1.0),
            h: at(0.0, 1.0),
            i: at(9.0, 0.0),
            j: at(7.0, 0.0),
        }
    }
}

/// Named region of the field.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldZone {
    WestNorthCorner,
    WestNorthSecondPost,
    WestNorthFront,
    WestNorthGoal,
    WestCenter,
    WestMiddle,
    WestSouthCorner,
    WestSouthSecondPost,
    WestSouthFront,
    WestSouthGoal,
    EastNorthCorner,
    EastNorthSecondPost,
    EastNorthFront,
    EastNorthGoal,
    EastCenter,
    EastMiddle,
    EastSouthCorner,
    EastSouthSecondPost,
    EastSouthFront,
    EastSouthGoal,
}

impl FieldZone {
    /// Every zone, in lookup order.
    pub const ALL: [FieldZone; 20] = [
        FieldZone::WestNorthCorner,
        FieldZone::WestNorthSecondPost,
        FieldZone::WestNorthFront,
        FieldZone::WestNorthGoal,
        FieldZone::WestCenter,
        FieldZone::WestMiddle,
        FieldZone::WestSouthCorner,
        FieldZone::WestSouthSecondPost,
        FieldZone::WestSouthFront,
        FieldZone::WestSouthGoal,
        FieldZone::EastNorthCorner,
        FieldZone::EastNorthSecondPost,
        FieldZone::EastNorthFront,
        FieldZone::EastNorthGoal,
        FieldZone::EastCenter,
        FieldZone::EastMiddle,
        FieldZone::EastSouthCorner,
        FieldZone::EastSouthSecondPost,
        FieldZone::EastSouthFront,
        FieldZone::EastSouthGoal,
    ];

    /// Zones a free shot may be taken from: everything except corners and goal areas.
    pub const SHOOTABLE: [FieldZone; 12] = [
        FieldZone::EastNorthFront,
        FieldZone::EastCenter,
        FieldZone::EastSouthFront,
        FieldZone::EastMiddle,
        FieldZone::EastNorthSecondPost,
        FieldZone::EastSouthSecondPost,
        FieldZone::WestNorthFront,
        FieldZone::WestCenter,
        FieldZone::WestSouthFront,
        FieldZone::WestMiddle,
        FieldZone::WestNorthSecondPost,
        FieldZone::WestSouthSecondPost,
    ];

    /// Half of the field the zone belongs to.
    pub fn side(self) -> FieldSide {
        use FieldZone::*;
        match self {
            WestNorthCorner | WestNorthSecondPost | WestNorthFront | WestNorthGoal | WestCenter
            | WestMiddle | WestSouthCorner | WestSouthSecondPost | WestSouthFront
            | WestSouthGoal => FieldSide::West,
            _ => FieldSide::East,
        }
    }

    /// Polygon vertices on `field`.
    pub fn vertices(self, field: &Field) -> Vec<Point> {
        use FieldZone::*;
        // Zones are described in the east half and mirrored across X for the west.
        let (east_twin, mirror_x) = match self {
            WestNorthCorner => (EastNorthCorner, true),
            WestNorthSecondPost => (EastNorthSecondPost, true),
            WestNorthFront => (EastNorthFront, true),
            WestNorthGoal => (EastNorthGoal, true),
            WestCenter => (EastCenter, true),
            WestMiddle => (EastMiddle, true),
            WestSouthCorner => (EastSouthCorner, true),
            WestSouthSecondPost => (EastSouthSecondPost, true),
            WestSouthFront => (EastSouthFront, true),
            WestSouthGoal => (EastSouthGoal, true),
            other => (other, false),
        };
        let p = Palette::for_field(field);
        let south = |q: Point| Point::new(q.x, -q.y);
        let east: Vec<Point> = match east_twin {
            EastNorthCorner => vec![p.a, p.b, p.e, p.d],
            EastNorthSecondPost => vec![p.e, p.b, p.g, p.f],
            EastNorthFront => vec![p.b, p.c, p.h, p.g],
            EastNorthGoal => vec![p.d, p.e, p.f, p.j, p.i],
            EastCenter => vec![p.f, p.g, south(p.g), south(p.f)],
            EastMiddle => vec![p.g, p.h, south(p.h), south(p.g)],
            EastSouthCorner => [p.a, p.b, p.e, p.d].map(south).to_vec(),
            EastSouthSecondPost => [p.b, p.g, p.f, p.e].map(south).to_vec(),
            EastSouthFront => [p.b, p.c, p.h, p.g].map(south).to_vec(),
            EastSouthGoal => [p.i, p.j, p.f, p.e, p.d].map(south).to_vec(),
            _ => Vec::new(),
        };
        if mirror_x {
            east.into_iter().map(|v| Point::new(-v.x, v.y)).collect()
        } else {
            east
        }
    }

    /// True if the point lies inside the zone on `field`.
    pub fn contains(self, field: &Field, point: Point) -> bool {
        point_in_polygon(point, &self.vertices(field))
    }

    /// First zone on `field` containing the point, if any.
    pub fn locate(field: &Field, point: Point) -> Option<FieldZone> {
        Self::ALL.into_iter().find(|zone| zone.contains(field, point))
    }

    /// Centre of the zone's bounding box on `field`.
    pub fn center(self, field: &Field) -> Point {
        match crate::core::geometry::bounding_box(&self.vertices(field)) {
            Some((min, max)) => min.lerp(max, 0.5),
            None => Point::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_geometry() {
        let field = Field::default();
        let east = field.goal(FieldSide::East);
        assert_eq!(east.line_x(), 4500.0);
        assert_eq!(east.y_range(), (-500.0, 500.0));
        assert_eq!(east.center(), Point::new(4500.0, 0.0));

        let west = field.goal(FieldSide::West);
        assert_eq!(west.line_x(), -4500.0);
        assert_eq!(FieldSide::West.opposite(), FieldSide::East);
    }

    #[test]
    fn test_locate_zones() {
        let field = Field::default();
        let locate = |x: f64, y: f64| FieldZone::locate(&field, Point::new(x, y));
        assert_eq!(locate(1000.0, 0.0), Some(FieldZone::EastMiddle));
        assert_eq!(locate(-1000.0, 0.0), Some(FieldZone::WestMiddle));
        assert_eq!(locate(3000.0, 100.0), Some(FieldZone::EastCenter));
        assert_eq!(locate(4300.0, 2500.0), Some(FieldZone::EastNorthCorner));
        assert_eq!(locate(-4300.0, -2500.0), Some(FieldZone::WestSouthCorner));
        assert_eq!(locate(1000.0, -2000.0), Some(FieldZone::EastSouthFront));
        assert_eq!(locate(4200.0, 300.0), Some(FieldZone::EastNorthGoal));
        assert_eq!(locate(9000.0, 0.0), None);
    }

    #[test]
    fn test_default_field_palette() {
        let field = Field::default();
        assert_eq!(
            FieldZone::EastNorthCorner.vertices(&field),
            vec![
                Point::new(4500.0, 3000.0),
                Point::new(2500.0, 3000.0),
                Point::new(4000.0, 1500.0),
                Point::new(4500.0, 1500.0),
            ]
        );
    }

    #[test]
    fn test_zones_follow_field_size() {
        let field = Field {
            length: 12000.0,
            width: 9000.0,
            ..Field::default()
        };
        let locate = |x: f64, y: f64| FieldZone::locate(&field, Point::new(x, y));
        assert_eq!(locate(4000.0, 100.0), Some(FieldZone::EastCenter));
        assert_eq!(locate(-5800.0, 4000.0), Some(FieldZone::WestNorthCorner));
        assert_eq!(locate(5800.0, 300.0), Some(FieldZone::EastNorthGoal));
        assert_eq!(locate(2000.0, -3000.0), Some(FieldZone::EastSouthFront));
        assert_eq!(locate(6100.0, 0.0), None);
    }

    #[test]
    fn test_shootable_excludes_corners_and_goals() {
        for zone in FieldZone::SHOOTABLE {
            assert!(!format!("{:?}", zone).ends_with("Corner"));
            assert!(!format!("{:?}", zone).ends_with("Goal"));
        }
    }

    #[test]
    fn test_zone_side_and_center() {
        assert_eq!(FieldZone::WestCenter.side(), FieldSide::West);
        assert_eq!(FieldZone::EastSouthGoal.side(), FieldSide::East);
        assert_eq!(FieldZone::EastMiddle.center(&Field::default()), Point::new(1250.0, 0.0));
    }
}
