//! Geometry Helpers
//!
//! Polygon, line and circle queries used by the world model and planners.

use super::point::Point;

/// Check if two circles overlap (touching counts).
#[inline]
pub fn circles_overlap(pos_a: Point, radius_a: f64, pos_b: Point, radius_b: f64) -> bool {
    let combined = radius_a + radius_b;
    (pos_a - pos_b).length_squared() <= combined * combined
}

/// Ray-casting point-in-polygon test. Vertices may be in either winding.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    let mut inside = false;
    if polygon.len() < 3 {
        return false;
    }
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (vi, vj) = (polygon[i], polygon[j]);
        if (vi.y > point.y) != (vj.y > point.y)
            && point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Perpendicular distance from `p` to the infinite line through `a` and `b`.
///
/// Falls back to the point distance when `a == b`.
pub fn point_to_line_distance(a: Point, b: Point, p: Point) -> f64 {
    let ab = b - a;
    let len = ab.length();
    if len == 0.0 {
        return p.distance(a);
    }
    ((p - a).cross(ab)).abs() / len
}

/// Distance from `p` to the closed segment `a`-`b`.
pub fn point_to_segment_distance(a: Point, b: Point, p: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab.scale(t))
}

/// True if segments `a`-`b` and `c`-`d` intersect (touching counts).
pub fn segments_intersect(a: Point, b: Point, c: Point, d: Point) -> bool {
    fn orientation(p: Point, q: Point, r: Point) -> f64 {
        (q - p).cross(r - p)
    }
    fn on_segment(p: Point, q: Point, r: Point) -> bool {
        r.x >= p.x.min(q.x) && r.x <= p.x.max(q.x) && r.y >= p.y.min(q.y) && r.y <= p.y.max(q.y)
    }

    let (d1, d2) = (orientation(c, d, a), orientation(c, d, b));
    let (d3, d4) = (orientation(a, b, c), orientation(a, b, d));
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0)) && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0)) {
        return true;
    }
    (d1 == 0.0 && on_segment(c, d, a))
        || (d2 == 0.0 && on_segment(c, d, b))
        || (d3 == 0.0 && on_segment(a, b, c))
        || (d4 == 0.0 && on_segment(a, b, d))
}

/// True if the segment `a`-`b` touches the polygon (crosses an edge or lies inside).
pub fn segment_intersects_polygon(a: Point, b: Point, polygon: &[Point]) -> bool {
    if point_in_polygon(a, polygon) || point_in_polygon(b, polygon) {
        return true;
    }
    let n = polygon.len();
    (0..n).any(|i| segments_intersect(a, b, polygon[i], polygon[(i + 1) % n]))
}

/// True if a circle at `center` with `radius` lies in or touches the polygon.
pub fn area_contains_circle(center: Point, polygon: &[Point], radius: f64) -> bool {
    if point_in_polygon(center, polygon) {
        return true;
    }
    let n = polygon.len();
    (0..n).any(|i| point_to_segment_distance(polygon[i], polygon[(i + 1) % n], center) < radius)
}

/// Wrap an angle in degrees into (-180, 180].
pub fn normalize_degrees(angle: f64) -> f64 {
    let mut wrapped = angle % 360.0;
    if wrapped > 180.0 {
        wrapped -= 360.0;
    } else if wrapped <= -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

/// Corners of a `length` x `width` rectangle centred on `center`, rotated by
/// `orientation` degrees. Length runs along the orientation axis.
pub fn rotated_rectangle(center: Point, length: f64, width: f64, orientation: f64) -> [Point; 4] {
    let (hl, hw) = (length / 2.0, width / 2.0);
    [
        Point::new(hl, hw),
        Point::new(-hl, hw),
        Point::new(-hl, -hw),
        Point::new(hl, -hw),
    ]
    .map(|corner| corner.rotate(orientation) + center)
}

/// Axis-aligned bounding box of a polygon as (min, max).
pub fn bounding_box(polygon: &[Point]) -> Option<(Point, Point)> {
    let first = *polygon.first()?;
    Some(polygon.iter().fold((first, first), |(min, max), p| {
        (
            Point::new(min.x.min(p.x), min.y.min(p.y)),
            Point::new(max.x.max(p.x), max.y.max(p.y)),
        )
    }))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ]
    }

    #[test]
    fn test_point_in_polygon() {
        let poly = square();
        assert!(point_in_polygon(Point::new(50.0, 50.0), &poly));
        assert!(!point_in_polygon(Point::new(150.0, 50.0), &poly));
        assert!(!point_in_polygon(Point::new(50.0, -1.0), &poly));
        assert!(!point_in_polygon(Point::new(50.0, 50.0), &poly[..2]));
    }

    #[test]
    fn test_point_to_line_distance() {
        let d = point_to_line_distance(Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(50.0, 5.0));
        assert_eq!(d, 5.0);
        let degenerate = point_to_line_distance(Point::ZERO, Point::ZERO, Point::new(3.0, 4.0));
        assert_eq!(degenerate, 5.0);
    }

    #[test]
    fn test_point_to_segment_distance_clamps_to_endpoints() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_eq!(point_to_segment_distance(a, b, Point::new(5.0, 3.0)), 3.0);
        assert_eq!(point_to_segment_distance(a, b, Point::new(13.0, 4.0)), 5.0);
    }

    #[test]
    fn test_area_contains_circle() {
        let poly = square();
        assert!(area_contains_circle(Point::new(50.0, 50.0), &poly, 1.0));
        // Outside, but the radius reaches the right edge
        assert!(area_contains_circle(Point::new(140.0, 50.0), &poly, 45.0));
        assert!(!area_contains_circle(Point::new(140.0, 50.0), &poly, 30.0));
        // Closing edge (0,100)-(0,0) counts too
        assert!(area_contains_circle(Point::new(-20.0, 50.0), &poly, 25.0));
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(190.0), -170.0);
        assert_eq!(normalize_degrees(-190.0), 170.0);
        assert_eq!(normalize_degrees(180.0), 180.0);
        assert_eq!(normalize_degrees(-180.0), 180.0);
        assert_eq!(normalize_degrees(720.0 + 45.0), 45.0);
    }

    #[test]
    fn test_rotated_rectangle() {
        let rect = rotated_rectangle(Point::new(100.0, 0.0), 200.0, 100.0, 90.0);
        assert!(point_in_polygon(Point::new(100.0, 90.0), &rect));
        assert!(!point_in_polygon(Point::new(180.0, 0.0), &rect));
        let (min, max) = bounding_box(&rect).unwrap();
        assert!(min.approx_eq(Point::new(50.0, -100.0), 1e-9));
        assert!(max.approx_eq(Point::new(150.0, 100.0), 1e-9));
    }

    #[test]
    fn test_segments_intersect() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 10.0);
        assert!(segments_intersect(a, b, Point::new(0.0, 10.0), Point::new(10.0, 0.0)));
        assert!(!segments_intersect(a, b, Point::new(20.0, 0.0), Point::new(30.0, 0.0)));
        // Touching at an endpoint
        assert!(segments_intersect(a, b, b, Point::new(20.0, 0.0)));
        // Collinear but disjoint
        assert!(!segments_intersect(a, b, Point::new(11.0, 11.0), Point::new(12.0, 12.0)));
    }

    #[test]
    fn test_segment_intersects_polygon() {
        let poly = square();
        assert!(segment_intersects_polygon(Point::new(-50.0, 50.0), Point::new(150.0, 50.0), &poly));
        assert!(segment_intersects_polygon(Point::new(10.0, 10.0), Point::new(20.0, 20.0), &poly));
        assert!(!segment_intersects_polygon(Point::new(-50.0, 150.0), Point::new(150.0, 150.0), &poly));
    }

    #[test]
    fn test_circles_overlap() {
        assert!(circles_overlap(Point::ZERO, 90.0, Point::new(180.0, 0.0), 90.0));
        assert!(!circles_overlap(Point::ZERO, 90.0, Point::new(181.0, 0.0), 90.0));
    }
}
