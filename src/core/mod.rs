//! Core geometric primitives.
//!
//! Plain value types and free functions with no knowledge of the match.

pub mod point;
pub mod geometry;

// Re-export core types
pub use point::Point;
pub use geometry::{
    area_contains_circle, circles_overlap, normalize_degrees, point_in_polygon,
    point_to_line_distance, point_to_segment_distance, rotated_rectangle,
    segment_intersects_polygon, segments_intersect,
};
