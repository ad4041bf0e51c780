//! Reader for the polygon test-data file format: line-oriented
//! UTF-8, blank lines and `#`-comments ignored, first non-comment line is
//! the vertex count `n`, followed by `n` lines of whitespace-separated
//! `x y` doubles in counter-clockwise order.

use crate::error::{PhysicsError, PhysicsResult};
use crate::geometry::shape::ConvexPolygon;
use crate::math::Point;

fn significant_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter_map(|line| {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            None
        } else {
            Some(trimmed)
        }
    })
}

/// Parses a polygon from the file format's text contents.
///
/// # Errors
/// Returns [`PhysicsError::InvalidArgument`] if the vertex count line is
/// missing or unparsable, a vertex line doesn't carry exactly two numbers,
/// there are fewer vertex lines than declared, or the resulting vertices
/// fail [`ConvexPolygon::new`]'s convexity check.
pub fn parse_polygon(text: &str) -> PhysicsResult<ConvexPolygon> {
    let mut lines = significant_lines(text);

    let count: usize = lines
        .next()
        .ok_or(PhysicsError::InvalidArgument("polygon file has no vertex count line"))?
        .parse()
        .map_err(|_| PhysicsError::InvalidArgument("polygon file's vertex count is not an integer"))?;

    let mut vertices = Vec::with_capacity(count);
    for _ in 0..count {
        let line = lines
            .next()
            .ok_or(PhysicsError::InvalidArgument("polygon file has fewer vertex lines than declared"))?;
        let mut parts = line.split_whitespace();
        let x: f32 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or(PhysicsError::InvalidArgument("polygon file vertex line missing x"))?;
        let y: f32 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or(PhysicsError::InvalidArgument("polygon file vertex line missing y"))?;
        if parts.next().is_some() {
            return Err(PhysicsError::InvalidArgument("polygon file vertex line has extra fields"));
        }
        vertices.push(Point::new(x, y));
    }

    ConvexPolygon::new(vertices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_square() {
        let text = "# a unit square\n4\n1.0 -1.0\n1.0 1.0\n-1.0 1.0\n-1.0 -1.0\n";
        let polygon = parse_polygon(text).unwrap();
        assert_eq!(polygon.vertices().len(), 4);
    }

    #[test]
    fn ignores_blank_lines_and_comments_between_vertices() {
        let text = "4\n\n1.0 -1.0\n# note\n1.0 1.0\n-1.0 1.0\n-1.0 -1.0\n";
        let polygon = parse_polygon(text).unwrap();
        assert_eq!(polygon.vertices().len(), 4);
    }

    #[test]
    fn rejects_truncated_vertex_list() {
        let text = "4\n1.0 -1.0\n1.0 1.0\n";
        assert!(parse_polygon(text).is_err());
    }

    #[test]
    fn rejects_non_integer_count_line() {
        let text = "four\n1.0 -1.0\n";
        assert!(parse_polygon(text).is_err());
    }
}
