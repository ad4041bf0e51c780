//! Expanding Polytope Algorithm: given a GJK simplex that encloses the
//! origin, recovers a penetration depth, world-space normal, and witness
//! points on each shape. See spec.md §4.2.

use crate::geometry::gjk::SupportPoint;
use crate::geometry::shape::Convex;
use crate::math::{Isometry, Point, Real, Vector};

/// Maximum EPA expansion iterations before the best edge found so far is
/// returned as an approximation.
pub const EPA_MAX_ITERATIONS: u32 = 32;

/// Tolerance on how close a newly found support point must be to the
/// current closest edge before EPA is considered converged.
pub const EPA_TOLERANCE: Real = 1e-4;

/// The result of an EPA query: how deeply the shapes overlap, along which
/// axis, and the witness points responsible.
#[derive(Copy, Clone, Debug)]
pub struct Penetration {
    /// Penetration depth (positive).
    pub depth: Real,
    /// World-space unit normal, pointing from shape A toward shape B.
    pub normal: Vector,
    /// Witness point on shape A.
    pub point_a: Point,
    /// Witness point on shape B.
    pub point_b: Point,
}

struct Edge {
    /// Index of the edge's first vertex within the polytope.
    index: usize,
    distance: Real,
    normal: Vector,
}

fn closest_edge(polytope: &[SupportPoint]) -> Edge {
    let n = polytope.len();
    let mut best = Edge {
        index: 0,
        distance: Real::MAX,
        normal: Vector::zeros(),
    };
    for i in 0..n {
        let a = polytope[i].point;
        let b = polytope[(i + 1) % n].point;
        let edge = b - a;
        let mut normal = crate::math::perp(edge).normalize();
        // Ensure the normal points away from the origin (outward).
        if normal.dot(&a.coords) < 0.0 {
            normal = -normal;
        }
        let distance = normal.dot(&a.coords);
        if distance < best.distance {
            best = Edge { index: i, distance, normal };
        }
    }
    best
}

fn support(
    shape_a: &dyn Convex,
    pose_a: &Isometry,
    shape_b: &dyn Convex,
    pose_b: &Isometry,
    dir: Vector,
) -> SupportPoint {
    let dir_a = pose_a.inverse_transform_vector(&dir);
    let dir_b = pose_b.inverse_transform_vector(&-dir);
    let witness_a = pose_a * shape_a.support(dir_a);
    let witness_b = pose_b * shape_b.support(dir_b);
    SupportPoint {
        point: witness_a - witness_b.coords,
        witness_a,
        witness_b,
    }
}

/// Expands `simplex` (a GJK termination simplex known to enclose the
/// origin) into a penetration depth and normal.
///
/// Degenerate input (a simplex with fewer than 2 distinct vertices, or one
/// that never separates from the origin within the iteration budget) is
/// reported as a zero-depth, arbitrary-normal penetration rather than an
/// error: spec.md §4.2 treats narrow-phase non-convergence as a recoverable
/// local condition, not a world-facing failure.
pub fn epa(
    shape_a: &dyn Convex,
    pose_a: &Isometry,
    shape_b: &dyn Convex,
    pose_b: &Isometry,
    simplex: &[SupportPoint],
) -> Penetration {
    let mut polytope: Vec<SupportPoint> = simplex.to_vec();

    // A 1- or 2-vertex simplex can't bound a 2D polytope; synthesize a
    // third vertex by probing along the perpendicular of the existing edge
    // (or an arbitrary axis for a single point) so EPA always starts from
    // a non-degenerate triangle.
    while polytope.len() < 3 {
        let probe_dir = if polytope.len() == 2 {
            crate::math::perp(polytope[1].point - polytope[0].point)
        } else {
            Vector::x()
        };
        polytope.push(support(shape_a, pose_a, shape_b, pose_b, probe_dir));
    }

    for _ in 0..EPA_MAX_ITERATIONS {
        let edge = closest_edge(&polytope);
        let candidate = support(shape_a, pose_a, shape_b, pose_b, edge.normal);
        let candidate_distance = edge.normal.dot(&candidate.point.coords);

        if candidate_distance - edge.distance < EPA_TOLERANCE {
            let (point_a, point_b) = witnesses_on_edge(&polytope, edge.index, edge.normal);
            return Penetration {
                depth: edge.distance.max(0.0),
                normal: edge.normal,
                point_a,
                point_b,
            };
        }

        polytope.insert(edge.index + 1, candidate);
    }

    let edge = closest_edge(&polytope);
    let (point_a, point_b) = witnesses_on_edge(&polytope, edge.index, edge.normal);
    Penetration {
        depth: edge.distance.max(0.0),
        normal: edge.normal,
        point_a,
        point_b,
    }
}

/// Projects the origin onto the polytope edge `index -> index+1` and
/// barycentric-interpolates each shape's witness points to that parameter.
fn witnesses_on_edge(polytope: &[SupportPoint], index: usize, _normal: Vector) -> (Point, Point) {
    let a = polytope[index];
    let b = polytope[(index + 1) % polytope.len()];
    let ab = b.point - a.point;
    let len2 = ab.norm_squared();
    let t = if len2 > Real::EPSILON {
        ((-a.point.coords).dot(&ab) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (
        a.witness_a + (b.witness_a - a.witness_a) * t,
        a.witness_b + (b.witness_b - a.witness_b) * t,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::gjk::{gjk, GjkResult};
    use crate::geometry::shape::{Ball, ConvexPolygon};
    use approx::assert_relative_eq;

    #[test]
    fn overlapping_balls_report_expected_depth() {
        let a = Ball::new(1.0).unwrap();
        let b = Ball::new(1.0).unwrap();
        let pose_a = Isometry::translation(0.0, 0.0);
        let pose_b = Isometry::translation(1.5, 0.0);

        let simplex = match gjk(&a, &pose_a, &b, &pose_b) {
            GjkResult::Intersecting { simplex } => simplex,
            GjkResult::Separated { .. } => panic!("expected overlap"),
        };
        let pen = epa(&a, &pose_a, &b, &pose_b, &simplex);
        assert_relative_eq!(pen.depth, 0.5, epsilon = 0.05);
        assert_relative_eq!(pen.normal.x.abs(), 1.0, epsilon = 0.05);
    }

    #[test]
    fn overlapping_rectangles_report_positive_depth() {
        let a = ConvexPolygon::rectangle(1.0, 1.0).unwrap();
        let b = ConvexPolygon::rectangle(1.0, 1.0).unwrap();
        let pose_a = Isometry::translation(0.0, 0.0);
        let pose_b = Isometry::translation(1.0, 0.0);

        let simplex = match gjk(&a, &pose_a, &b, &pose_b) {
            GjkResult::Intersecting { simplex } => simplex,
            GjkResult::Separated { .. } => panic!("expected overlap"),
        };
        let pen = epa(&a, &pose_a, &b, &pose_b, &simplex);
        assert!(pen.depth > 0.0 && pen.depth <= 2.0);
    }
}
