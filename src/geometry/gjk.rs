//! GJK distance and intersection test on convex shapes.
//!
//! Maintains a simplex (at most a triangle in 2D) of Minkowski-difference
//! support points; each iteration computes the closest point on the
//! simplex to the origin (dropping unused vertices — Johnson/barycentric
//! culling) and queries a new support point in the direction from that
//! closest point toward the origin. See spec.md §4.2.

use crate::geometry::shape::Convex;
use crate::math::{Isometry, Point, Real, Vector};

/// Maximum GJK iterations before the search is declared degenerate and
/// reported as "no intersection".
pub const GJK_MAX_ITERATIONS: u32 = 32;

/// Numerical tolerance below which GJK considers a support step to have
/// made "no progress".
pub const GJK_TOLERANCE: Real = 1e-5;

/// One vertex of the GJK simplex: a point on the Minkowski difference,
/// plus the world-space witness points on each shape that produced it
/// (needed later to reconstruct contact points / feed EPA).
#[derive(Copy, Clone, Debug)]
pub struct SupportPoint {
    /// The Minkowski-difference point, `witness_a - witness_b`.
    pub point: Point,
    /// The witness point on shape A.
    pub witness_a: Point,
    /// The witness point on shape B.
    pub witness_b: Point,
}

/// Outcome of a GJK query.
#[derive(Clone, Debug)]
pub enum GjkResult {
    /// The shapes are separated by `distance`, with witness points on each
    /// shape's boundary.
    Separated {
        /// The gap between the shapes.
        distance: Real,
        /// Closest point on shape A.
        closest_a: Point,
        /// Closest point on shape B.
        closest_b: Point,
    },
    /// The shapes overlap; `simplex` encloses the origin and is handed to
    /// EPA to extract a penetration depth and normal.
    Intersecting {
        /// The terminating simplex (2 or 3 vertices), suitable as EPA's
        /// starting polytope.
        simplex: Vec<SupportPoint>,
    },
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

/// Closest point to the origin on the segment `a..b`, expressed as the
/// point itself and the two simplex vertices that remain relevant
/// (dropping the other one is the "Johnson culling" for a 2-simplex).
fn closest_on_segment(a: SupportPoint, b: SupportPoint) -> (Point, Vec<SupportPoint>) {
    let ab = b.point - a.point;
    let t = (-a.point.coords).dot(&ab) / ab.norm_squared().max(Real::EPSILON);
    if t <= 0.0 {
        (a.point, vec![a])
    } else if t >= 1.0 {
        (b.point, vec![b])
    } else {
        (a.point + ab * t, vec![a, b])
    }
}

/// Reduces a (possibly degenerate) triangle simplex to whichever feature
/// (vertex, edge, or the triangle's interior) is closest to the origin,
/// returning that closest point and the surviving vertices.
fn closest_on_triangle(
    a: SupportPoint,
    b: SupportPoint,
    c: SupportPoint,
) -> (Point, Vec<SupportPoint>) {
    // Test the origin against each edge's outward half-plane; if it's
    // outside exactly one edge, the closest feature is that edge (or one
    // of its vertices, resolved by `closest_on_segment`).
    let ab = b.point - a.point;
    let bc = c.point - b.point;
    let ca = a.point - c.point;

    let area2 = crate::math::cross(ab, -ca);
    if area2.abs() <= Real::EPSILON {
        // Degenerate (near-collinear) triangle: fall back to the best edge.
        let (p_ab, s_ab) = closest_on_segment(a, b);
        let (p_bc, s_bc) = closest_on_segment(b, c);
        return if p_ab.coords.norm_squared() <= p_bc.coords.norm_squared() {
            (p_ab, s_ab)
        } else {
            (p_bc, s_bc)
        };
    }

    // Barycentric test: is the origin inside the triangle?
    let n = area2.signum();
    let side = |edge: Vector, origin_rel: Vector| crate::math::cross(edge, origin_rel) * n;

    let s_ab = side(ab, -a.point.coords);
    let s_bc = side(bc, -b.point.coords);
    let s_ca = side(ca, -c.point.coords);

    if s_ab >= 0.0 && s_bc >= 0.0 && s_ca >= 0.0 {
        // Origin is inside (or on) the triangle.
        return (Point::origin(), vec![a, b, c]);
    }

    // Otherwise the closest feature is the nearest of the three edges.
    let candidates = [closest_on_segment(a, b), closest_on_segment(b, c), closest_on_segment(c, a)];
    candidates
        .into_iter()
        .min_by(|x, y| {
            x.0.coords
                .norm_squared()
                .partial_cmp(&y.0.coords.norm_squared())
                .unwrap()
        })
        .unwrap()
}

fn reduce_simplex(simplex: &[SupportPoint]) -> (Point, Vec<SupportPoint>) {
    match simplex.len() {
        1 => (simplex[0].point, vec![simplex[0]]),
        2 => closest_on_segment(simplex[0], simplex[1]),
        3 => closest_on_triangle(simplex[0], simplex[1], simplex[2]),
        _ => unreachable!("GJK simplex never exceeds 3 vertices in 2D"),
    }
}

/// Barycentric-interpolates the witness points on A and B corresponding to
/// `closest`'s position within `simplex`.
fn witnesses_for(closest: Point, simplex: &[SupportPoint]) -> (Point, Point) {
    match simplex.len() {
        1 => (simplex[0].witness_a, simplex[0].witness_b),
        2 => {
            let a = simplex[0];
            let b = simplex[1];
            let ab = b.point - a.point;
            let len2 = ab.norm_squared();
            let t = if len2 > Real::EPSILON {
                ((closest - a.point).dot(&ab) / len2).clamp(0.0, 1.0)
            } else {
                0.0
            };
            (
                a.witness_a + (b.witness_a - a.witness_a) * t,
                a.witness_b + (b.witness_b - a.witness_b) * t,
            )
        }
        3 => {
            // Origin enclosed: any witness pair is a valid (deeply
            // overlapping) approximation; EPA is responsible for the
            // actual penetration geometry once intersection is reported.
            (simplex[0].witness_a, simplex[0].witness_b)
        }
        _ => unreachable!(),
    }
}

/// Runs GJK between `shape_a` (at `pose_a`) and `shape_b` (at `pose_b`).
pub fn gjk(
    shape_a: &dyn Convex,
    pose_a: &Isometry,
    shape_b: &dyn Convex,
    pose_b: &Isometry,
) -> GjkResult {
    let mut dir = pose_b.translation.vector - pose_a.translation.vector;
    if dir.norm_squared() <= Real::EPSILON {
        dir = Vector::x();
    }

    let mut simplex = vec![support(shape_a, pose_a, shape_b, pose_b, dir)];

    for _ in 0..GJK_MAX_ITERATIONS {
        let (closest, reduced) = reduce_simplex(&simplex);
        simplex = reduced;

        if simplex.len() == 3 {
            return GjkResult::Intersecting { simplex };
        }

        let search_dir = -closest.coords;
        if search_dir.norm_squared() <= GJK_TOLERANCE * GJK_TOLERANCE {
            // Origin lies (numerically) on the simplex: treat as touching.
            return GjkResult::Intersecting { simplex };
        }

        let new_point = support(shape_a, pose_a, shape_b, pose_b, search_dir);

        // No-progress check: the new support doesn't advance past the
        // current closest point along the search direction.
        let progress = new_point.point.coords.dot(&search_dir.normalize())
            - closest.coords.dot(&search_dir.normalize());
        if progress <= GJK_TOLERANCE {
            let (wa, wb) = witnesses_for(closest, &simplex);
            return GjkResult::Separated {
                distance: closest.coords.norm(),
                closest_a: wa,
                closest_b: wb,
            };
        }

        simplex.push(new_point);
    }

    // Budget exceeded without convergence: treat as separated with zero
    // distance, per spec.md §4.2's degenerate-input failure mode.
    let (closest, reduced) = reduce_simplex(&simplex);
    let (wa, wb) = witnesses_for(closest, &reduced);
    GjkResult::Separated {
        distance: 0.0,
        closest_a: wa,
        closest_b: wb,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::shape::{Ball, ConvexPolygon};
    use approx::assert_relative_eq;

    #[test]
    fn separated_balls_report_gap_distance() {
        let a = Ball::new(1.0).unwrap();
        let b = Ball::new(1.0).unwrap();
        let pose_a = Isometry::translation(0.0, 0.0);
        let pose_b = Isometry::translation(5.0, 0.0);
        match gjk(&a, &pose_a, &b, &pose_b) {
            GjkResult::Separated { distance, .. } => {
                assert_relative_eq!(distance, 3.0, epsilon = 1e-3);
            }
            GjkResult::Intersecting { .. } => panic!("expected separation"),
        }
    }

    #[test]
    fn overlapping_rectangles_report_intersection() {
        let a = ConvexPolygon::rectangle(1.0, 1.0).unwrap();
        let b = ConvexPolygon::rectangle(1.0, 1.0).unwrap();
        let pose_a = Isometry::translation(0.0, 0.0);
        let pose_b = Isometry::translation(0.5, 0.0);
        match gjk(&a, &pose_a, &b, &pose_b) {
            GjkResult::Intersecting { .. } => {}
            GjkResult::Separated { distance, .. } => panic!("expected overlap, got {distance}"),
        }
    }

    #[test]
    fn touching_circles_are_not_strictly_separated_by_more_than_epsilon() {
        let a = Ball::new(1.0).unwrap();
        let b = Ball::new(1.0).unwrap();
        let pose_a = Isometry::translation(0.0, 0.0);
        let pose_b = Isometry::translation(1.99, 0.0);
        match gjk(&a, &pose_a, &b, &pose_b) {
            GjkResult::Separated { distance, .. } => assert!(distance < 0.02),
            GjkResult::Intersecting { .. } => {}
        }
    }
}
