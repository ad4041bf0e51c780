//! Builds a [`ContactManifold`] from two posed convex shapes: GJK/EPA for
//! separation or penetration, then Sutherland–Hodgman clipping of the
//! incident face against the reference face when both shapes expose more
//! than one vertex, per spec.md §4.2's manifold-construction step.

use crate::geometry::contact_manifold::{ContactManifold, ContactPoint, FeatureId};
use crate::geometry::epa::epa;
use crate::geometry::gjk::{gjk, GjkResult};
use crate::geometry::shape::{Convex, Shape};
use crate::math::{Isometry, Point, Real, Vector};

/// Generates the contact manifold between `shape_a` and `shape_b` at their
/// given poses. Shapes farther apart than `prediction_margin` produce an
/// empty manifold (the "speculative contact" margin of spec.md §4.2, which
/// lets the solver start resolving a contact slightly before the shapes
/// actually touch).
pub fn generate_manifold(
    shape_a: &Shape,
    pose_a: &Isometry,
    shape_b: &Shape,
    pose_b: &Isometry,
    prediction_margin: Real,
) -> ContactManifold {
    let convex_a = shape_a.as_convex();
    let convex_b = shape_b.as_convex();

    match gjk(convex_a, pose_a, convex_b, pose_b) {
        GjkResult::Separated {
            distance,
            closest_a,
            closest_b,
        } => {
            if distance > prediction_margin {
                return ContactManifold::empty();
            }
            let normal = if distance > Real::EPSILON {
                (closest_b - closest_a) / distance
            } else {
                Vector::x()
            };
            single_point_manifold(normal, closest_a, closest_b, -distance)
        }
        GjkResult::Intersecting { simplex } => {
            let pen = epa(convex_a, pose_a, convex_b, pose_b, &simplex);
            clip_or_single_point(shape_a, pose_a, shape_b, pose_b, pen.normal, pen.depth, pen.point_a, pen.point_b)
        }
    }
}

fn single_point_manifold(normal: Vector, point_a: Point, point_b: Point, separation: Real) -> ContactManifold {
    ContactManifold {
        normal,
        points: vec![ContactPoint {
            point_a,
            point_b,
            separation,
            feature_a: FeatureId::Distance,
            feature_b: FeatureId::Distance,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
            enabled: true,
        }],
    }
}

fn clip_or_single_point(
    shape_a: &Shape,
    pose_a: &Isometry,
    shape_b: &Shape,
    pose_b: &Isometry,
    normal: Vector,
    depth: Real,
    point_a: Point,
    point_b: Point,
) -> ContactManifold {
    match (polygon_vertices(shape_a, pose_a), polygon_vertices(shape_b, pose_b)) {
        (Some(verts_a), Some(verts_b)) => clip_polygons(&verts_a, &verts_b, normal, depth),
        _ => single_point_manifold(normal, point_a, point_b, -depth),
    }
}

/// World-space vertices for shapes with a stable polygonal face structure
/// (polygons and segments); `None` for shapes like `Ball` that have no
/// edges to clip against.
fn polygon_vertices(shape: &Shape, pose: &Isometry) -> Option<Vec<Point>> {
    match shape {
        Shape::Polygon(p) => Some(p.vertices().iter().map(|&v| pose * v).collect()),
        Shape::Segment(s) => Some(vec![pose * s.a, pose * s.b]),
        Shape::Ball(_) | Shape::Capsule(_) => None,
    }
}

fn edge_normal(verts: &[Point], i: usize) -> Vector {
    let n = verts.len();
    let edge = verts[(i + 1) % n] - verts[i];
    crate::math::perp(edge).normalize() * -1.0
}

fn best_face(verts: &[Point], direction: Vector) -> usize {
    let n = verts.len();
    (0..n)
        .max_by(|&i, &j| {
            edge_normal(verts, i)
                .dot(&direction)
                .partial_cmp(&edge_normal(verts, j).dot(&direction))
                .unwrap()
        })
        .unwrap_or(0)
}

/// Clips the incident polygon's edge against the reference polygon's side
/// planes (Sutherland–Hodgman), producing up to two contact points.
fn clip_polygons(verts_a: &[Point], verts_b: &[Point], normal: Vector, depth: Real) -> ContactManifold {
    // The reference face is whichever polygon's edge normal best aligns
    // with the separating axis; the other polygon contributes the
    // incident edge that gets clipped.
    let face_a = best_face(verts_a, normal);
    let face_b = best_face(verts_b, -normal);

    let (ref_verts, ref_face, inc_verts, inc_face, flip) =
        if edge_normal(verts_a, face_a).dot(&normal) >= edge_normal(verts_b, face_b).dot(&-normal) {
            (verts_a, face_a, verts_b, face_b, false)
        } else {
            (verts_b, face_b, verts_a, face_a, true)
        };

    let ref_normal = edge_normal(ref_verts, ref_face);
    let n = ref_verts.len();
    let ref_v1 = ref_verts[ref_face];
    let ref_v2 = ref_verts[(ref_face + 1) % n];

    let m = inc_verts.len();
    let mut incident = [inc_verts[inc_face], inc_verts[(inc_face + 1) % m]];

    // Clip against the two side planes (perpendicular to the reference
    // edge, through each endpoint).
    let side = crate::math::perp(ref_normal);
    if clip_segment(&mut incident, side, -side.dot(&ref_v1.coords)).is_none() {
        return ContactManifold::empty();
    }
    if clip_segment(&mut incident, -side, side.dot(&ref_v2.coords)).is_none() {
        return ContactManifold::empty();
    }

    let mut points = Vec::new();
    for p in incident {
        let separation = ref_normal.dot(&(p - ref_v1));
        if separation <= 0.0 {
            let (point_a, point_b) = if flip { (p, p - ref_normal * separation) } else { (p - ref_normal * separation, p) };
            points.push(ContactPoint {
                point_a,
                point_b,
                separation,
                feature_a: FeatureId::Edge(ref_face as u32),
                feature_b: FeatureId::Edge(inc_face as u32),
                normal_impulse: 0.0,
                tangent_impulse: 0.0,
                enabled: true,
            });
        }
    }

    if points.is_empty() {
        // Clipping found no overlapping points (can happen near a vertex);
        // fall back to the single EPA witness pair so the solver still
        // sees a contact rather than silently dropping one.
        let fallback_a = ref_v1;
        let fallback_b = ref_v1 - ref_normal * (-depth);
        return single_point_manifold(normal, fallback_a, fallback_b, -depth);
    }

    ContactManifold {
        normal: if flip { -ref_normal } else { ref_normal },
        points,
    }
}

/// Clips the 2-point `segment` against the half-plane `{p : normal.dot(p) + offset <= 0}`,
/// returning `None` if the whole segment is clipped away.
fn clip_segment(segment: &mut [Point; 2], normal: Vector, offset: Real) -> Option<()> {
    let d0 = normal.dot(&segment[0].coords) + offset;
    let d1 = normal.dot(&segment[1].coords) + offset;

    if d0 <= 0.0 && d1 <= 0.0 {
        return Some(());
    }
    if d0 > 0.0 && d1 > 0.0 {
        return None;
    }

    let t = d0 / (d0 - d1);
    let clipped = segment[0] + (segment[1] - segment[0]) * t;
    if d0 > 0.0 {
        segment[0] = clipped;
    } else {
        segment[1] = clipped;
    }
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::shape::{Ball, ConvexPolygon};

    #[test]
    fn separated_shapes_beyond_margin_produce_empty_manifold() {
        let a: Shape = Ball::new(1.0).unwrap().into();
        let b: Shape = Ball::new(1.0).unwrap().into();
        let pose_a = Isometry::translation(0.0, 0.0);
        let pose_b = Isometry::translation(10.0, 0.0);
        let manifold = generate_manifold(&a, &pose_a, &b, &pose_b, 0.01);
        assert!(manifold.points.is_empty());
    }

    #[test]
    fn touching_balls_within_margin_produce_one_point() {
        let a: Shape = Ball::new(1.0).unwrap().into();
        let b: Shape = Ball::new(1.0).unwrap().into();
        let pose_a = Isometry::translation(0.0, 0.0);
        let pose_b = Isometry::translation(2.005, 0.0);
        let manifold = generate_manifold(&a, &pose_a, &b, &pose_b, 0.01);
        assert_eq!(manifold.points.len(), 1);
    }

    #[test]
    fn overlapping_boxes_produce_two_point_manifold() {
        let a: Shape = ConvexPolygon::rectangle(1.0, 1.0).unwrap().into();
        let b: Shape = ConvexPolygon::rectangle(1.0, 1.0).unwrap().into();
        let pose_a = Isometry::translation(0.0, 0.0);
        let pose_b = Isometry::translation(1.5, 0.0);
        let manifold = generate_manifold(&a, &pose_a, &b, &pose_b, 0.01);
        assert!(!manifold.points.is_empty());
        assert!(manifold.points.iter().all(|p| p.separation <= 1e-3));
    }
}
