//! Continuous collision detection via conservative advancement: bounds a
//! bullet body's sweep between two convex shapes with a signed-separation
//! root find, so fast-moving bodies can't tunnel through thin geometry in
//! one discrete step.

use crate::dynamics::rigid_body::RigidBody;
use crate::geometry::epa::epa;
use crate::geometry::gjk::{gjk, GjkResult};
use crate::geometry::shape::Convex;
use crate::math::{Isometry, Real, Vector};

/// Signed separation between two convex shapes at given poses: positive is
/// a gap, negative is penetration depth. The companion normal points from
/// shape A toward shape B.
fn signed_separation(shape_a: &dyn Convex, pose_a: &Isometry, shape_b: &dyn Convex, pose_b: &Isometry) -> (Real, Vector) {
    match gjk(shape_a, pose_a, shape_b, pose_b) {
        GjkResult::Separated { distance, closest_a, closest_b } => {
            let normal = (closest_b - closest_a).try_normalize(Real::EPSILON).unwrap_or(Vector::x());
            (distance, normal)
        }
        GjkResult::Intersecting { simplex } => {
            let pen = epa(shape_a, pose_a, shape_b, pose_b, &simplex);
            (-pen.depth, pen.normal)
        }
    }
}

/// Finds the time of impact in `[0, 1]` between two fixtures as their
/// parent bodies sweep from their recorded `previous_pose` to their
/// current `pose`, alternating secant and bisection root-finding on the
/// signed-separation function.
///
/// Returns `None` when the fixtures are already overlapping at `t = 0`
/// (the discrete solver already owns that case), when they never
/// approach each other, or when the root-finding budget runs out with the
/// bracket's high end still separated.
pub fn time_of_impact(
    shape_a: &dyn Convex,
    collider_pose_a: Isometry,
    body_a: &RigidBody,
    shape_b: &dyn Convex,
    collider_pose_b: Isometry,
    body_b: &RigidBody,
    tolerance: Real,
    max_iterations: u32,
) -> Option<Real> {
    let pose_at = |body: &RigidBody, collider_pose: Isometry, t: Real| body.interpolate_pose(t) * collider_pose;

    let separation_at = |t: Real| {
        let pose_a = pose_at(body_a, collider_pose_a, t);
        let pose_b = pose_at(body_b, collider_pose_b, t);
        signed_separation(shape_a, &pose_a, shape_b, &pose_b).0
    };

    let d0 = separation_at(0.0);
    if d0 < 0.0 {
        return None;
    }

    let d1 = separation_at(1.0);
    if d1 >= 0.0 {
        let n0 = signed_separation(shape_a, &pose_at(body_a, collider_pose_a, 0.0), shape_b, &pose_at(body_b, collider_pose_b, 0.0)).1;
        let n1 = signed_separation(shape_a, &pose_at(body_a, collider_pose_a, 1.0), shape_b, &pose_at(body_b, collider_pose_b, 1.0)).1;
        if n0.dot(&n1) >= 0.0 {
            return None;
        }
    }

    let mut t_lo = 0.0;
    let mut d_lo = d0;
    let mut t_hi = 1.0;
    let mut d_hi = d1;

    for iteration in 0..max_iterations {
        if d_lo.abs() < tolerance {
            return Some(t_lo);
        }

        let t = if iteration % 2 == 1 && (d_hi - d_lo).abs() > Real::EPSILON {
            t_lo + (0.0 - d_lo) * (t_hi - t_lo) / (d_hi - d_lo)
        } else {
            0.5 * (t_lo + t_hi)
        };
        let t = t.clamp(t_lo, t_hi);

        let d = separation_at(t);
        if d.abs() < tolerance {
            return Some(t);
        }

        if d > 0.0 {
            t_lo = t;
            d_lo = d;
        } else {
            t_hi = t;
            d_hi = d;
        }
    }

    // Budget exhausted: accept the high end of the bracket if it is still
    // separated (a conservative, slightly-early impact time), otherwise
    // report no impact rather than a time that's actually penetrating.
    if d_hi >= 0.0 {
        Some(t_hi)
    } else {
        None
    }
}

/// Rolls `body` back to its pose at the given time of impact, discarding
/// the remainder of this step's motion. The velocity is left untouched so
/// the next step's discrete contact solver picks up the resulting contact.
pub fn clamp_to_time_of_impact(body: &mut RigidBody, toi: Real) {
    body.pose = body.interpolate_pose(toi);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::rigid_body::RigidBodyType;
    use crate::geometry::shape::Ball;
    use crate::math::Isometry;

    fn swept_body(x0: Real, x1: Real) -> RigidBody {
        let mut body = RigidBody::new(Isometry::translation(x0, 0.0), RigidBodyType::Normal);
        body.previous_pose = Isometry::translation(x0, 0.0);
        body.pose = Isometry::translation(x1, 0.0);
        body
    }

    #[test]
    fn fast_ball_through_thin_wall_reports_an_impact_time() {
        let bullet = swept_body(-10.0, 10.0);
        let wall = {
            let mut b = RigidBody::new(Isometry::identity(), RigidBodyType::Infinite);
            b.previous_pose = b.pose;
            b
        };
        let ball = Ball::new(0.2).unwrap();
        let plate = Ball::new(0.2).unwrap();

        let toi = time_of_impact(&ball, Isometry::identity(), &bullet, &plate, Isometry::identity(), &wall, 1e-3, 30);
        assert!(toi.is_some());
        let t = toi.unwrap();
        assert!((0.0..=1.0).contains(&t));
    }

    #[test]
    fn bodies_moving_apart_report_no_impact() {
        let a = swept_body(0.0, -5.0);
        let b = swept_body(3.0, 8.0);
        let ball = Ball::new(0.5).unwrap();

        let toi = time_of_impact(&ball, Isometry::identity(), &a, &ball, Isometry::identity(), &b, 1e-3, 30);
        assert!(toi.is_none());
    }

    #[test]
    fn already_overlapping_at_start_defers_to_discrete_solver() {
        let a = swept_body(0.0, 0.0);
        let b = swept_body(0.1, 0.1);
        let ball = Ball::new(1.0).unwrap();

        let toi = time_of_impact(&ball, Isometry::identity(), &a, &ball, Isometry::identity(), &b, 1e-3, 30);
        assert!(toi.is_none());
    }

    #[test]
    fn clamp_moves_body_to_interpolated_pose() {
        let mut body = swept_body(0.0, 10.0);
        clamp_to_time_of_impact(&mut body, 0.5);
        assert!((body.pose.translation.vector.x - 5.0).abs() < 1e-5);
    }
}
