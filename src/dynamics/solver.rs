//! The sequential-impulse solver: builds per-contact velocity constraints,
//! warm-starts them, runs velocity and position iterations, and evaluates
//! island sleep.

use crate::data::arena::Index;
use crate::dynamics::island::Island;
use crate::dynamics::joint::JointSet;
use crate::dynamics::rigid_body::RigidBodyFlags;
use crate::dynamics::rigid_body_set::RigidBodySet;
use crate::dynamics::IntegrationParameters;
use crate::geometry::collider::ColliderSet;
use crate::geometry::narrow_phase::NarrowPhase;
use crate::math::{cross, perp, Point, Real, Rotation, Vector};
use std::collections::HashSet;

struct ContactPointConstraint {
    point: Point,
    local_anchor1: Point,
    local_anchor2: Point,
    normal_mass: Real,
    tangent_mass: Real,
    velocity_bias: Real,
    normal_impulse: Real,
    tangent_impulse: Real,
    manifold_point_index: usize,
}

struct ContactConstraint {
    collider_a: Index,
    collider_b: Index,
    body_a: Index,
    body_b: Index,
    normal: Vector,
    tangent: Vector,
    friction: Real,
    points: Vec<ContactPointConstraint>,
}

/// Builds one velocity constraint per enabled contact point touching this
/// island, combining friction/restitution and computing each point's
/// effective masses and restitution target from the bodies' velocities
/// immediately before warm-starting.
fn build_contact_constraints(
    island_bodies: &HashSet<Index>,
    bodies: &RigidBodySet,
    colliders: &ColliderSet,
    narrow_phase: &NarrowPhase,
    params: &IntegrationParameters,
) -> Vec<ContactConstraint> {
    let mut constraints = Vec::new();

    for (collider_a, collider_b, manifold) in narrow_phase.contact_pairs() {
        let (Some(ca), Some(cb)) = (colliders.get(collider_a), colliders.get(collider_b)) else {
            continue;
        };
        if ca.is_sensor || cb.is_sensor {
            continue;
        }
        let (Some(body_a), Some(body_b)) = (ca.parent, cb.parent) else {
            continue;
        };
        if body_a == body_b {
            continue;
        }
        if !island_bodies.contains(&body_a) || !island_bodies.contains(&body_b) {
            continue;
        }
        let (Some(ba), Some(bb)) = (bodies.get(body_a), bodies.get(body_b)) else {
            continue;
        };

        let normal = manifold.normal;
        let tangent = perp(normal);
        let friction = (ca.friction * cb.friction).max(0.0).sqrt();
        let restitution = ca.restitution.max(cb.restitution);

        let mut points = Vec::new();
        for (point_index, cp) in manifold.points.iter().enumerate() {
            if !cp.enabled {
                continue;
            }
            let point = Point::from((cp.point_a.coords + cp.point_b.coords) * 0.5);
            let r1 = point - ba.world_center_of_mass();
            let r2 = point - bb.world_center_of_mass();

            let rn1 = cross(r1, normal);
            let rn2 = cross(r2, normal);
            let k_normal = ba.inv_mass() + bb.inv_mass() + rn1 * rn1 * ba.inv_inertia() + rn2 * rn2 * bb.inv_inertia();
            let normal_mass = if k_normal > 0.0 { 1.0 / k_normal } else { 0.0 };

            let rt1 = cross(r1, tangent);
            let rt2 = cross(r2, tangent);
            let k_tangent = ba.inv_mass() + bb.inv_mass() + rt1 * rt1 * ba.inv_inertia() + rt2 * rt2 * bb.inv_inertia();
            let tangent_mass = if k_tangent > 0.0 { 1.0 / k_tangent } else { 0.0 };

            let rel_vel0 = bb.velocity_at_point(point) - ba.velocity_at_point(point);
            let vn0 = rel_vel0.dot(&normal);
            let velocity_bias = if vn0 < -params.restitution_velocity { -restitution * vn0 } else { 0.0 };

            points.push(ContactPointConstraint {
                point,
                local_anchor1: ba.pose.inverse() * point,
                local_anchor2: bb.pose.inverse() * point,
                normal_mass,
                tangent_mass,
                velocity_bias,
                normal_impulse: cp.normal_impulse,
                tangent_impulse: cp.tangent_impulse,
                manifold_point_index: point_index,
            });
        }

        if !points.is_empty() {
            constraints.push(ContactConstraint {
                collider_a,
                collider_b,
                body_a,
                body_b,
                normal,
                tangent,
                friction,
                points,
            });
        }
    }

    constraints
}

/// Reapplies each point's carried-over impulses before velocity iterations
/// begin.
fn warm_start_contacts(constraints: &mut [ContactConstraint], bodies: &mut RigidBodySet) {
    for constraint in constraints.iter() {
        let (Some(ba), Some(bb)) = bodies.get_pair_mut(constraint.body_a, constraint.body_b) else {
            continue;
        };
        for point in &constraint.points {
            let impulse = constraint.normal * point.normal_impulse + constraint.tangent * point.tangent_impulse;
            ba.apply_impulse_at_point(-impulse, point.point);
            bb.apply_impulse_at_point(impulse, point.point);
        }
    }
}

/// One contact velocity iteration: normal impulse first (clamped ≥ 0, with
/// restitution bias), then tangent/friction impulse (clamped to the
/// friction cone implied by the just-solved normal impulse), matching
/// spec.md §4.5 step 3.
fn solve_contact_velocity_iteration(constraints: &mut [ContactConstraint], bodies: &mut RigidBodySet) {
    for constraint in constraints.iter_mut() {
        let (Some(ba), Some(bb)) = bodies.get_pair_mut(constraint.body_a, constraint.body_b) else {
            continue;
        };

        for point in &mut constraint.points {
            let rel_vel = bb.velocity_at_point(point.point) - ba.velocity_at_point(point.point);
            let vn = rel_vel.dot(&constraint.normal);
            let lambda = -point.normal_mass * (vn - point.velocity_bias);
            let new_impulse = (point.normal_impulse + lambda).max(0.0);
            let applied = new_impulse - point.normal_impulse;
            point.normal_impulse = new_impulse;

            let impulse = constraint.normal * applied;
            ba.apply_impulse_at_point(-impulse, point.point);
            bb.apply_impulse_at_point(impulse, point.point);
        }

        for point in &mut constraint.points {
            let rel_vel = bb.velocity_at_point(point.point) - ba.velocity_at_point(point.point);
            let vt = rel_vel.dot(&constraint.tangent);
            let lambda = -point.tangent_mass * vt;
            let max_friction = constraint.friction * point.normal_impulse;
            let new_impulse = (point.tangent_impulse + lambda).clamp(-max_friction, max_friction);
            let applied = new_impulse - point.tangent_impulse;
            point.tangent_impulse = new_impulse;

            let impulse = constraint.tangent * applied;
            ba.apply_impulse_at_point(-impulse, point.point);
            bb.apply_impulse_at_point(impulse, point.point);
        }
    }
}

/// One contact position (NGS) iteration: recomputes each point's current
/// separation from the anchors recorded at constraint-build time, then
/// applies a clamped, Baumgarte-scaled pseudo-impulse directly to pose.
/// Returns the worst (most negative) separation seen, for the island's
/// overall residual.
fn solve_contact_position_iteration(constraints: &[ContactConstraint], bodies: &mut RigidBodySet, params: &IntegrationParameters) -> Real {
    let mut worst: Real = 0.0;

    for constraint in constraints {
        let (Some(ba), Some(bb)) = bodies.get_pair_mut(constraint.body_a, constraint.body_b) else {
            continue;
        };

        for point in &constraint.points {
            let p1 = ba.pose * point.local_anchor1;
            let p2 = bb.pose * point.local_anchor2;
            let separation = -(p2 - p1).dot(&constraint.normal);
            worst = worst.min(separation);

            let r1 = p1 - ba.world_center_of_mass();
            let r2 = p2 - bb.world_center_of_mass();
            let rn1 = cross(r1, constraint.normal);
            let rn2 = cross(r2, constraint.normal);
            let k = ba.inv_mass() + bb.inv_mass() + rn1 * rn1 * ba.inv_inertia() + rn2 * rn2 * bb.inv_inertia();
            if k <= 0.0 {
                continue;
            }

            let c = (separation + params.linear_tolerance).min(0.0);
            let bias = (params.baumgarte * c).clamp(-params.max_linear_correction, 0.0);
            let lambda = -bias / k;
            let correction = constraint.normal * lambda;

            ba.pose.translation.vector -= correction * ba.inv_mass();
            ba.pose.rotation = Rotation::new(ba.pose.rotation.angle() - ba.inv_inertia() * cross(r1, correction));
            bb.pose.translation.vector += correction * bb.inv_mass();
            bb.pose.rotation = Rotation::new(bb.pose.rotation.angle() + bb.inv_inertia() * cross(r2, correction));
        }
    }

    worst
}

/// Writes each point's final accumulated impulses back into the narrow
/// phase's persistent manifold, so the next step's `NarrowPhase::update`
/// can warm-start from them and `post_solve_notify` can report them.
fn write_back_impulses(constraints: &[ContactConstraint], narrow_phase: &mut NarrowPhase) {
    for constraint in constraints {
        let Some(manifold) = narrow_phase.manifold_mut(constraint.collider_a, constraint.collider_b) else {
            continue;
        };
        for point in &constraint.points {
            if let Some(mp) = manifold.points.get_mut(point.manifold_point_index) {
                mp.normal_impulse = point.normal_impulse;
                mp.tangent_impulse = point.tangent_impulse;
            }
        }
    }
}

/// Applies sleep accounting to every body in the island: if sleep is enabled, no kinematic body is present, and every dynamic
/// body is below both thresholds, accumulate sleep time and put the whole
/// island to sleep once every body has stayed under for `time_to_sleep`.
/// Any body still moving resets every body's timer.
fn evaluate_sleep(island: &Island, bodies: &mut RigidBodySet, params: &IntegrationParameters, dt: Real) {
    if !params.sleep_enabled {
        return;
    }

    let has_kinematic_or_fixed = island
        .bodies
        .iter()
        .filter_map(|&h| bodies.get(h))
        .any(|b| !b.is_dynamic());
    if has_kinematic_or_fixed {
        return;
    }

    let all_below = island.bodies.iter().filter_map(|&h| bodies.get(h)).all(|b| {
        b.below_sleep_thresholds(params.sleep_linear_threshold, params.sleep_angular_threshold)
    });

    if !all_below {
        for &handle in &island.bodies {
            if let Some(body) = bodies.get_mut(handle) {
                body.sleep_time = 0.0;
            }
        }
        return;
    }

    let mut min_sleep_time = Real::MAX;
    for &handle in &island.bodies {
        if let Some(body) = bodies.get_mut(handle) {
            body.sleep_time += dt;
            min_sleep_time = min_sleep_time.min(body.sleep_time);
        }
    }

    if min_sleep_time >= params.time_to_sleep {
        for &handle in &island.bodies {
            if let Some(body) = bodies.get_mut(handle) {
                if body.is_dynamic() {
                    body.fall_asleep();
                }
            }
        }
    }
}

/// Runs a full per-island solve step: force integration, warm start,
/// velocity iterations, position integration, position iterations, and
/// sleep evaluation, exactly the sub-steps of spec.md §4.5.
pub fn solve_island(
    island: &Island,
    bodies: &mut RigidBodySet,
    colliders: &ColliderSet,
    narrow_phase: &mut NarrowPhase,
    joints: &mut JointSet,
    params: &IntegrationParameters,
    gravity: Vector,
) {
    for &handle in &island.bodies {
        if let Some(body) = bodies.get_mut(handle) {
            if body.is_dynamic() && !body.flags.contains(RigidBodyFlags::ASLEEP) {
                body.apply_force_generators(params.dt);
                body.integrate_forces(params.dt, gravity, params.max_velocity, params.max_angular_velocity);
                body.clear_accumulators();
            }
        }
    }

    let island_bodies: HashSet<Index> = island.bodies.iter().copied().collect();
    let mut contact_constraints = build_contact_constraints(&island_bodies, bodies, colliders, narrow_phase, params);

    warm_start_contacts(&mut contact_constraints, bodies);
    for &handle in &island.joints {
        if let Some(joint) = joints.get_mut(handle) {
            let (Some(b1), Some(b2)) = bodies.get_pair_mut(joint.body1, joint.body2) else {
                continue;
            };
            joint.warm_start(b1, b2);
        }
    }

    for _ in 0..params.velocity_iterations {
        solve_contact_velocity_iteration(&mut contact_constraints, bodies);
        for &handle in &island.joints {
            if let Some(joint) = joints.get_mut(handle) {
                let (Some(b1), Some(b2)) = bodies.get_pair_mut(joint.body1, joint.body2) else {
                    continue;
                };
                joint.solve_velocity(b1, b2);
            }
        }
    }

    write_back_impulses(&contact_constraints, narrow_phase);

    for &handle in &island.bodies {
        if let Some(body) = bodies.get_mut(handle) {
            body.integrate_positions(params.dt);
        }
    }

    for _ in 0..params.position_iterations {
        solve_contact_position_iteration(&contact_constraints, bodies, params);
        for &handle in &island.joints {
            if let Some(joint) = joints.get_mut(handle) {
                let (Some(b1), Some(b2)) = bodies.get_pair_mut(joint.body1, joint.body2) else {
                    continue;
                };
                joint.solve_position(b1, b2);
            }
        }
    }

    evaluate_sleep(island, bodies, params, params.dt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::rigid_body::{RigidBody, RigidBodyType};
    use crate::geometry::collider::ColliderBuilder;
    use crate::geometry::shape::Ball;
    use crate::math::Isometry;

    fn setup_resting_pair() -> (RigidBodySet, ColliderSet, NarrowPhase, Island) {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        let ground = bodies.insert(RigidBody::new(Isometry::translation(0.0, 0.0), RigidBodyType::Infinite));
        bodies
            .attach_collider(ground, ColliderBuilder::new(Ball::new(1.0).unwrap().into()).build(), &mut colliders)
            .unwrap();

        let falling = bodies.insert(RigidBody::new(Isometry::translation(0.0, 1.99), RigidBodyType::Normal));
        bodies
            .attach_collider(falling, ColliderBuilder::new(Ball::new(1.0).unwrap().into()).build(), &mut colliders)
            .unwrap();

        let mut narrow_phase = NarrowPhase::new();
        let poses = |h: Index| bodies.get(h).unwrap().pose;
        let ground_fixture = bodies.get(ground).unwrap().fixtures[0];
        let falling_fixture = bodies.get(falling).unwrap().fixtures[0];
        narrow_phase.update(&[(ground_fixture, falling_fixture)], &colliders, &poses, 0.01, 1e-4, &());

        let island = Island {
            bodies: vec![ground, falling],
            joints: vec![],
        };
        (bodies, colliders, narrow_phase, island)
    }

    #[test]
    fn velocity_solve_stops_a_body_sinking_into_the_ground() {
        let (mut bodies, colliders, mut narrow_phase, island) = setup_resting_pair();
        bodies.get_mut(island.bodies[1]).unwrap().linear_velocity = Vector::new(0.0, -5.0);
        let params = IntegrationParameters::default();
        let mut joints = JointSet::new();

        solve_island(&island, &mut bodies, &colliders, &mut narrow_phase, &mut joints, &params, Vector::zeros());

        let falling = bodies.get(island.bodies[1]).unwrap();
        assert!(falling.linear_velocity.y > -5.0);
    }

    #[test]
    fn island_with_only_static_bodies_never_sleeps_the_dynamic_one_prematurely() {
        let (mut bodies, colliders, mut narrow_phase, island) = setup_resting_pair();
        let params = IntegrationParameters::default();
        let mut joints = JointSet::new();

        for _ in 0..5 {
            solve_island(&island, &mut bodies, &colliders, &mut narrow_phase, &mut joints, &params, Vector::new(0.0, -9.8));
        }

        // Five steps at 1/60s is well under `time_to_sleep` (0.5s).
        let falling = bodies.get(island.bodies[1]).unwrap();
        assert!(!falling.flags.contains(RigidBodyFlags::ASLEEP));
    }
}
