//! Rigid bodies: pose, velocity, mass properties, and the bookkeeping the
//! solver and sleep system need.

use crate::data::arena::Index;
use crate::geometry::collider::Collider;
use crate::geometry::mass_properties::MassProperties;
use crate::math::{Isometry, Point, Real, Vector};
use bitflags::bitflags;

bitflags! {
    /// Transient and persistent body flags.
    #[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct RigidBodyFlags: u32 {
        /// The body currently participates in the simulation.
        const ACTIVE = 1 << 0;
        /// The body is asleep (velocities frozen, skipped by the solver).
        const ASLEEP = 1 << 1;
        /// The body is allowed to fall asleep automatically.
        const AUTO_SLEEP = 1 << 2;
        /// Transient: set while the body belongs to this step's island,
        /// cleared at the start of the next step's island assembly.
        const ON_ISLAND = 1 << 3;
        /// The body requests continuous collision detection.
        const BULLET = 1 << 4;
    }
}

/// How a body's mass participates in the simulation.
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RigidBodyType {
    /// Ordinary dynamic body: finite mass and inertia, driven by forces.
    Normal,
    /// Infinite mass and inertia; forces have no effect, velocity may
    /// still be set directly (kinematic).
    Infinite,
    /// Infinite mass only; angular response is unaffected.
    FixedLinearVelocity,
    /// Infinite inertia only; linear response is unaffected.
    FixedAngularVelocity,
}

/// A time-limited (or permanent) force/torque generator, reapplied every
/// step until it expires.
#[derive(Copy, Clone, Debug)]
pub struct ForceGenerator {
    /// World-space force applied at the body's center of mass.
    pub force: Vector,
    /// Torque applied about the body's center of mass.
    pub torque: Real,
    /// Remaining lifetime in seconds; `None` means it never expires.
    pub remaining: Option<Real>,
}

/// An edge in a body's adjacency list: another body plus the handle of the
/// constraint linking them.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AdjacencyEdge {
    /// The body at the other end of the constraint.
    pub other: Index,
    /// The joint or contact-constraint handle.
    pub constraint: Index,
}

/// A rigid body: pose, velocity, mass properties, and the fixtures
/// attached to it.
pub struct RigidBody {
    /// Current pose.
    pub pose: Isometry,
    /// Pose at the start of the current step, used to interpolate motion
    /// for CCD.
    pub previous_pose: Isometry,
    /// Linear velocity.
    pub linear_velocity: Vector,
    /// Angular velocity.
    pub angular_velocity: Real,
    /// Force accumulated for the current step.
    pub force: Vector,
    /// Torque accumulated for the current step.
    pub torque: Real,
    /// Active force/torque generators, reapplied (and aged) every step.
    pub force_generators: Vec<ForceGenerator>,
    /// Combined mass properties of all attached fixtures, in the body's
    /// local frame.
    pub mass_properties: MassProperties,
    /// How this body's mass participates in the simulation.
    pub body_type: RigidBodyType,
    /// The fixtures (collider handles) attached to this body.
    pub fixtures: Vec<Index>,
    /// Max distance from the local center of mass to any fixture point;
    /// bounds rotational motion for CCD.
    pub rotation_disc_radius: Real,
    /// Linear damping, `[0, inf)`.
    pub linear_damping: Real,
    /// Angular damping, `[0, inf)`.
    pub angular_damping: Real,
    /// Status flags.
    pub flags: RigidBodyFlags,
    /// Seconds the body has spent below the sleep thresholds.
    pub sleep_time: Real,
    /// Joint adjacency list.
    pub joint_edges: Vec<AdjacencyEdge>,
    /// Contact adjacency list.
    pub contact_edges: Vec<AdjacencyEdge>,
}

impl RigidBody {
    /// Builds a new body at `pose` with the given type, no fixtures yet.
    pub fn new(pose: Isometry, body_type: RigidBodyType) -> Self {
        RigidBody {
            pose,
            previous_pose: pose,
            linear_velocity: Vector::zeros(),
            angular_velocity: 0.0,
            force: Vector::zeros(),
            torque: 0.0,
            force_generators: Vec::new(),
            mass_properties: MassProperties::zero(),
            body_type,
            fixtures: Vec::new(),
            rotation_disc_radius: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            flags: RigidBodyFlags::ACTIVE | RigidBodyFlags::AUTO_SLEEP,
            sleep_time: 0.0,
            joint_edges: Vec::new(),
            contact_edges: Vec::new(),
        }
    }

    /// Whether this body is pushed around by the solver (as opposed to
    /// being immovable or velocity-driven only).
    pub fn is_dynamic(&self) -> bool {
        self.body_type == RigidBodyType::Normal
    }

    /// Inverse mass, honoring the body type's zeroing rules.
    pub fn inv_mass(&self) -> Real {
        match self.body_type {
            RigidBodyType::Infinite | RigidBodyType::FixedLinearVelocity => 0.0,
            _ => self.mass_properties.inv_mass(),
        }
    }

    /// Inverse rotational inertia, honoring the body type's zeroing rules.
    pub fn inv_inertia(&self) -> Real {
        match self.body_type {
            RigidBodyType::Infinite | RigidBodyType::FixedAngularVelocity => 0.0,
            _ => self.mass_properties.inv_inertia(),
        }
    }

    /// Mass as seen from outside the body: zero whenever `body_type`
    /// treats mass as infinite, even though `mass_properties.mass` keeps
    /// its computed value underneath. Switching back to `Normal` restores
    /// the non-zero reading without recomputing mass from fixtures.
    pub fn mass(&self) -> Real {
        match self.body_type {
            RigidBodyType::Infinite | RigidBodyType::FixedLinearVelocity => 0.0,
            _ => self.mass_properties.mass,
        }
    }

    /// Rotational inertia as seen from outside the body: zero whenever
    /// `body_type` treats inertia as infinite, even though
    /// `mass_properties.inertia` keeps its computed value underneath.
    pub fn inertia(&self) -> Real {
        match self.body_type {
            RigidBodyType::Infinite | RigidBodyType::FixedAngularVelocity => 0.0,
            _ => self.mass_properties.inertia,
        }
    }

    /// Recomputes `mass_properties` and `rotation_disc_radius` from the
    /// given fixtures (called whenever fixtures are attached/removed).
    pub fn recompute_mass_from_fixtures(&mut self, colliders: &[&Collider]) {
        let parts: Vec<MassProperties> = colliders.iter().map(|c| c.mass_properties()).collect();
        self.mass_properties = MassProperties::combine(&parts);
        self.rotation_disc_radius = colliders
            .iter()
            .map(|c| c.shape.as_convex().radius(self.mass_properties.local_center))
            .fold(0.0, Real::max);
    }

    /// Applies gravity and accumulated forces/torques to velocity, then
    /// damping, then clamps to the configured maximum speeds. Does nothing
    /// for non-dynamic bodies.
    pub fn integrate_forces(&mut self, dt: Real, gravity: Vector, max_velocity: Real, max_angular_velocity: Real) {
        if !self.is_dynamic() {
            return;
        }
        let inv_mass = self.inv_mass();
        let inv_inertia = self.inv_inertia();

        self.linear_velocity += (gravity + self.force * inv_mass) * dt;
        self.angular_velocity += self.torque * inv_inertia * dt;

        self.linear_velocity *= 1.0 / (1.0 + dt * self.linear_damping);
        self.angular_velocity *= 1.0 / (1.0 + dt * self.angular_damping);

        let speed = self.linear_velocity.norm();
        if speed > max_velocity {
            self.linear_velocity *= max_velocity / speed;
        }
        self.angular_velocity = self.angular_velocity.clamp(-max_angular_velocity, max_angular_velocity);
    }

    /// Integrates pose from velocity.
    pub fn integrate_positions(&mut self, dt: Real) {
        if self.flags.contains(RigidBodyFlags::ASLEEP) {
            return;
        }
        let translation = self.pose.translation.vector + self.linear_velocity * dt;
        let angle = self.pose.rotation.angle() + self.angular_velocity * dt;
        self.pose = Isometry::new(translation, angle);
    }

    /// Clears the per-step force/torque accumulators (called after
    /// integration; generators with remaining lifetime re-populate them
    /// next step).
    pub fn clear_accumulators(&mut self) {
        self.force = Vector::zeros();
        self.torque = 0.0;
    }

    /// Applies every live force generator to the accumulators, ages it by
    /// `dt`, and drops any that have expired.
    pub fn apply_force_generators(&mut self, dt: Real) {
        let force = &mut self.force;
        let torque = &mut self.torque;
        self.force_generators.retain_mut(|gen| {
            *force += gen.force;
            *torque += gen.torque;
            match &mut gen.remaining {
                Some(remaining) => {
                    *remaining -= dt;
                    *remaining > 0.0
                }
                None => true,
            }
        });
    }

    /// World-space offset from the body's center of mass to `point`
    /// (world space), i.e. `r` in the standard contact-impulse formulas.
    pub fn world_center_of_mass(&self) -> Point {
        self.pose * self.mass_properties.local_center
    }

    /// Linear velocity of the material point currently at world position
    /// `point`, accounting for rotation about the center of mass.
    pub fn velocity_at_point(&self, point: Point) -> Vector {
        let r = point - self.world_center_of_mass();
        self.linear_velocity + crate::math::cross_scalar_vector(self.angular_velocity, r)
    }

    /// Applies an impulse at `point` (world space): updates linear and
    /// angular velocity per the standard `v += invM * j`, `w += invI * (r
    /// x j)` rule.
    pub fn apply_impulse_at_point(&mut self, impulse: Vector, point: Point) {
        let inv_mass = self.inv_mass();
        let inv_inertia = self.inv_inertia();
        let r = point - self.world_center_of_mass();
        self.linear_velocity += impulse * inv_mass;
        self.angular_velocity += inv_inertia * crate::math::cross(r, impulse);
    }

    /// Whether |v| and |w| are both below the sleep thresholds.
    pub fn below_sleep_thresholds(&self, linear_threshold: Real, angular_threshold: Real) -> bool {
        self.linear_velocity.norm_squared() < linear_threshold * linear_threshold
            && self.angular_velocity.abs() < angular_threshold
    }

    /// Puts the body to sleep: zeroes velocities and accumulators, sets
    /// the `Asleep` flag.
    pub fn fall_asleep(&mut self) {
        self.linear_velocity = Vector::zeros();
        self.angular_velocity = 0.0;
        self.clear_accumulators();
        self.sleep_time = 0.0;
        self.flags.insert(RigidBodyFlags::ASLEEP);
    }

    /// Wakes the body: clears `Asleep` and resets the sleep timer.
    pub fn wake_up(&mut self) {
        self.flags.remove(RigidBodyFlags::ASLEEP);
        self.sleep_time = 0.0;
    }

    /// Translates the body's current and previous pose by `v` (world
    /// origin shift, spec.md §4.6).
    pub fn shift(&mut self, v: Vector) {
        self.pose.translation.vector += v;
        self.previous_pose.translation.vector += v;
    }

    /// Snapshots the current pose as the "previous" pose for this step's
    /// CCD sweep (called at step start, before integration).
    pub fn snapshot_previous_pose(&mut self) {
        self.previous_pose = self.pose;
    }

    /// Interpolates between the previous and current pose at `t in [0,1]`
    /// (lerp position, lerp-then-renormalize angle), used both by CCD's
    /// root-finding and by `run_ccd_motion_clamping` to roll a body back
    /// to its time of impact.
    pub fn interpolate_pose(&self, t: Real) -> Isometry {
        let p0 = self.previous_pose.translation.vector;
        let p1 = self.pose.translation.vector;
        let translation = p0 + (p1 - p0) * t;

        let a0 = self.previous_pose.rotation.angle();
        let a1 = self.pose.rotation.angle();
        let angle = a0 + (a1 - a0) * t;

        Isometry::new(translation, angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinite_body_has_zero_inverse_mass_and_inertia() {
        let mut body = RigidBody::new(Isometry::identity(), RigidBodyType::Infinite);
        body.mass_properties = MassProperties {
            mass: 10.0,
            local_center: Point::origin(),
            inertia: 5.0,
        };
        assert_eq!(body.inv_mass(), 0.0);
        assert_eq!(body.inv_inertia(), 0.0);
    }

    #[test]
    fn switching_to_infinite_zeroes_mass_and_inertia_but_preserves_storage() {
        let mut body = RigidBody::new(Isometry::identity(), RigidBodyType::Normal);
        body.mass_properties = MassProperties {
            mass: 10.0,
            local_center: Point::origin(),
            inertia: 5.0,
        };
        assert_eq!(body.mass(), 10.0);
        assert_eq!(body.inertia(), 5.0);

        body.body_type = RigidBodyType::Infinite;
        assert_eq!(body.mass(), 0.0);
        assert_eq!(body.inertia(), 0.0);
        assert_eq!(body.mass_properties.mass, 10.0);
        assert_eq!(body.mass_properties.inertia, 5.0);

        body.body_type = RigidBodyType::Normal;
        assert_eq!(body.mass(), 10.0);
        assert_eq!(body.inertia(), 5.0);
    }

    #[test]
    fn fixed_linear_velocity_zeroes_only_inverse_mass() {
        let mut body = RigidBody::new(Isometry::identity(), RigidBodyType::FixedLinearVelocity);
        body.mass_properties = MassProperties {
            mass: 10.0,
            local_center: Point::origin(),
            inertia: 5.0,
        };
        assert_eq!(body.inv_mass(), 0.0);
        assert!(body.inv_inertia() > 0.0);
    }

    #[test]
    fn gravity_accelerates_a_dynamic_body() {
        let mut body = RigidBody::new(Isometry::identity(), RigidBodyType::Normal);
        body.mass_properties = MassProperties {
            mass: 1.0,
            local_center: Point::origin(),
            inertia: 1.0,
        };
        body.integrate_forces(1.0, Vector::new(0.0, -9.8), 200.0, 4.36);
        assert!((body.linear_velocity.y - (-9.8)).abs() < 1e-5);
    }

    #[test]
    fn damping_reduces_velocity_without_overshoot() {
        let mut body = RigidBody::new(Isometry::identity(), RigidBodyType::Normal);
        body.mass_properties = MassProperties {
            mass: 1.0,
            local_center: Point::origin(),
            inertia: 1.0,
        };
        body.linear_velocity = Vector::new(10.0, 0.0);
        body.linear_damping = 1.0;
        body.integrate_forces(1.0, Vector::zeros(), 200.0, 4.36);
        assert!(body.linear_velocity.x > 0.0 && body.linear_velocity.x < 10.0);
    }

    #[test]
    fn speed_clamp_caps_linear_velocity_magnitude() {
        let mut body = RigidBody::new(Isometry::identity(), RigidBodyType::Normal);
        body.mass_properties = MassProperties {
            mass: 1.0,
            local_center: Point::origin(),
            inertia: 1.0,
        };
        body.linear_velocity = Vector::new(1000.0, 0.0);
        body.integrate_forces(1.0 / 60.0, Vector::zeros(), 200.0, 4.36);
        assert!((body.linear_velocity.norm() - 200.0).abs() < 1e-3);
    }

    #[test]
    fn expired_force_generator_is_dropped() {
        let mut body = RigidBody::new(Isometry::identity(), RigidBodyType::Normal);
        body.force_generators.push(ForceGenerator {
            force: Vector::new(1.0, 0.0),
            torque: 0.0,
            remaining: Some(0.01),
        });
        body.apply_force_generators(0.1);
        assert!(body.force_generators.is_empty());
        assert_eq!(body.force, Vector::new(1.0, 0.0));
    }
}
