//! Weld joints: rigidly lock both the relative translation and relative
//! rotation of two bodies, as if welded together.

use crate::dynamics::rigid_body::RigidBody;
use crate::math::{cross, Point, Real, Vector};

/// Locks both anchors together and the bodies' relative angle. The angular
/// constraint is solved first, then the point constraint, mirroring
/// Box2D's weld-joint ordering (the angular correction is cheap and keeps
/// the subsequent point Jacobian from drifting).
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug)]
pub struct WeldJoint {
    /// Anchor in body 1's local frame.
    pub local_anchor1: Point,
    /// Anchor in body 2's local frame.
    pub local_anchor2: Point,
    /// Relative angle (body2 minus body1) the joint holds the bodies at.
    pub reference_angle: Real,
    angular_impulse: Real,
    point_impulse: Vector,
}

impl WeldJoint {
    /// Builds a new weld joint holding the given reference angle.
    pub fn new(local_anchor1: Point, local_anchor2: Point, reference_angle: Real) -> Self {
        WeldJoint {
            local_anchor1,
            local_anchor2,
            reference_angle,
            angular_impulse: 0.0,
            point_impulse: Vector::zeros(),
        }
    }

    fn anchors(&self, b1: &RigidBody, b2: &RigidBody) -> (Point, Point, Vector, Vector) {
        let p1 = b1.pose * self.local_anchor1;
        let p2 = b2.pose * self.local_anchor2;
        let r1 = p1 - b1.world_center_of_mass();
        let r2 = p2 - b2.world_center_of_mass();
        (p1, p2, r1, r2)
    }

    /// Reapplies last step's accumulated impulses before velocity
    /// iterations begin.
    pub fn warm_start(&mut self, b1: &mut RigidBody, b2: &mut RigidBody) {
        let (p1, p2, r1, r2) = self.anchors(b1, b2);
        b1.angular_velocity -= b1.inv_inertia() * (self.angular_impulse + cross(r1, self.point_impulse));
        b2.angular_velocity += b2.inv_inertia() * (self.angular_impulse + cross(r2, self.point_impulse));
        b1.linear_velocity -= self.point_impulse * b1.inv_mass();
        b2.linear_velocity += self.point_impulse * b2.inv_mass();
    }

    /// One velocity-iteration solve: first removes relative angular
    /// velocity, then drives the anchors' relative velocity to zero.
    pub fn solve_velocity(&mut self, b1: &mut RigidBody, b2: &mut RigidBody) {
        let (ii1, ii2) = (b1.inv_inertia(), b2.inv_inertia());
        let k_angular = ii1 + ii2;
        if k_angular > 0.0 {
            let cdot = b2.angular_velocity - b1.angular_velocity;
            let lambda = -cdot / k_angular;
            self.angular_impulse += lambda;
            b1.angular_velocity -= ii1 * lambda;
            b2.angular_velocity += ii2 * lambda;
        }

        let (p1, p2, r1, r2) = self.anchors(b1, b2);
        let (im1, im2) = (b1.inv_mass(), b2.inv_mass());
        let k11 = im1 + im2 + ii1 * r1.y * r1.y + ii2 * r2.y * r2.y;
        let k12 = -ii1 * r1.x * r1.y - ii2 * r2.x * r2.y;
        let k22 = im1 + im2 + ii1 * r1.x * r1.x + ii2 * r2.x * r2.x;
        let k = crate::math::Matrix::new(k11, k12, k12, k22);
        let Some(k_inv) = k.try_inverse() else { return };

        let rel_vel = b2.velocity_at_point(p2) - b1.velocity_at_point(p1);
        let impulse = -(k_inv * rel_vel);
        self.point_impulse += impulse;

        b1.apply_impulse_at_point(-impulse, p1);
        b2.apply_impulse_at_point(impulse, p2);
    }

    /// One position-iteration (NGS) correction: first the relative angle,
    /// then the anchor separation. Returns the residual anchor separation.
    pub fn solve_position(&mut self, b1: &mut RigidBody, b2: &mut RigidBody) -> Real {
        let (ii1, ii2) = (b1.inv_inertia(), b2.inv_inertia());
        let k_angular = ii1 + ii2;
        if k_angular > 0.0 {
            let c_angle = b2.pose.rotation.angle() - b1.pose.rotation.angle() - self.reference_angle;
            let lambda = -c_angle / k_angular;
            b1.pose.rotation = crate::math::Rotation::new(b1.pose.rotation.angle() - ii1 * lambda);
            b2.pose.rotation = crate::math::Rotation::new(b2.pose.rotation.angle() + ii2 * lambda);
        }

        let (p1, p2, r1, r2) = self.anchors(b1, b2);
        let (im1, im2) = (b1.inv_mass(), b2.inv_mass());
        let c = p2 - p1;
        let k11 = im1 + im2 + ii1 * r1.y * r1.y + ii2 * r2.y * r2.y;
        let k12 = -ii1 * r1.x * r1.y - ii2 * r2.x * r2.y;
        let k22 = im1 + im2 + ii1 * r1.x * r1.x + ii2 * r2.x * r2.x;
        let k = crate::math::Matrix::new(k11, k12, k12, k22);
        let Some(k_inv) = k.try_inverse() else { return c.norm() };
        let correction = -(k_inv * c);

        b1.pose.translation.vector -= correction * im1;
        b1.pose.rotation = crate::math::Rotation::new(b1.pose.rotation.angle() - ii1 * cross(r1, correction));
        b2.pose.translation.vector += correction * im2;
        b2.pose.rotation = crate::math::Rotation::new(b2.pose.rotation.angle() + ii2 * cross(r2, correction));

        c.norm()
    }
}

/// Builds a [`WeldJoint`] with rapier-style chained setters.
#[derive(Clone, Debug)]
pub struct WeldJointBuilder {
    local_anchor1: Point,
    local_anchor2: Point,
    reference_angle: Real,
}

impl WeldJointBuilder {
    /// Starts building a joint welding the bodies at their current relative
    /// angle (zero), anchored at each body's origin until overridden.
    pub fn new() -> Self {
        WeldJointBuilder {
            local_anchor1: Point::origin(),
            local_anchor2: Point::origin(),
            reference_angle: 0.0,
        }
    }

    /// Sets the anchor in body 1's local frame.
    pub fn local_anchor1(mut self, anchor: Point) -> Self {
        self.local_anchor1 = anchor;
        self
    }

    /// Sets the anchor in body 2's local frame.
    pub fn local_anchor2(mut self, anchor: Point) -> Self {
        self.local_anchor2 = anchor;
        self
    }

    /// Sets the relative angle (body2 minus body1) the joint holds.
    pub fn reference_angle(mut self, angle: Real) -> Self {
        self.reference_angle = angle;
        self
    }

    /// Finalizes the joint.
    pub fn build(self) -> WeldJoint {
        WeldJoint::new(self.local_anchor1, self.local_anchor2, self.reference_angle)
    }
}

impl Default for WeldJointBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::rigid_body::RigidBodyType;
    use crate::geometry::mass_properties::MassProperties;
    use crate::math::Isometry;

    fn dynamic_body(x: Real, y: Real) -> RigidBody {
        let mut body = RigidBody::new(Isometry::translation(x, y), RigidBodyType::Normal);
        body.mass_properties = MassProperties {
            mass: 1.0,
            local_center: Point::origin(),
            inertia: 1.0,
        };
        body
    }

    #[test]
    fn velocity_solve_removes_relative_spin_and_drift() {
        let mut b1 = dynamic_body(0.0, 0.0);
        let mut b2 = dynamic_body(1.0, 0.0);
        b2.angular_velocity = 2.0;
        b2.linear_velocity = Vector::new(0.0, 1.0);
        let mut joint = WeldJoint::new(Point::origin(), Point::origin(), 0.0);

        for _ in 0..10 {
            joint.solve_velocity(&mut b1, &mut b2);
        }

        assert!((b2.angular_velocity - b1.angular_velocity).abs() < 1e-3);
        let p1 = b1.pose * joint.local_anchor1;
        let p2 = b2.pose * joint.local_anchor2;
        let rel_vel = b2.velocity_at_point(p2) - b1.velocity_at_point(p1);
        assert!(rel_vel.norm() < 1e-3);
    }

    #[test]
    fn position_solve_shrinks_angle_and_point_error() {
        let mut b1 = dynamic_body(0.0, 0.0);
        let mut b2 = dynamic_body(1.3, 0.0);
        b2.pose.rotation = crate::math::Rotation::new(0.4);
        let mut joint = WeldJoint::new(Point::origin(), Point::origin(), 0.0);

        let first_error = joint.solve_position(&mut b1, &mut b2);
        let second_error = joint.solve_position(&mut b1, &mut b2);
        assert!(second_error < first_error);
    }
}
