//! Distance joints: hold two body-local anchors at a fixed world-space
//! separation, like a rigid rod.

use crate::dynamics::rigid_body::RigidBody;
use crate::math::{cross, Point, Real, Vector};

/// Keeps `|anchor2 - anchor1|` equal to `rest_length`.
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug)]
pub struct DistanceJoint {
    /// Anchor in body 1's local frame.
    pub local_anchor1: Point,
    /// Anchor in body 2's local frame.
    pub local_anchor2: Point,
    /// The distance the joint holds the anchors at.
    pub rest_length: Real,
    impulse: Real,
}

impl DistanceJoint {
    /// Builds a new distance joint holding the given rest length.
    pub fn new(local_anchor1: Point, local_anchor2: Point, rest_length: Real) -> Self {
        DistanceJoint {
            local_anchor1,
            local_anchor2,
            rest_length,
            impulse: 0.0,
        }
    }

    fn axis(&self, b1: &RigidBody, b2: &RigidBody) -> (Vector, Point, Point, Real) {
        let p1 = b1.pose * self.local_anchor1;
        let p2 = b2.pose * self.local_anchor2;
        let delta = p2 - p1;
        let length = delta.norm();
        let axis = if length > Real::EPSILON { delta / length } else { Vector::x() };
        (axis, p1, p2, length)
    }

    /// Reapplies last step's accumulated impulse before velocity iterations
    /// begin.
    pub fn warm_start(&mut self, b1: &mut RigidBody, b2: &mut RigidBody) {
        let (axis, p1, p2, _) = self.axis(b1, b2);
        let impulse = axis * self.impulse;
        b1.apply_impulse_at_point(-impulse, p1);
        b2.apply_impulse_at_point(impulse, p2);
    }

    /// One velocity-iteration solve: drives the anchors' relative speed
    /// along the joint axis to zero.
    pub fn solve_velocity(&mut self, b1: &mut RigidBody, b2: &mut RigidBody) {
        let (axis, p1, p2, _) = self.axis(b1, b2);
        let r1 = p1 - b1.world_center_of_mass();
        let r2 = p2 - b2.world_center_of_mass();

        let rel_vel = b2.velocity_at_point(p2) - b1.velocity_at_point(p1);
        let vn = rel_vel.dot(&axis);

        let rn1 = cross(r1, axis);
        let rn2 = cross(r2, axis);
        let k = b1.inv_mass() + b2.inv_mass() + rn1 * rn1 * b1.inv_inertia() + rn2 * rn2 * b2.inv_inertia();
        if k <= 0.0 {
            return;
        }
        let lambda = -vn / k;
        self.impulse += lambda;

        let impulse = axis * lambda;
        b1.apply_impulse_at_point(-impulse, p1);
        b2.apply_impulse_at_point(impulse, p2);
    }

    /// One position-iteration (NGS) correction, directly displacing pose
    /// rather than velocity. Returns the residual length error.
    pub fn solve_position(&mut self, b1: &mut RigidBody, b2: &mut RigidBody) -> Real {
        let (axis, p1, p2, length) = self.axis(b1, b2);
        let c = length - self.rest_length;

        let r1 = p1 - b1.world_center_of_mass();
        let r2 = p2 - b2.world_center_of_mass();
        let rn1 = cross(r1, axis);
        let rn2 = cross(r2, axis);
        let k = b1.inv_mass() + b2.inv_mass() + rn1 * rn1 * b1.inv_inertia() + rn2 * rn2 * b2.inv_inertia();
        if k <= 0.0 {
            return c.abs();
        }
        let lambda = -c / k;
        let correction = axis * lambda;

        b1.pose.translation.vector -= correction * b1.inv_mass();
        b1.pose.rotation = crate::math::Rotation::new(b1.pose.rotation.angle() - b1.inv_inertia() * cross(r1, correction));
        b2.pose.translation.vector += correction * b2.inv_mass();
        b2.pose.rotation = crate::math::Rotation::new(b2.pose.rotation.angle() + b2.inv_inertia() * cross(r2, correction));

        c.abs()
    }
}

/// Builds a [`DistanceJoint`] with rapier-style chained setters.
#[derive(Clone, Debug)]
pub struct DistanceJointBuilder {
    local_anchor1: Point,
    local_anchor2: Point,
    rest_length: Real,
}

impl DistanceJointBuilder {
    /// Starts building a joint holding the given rest length, anchored at
    /// each body's origin until overridden.
    pub fn new(rest_length: Real) -> Self {
        DistanceJointBuilder {
            local_anchor1: Point::origin(),
            local_anchor2: Point::origin(),
            rest_length,
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

    /// Finalizes the joint.
    pub fn build(self) -> DistanceJoint {
        DistanceJoint::new(self.local_anchor1, self.local_anchor2, self.rest_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::rigid_body::RigidBodyType;
    use crate::geometry::mass_properties::MassProperties;
    use crate::math::Isometry;

    fn dynamic_body(x: Real) -> RigidBody {
        let mut body = RigidBody::new(Isometry::translation(x, 0.0), RigidBodyType::Normal);
        body.mass_properties = MassProperties {
            mass: 1.0,
            local_center: Point::origin(),
            inertia: 1.0,
        };
        body
    }

    #[test]
    fn velocity_solve_removes_separating_speed_along_axis() {
        let mut b1 = dynamic_body(0.0);
        let mut b2 = dynamic_body(2.0);
        b2.linear_velocity = Vector::new(5.0, 0.0);
        let mut joint = DistanceJoint::new(Point::origin(), Point::origin(), 2.0);

        for _ in 0..8 {
            joint.solve_velocity(&mut b1, &mut b2);
        }

        let rel_vel = b2.velocity_at_point(b2.pose * Point::origin()) - b1.velocity_at_point(b1.pose * Point::origin());
        assert!(rel_vel.x.abs() < 1e-3);
    }

    #[test]
    fn position_solve_shrinks_length_error() {
        let mut b1 = dynamic_body(0.0);
        let mut b2 = dynamic_body(3.0);
        let mut joint = DistanceJoint::new(Point::origin(), Point::origin(), 2.0);

        let first_error = joint.solve_position(&mut b1, &mut b2);
        let second_error = joint.solve_position(&mut b1, &mut b2);
        assert!(second_error < first_error);
    }
}
