//! Revolute joints: pin two bodies together at a shared point while
//! leaving relative rotation free.

use crate::dynamics::rigid_body::RigidBody;
use crate::math::{cross, Matrix, Point, Real, Vector};

/// Keeps two body-local anchors coincident in world space.
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug)]
pub struct RevoluteJoint {
    /// Anchor in body 1's local frame.
    pub local_anchor1: Point,
    /// Anchor in body 2's local frame.
    pub local_anchor2: Point,
    impulse: Vector,
}

impl RevoluteJoint {
    /// Builds a new revolute joint pinning the two local anchors together.
    pub fn new(local_anchor1: Point, local_anchor2: Point) -> Self {
        RevoluteJoint {
            local_anchor1,
            local_anchor2,
            impulse: Vector::zeros(),
        }
    }

    fn anchors(&self, b1: &RigidBody, b2: &RigidBody) -> (Point, Point, Vector, Vector) {
        let p1 = b1.pose * self.local_anchor1;
        let p2 = b2.pose * self.local_anchor2;
        let r1 = p1 - b1.world_center_of_mass();
        let r2 = p2 - b2.world_center_of_mass();
        (p1, p2, r1, r2)
    }

    fn k_matrix(b1: &RigidBody, b2: &RigidBody, r1: Vector, r2: Vector) -> Matrix {
        let (im1, im2) = (b1.inv_mass(), b2.inv_mass());
        let (ii1, ii2) = (b1.inv_inertia(), b2.inv_inertia());
        let k11 = im1 + im2 + ii1 * r1.y * r1.y + ii2 * r2.y * r2.y;
        let k12 = -ii1 * r1.x * r1.y - ii2 * r2.x * r2.y;
        let k22 = im1 + im2 + ii1 * r1.x * r1.x + ii2 * r2.x * r2.x;
        Matrix::new(k11, k12, k12, k22)
    }

    /// Reapplies last step's accumulated impulse before velocity iterations
    /// begin.
    pub fn warm_start(&mut self, b1: &mut RigidBody, b2: &mut RigidBody) {
        let (p1, p2, _, _) = self.anchors(b1, b2);
        b1.apply_impulse_at_point(-self.impulse, p1);
        b2.apply_impulse_at_point(self.impulse, p2);
    }

    /// One velocity-iteration solve: drives the anchors' relative velocity
    /// to zero.
    pub fn solve_velocity(&mut self, b1: &mut RigidBody, b2: &mut RigidBody) {
        let (p1, p2, r1, r2) = self.anchors(b1, b2);
        let k = Self::k_matrix(b1, b2, r1, r2);
        let Some(k_inv) = k.try_inverse() else { return };

        let rel_vel = b2.velocity_at_point(p2) - b1.velocity_at_point(p1);
        let impulse = -(k_inv * rel_vel);
        self.impulse += impulse;

        b1.apply_impulse_at_point(-impulse, p1);
        b2.apply_impulse_at_point(impulse, p2);
    }

    /// One position-iteration (NGS) correction, returning the residual
    /// anchor separation.
    pub fn solve_position(&mut self, b1: &mut RigidBody, b2: &mut RigidBody) -> Real {
        let (p1, p2, r1, r2) = self.anchors(b1, b2);
        let c = p2 - p1;
        let k = Self::k_matrix(b1, b2, r1, r2);
        let Some(k_inv) = k.try_inverse() else { return c.norm() };
        let correction = -(k_inv * c);

        b1.pose.translation.vector -= correction * b1.inv_mass();
        b1.pose.rotation = crate::math::Rotation::new(b1.pose.rotation.angle() - b1.inv_inertia() * cross(r1, correction));
        b2.pose.translation.vector += correction * b2.inv_mass();
        b2.pose.rotation = crate::math::Rotation::new(b2.pose.rotation.angle() + b2.inv_inertia() * cross(r2, correction));

        c.norm()
    }
}

/// Builds a [`RevoluteJoint`] with rapier-style chained setters.
#[derive(Clone, Debug)]
pub struct RevoluteJointBuilder {
    local_anchor1: Point,
    local_anchor2: Point,
}

impl RevoluteJointBuilder {
    /// Starts building a joint pinned at each body's origin until
    /// overridden.
    pub fn new() -> Self {
        RevoluteJointBuilder {
            local_anchor1: Point::origin(),
            local_anchor2: Point::origin(),
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
    pub fn build(self) -> RevoluteJoint {
        RevoluteJoint::new(self.local_anchor1, self.local_anchor2)
    }
}

impl Default for RevoluteJointBuilder {
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
    fn velocity_solve_pins_anchor_velocities_together() {
        let mut b1 = dynamic_body(0.0, 0.0);
        let mut b2 = dynamic_body(1.0, 0.0);
        b2.linear_velocity = Vector::new(0.0, 4.0);
        let mut joint = RevoluteJoint::new(Point::new(0.5, 0.0), Point::new(-0.5, 0.0));

        for _ in 0..8 {
            joint.solve_velocity(&mut b1, &mut b2);
        }

        let p1 = b1.pose * joint.local_anchor1;
        let p2 = b2.pose * joint.local_anchor2;
        let rel_vel = b2.velocity_at_point(p2) - b1.velocity_at_point(p1);
        assert!(rel_vel.norm() < 1e-3);
    }

    #[test]
    fn position_solve_shrinks_anchor_gap() {
        let mut b1 = dynamic_body(0.0, 0.0);
        let mut b2 = dynamic_body(1.2, 0.0);
        let mut joint = RevoluteJoint::new(Point::new(0.5, 0.0), Point::new(-0.5, 0.0));

        let first_error = joint.solve_position(&mut b1, &mut b2);
        let second_error = joint.solve_position(&mut b1, &mut b2);
        assert!(second_error < first_error);
    }
}
