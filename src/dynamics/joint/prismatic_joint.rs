//! Prismatic joints: constrain two bodies to slide along a shared axis,
//! locking every other relative degree of freedom, with optional
//! translation limits.

use crate::dynamics::rigid_body::RigidBody;
use crate::math::{cross, perp, Point, Real, Vector};

/// Slides along `local_axis1`, locking the perpendicular translation and
/// the relative rotation. Limits are expressed as signed translation along
/// the axis, measured from the position where the two anchors coincide.
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug)]
pub struct PrismaticJoint {
    /// Anchor in body 1's local frame.
    pub local_anchor1: Point,
    /// Anchor in body 2's local frame.
    pub local_anchor2: Point,
    /// Slide axis, in body 1's local frame (normalized at construction).
    pub local_axis1: Vector,
    /// Inclusive translation limits along the axis, if any.
    pub limits: Option<(Real, Real)>,
    /// Accumulated impulse for the two locked degrees of freedom
    /// (perpendicular translation, relative rotation).
    perp_impulse: Real,
    angular_impulse: Real,
    /// Accumulated impulse for the one-sided limit constraint, if active.
    limit_impulse: Real,
}

impl PrismaticJoint {
    /// Builds a new prismatic joint sliding along `local_axis1`.
    pub fn new(local_anchor1: Point, local_anchor2: Point, local_axis1: Vector) -> Self {
        let axis = if local_axis1.norm() > Real::EPSILON {
            local_axis1.normalize()
        } else {
            Vector::x()
        };
        PrismaticJoint {
            local_anchor1,
            local_anchor2,
            local_axis1: axis,
            limits: None,
            perp_impulse: 0.0,
            angular_impulse: 0.0,
            limit_impulse: 0.0,
        }
    }

    fn frame(&self, b1: &RigidBody, b2: &RigidBody) -> (Point, Point, Vector, Vector, Vector, Vector, Real) {
        let p1 = b1.pose * self.local_anchor1;
        let p2 = b2.pose * self.local_anchor2;
        let axis = b1.pose.rotation * self.local_axis1;
        let perp_axis = perp(axis);
        let r1 = p1 - b1.world_center_of_mass();
        let r2 = p2 - b2.world_center_of_mass();
        let d = p2 - p1;
        let translation = d.dot(&axis);
        (p1, p2, axis, perp_axis, r1, r2, translation)
    }

    /// Reapplies last step's accumulated impulses before velocity
    /// iterations begin.
    pub fn warm_start(&mut self, b1: &mut RigidBody, b2: &mut RigidBody) {
        let (p1, p2, axis, perp_axis, r1, r2, _translation) = self.frame(b1, b2);
        let s1 = cross(r1 + (p2 - p1), perp_axis);
        let s2 = cross(r2, perp_axis);

        let mut impulse = perp_axis * self.perp_impulse;
        if self.limits.is_some() {
            impulse += axis * self.limit_impulse;
        }

        b1.apply_impulse_at_point(-impulse, p1);
        b1.angular_velocity -= b1.inv_inertia() * (self.perp_impulse * s1 + self.angular_impulse);
        b2.apply_impulse_at_point(impulse, p2);
        b2.angular_velocity += b2.inv_inertia() * (self.perp_impulse * s2 + self.angular_impulse);
    }

    /// One velocity-iteration solve: locks perpendicular translation and
    /// relative rotation, then clamps translation against any limit.
    pub fn solve_velocity(&mut self, b1: &mut RigidBody, b2: &mut RigidBody) {
        let (p1, p2, axis, perp_axis, r1, r2, translation) = self.frame(b1, b2);
        let (im1, im2) = (b1.inv_mass(), b2.inv_mass());
        let (ii1, ii2) = (b1.inv_inertia(), b2.inv_inertia());

        // Locked perpendicular translation + relative angle, solved as a
        // coupled 2x2 system the way rapier's prismatic joint does.
        let s1 = cross(r1 + (p2 - p1), perp_axis);
        let s2 = cross(r2, perp_axis);
        let k11 = im1 + im2 + ii1 * s1 * s1 + ii2 * s2 * s2;
        let k12 = ii1 * s1 + ii2 * s2;
        let k22 = ii1 + ii2;
        let k22 = if k22 > 0.0 { k22 } else { 1.0 };

        let rel_vel = b2.velocity_at_point(p2) - b1.velocity_at_point(p1);
        let cdot1 = rel_vel.dot(&perp_axis);
        let cdot2 = b2.angular_velocity - b1.angular_velocity;

        let det = k11 * k22 - k12 * k12;
        let (lambda1, lambda2) = if det.abs() > Real::EPSILON {
            let inv_det = 1.0 / det;
            (
                inv_det * (k22 * -cdot1 - k12 * -cdot2),
                inv_det * (k11 * -cdot2 - k12 * -cdot1),
            )
        } else {
            (0.0, 0.0)
        };
        self.perp_impulse += lambda1;
        self.angular_impulse += lambda2;

        let p_impulse = perp_axis * lambda1;
        b1.apply_impulse_at_point(-p_impulse, p1);
        b1.angular_velocity -= ii1 * (lambda1 * s1 + lambda2);
        b2.apply_impulse_at_point(p_impulse, p2);
        b2.angular_velocity += ii2 * (lambda1 * s2 + lambda2);

        if let Some((lower, upper)) = self.limits {
            let rn1 = cross(r1, axis);
            let rn2 = cross(r2, axis);
            let k = im1 + im2 + rn1 * rn1 * ii1 + rn2 * rn2 * ii2;
            if k > 0.0 {
                let rel_vel = b2.velocity_at_point(p2) - b1.velocity_at_point(p1);
                let vn = rel_vel.dot(&axis);
                let mut lambda = -vn / k;
                let old_impulse = self.limit_impulse;
                if translation <= lower {
                    self.limit_impulse = (old_impulse + lambda).max(0.0);
                } else if translation >= upper {
                    self.limit_impulse = (old_impulse + lambda).min(0.0);
                } else {
                    self.limit_impulse = 0.0;
                }
                lambda = self.limit_impulse - old_impulse;

                let impulse = axis * lambda;
                b1.apply_impulse_at_point(-impulse, p1);
                b2.apply_impulse_at_point(impulse, p2);
            }
        }
    }

    /// One position-iteration (NGS) correction for the perpendicular
    /// translation and relative angle. Returns the residual perpendicular
    /// separation. Limit correction is intentionally left to the velocity
    /// pass, the usual treatment of one-sided contact limits.
    pub fn solve_position(&mut self, b1: &mut RigidBody, b2: &mut RigidBody) -> Real {
        let (p1, p2, _axis, perp_axis, r1, r2, _translation) = self.frame(b1, b2);
        let (im1, im2) = (b1.inv_mass(), b2.inv_mass());
        let (ii1, ii2) = (b1.inv_inertia(), b2.inv_inertia());

        let c1 = (p2 - p1).dot(&perp_axis);
        let c2 = b2.pose.rotation.angle() - b1.pose.rotation.angle();

        let s1 = cross(r1 + (p2 - p1), perp_axis);
        let s2 = cross(r2, perp_axis);
        let k11 = im1 + im2 + ii1 * s1 * s1 + ii2 * s2 * s2;
        let k12 = ii1 * s1 + ii2 * s2;
        let k22 = (ii1 + ii2).max(1.0);

        let det = k11 * k22 - k12 * k12;
        let (lambda1, lambda2) = if det.abs() > Real::EPSILON {
            let inv_det = 1.0 / det;
            (
                inv_det * (k22 * -c1 - k12 * -c2),
                inv_det * (k11 * -c2 - k12 * -c1),
            )
        } else {
            (0.0, 0.0)
        };

        let correction = perp_axis * lambda1;
        b1.pose.translation.vector -= correction * im1;
        b1.pose.rotation = crate::math::Rotation::new(b1.pose.rotation.angle() - ii1 * (lambda1 * s1 + lambda2));
        b2.pose.translation.vector += correction * im2;
        b2.pose.rotation = crate::math::Rotation::new(b2.pose.rotation.angle() + ii2 * (lambda1 * s2 + lambda2));

        c1.abs()
    }
}

/// Builds a [`PrismaticJoint`] with rapier-style chained setters.
#[derive(Clone, Debug)]
pub struct PrismaticJointBuilder {
    local_anchor1: Point,
    local_anchor2: Point,
    local_axis1: Vector,
    limits: Option<(Real, Real)>,
}

impl PrismaticJointBuilder {
    /// Starts building a joint sliding along `local_axis1`, anchored at
    /// each body's origin until overridden.
    pub fn new(local_axis1: Vector) -> Self {
        PrismaticJointBuilder {
            local_anchor1: Point::origin(),
            local_anchor2: Point::origin(),
            local_axis1,
            limits: None,
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

    /// Restricts translation along the axis to `[lower, upper]`.
    pub fn limits(mut self, lower: Real, upper: Real) -> Self {
        self.limits = Some((lower, upper));
        self
    }

    /// Finalizes the joint.
    pub fn build(self) -> PrismaticJoint {
        let mut joint = PrismaticJoint::new(self.local_anchor1, self.local_anchor2, self.local_axis1);
        joint.limits = self.limits;
        joint
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
    fn velocity_solve_removes_perpendicular_drift() {
        let mut b1 = dynamic_body(0.0, 0.0);
        let mut b2 = dynamic_body(2.0, 0.0);
        b2.linear_velocity = Vector::new(0.0, 3.0);
        let mut joint = PrismaticJoint::new(Point::origin(), Point::origin(), Vector::x());

        for _ in 0..8 {
            joint.solve_velocity(&mut b1, &mut b2);
        }

        let p1 = b1.pose * joint.local_anchor1;
        let p2 = b2.pose * joint.local_anchor2;
        let axis = b1.pose.rotation * joint.local_axis1;
        let perp_axis = perp(axis);
        let rel_vel = b2.velocity_at_point(p2) - b1.velocity_at_point(p1);
        assert!(rel_vel.dot(&perp_axis).abs() < 1e-3);
    }

    #[test]
    fn limit_prevents_exceeding_upper_bound() {
        let mut b1 = dynamic_body(0.0, 0.0);
        let mut b2 = dynamic_body(1.0, 0.0);
        b2.linear_velocity = Vector::new(5.0, 0.0);
        let mut joint = PrismaticJoint::new(Point::origin(), Point::origin(), Vector::x());
        joint.limits = Some((-1.0, 1.0));

        for _ in 0..8 {
            joint.solve_velocity(&mut b1, &mut b2);
        }

        let rel_vel = b2.velocity_at_point(b2.pose * Point::origin()) - b1.velocity_at_point(b1.pose * Point::origin());
        assert!(rel_vel.x <= 1e-3);
    }
}
