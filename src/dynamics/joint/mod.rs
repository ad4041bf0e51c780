//! Joints: equality constraints between two bodies, solved by the same
//! sequential-impulse machinery as contacts.

pub mod distance_joint;
pub mod prismatic_joint;
pub mod revolute_joint;
pub mod weld_joint;

pub use distance_joint::{DistanceJoint, DistanceJointBuilder};
pub use prismatic_joint::{PrismaticJoint, PrismaticJointBuilder};
pub use revolute_joint::{RevoluteJoint, RevoluteJointBuilder};
pub use weld_joint::{WeldJoint, WeldJointBuilder};

use crate::data::arena::{Arena, Index};
use crate::data::graph::InteractionGraph;
use crate::dynamics::rigid_body::{AdjacencyEdge, RigidBody};
use crate::dynamics::rigid_body_set::RigidBodySet;
use crate::error::{PhysicsError, PhysicsResult};
use crate::math::Real;

/// The constraint a [`Joint`] enforces, dispatched to the matching solver.
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug)]
pub enum JointKind {
    /// See [`DistanceJoint`].
    Distance(DistanceJoint),
    /// See [`RevoluteJoint`].
    Revolute(RevoluteJoint),
    /// See [`PrismaticJoint`].
    Prismatic(PrismaticJoint),
    /// See [`WeldJoint`].
    Weld(WeldJoint),
}

/// A joint linking two bodies: which bodies, and the constraint between
/// them.
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug)]
pub struct Joint {
    /// The first body this joint links.
    pub body1: Index,
    /// The second body this joint links.
    pub body2: Index,
    /// The constraint this joint enforces.
    pub kind: JointKind,
    /// This step's island assignment, set by island assembly and read by
    /// the solver; never meaningful across steps.
    pub island: Option<usize>,
}

impl Joint {
    fn new(body1: Index, body2: Index, kind: JointKind) -> Self {
        Joint {
            body1,
            body2,
            kind,
            island: None,
        }
    }

    /// Reapplies the joint's accumulated impulse from the previous step,
    /// before velocity iterations begin.
    pub fn warm_start(&mut self, b1: &mut RigidBody, b2: &mut RigidBody) {
        match &mut self.kind {
            JointKind::Distance(j) => j.warm_start(b1, b2),
            JointKind::Revolute(j) => j.warm_start(b1, b2),
            JointKind::Prismatic(j) => j.warm_start(b1, b2),
            JointKind::Weld(j) => j.warm_start(b1, b2),
        }
    }

    /// One velocity-iteration solve.
    pub fn solve_velocity(&mut self, b1: &mut RigidBody, b2: &mut RigidBody) {
        match &mut self.kind {
            JointKind::Distance(j) => j.solve_velocity(b1, b2),
            JointKind::Revolute(j) => j.solve_velocity(b1, b2),
            JointKind::Prismatic(j) => j.solve_velocity(b1, b2),
            JointKind::Weld(j) => j.solve_velocity(b1, b2),
        }
    }

    /// One position-iteration (NGS) solve, returning the worst residual.
    pub fn solve_position(&mut self, b1: &mut RigidBody, b2: &mut RigidBody) -> Real {
        match &mut self.kind {
            JointKind::Distance(j) => j.solve_position(b1, b2),
            JointKind::Revolute(j) => j.solve_position(b1, b2),
            JointKind::Prismatic(j) => j.solve_position(b1, b2),
            JointKind::Weld(j) => j.solve_position(b1, b2),
        }
    }
}

/// Owns every joint in a world, plus the adjacency graph used to find the
/// joints touching a given body without scanning the whole arena.
#[derive(Default)]
pub struct JointSet {
    joints: Arena<Joint>,
    graph: InteractionGraph<Index>,
}

impl JointSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a joint linking `body1` and `body2`, recording the adjacency
    /// edge on both bodies (for island assembly) and in the internal
    /// interaction graph (for `joints_touching`).
    ///
    /// # Errors
    /// Returns [`PhysicsError::NotFound`] if either body handle is not live.
    pub fn insert(&mut self, body1: Index, body2: Index, kind: JointKind, bodies: &mut RigidBodySet) -> PhysicsResult<Index> {
        if bodies.get(body1).is_none() || bodies.get(body2).is_none() {
            return Err(PhysicsError::NotFound);
        }
        let handle = self.joints.insert(Joint::new(body1, body2, kind));
        self.graph.insert_edge(body1, body2, handle);

        if let Some(b1) = bodies.get_mut(body1) {
            b1.joint_edges.push(AdjacencyEdge { other: body2, constraint: handle });
        }
        if let Some(b2) = bodies.get_mut(body2) {
            b2.joint_edges.push(AdjacencyEdge { other: body1, constraint: handle });
        }

        Ok(handle)
    }

    /// Removes a joint, clearing its adjacency edges from both bodies and
    /// the interaction graph.
    pub fn remove(&mut self, handle: Index, bodies: &mut RigidBodySet) -> Option<Joint> {
        let joint = self.joints.remove(handle)?;
        self.graph.remove_edge(joint.body1, joint.body2, handle);
        if let Some(b1) = bodies.get_mut(joint.body1) {
            b1.joint_edges.retain(|e| e.constraint != handle);
        }
        if let Some(b2) = bodies.get_mut(joint.body2) {
            b2.joint_edges.retain(|e| e.constraint != handle);
        }
        Some(joint)
    }

    /// Removes every joint touching `body` (called when a body is removed
    /// from the world).
    pub fn remove_body_joints(&mut self, body: Index, bodies: &mut RigidBodySet) {
        let touching: Vec<Index> = self.graph.neighbors(body).map(|e| e.payload).collect();
        for handle in touching {
            self.remove(handle, bodies);
        }
    }

    /// Every joint handle touching `body`.
    pub fn joints_touching(&self, body: Index) -> impl Iterator<Item = Index> + '_ {
        self.graph.neighbors(body).map(|e| e.payload)
    }

    /// Borrows a joint.
    pub fn get(&self, handle: Index) -> Option<&Joint> {
        self.joints.get(handle)
    }

    /// Mutably borrows a joint.
    pub fn get_mut(&mut self, handle: Index) -> Option<&mut Joint> {
        self.joints.get_mut(handle)
    }

    /// Mutably iterates over every `(handle, joint)` pair.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Index, &mut Joint)> {
        self.joints.iter_mut()
    }

    /// Number of joints stored.
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    /// True if no joints are stored.
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::rigid_body::RigidBodyType;
    use crate::math::{Isometry, Point};

    #[test]
    fn insert_records_adjacency_on_both_bodies() {
        let mut bodies = RigidBodySet::new();
        let a = bodies.insert(RigidBody::new(Isometry::identity(), RigidBodyType::Normal));
        let b = bodies.insert(RigidBody::new(Isometry::identity(), RigidBodyType::Normal));
        let mut joints = JointSet::new();
        let kind = JointKind::Distance(DistanceJoint::new(Point::origin(), Point::origin(), 1.0));
        let handle = joints.insert(a, b, kind, &mut bodies).unwrap();

        assert_eq!(bodies.get(a).unwrap().joint_edges[0].other, b);
        assert_eq!(bodies.get(b).unwrap().joint_edges[0].other, a);
        assert_eq!(joints.joints_touching(a).collect::<Vec<_>>(), vec![handle]);
    }

    #[test]
    fn insert_with_missing_body_reports_not_found() {
        let mut bodies = RigidBodySet::new();
        let a = bodies.insert(RigidBody::new(Isometry::identity(), RigidBodyType::Normal));
        let mut joints = JointSet::new();
        let kind = JointKind::Distance(DistanceJoint::new(Point::origin(), Point::origin(), 1.0));
        let err = joints.insert(a, Index::INVALID, kind, &mut bodies).unwrap_err();
        assert_eq!(err, PhysicsError::NotFound);
    }

    #[test]
    fn remove_clears_adjacency_and_graph() {
        let mut bodies = RigidBodySet::new();
        let a = bodies.insert(RigidBody::new(Isometry::identity(), RigidBodyType::Normal));
        let b = bodies.insert(RigidBody::new(Isometry::identity(), RigidBodyType::Normal));
        let mut joints = JointSet::new();
        let kind = JointKind::Distance(DistanceJoint::new(Point::origin(), Point::origin(), 1.0));
        let handle = joints.insert(a, b, kind, &mut bodies).unwrap();

        joints.remove(handle, &mut bodies);
        assert!(bodies.get(a).unwrap().joint_edges.is_empty());
        assert!(bodies.get(b).unwrap().joint_edges.is_empty());
        assert_eq!(joints.joints_touching(a).count(), 0);
    }
}
