//! Bodies, joints, islands, and the solver: everything that advances the
//! simulation once the narrow phase has produced this step's contacts.

pub mod ccd;
pub mod integration_parameters;
pub mod island;
pub mod joint;
pub mod rigid_body;
pub mod rigid_body_set;
pub mod solver;

pub use integration_parameters::{ContinuousDetectionMode, IntegrationParameters};
pub use island::{build_islands, Island};
pub use joint::{DistanceJoint, DistanceJointBuilder, Joint, JointKind, JointSet, PrismaticJoint, PrismaticJointBuilder, RevoluteJoint, RevoluteJointBuilder, WeldJoint, WeldJointBuilder};
pub use rigid_body::{AdjacencyEdge, ForceGenerator, RigidBody, RigidBodyFlags, RigidBodyType};
pub use rigid_body_set::RigidBodySet;
pub use solver::solve_island;
