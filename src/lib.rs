//! impulse2d: a 2D sequential-impulse rigid-body physics engine.
//!
//! A [`World`] owns every body, collider, and joint, and advances them one
//! step at a time through broad phase, narrow phase, island assembly,
//! sequential-impulse solving, and continuous collision detection. Shapes,
//! bodies, and joints are built with rapier-style chained builders
//! (`ColliderBuilder`, `DistanceJointBuilder`, `RevoluteJointBuilder`,
//! `PrismaticJointBuilder`, `WeldJointBuilder`); everything else is reached
//! through handles returned by `World`'s insert methods, which stay valid
//! across steps and across the removal/reuse of unrelated slots.
//!
//! ```
//! use impulse2d::{World, RigidBody, RigidBodyType, ColliderBuilder, Ball};
//! use impulse2d::math::{Isometry, Vector};
//!
//! let mut world = World::new(Vector::new(0.0, -9.8));
//! let ground = world.insert_rigid_body(RigidBody::new(Isometry::translation(0.0, 0.0), RigidBodyType::Infinite));
//! world.insert_collider(ground, ColliderBuilder::new(Ball::new(1.0).unwrap().into()).build()).unwrap();
//!
//! let ball = world.insert_rigid_body(RigidBody::new(Isometry::translation(0.0, 5.0), RigidBodyType::Normal));
//! world.insert_collider(ball, ColliderBuilder::new(Ball::new(1.0).unwrap().into()).build()).unwrap();
//!
//! for _ in 0..60 {
//!     world.step();
//! }
//! ```

pub mod counters;
pub mod data;
pub mod dynamics;
pub mod error;
pub mod geometry;
pub mod math;
pub mod pipeline;
pub mod world;

pub use counters::Counters;
pub use data::arena::Index;
pub use dynamics::{
    ContinuousDetectionMode, DistanceJoint, DistanceJointBuilder, IntegrationParameters, Joint, JointKind, JointSet, PrismaticJoint,
    PrismaticJointBuilder, RevoluteJoint, RevoluteJointBuilder, RigidBody, RigidBodyFlags, RigidBodySet, RigidBodyType, WeldJoint,
    WeldJointBuilder,
};
pub use error::{PhysicsError, PhysicsResult};
pub use geometry::{
    parse_polygon, Aabb, Ball, BroadPhase, Capsule, Collider, ColliderBuilder, ColliderSet, ContactEvent, ContactManifold, ContactPoint,
    Convex, ConvexPolygon, FeatureId, InteractionGroups, NarrowPhase, Ray, Segment, Shape,
};
pub use pipeline::{BoundsListener, ContactListener, SolvedContactPoint};
pub use world::World;
