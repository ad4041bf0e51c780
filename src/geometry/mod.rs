//! Geometric primitives and collision-detection pipeline stages: shapes,
//! AABBs, the broad-phase tree, GJK/EPA, manifold construction, and the
//! contact manager.

pub mod aabb;
pub mod broad_phase;
pub mod bvh;
pub mod collider;
pub mod contact_manifold;
pub mod epa;
pub mod filter;
pub mod gjk;
pub mod manifold;
pub mod mass_properties;
pub mod narrow_phase;
pub mod polygon_file;
pub mod ray;
pub mod shape;

pub use aabb::Aabb;
pub use broad_phase::BroadPhase;
pub use bvh::Bvh;
pub use collider::{Collider, ColliderBuilder, ColliderSet};
pub use contact_manifold::{ContactManifold, ContactPoint, FeatureId};
pub use filter::InteractionGroups;
pub use gjk::{gjk as gjk_query, GjkResult};
pub use mass_properties::MassProperties;
pub use narrow_phase::{ContactEvent, NarrowPhase};
pub use polygon_file::parse_polygon;
pub use ray::Ray;
pub use shape::{Ball, Capsule, ConvexPolygon, Convex, Segment, Shape};
