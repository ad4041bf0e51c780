//! Arena-backed storage for rigid bodies, plus collider attachment.

use crate::data::arena::{Arena, Index};
use crate::dynamics::rigid_body::{AdjacencyEdge, RigidBody};
use crate::error::{PhysicsError, PhysicsResult};
use crate::geometry::collider::ColliderSet;
use crate::geometry::collider::Collider;
use crate::geometry::narrow_phase::NarrowPhase;

/// Owns every body in a world.
#[derive(Default)]
pub struct RigidBodySet {
    bodies: Arena<RigidBody>,
}

impl RigidBodySet {
    /// An empty set.
    pub fn new() -> Self {
        RigidBodySet { bodies: Arena::new() }
    }

    /// Inserts a body, returning its handle.
    pub fn insert(&mut self, body: RigidBody) -> Index {
        self.bodies.insert(body)
    }

    /// Removes a body and every fixture handle it carried (callers are
    /// responsible for removing those from the `ColliderSet` and
    /// broad-phase too).
    pub fn remove(&mut self, handle: Index) -> Option<RigidBody> {
        self.bodies.remove(handle)
    }

    /// Borrows a body.
    pub fn get(&self, handle: Index) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    /// Mutably borrows a body.
    pub fn get_mut(&mut self, handle: Index) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    /// Borrows two distinct bodies mutably at once (used by contact and
    /// joint solving, which touch both endpoints of a constraint).
    pub fn get_pair_mut(&mut self, a: Index, b: Index) -> (Option<&mut RigidBody>, Option<&mut RigidBody>) {
        self.bodies.get_pair_mut(a, b)
    }

    /// Looks up a body, failing with [`PhysicsError::NotFound`] rather
    /// than returning `Option`.
    pub fn require(&self, handle: Index) -> PhysicsResult<&RigidBody> {
        self.bodies.get(handle).ok_or(PhysicsError::NotFound)
    }

    /// Iterates over every `(handle, body)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (Index, &RigidBody)> {
        self.bodies.iter()
    }

    /// Mutably iterates over every `(handle, body)` pair.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Index, &mut RigidBody)> {
        self.bodies.iter_mut()
    }

    /// Number of bodies stored.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// True if no bodies are stored.
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Attaches `collider` to `body_handle`, inserting it into `colliders`
    /// and recomputing the body's mass properties from all its fixtures.
    ///
    /// # Errors
    /// Returns [`PhysicsError::NotFound`] if `body_handle` doesn't refer to
    /// a live body.
    pub fn attach_collider(
        &mut self,
        body_handle: Index,
        mut collider: Collider,
        colliders: &mut ColliderSet,
    ) -> PhysicsResult<Index> {
        if !self.bodies.contains(body_handle) {
            return Err(PhysicsError::NotFound);
        }
        collider.parent = Some(body_handle);
        let collider_handle = colliders.insert(collider);
        let body = self.bodies.get_mut(body_handle).expect("checked above");
        body.fixtures.push(collider_handle);
        self.recompute_mass(body_handle, colliders);
        Ok(collider_handle)
    }

    /// Recomputes a body's mass properties and rotation-disc radius from
    /// its currently-attached fixtures.
    pub fn recompute_mass(&mut self, body_handle: Index, colliders: &ColliderSet) {
        let Some(body) = self.bodies.get(body_handle) else {
            return;
        };
        let attached: Vec<&Collider> = body.fixtures.iter().filter_map(|&h| colliders.get(h)).collect();
        if let Some(body) = self.bodies.get_mut(body_handle) {
            body.recompute_mass_from_fixtures(&attached);
        }
    }

    /// Rebuilds every body's contact adjacency list from this step's
    /// touching, non-sensor manifolds, so [`crate::dynamics::island::build_islands`]
    /// can flood-fill across contacts the same way it does across joints.
    /// A manifold links its bodies only if at least one of its points is
    /// still `enabled`; a manifold every point of which a
    /// [`crate::pipeline::ContactListener`] has disabled contributes no
    /// adjacency edge. Rebuilt from scratch every step; nothing about it
    /// persists.
    pub fn sync_contact_graph(&mut self, narrow_phase: &NarrowPhase, colliders: &ColliderSet) {
        for (_, body) in self.bodies.iter_mut() {
            body.contact_edges.clear();
        }

        for (collider_a, collider_b, manifold) in narrow_phase.contact_pairs() {
            if !manifold.points.iter().any(|point| point.enabled) {
                continue;
            }
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
            let (ba, bb) = self.bodies.get_pair_mut(body_a, body_b);
            if let (Some(ba), Some(bb)) = (ba, bb) {
                ba.contact_edges.push(AdjacencyEdge { other: body_b, constraint: collider_a });
                bb.contact_edges.push(AdjacencyEdge { other: body_a, constraint: collider_a });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::rigid_body::RigidBodyType;
    use crate::geometry::collider::ColliderBuilder;
    use crate::geometry::shape::Ball;
    use crate::math::Isometry;

    #[test]
    fn attaching_a_fixture_gives_the_body_nonzero_mass() {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();
        let handle = bodies.insert(RigidBody::new(Isometry::identity(), RigidBodyType::Normal));
        bodies
            .attach_collider(handle, ColliderBuilder::new(Ball::new(1.0).unwrap().into()).build(), &mut colliders)
            .unwrap();
        assert!(bodies.get(handle).unwrap().mass_properties.mass > 0.0);
    }

    #[test]
    fn sync_contact_graph_links_touching_non_sensor_bodies() {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();
        let a = bodies.insert(RigidBody::new(Isometry::identity(), RigidBodyType::Normal));
        let b = bodies.insert(RigidBody::new(Isometry::translation(1.5, 0.0), RigidBodyType::Normal));
        let ca = bodies
            .attach_collider(a, ColliderBuilder::new(Ball::new(1.0).unwrap().into()).build(), &mut colliders)
            .unwrap();
        let cb = bodies
            .attach_collider(b, ColliderBuilder::new(Ball::new(1.0).unwrap().into()).build(), &mut colliders)
            .unwrap();

        let mut narrow_phase = NarrowPhase::new();
        let poses = |h: Index| bodies.get(if h == ca { a } else { b }).unwrap().pose;
        narrow_phase.update(&[(ca, cb)], &colliders, &poses, 0.01, 1e-4, &());

        bodies.sync_contact_graph(&narrow_phase, &colliders);
        assert_eq!(bodies.get(a).unwrap().contact_edges[0].other, b);
        assert_eq!(bodies.get(b).unwrap().contact_edges[0].other, a);
    }

    #[test]
    fn sync_contact_graph_ignores_manifolds_with_every_point_disabled() {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();
        let a = bodies.insert(RigidBody::new(Isometry::identity(), RigidBodyType::Normal));
        let b = bodies.insert(RigidBody::new(Isometry::translation(1.5, 0.0), RigidBodyType::Normal));
        let ca = bodies
            .attach_collider(a, ColliderBuilder::new(Ball::new(1.0).unwrap().into()).build(), &mut colliders)
            .unwrap();
        let cb = bodies
            .attach_collider(b, ColliderBuilder::new(Ball::new(1.0).unwrap().into()).build(), &mut colliders)
            .unwrap();

        struct RejectAll;
        impl crate::pipeline::ContactListener for RejectAll {
            fn begin(&self, _a: Index, _b: Index, _point: &crate::geometry::contact_manifold::ContactPoint) -> bool {
                false
            }
        }

        let mut narrow_phase = NarrowPhase::new();
        let poses = |h: Index| bodies.get(if h == ca { a } else { b }).unwrap().pose;
        narrow_phase.update(&[(ca, cb)], &colliders, &poses, 0.01, 1e-4, &RejectAll);

        bodies.sync_contact_graph(&narrow_phase, &colliders);
        assert!(bodies.get(a).unwrap().contact_edges.is_empty());
        assert!(bodies.get(b).unwrap().contact_edges.is_empty());
    }

    #[test]
    fn attaching_to_missing_body_reports_not_found() {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();
        let handle = bodies.insert(RigidBody::new(Isometry::identity(), RigidBodyType::Normal));
        bodies.remove(handle);
        let err = bodies
            .attach_collider(handle, ColliderBuilder::new(Ball::new(1.0).unwrap().into()).build(), &mut colliders)
            .unwrap_err();
        assert_eq!(err, PhysicsError::NotFound);
    }
}
