//! The broad phase: a thin wrapper around the [`Bvh`] that tracks fixture
//! AABBs in world space and turns tree overlaps into candidate pairs for
//! the narrow phase.

use crate::data::arena::Index;
use crate::geometry::aabb::Aabb;
use crate::geometry::bvh::Bvh;
use crate::geometry::collider::Collider;
use crate::geometry::ray::Ray;
use crate::math::{Isometry, Real, Vector};

/// Wraps a [`Bvh`] keyed by collider handle, computing each fixture's world
/// AABB from its parent body's pose and its own local position.
#[derive(Default)]
pub struct BroadPhase {
    tree: Bvh,
}

impl BroadPhase {
    /// An empty broad phase with the default AABB fattening margin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the AABB fattening margin used by future inserts/updates.
    pub fn set_expansion(&mut self, expansion: Real) {
        self.tree.set_expansion(expansion);
    }

    /// The current AABB fattening margin.
    pub fn get_expansion(&self) -> Real {
        self.tree.get_expansion()
    }

    /// Computes `collider`'s world AABB given its parent body's pose (pass
    /// [`Isometry::identity`] for a fixture with no parent body).
    fn world_aabb(collider: &Collider, body_pose: &Isometry) -> Aabb {
        let pose = body_pose * collider.position;
        collider.shape.as_convex().compute_aabb(&pose)
    }

    /// Inserts or refreshes `handle`'s AABB in the tree, adding it if this
    /// is the first time the handle has been seen.
    pub fn update_fixture(&mut self, handle: Index, collider: &Collider, body_pose: &Isometry) {
        let aabb = Self::world_aabb(collider, body_pose);
        if self.tree.get_aabb(handle).is_some() {
            self.tree.update(handle, aabb);
        } else {
            self.tree.add(handle, aabb);
        }
    }

    /// Removes `handle` from the tree (called when a collider is detached
    /// or its owning body is removed).
    pub fn remove_fixture(&mut self, handle: Index) {
        self.tree.remove(handle);
    }

    /// Every pair of fixtures whose fattened AABBs overlap and for which
    /// `filter` returns `true`. `filter` is typically an
    /// [`crate::geometry::filter::InteractionGroups`] test plus a
    /// same-body exclusion.
    pub fn detect_pairs(&self, mut filter: impl FnMut(Index, Index) -> bool) -> Vec<(Index, Index)> {
        self.tree
            .detect_pairs()
            .into_iter()
            .filter(|&(a, b)| filter(a, b))
            .collect()
    }

    /// Every fixture handle whose fattened AABB overlaps `aabb` and for
    /// which `filter` returns `true`.
    pub fn query_aabb(&self, aabb: &Aabb, mut filter: impl FnMut(Index) -> bool) -> Vec<Index> {
        self.tree
            .query_aabb(aabb)
            .into_iter()
            .filter(|&h| filter(h))
            .collect()
    }

    /// Every fixture handle along `ray`'s path within `[0, max_toi]` for
    /// which `filter` returns `true`, nearest first.
    pub fn raycast(&self, ray: &Ray, max_toi: Real, mut filter: impl FnMut(Index) -> bool) -> Vec<(Index, Real)> {
        let mut hits: Vec<(Index, Real)> = self
            .tree
            .query_ray(ray, max_toi)
            .into_iter()
            .filter(|&(h, _)| filter(h))
            .collect();
        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        hits
    }

    /// The current (fattened) world AABB stored for `handle`.
    pub fn get_aabb(&self, handle: Index) -> Option<Aabb> {
        self.tree.get_aabb(handle)
    }

    /// Translates every stored AABB by `delta`.
    pub fn shift(&mut self, delta: Vector) {
        self.tree.shift(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::collider::ColliderBuilder;
    use crate::geometry::shape::Ball;

    fn ball_collider() -> Collider {
        ColliderBuilder::new(Ball::new(1.0).unwrap().into()).build()
    }

    #[test]
    fn first_update_adds_the_fixture() {
        let mut broad_phase = BroadPhase::new();
        let collider = ball_collider();
        let handle = crate::data::arena::Arena::<()>::new().insert(());
        broad_phase.update_fixture(handle, &collider, &Isometry::identity());
        assert!(broad_phase.get_aabb(handle).is_some());
    }

    #[test]
    fn overlapping_fixtures_are_reported_as_a_candidate_pair() {
        let mut broad_phase = BroadPhase::new();
        let collider = ball_collider();
        let mut arena = crate::data::arena::Arena::<()>::new();
        let a = arena.insert(());
        let b = arena.insert(());
        broad_phase.update_fixture(a, &collider, &Isometry::translation(0.0, 0.0));
        broad_phase.update_fixture(b, &collider, &Isometry::translation(0.5, 0.0));
        let pairs = broad_phase.detect_pairs(|_, _| true);
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn removed_fixture_no_longer_overlaps() {
        let mut broad_phase = BroadPhase::new();
        let collider = ball_collider();
        let mut arena = crate::data::arena::Arena::<()>::new();
        let a = arena.insert(());
        let b = arena.insert(());
        broad_phase.update_fixture(a, &collider, &Isometry::translation(0.0, 0.0));
        broad_phase.update_fixture(b, &collider, &Isometry::translation(0.5, 0.0));
        broad_phase.remove_fixture(b);
        let pairs = broad_phase.detect_pairs(|_, _| true);
        assert!(pairs.is_empty());
    }

    #[test]
    fn shift_moves_every_stored_aabb() {
        let mut broad_phase = BroadPhase::new();
        let collider = ball_collider();
        let handle = crate::data::arena::Arena::<()>::new().insert(());
        broad_phase.update_fixture(handle, &collider, &Isometry::identity());
        let before = broad_phase.get_aabb(handle).unwrap();
        broad_phase.shift(Vector::new(5.0, 0.0));
        let after = broad_phase.get_aabb(handle).unwrap();
        assert!((after.mins.x - before.mins.x - 5.0).abs() < 1e-4);
    }
}
