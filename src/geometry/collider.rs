//! Colliders: the geometric fixtures attached to rigid bodies (or free
//! standing, for sensors), built with rapier-style builders.

use crate::data::arena::{Arena, Index};
use crate::error::{PhysicsError, PhysicsResult};
use crate::geometry::filter::InteractionGroups;
use crate::geometry::mass_properties::MassProperties;
use crate::geometry::shape::Shape;
use crate::math::{Isometry, Real};

/// A single geometric fixture: a shape plus the material and filtering
/// properties that govern how it participates in collision.
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug)]
pub struct Collider {
    /// The fixture's shape.
    pub shape: Shape,
    /// The fixture's pose relative to its parent body (or the world, if it
    /// has no parent).
    pub position: Isometry,
    /// Material density, used to derive mass properties when attached to a
    /// dynamic body.
    pub density: Real,
    /// Coulomb friction coefficient.
    pub friction: Real,
    /// Coefficient of restitution (bounciness).
    pub restitution: Real,
    /// Collision filtering bitsets/group.
    pub collision_groups: InteractionGroups,
    /// Sensors detect overlap (firing begin/end events) but never generate
    /// solver contacts.
    pub is_sensor: bool,
    /// The rigid body this collider is attached to, if any.
    pub parent: Option<Index>,
}

impl Collider {
    /// This fixture's mass properties at its own density, in its parent
    /// body's local frame (i.e. already offset by `self.position`).
    pub fn mass_properties(&self) -> MassProperties {
        let local = self.shape.as_convex().compute_mass(self.density);
        MassProperties {
            mass: local.mass,
            local_center: self.position * local.local_center,
            inertia: local.inertia + local.mass * self.position.translation.vector.norm_squared(),
        }
    }
}

/// Builds a [`Collider`] with rapier-style chained setters.
#[must_use]
#[derive(Clone, Debug)]
pub struct ColliderBuilder {
    shape: Shape,
    position: Isometry,
    density: Real,
    friction: Real,
    restitution: Real,
    collision_groups: InteractionGroups,
    is_sensor: bool,
}

impl ColliderBuilder {
    /// Starts building a collider around `shape`, with rapier's usual
    /// defaults: density 1, friction 0.5, restitution 0.
    pub fn new(shape: Shape) -> Self {
        ColliderBuilder {
            shape,
            position: Isometry::identity(),
            density: 1.0,
            friction: 0.5,
            restitution: 0.0,
            collision_groups: InteractionGroups::default(),
            is_sensor: false,
        }
    }

    /// Sets the fixture's pose relative to its parent body.
    pub fn position(mut self, position: Isometry) -> Self {
        self.position = position;
        self
    }

    /// Sets the fixture's material density.
    pub fn density(mut self, density: Real) -> Self {
        self.density = density;
        self
    }

    /// Sets the Coulomb friction coefficient.
    pub fn friction(mut self, friction: Real) -> Self {
        self.friction = friction;
        self
    }

    /// Sets the coefficient of restitution.
    pub fn restitution(mut self, restitution: Real) -> Self {
        self.restitution = restitution;
        self
    }

    /// Sets the collision filter.
    pub fn collision_groups(mut self, groups: InteractionGroups) -> Self {
        self.collision_groups = groups;
        self
    }

    /// Marks the collider as a sensor.
    pub fn sensor(mut self, is_sensor: bool) -> Self {
        self.is_sensor = is_sensor;
        self
    }

    /// Finalizes the collider, detached from any body (attach it via
    /// [`crate::dynamics::rigid_body_set::RigidBodySet::attach_collider`]).
    pub fn build(self) -> Collider {
        Collider {
            shape: self.shape,
            position: self.position,
            density: self.density,
            friction: self.friction,
            restitution: self.restitution,
            collision_groups: self.collision_groups,
            is_sensor: self.is_sensor,
            parent: None,
        }
    }
}

/// Arena-backed storage for every collider in a world.
#[derive(Default)]
pub struct ColliderSet {
    colliders: Arena<Collider>,
}

impl ColliderSet {
    /// An empty set.
    pub fn new() -> Self {
        ColliderSet { colliders: Arena::new() }
    }

    /// Inserts a collider, returning its handle.
    pub fn insert(&mut self, collider: Collider) -> Index {
        self.colliders.insert(collider)
    }

    /// Removes a collider.
    pub fn remove(&mut self, handle: Index) -> Option<Collider> {
        self.colliders.remove(handle)
    }

    /// Borrows a collider.
    pub fn get(&self, handle: Index) -> Option<&Collider> {
        self.colliders.get(handle)
    }

    /// Mutably borrows a collider.
    pub fn get_mut(&mut self, handle: Index) -> Option<&mut Collider> {
        self.colliders.get_mut(handle)
    }

    /// Looks up a collider, failing with [`PhysicsError::NotFound`] rather
    /// than returning `Option` — used at world-facing call sites where a
    /// missing handle is a caller error.
    pub fn require(&self, handle: Index) -> PhysicsResult<&Collider> {
        self.colliders.get(handle).ok_or(PhysicsError::NotFound)
    }

    /// Iterates over every `(handle, collider)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (Index, &Collider)> {
        self.colliders.iter()
    }

    /// Mutably iterates over every `(handle, collider)` pair.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Index, &mut Collider)> {
        self.colliders.iter_mut()
    }

    /// Number of colliders currently stored.
    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    /// True if no colliders are stored.
    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::shape::Ball;

    #[test]
    fn builder_defaults_match_documented_values() {
        let c = ColliderBuilder::new(Ball::new(1.0).unwrap().into()).build();
        assert_eq!(c.density, 1.0);
        assert_eq!(c.friction, 0.5);
        assert_eq!(c.restitution, 0.0);
        assert!(!c.is_sensor);
    }

    #[test]
    fn offset_collider_mass_includes_parallel_axis_term() {
        let shape: Shape = Ball::new(1.0).unwrap().into();
        let centered = ColliderBuilder::new(shape.clone()).build().mass_properties();
        let offset = ColliderBuilder::new(shape)
            .position(Isometry::translation(2.0, 0.0))
            .build()
            .mass_properties();
        assert!(offset.inertia > centered.inertia);
        assert_eq!(offset.mass, centered.mass);
    }
}
