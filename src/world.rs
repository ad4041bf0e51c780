//! The world: owns every body, collider, and joint, and orchestrates one
//! simulation step through the pipeline stages of spec.md §4.6 — broad
//! phase, narrow phase, island assembly, solving, CCD, and listener
//! notification — the way `PhysicsPipeline::step` sequences rapier's stages,
//! but folded into a single owning struct instead of pipeline-plus-sets.

use crate::dynamics::ccd::{clamp_to_time_of_impact, time_of_impact};
use crate::dynamics::island::build_islands;
use crate::dynamics::joint::{Joint, JointKind, JointSet};
use crate::dynamics::rigid_body::{RigidBody, RigidBodyFlags};
use crate::dynamics::rigid_body_set::RigidBodySet;
use crate::dynamics::solver::solve_island;
use crate::dynamics::{ContinuousDetectionMode, IntegrationParameters};
use crate::error::PhysicsResult;
use crate::geometry::aabb::Aabb;
use crate::geometry::broad_phase::BroadPhase;
use crate::geometry::collider::{Collider, ColliderSet};
use crate::geometry::narrow_phase::NarrowPhase;
use crate::geometry::ray::Ray;
use crate::math::{Isometry, Real, Vector};
use crate::pipeline::{BoundsListener, ContactListener};
use crate::counters::Counters;
use crate::data::arena::Index;

/// Owns every body, collider, and joint in a simulation and advances them
/// one step at a time.
pub struct World {
    /// Constant acceleration applied to every dynamic body's velocity each
    /// step.
    pub gravity: Vector,
    /// Numerical tolerances and iteration counts for the solver and CCD.
    pub integration_parameters: IntegrationParameters,
    /// Every rigid body in the world.
    pub bodies: RigidBodySet,
    /// Every collider (fixture) in the world.
    pub colliders: ColliderSet,
    /// Every joint in the world.
    pub joints: JointSet,
    /// The broad-phase acceleration structure.
    pub broad_phase: BroadPhase,
    /// The narrow phase's persistent contact manifolds.
    pub narrow_phase: NarrowPhase,
    /// Per-stage step timers.
    pub counters: Counters,
    /// An optional axis-aligned region; bodies whose center of mass leaves
    /// it are reported to the [`BoundsListener`] and deactivated.
    pub bounds: Option<Aabb>,
    /// When a body leaves `bounds`, remove it outright instead of merely
    /// putting it to sleep.
    pub remove_out_of_bounds: bool,
}

impl World {
    /// Builds an empty world under the given gravity, with default
    /// integration parameters and no bounds region.
    pub fn new(gravity: Vector) -> Self {
        World {
            gravity,
            integration_parameters: IntegrationParameters::default(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            joints: JointSet::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            counters: Counters::new(),
            bounds: None,
            remove_out_of_bounds: false,
        }
    }

    /// Inserts a body, returning its handle.
    pub fn insert_rigid_body(&mut self, body: RigidBody) -> Index {
        self.bodies.insert(body)
    }

    /// Removes a body along with every fixture and joint attached to it.
    pub fn remove_rigid_body(&mut self, handle: Index) -> Option<RigidBody> {
        let body = self.bodies.remove(handle)?;
        for &fixture in &body.fixtures {
            self.colliders.remove(fixture);
            self.broad_phase.remove_fixture(fixture);
            self.narrow_phase.remove_collider(fixture);
        }
        self.joints.remove_body_joints(handle, &mut self.bodies);
        Some(body)
    }

    /// Attaches a collider to `parent`, inserting it into the broad phase
    /// immediately so it can be found before the next `step`.
    ///
    /// # Errors
    /// Returns [`crate::error::PhysicsError::NotFound`] if `parent` is not a
    /// live body handle.
    pub fn insert_collider(&mut self, parent: Index, collider: Collider) -> PhysicsResult<Index> {
        let handle = self.bodies.attach_collider(parent, collider, &mut self.colliders)?;
        let pose = self.bodies.get(parent).map(|b| b.pose).unwrap_or_else(Isometry::identity);
        let inserted = self.colliders.get(handle).expect("just inserted");
        self.broad_phase.update_fixture(handle, inserted, &pose);
        Ok(handle)
    }

    /// Inserts a free-standing collider with no parent body (e.g. a static
    /// sensor zone), at its own `position` in world space.
    pub fn insert_free_collider(&mut self, collider: Collider) -> Index {
        let handle = self.colliders.insert(collider);
        let inserted = self.colliders.get(handle).expect("just inserted");
        self.broad_phase.update_fixture(handle, inserted, &Isometry::identity());
        handle
    }

    /// Removes a collider, detaching it from its parent body (if any) and
    /// recomputing that body's mass properties.
    pub fn remove_collider(&mut self, handle: Index) -> Option<Collider> {
        let collider = self.colliders.remove(handle)?;
        self.broad_phase.remove_fixture(handle);
        self.narrow_phase.remove_collider(handle);
        if let Some(parent) = collider.parent {
            if let Some(body) = self.bodies.get_mut(parent) {
                body.fixtures.retain(|&f| f != handle);
            }
            self.bodies.recompute_mass(parent, &self.colliders);
        }
        Some(collider)
    }

    /// Links `body1` and `body2` with a new joint.
    ///
    /// # Errors
    /// Returns [`crate::error::PhysicsError::NotFound`] if either body
    /// handle is not live.
    pub fn insert_joint(&mut self, body1: Index, body2: Index, kind: JointKind) -> PhysicsResult<Index> {
        self.joints.insert(body1, body2, kind, &mut self.bodies)
    }

    /// Removes a joint.
    pub fn remove_joint(&mut self, handle: Index) -> Option<Joint> {
        self.joints.remove(handle, &mut self.bodies)
    }

    fn body_pose_of_collider(colliders: &ColliderSet, bodies: &RigidBodySet, handle: Index) -> Isometry {
        colliders
            .get(handle)
            .and_then(|c| c.parent)
            .and_then(|parent| bodies.get(parent))
            .map(|b| b.pose)
            .unwrap_or_else(Isometry::identity)
    }

    /// Refreshes every fixture's world AABB in the broad phase from its
    /// parent body's current pose.
    fn sync_broad_phase(&mut self) {
        let bodies = &self.bodies;
        for (handle, collider) in self.colliders.iter() {
            let pose = Self::body_pose_of_collider(&self.colliders, bodies, handle);
            self.broad_phase.update_fixture(handle, collider, &pose);
        }
    }

    /// Whether two fixtures should even be considered for narrow-phase
    /// testing: not the same parent body, and their collision groups agree.
    fn candidate_filter(colliders: &ColliderSet, a: Index, b: Index) -> bool {
        let (Some(ca), Some(cb)) = (colliders.get(a), colliders.get(b)) else {
            return false;
        };
        if ca.parent.is_some() && ca.parent == cb.parent {
            return false;
        }
        ca.collision_groups.test(&cb.collision_groups)
    }

    /// Runs continuous collision detection for every awake dynamic body
    /// this step's [`IntegrationParameters::continuous_detection_mode`]
    /// covers, rolling each one back to the earliest time of impact found
    /// against any candidate in its swept AABB.
    fn run_ccd(&mut self) {
        let mode = self.integration_parameters.continuous_detection_mode;
        if mode == ContinuousDetectionMode::None {
            return;
        }

        let candidates: Vec<Index> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.is_dynamic() && !b.flags.contains(RigidBodyFlags::ASLEEP))
            .filter(|(_, b)| mode == ContinuousDetectionMode::All || b.flags.contains(RigidBodyFlags::BULLET))
            .map(|(h, _)| h)
            .collect();

        for handle in candidates {
            let fixtures = match self.bodies.get(handle) {
                Some(body) => body.fixtures.clone(),
                None => continue,
            };

            let mut earliest: Option<Real> = None;

            for &fixture in &fixtures {
                let Some(collider) = self.colliders.get(fixture) else { continue };
                let Some(body) = self.bodies.get(handle) else { continue };
                let swept = collider
                    .shape
                    .as_convex()
                    .compute_aabb(&(body.previous_pose * collider.position))
                    .union(&collider.shape.as_convex().compute_aabb(&(body.pose * collider.position)));

                let others = self.broad_phase.query_aabb(&swept, |h| h != fixture);
                for other_fixture in others {
                    let Some(other_collider) = self.colliders.get(other_fixture) else { continue };
                    if collider.is_sensor || other_collider.is_sensor {
                        continue;
                    }
                    if !collider.collision_groups.test(&other_collider.collision_groups) {
                        continue;
                    }
                    let Some(other_handle) = other_collider.parent else { continue };
                    if other_handle == handle {
                        continue;
                    }
                    let (Some(this_body), Some(other_body)) = (self.bodies.get(handle), self.bodies.get(other_handle)) else {
                        continue;
                    };

                    if let Some(toi) = time_of_impact(
                        collider.shape.as_convex(),
                        collider.position,
                        this_body,
                        other_collider.shape.as_convex(),
                        other_collider.position,
                        other_body,
                        self.integration_parameters.ccd_tolerance,
                        self.integration_parameters.ccd_max_iterations,
                    ) {
                        earliest = Some(earliest.map_or(toi, |e: Real| e.min(toi)));
                    }
                }
            }

            if let Some(toi) = earliest {
                if let Some(body) = self.bodies.get_mut(handle) {
                    clamp_to_time_of_impact(body, toi);
                }
            }
        }
    }

    /// Reports and deactivates every body whose center of mass has left
    /// `self.bounds`, if one is set.
    fn enforce_bounds(&mut self, bounds_listener: &dyn BoundsListener) {
        let Some(bounds) = self.bounds else { return };

        let crossed: Vec<Index> = self
            .bodies
            .iter()
            .filter(|(_, b)| !b.flags.contains(RigidBodyFlags::ASLEEP))
            .filter(|(_, b)| {
                let p = b.world_center_of_mass();
                !bounds.contains(&Aabb::new(p, p))
            })
            .map(|(h, _)| h)
            .collect();

        for handle in crossed {
            bounds_listener.out_of_bounds(handle);
            if self.remove_out_of_bounds {
                self.remove_rigid_body(handle);
            } else if let Some(body) = self.bodies.get_mut(handle) {
                body.fall_asleep();
            }
        }
    }

    /// Advances the simulation by `self.integration_parameters.dt`, with no
    /// listener installed.
    pub fn step(&mut self) {
        self.step_with_listeners(&(), &());
    }

    /// Advances the simulation by `self.integration_parameters.dt`,
    /// sequencing broad phase, narrow phase, island assembly and solving,
    /// CCD, and listener notification exactly per spec.md §4.6.
    pub fn step_with_listeners(&mut self, contact_listener: &dyn ContactListener, bounds_listener: &dyn BoundsListener) {
        self.counters.reset();
        self.counters.step_time.resume();

        for (_, body) in self.bodies.iter_mut() {
            body.snapshot_previous_pose();
        }

        self.counters.stages.broad_phase_time.resume();
        self.sync_broad_phase();
        let colliders = &self.colliders;
        let pairs = self.broad_phase.detect_pairs(|a, b| Self::candidate_filter(colliders, a, b));
        self.counters.stages.broad_phase_time.pause();

        self.counters.stages.narrow_phase_time.resume();
        let colliders = &self.colliders;
        let bodies = &self.bodies;
        let poses = |h: Index| Self::body_pose_of_collider(colliders, bodies, h);
        self.narrow_phase.update(
            &pairs,
            colliders,
            &poses,
            self.integration_parameters.expansion,
            self.integration_parameters.warm_start_distance_squared(),
            contact_listener,
        );
        self.narrow_phase.pre_solve_notify(contact_listener);
        self.counters.stages.narrow_phase_time.pause();

        self.bodies.sync_contact_graph(&self.narrow_phase, &self.colliders);

        self.counters.stages.island_construction_time.resume();
        let islands = build_islands(&mut self.bodies);
        self.counters.stages.island_construction_time.pause();

        self.counters.stages.solver_time.resume();
        for island in &islands {
            solve_island(
                island,
                &mut self.bodies,
                &self.colliders,
                &mut self.narrow_phase,
                &mut self.joints,
                &self.integration_parameters,
                self.gravity,
            );
        }
        self.counters.stages.solver_time.pause();

        self.narrow_phase.post_solve_notify(contact_listener);

        self.counters.stages.ccd_time.resume();
        self.run_ccd();
        self.counters.stages.ccd_time.pause();

        self.enforce_bounds(bounds_listener);

        self.counters.step_time.pause();
    }

    /// Translates every body, every stored AABB, and every persisted
    /// contact point by `delta` — useful for keeping a scrolling world's
    /// coordinates from drifting to numerically unstable magnitudes.
    pub fn shift(&mut self, delta: Vector) {
        for (_, body) in self.bodies.iter_mut() {
            body.shift(delta);
        }
        self.broad_phase.shift(delta);
        self.narrow_phase.shift(delta);
        if let Some(bounds) = &mut self.bounds {
            *bounds = bounds.translated(delta);
        }
    }

    /// Every fixture handle whose fattened AABB overlaps `aabb` and for
    /// which `filter` returns `true`.
    pub fn query_aabb(&self, aabb: &Aabb, filter: impl FnMut(Index) -> bool) -> Vec<Index> {
        self.broad_phase.query_aabb(aabb, filter)
    }

    /// Casts `ray` against every fixture within `max_toi`, nearest first.
    pub fn raycast(&self, ray: &Ray, max_toi: Real, mut filter: impl FnMut(Index) -> bool) -> Vec<(Index, Real)> {
        let broad_hits = self.broad_phase.raycast(ray, max_toi, &mut filter);
        let mut hits: Vec<(Index, Real)> = Vec::new();
        for (handle, _) in broad_hits {
            let Some(collider) = self.colliders.get(handle) else { continue };
            let pose = Self::body_pose_of_collider(&self.colliders, &self.bodies, handle);
            let world_pose = pose * collider.position;
            let local_ray = Ray::new(world_pose.inverse() * ray.origin, world_pose.inverse() * ray.dir);
            if let Some(t) = crate::geometry::ray::cast_ray_at_convex(collider.shape.as_convex(), &local_ray, max_toi) {
                hits.push((handle, t));
            }
        }
        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        hits
    }
}
