//! The contact manager: turns broad-phase candidate pairs into persistent
//! [`ContactManifold`]s, firing a begin/persist/end event per contact
//! point as that point is matched, re-matched, or dropped across steps.

use crate::data::arena::Index;
use crate::geometry::collider::ColliderSet;
use crate::geometry::contact_manifold::ContactManifold;
use crate::geometry::manifold::generate_manifold;
use crate::math::Isometry;
use crate::pipeline::ContactListener;
use std::collections::HashMap;

/// Squared distance (world units) within which two `Distance`-sentinel
/// contact points across steps are still considered the same physical
/// contact for warm-starting purposes.
pub const WARM_START_DISTANCE_SQUARED: f32 = 0.01 * 0.01;

/// A narrow-phase lifecycle event, queued during [`NarrowPhase::update`]
/// for the pipeline to dispatch to the world's event handler.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContactEvent {
    /// A pair of non-sensor colliders started touching.
    Started(Index, Index),
    /// A pair of non-sensor colliders stopped touching.
    Stopped(Index, Index),
    /// A sensor began overlapping another collider.
    SensedStarted(Index, Index),
    /// A sensor stopped overlapping another collider.
    SensedStopped(Index, Index),
}

/// Tracks every collider pair the broad phase currently reports as
/// possibly-touching, along with their persistent contact manifolds.
#[derive(Default)]
pub struct NarrowPhase {
    pairs: HashMap<(Index, Index), ContactManifold>,
    /// Collider pairs present as of the most recent `update`, used to
    /// detect which pairs disappeared (no longer reported by the broad
    /// phase, or separated beyond the prediction margin) since the last
    /// call.
    touching: std::collections::HashSet<(Index, Index)>,
}

fn pair_key(a: Index, b: Index) -> (Index, Index) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

impl NarrowPhase {
    /// An empty contact manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// The manifold currently stored for a pair, if any.
    pub fn manifold(&self, a: Index, b: Index) -> Option<&ContactManifold> {
        self.pairs.get(&pair_key(a, b))
    }

    /// Mutably borrows the manifold stored for a pair, if any (used by the
    /// solver to write back accumulated impulses after solving).
    pub fn manifold_mut(&mut self, a: Index, b: Index) -> Option<&mut ContactManifold> {
        self.pairs.get_mut(&pair_key(a, b))
    }

    /// Drops every manifold for pairs that no longer appear in
    /// `candidate_pairs` (the broad phase stopped reporting them as
    /// possibly overlapping), firing `end` for each of the retired
    /// manifold's points and returning the resulting `Stopped` events.
    fn retire_stale_pairs(
        &mut self,
        candidate_pairs: &[(Index, Index)],
        colliders: &ColliderSet,
        listener: &dyn ContactListener,
    ) -> Vec<ContactEvent> {
        let current: std::collections::HashSet<(Index, Index)> =
            candidate_pairs.iter().map(|&(a, b)| pair_key(a, b)).collect();
        let mut events = Vec::new();
        self.pairs.retain(|key, manifold| {
            let keep = current.contains(key);
            if !keep && self.touching.remove(key) {
                let is_sensor = colliders
                    .get(key.0)
                    .zip(colliders.get(key.1))
                    .map_or(false, |(a, b)| a.is_sensor || b.is_sensor);
                if is_sensor {
                    listener.sensed(key.0, key.1, false);
                    events.push(ContactEvent::SensedStopped(key.0, key.1));
                } else {
                    for point in &manifold.points {
                        listener.end(key.0, key.1, point);
                    }
                    events.push(ContactEvent::Stopped(key.0, key.1));
                }
            }
            keep
        });
        events
    }

    /// Rebuilds the manifold for every candidate pair reported by the
    /// broad phase, warm-starting against the previous step's accumulated
    /// impulses and firing begin/persist/end once per contact point
    /// depending on whether that point matched one from the previous
    /// step.
    ///
    /// `prediction_margin` is the speculative-contact distance beyond
    /// which a pair produces no manifold at all.
    /// `warm_start_distance_squared` is `IntegrationParameters::warm_start_distance_squared`.
    pub fn update(
        &mut self,
        candidate_pairs: &[(Index, Index)],
        colliders: &ColliderSet,
        poses: &dyn Fn(Index) -> Isometry,
        prediction_margin: f32,
        warm_start_distance_squared: f32,
        listener: &dyn ContactListener,
    ) -> Vec<ContactEvent> {
        let mut events = self.retire_stale_pairs(candidate_pairs, colliders, listener);

        for &(a, b) in candidate_pairs {
            let key = pair_key(a, b);
            let (Some(collider_a), Some(collider_b)) = (colliders.get(key.0), colliders.get(key.1)) else {
                continue;
            };

            let pose_a = poses(key.0) * collider_a.position;
            let pose_b = poses(key.1) * collider_b.position;

            let mut manifold = generate_manifold(
                &collider_a.shape,
                &pose_a,
                &collider_b.shape,
                &pose_b,
                prediction_margin,
            );

            let previous = self.pairs.get(&key).cloned();
            let now_touching = !manifold.points.is_empty();
            let was_touching = self.touching.contains(&key);
            let is_sensor = collider_a.is_sensor || collider_b.is_sensor;

            if is_sensor {
                if now_touching && !was_touching {
                    self.touching.insert(key);
                    listener.sensed(key.0, key.1, true);
                    events.push(ContactEvent::SensedStarted(key.0, key.1));
                } else if !now_touching && was_touching {
                    self.touching.remove(&key);
                    listener.sensed(key.0, key.1, false);
                    events.push(ContactEvent::SensedStopped(key.0, key.1));
                }
                self.pairs.insert(key, manifold);
                continue;
            }

            match &previous {
                Some(previous) => {
                    let matched = manifold.warm_start_from(previous, warm_start_distance_squared);
                    for (point, was_matched) in manifold.points.iter_mut().zip(&matched) {
                        let allowed = if was_matched.is_some() {
                            listener.persist(key.0, key.1, point)
                        } else {
                            listener.begin(key.0, key.1, point)
                        };
                        if !allowed {
                            point.enabled = false;
                        }
                    }
                    let rematched: std::collections::HashSet<usize> = matched.into_iter().flatten().collect();
                    for (index, prev_point) in previous.points.iter().enumerate() {
                        if !rematched.contains(&index) {
                            listener.end(key.0, key.1, prev_point);
                        }
                    }
                }
                None => {
                    for point in &mut manifold.points {
                        if !listener.begin(key.0, key.1, point) {
                            point.enabled = false;
                        }
                    }
                }
            }

            if now_touching && !was_touching {
                self.touching.insert(key);
                events.push(ContactEvent::Started(key.0, key.1));
            } else if !now_touching && was_touching {
                self.touching.remove(&key);
                events.push(ContactEvent::Stopped(key.0, key.1));
            }

            self.pairs.insert(key, manifold);
        }

        events
    }

    /// Called once per contact point of every touching, non-sensor pair
    /// immediately before the solver runs. Clears the `enabled` flag of
    /// whichever points the listener vetoes this step; the veto does not
    /// persist past the current step the way `begin`/`persist` rejection
    /// does.
    pub fn pre_solve_notify(&mut self, listener: &dyn ContactListener) {
        for (&(a, b), manifold) in self.pairs.iter_mut() {
            for point in &mut manifold.points {
                if !listener.pre_solve(a, b, point) {
                    point.enabled = false;
                }
            }
        }
    }

    /// Called once per contact point of every touching, non-sensor pair
    /// after the solver has computed its impulses, reporting the result
    /// to the listener.
    pub fn post_solve_notify(&self, listener: &dyn ContactListener) {
        use crate::pipeline::SolvedContactPoint;

        for (&(a, b), manifold) in self.pairs.iter() {
            for point in &manifold.points {
                let solved = SolvedContactPoint {
                    normal_impulse: point.normal_impulse,
                    tangent_impulse: point.tangent_impulse,
                };
                listener.post_solve(a, b, &solved);
            }
        }
    }

    /// Translates every persisted contact point's world-space coordinates by
    /// `delta`; each manifold's normal is a free direction and is left
    /// untouched.
    pub fn shift(&mut self, delta: crate::math::Vector) {
        for manifold in self.pairs.values_mut() {
            for point in &mut manifold.points {
                point.point_a.coords += delta;
                point.point_b.coords += delta;
            }
        }
    }

    /// Removes every manifold involving `handle` (called when a collider
    /// is removed from the world).
    pub fn remove_collider(&mut self, handle: Index) {
        self.pairs.retain(|&(a, b), _| a != handle && b != handle);
        self.touching.retain(|&(a, b)| a != handle && b != handle);
    }

    /// Every currently-touching, non-sensor manifold, for the solver to
    /// consume.
    pub fn contact_pairs(&self) -> impl Iterator<Item = (Index, Index, &ContactManifold)> {
        self.pairs
            .iter()
            .filter(|(_, m)| !m.points.is_empty())
            .map(|(&(a, b), m)| (a, b, m))
    }
}
