//! Island assembly: a per-step flood fill over the constraint graph,
//! grouping bodies that can affect each other into independent solve
//! units.

use crate::data::arena::Index;
use crate::dynamics::rigid_body::RigidBodyFlags;
use crate::dynamics::rigid_body_set::RigidBodySet;

/// One connected component of the constraint graph, ready to be handed to
/// the solver. Rebuilt from scratch every step; never persisted.
#[derive(Clone, Debug, Default)]
pub struct Island {
    /// Every body in the island (dynamic bodies that drive the flood fill,
    /// plus any static/kinematic bodies touched along the way).
    pub bodies: Vec<Index>,
    /// Joint handles whose constraint graph edge lies inside this island.
    pub joints: Vec<Index>,
}

/// Builds this step's islands by flood-filling the constraint graph
/// formed by each body's joint and contact adjacency edges.
///
/// Per spec.md §4.5: clears every body's `OnIsland` flag first; for each
/// awake dynamic body not yet islanded, flood-fills via a stack, pulling
/// in static/kinematic endpoints without propagating the flood through
/// them, then immediately clears their `OnIsland` flag again so they
/// remain eligible to join a different island later in the same sweep.
pub fn build_islands(bodies: &mut RigidBodySet) -> Vec<Island> {
    for (_, body) in bodies.iter_mut() {
        body.flags.remove(RigidBodyFlags::ON_ISLAND);
    }

    let awake_dynamic: Vec<Index> = bodies
        .iter()
        .filter(|(_, b)| b.is_dynamic() && !b.flags.contains(RigidBodyFlags::ASLEEP))
        .map(|(h, _)| h)
        .collect();

    let mut islands = Vec::new();

    for seed in awake_dynamic {
        if bodies.get(seed).map(|b| b.flags.contains(RigidBodyFlags::ON_ISLAND)) != Some(false) {
            continue;
        }

        let mut island = Island::default();
        let mut stack = vec![seed];
        let mut non_propagating = Vec::new();

        if let Some(body) = bodies.get_mut(seed) {
            body.flags.insert(RigidBodyFlags::ON_ISLAND);
        }

        while let Some(current) = stack.pop() {
            island.bodies.push(current);

            let Some(body) = bodies.get(current) else {
                continue;
            };
            let is_current_dynamic = body.is_dynamic();
            let contact_edges = body.contact_edges.clone();
            let joint_edges = body.joint_edges.clone();

            if !is_current_dynamic {
                // Static/kinematic bodies join the island but never
                // propagate the flood through their own edges.
                continue;
            }

            for edge in contact_edges {
                let already = bodies.get(edge.other).map(|b| b.flags.contains(RigidBodyFlags::ON_ISLAND)).unwrap_or(true);
                if !already {
                    if let Some(other_body) = bodies.get_mut(edge.other) {
                        other_body.flags.insert(RigidBodyFlags::ON_ISLAND);
                        if !other_body.is_dynamic() {
                            non_propagating.push(edge.other);
                        }
                    }
                    stack.push(edge.other);
                }
            }

            for edge in joint_edges {
                if !island.joints.contains(&edge.constraint) {
                    island.joints.push(edge.constraint);
                }
                let already = bodies.get(edge.other).map(|b| b.flags.contains(RigidBodyFlags::ON_ISLAND)).unwrap_or(true);
                if !already {
                    if let Some(other_body) = bodies.get_mut(edge.other) {
                        other_body.flags.insert(RigidBodyFlags::ON_ISLAND);
                        if !other_body.is_dynamic() {
                            non_propagating.push(edge.other);
                        }
                    }
                    stack.push(edge.other);
                }
            }
        }

        // Static/kinematic bodies re-clear `OnIsland` so they remain free
        // to join another island discovered later this sweep.
        for handle in non_propagating {
            if let Some(body) = bodies.get_mut(handle) {
                if !body.is_dynamic() {
                    body.flags.remove(RigidBodyFlags::ON_ISLAND);
                }
            }
        }

        islands.push(island);
    }

    islands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::rigid_body::{AdjacencyEdge, RigidBody, RigidBodyType};
    use crate::math::Isometry;

    #[test]
    fn two_disconnected_dynamic_bodies_form_two_islands() {
        let mut bodies = RigidBodySet::new();
        bodies.insert(RigidBody::new(Isometry::identity(), RigidBodyType::Normal));
        bodies.insert(RigidBody::new(Isometry::identity(), RigidBodyType::Normal));
        let islands = build_islands(&mut bodies);
        assert_eq!(islands.len(), 2);
    }

    #[test]
    fn contact_linked_bodies_share_one_island() {
        let mut bodies = RigidBodySet::new();
        let a = bodies.insert(RigidBody::new(Isometry::identity(), RigidBodyType::Normal));
        let b = bodies.insert(RigidBody::new(Isometry::identity(), RigidBodyType::Normal));
        bodies.get_mut(a).unwrap().contact_edges.push(AdjacencyEdge { other: b, constraint: Index::INVALID });
        bodies.get_mut(b).unwrap().contact_edges.push(AdjacencyEdge { other: a, constraint: Index::INVALID });

        let islands = build_islands(&mut bodies);
        assert_eq!(islands.len(), 1);
        assert_eq!(islands[0].bodies.len(), 2);
    }

    #[test]
    fn static_body_does_not_propagate_flood_but_can_rejoin_later_island() {
        let mut bodies = RigidBodySet::new();
        let ground = bodies.insert(RigidBody::new(Isometry::identity(), RigidBodyType::Infinite));
        let a = bodies.insert(RigidBody::new(Isometry::identity(), RigidBodyType::Normal));
        let b = bodies.insert(RigidBody::new(Isometry::identity(), RigidBodyType::Normal));

        bodies.get_mut(a).unwrap().contact_edges.push(AdjacencyEdge { other: ground, constraint: Index::INVALID });
        bodies.get_mut(b).unwrap().contact_edges.push(AdjacencyEdge { other: ground, constraint: Index::INVALID });

        let islands = build_islands(&mut bodies);
        // `a` and `b` should end up in separate islands (both touching the
        // static ground, but not each other), since the ground does not
        // propagate the flood.
        assert_eq!(islands.len(), 2);
    }

    #[test]
    fn asleep_bodies_are_skipped_as_seeds() {
        let mut bodies = RigidBodySet::new();
        let a = bodies.insert(RigidBody::new(Isometry::identity(), RigidBodyType::Normal));
        bodies.get_mut(a).unwrap().fall_asleep();
        let islands = build_islands(&mut bodies);
        assert!(islands.is_empty());
    }
}
