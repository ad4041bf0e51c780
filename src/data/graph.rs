//! A small undirected multigraph over body handles, used to track which
//! bodies are linked by an active joint.
//!
//! [`crate::dynamics::joint::JointSet`] maintains one of these so
//! `joints_touching`/`remove_body_joints` don't have to scan the whole joint
//! arena. Contact adjacency is tracked separately, directly on each body
//! (`RigidBody::contact_edges`, rebuilt every step by
//! `RigidBodySet::sync_contact_graph`), since it is rebuilt wholesale each
//! step rather than incrementally maintained.

use crate::data::Index;
use std::collections::HashMap;

/// One edge of the graph: the other endpoint plus a payload identifying the
/// interaction (a contact-constraint or joint handle).
#[derive(Copy, Clone, Debug)]
pub struct Edge<P> {
    /// The body at the other end of this edge.
    pub other: Index,
    /// The interaction this edge represents (a contact or joint handle).
    pub payload: P,
}

/// An adjacency-list graph over body handles.
#[derive(Default)]
pub struct InteractionGraph<P> {
    edges: HashMap<Index, Vec<Edge<P>>>,
}

impl<P: Copy> InteractionGraph<P> {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            edges: HashMap::new(),
        }
    }

    /// Adds an edge between `a` and `b` carrying `payload`. Both directions
    /// are recorded so `neighbors` works from either endpoint.
    pub fn insert_edge(&mut self, a: Index, b: Index, payload: P) {
        self.edges.entry(a).or_default().push(Edge { other: b, payload });
        self.edges.entry(b).or_default().push(Edge { other: a, payload });
    }

    /// Removes a single edge between `a` and `b` carrying `payload` (both
    /// directions), leaving any other edges between the two untouched.
    pub fn remove_edge(&mut self, a: Index, b: Index, payload: P)
    where
        P: PartialEq,
    {
        if let Some(others) = self.edges.get_mut(&a) {
            if let Some(pos) = others.iter().position(|e| e.other == b && e.payload == payload) {
                others.remove(pos);
            }
        }
        if let Some(others) = self.edges.get_mut(&b) {
            if let Some(pos) = others.iter().position(|e| e.other == a && e.payload == payload) {
                others.remove(pos);
            }
        }
    }

    /// Removes every edge touching `body`.
    pub fn remove_node(&mut self, body: Index) {
        if let Some(removed) = self.edges.remove(&body) {
            for edge in removed {
                if let Some(others) = self.edges.get_mut(&edge.other) {
                    others.retain(|e| !(e.other == body));
                }
            }
        }
    }

    /// Iterates the edges touching `body`.
    pub fn neighbors(&self, body: Index) -> impl Iterator<Item = &Edge<P>> {
        self.edges.get(&body).into_iter().flatten()
    }

    /// Removes all edges.
    pub fn clear(&mut self) {
        self.edges.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Arena;

    #[test]
    fn neighbors_visible_from_both_endpoints() {
        let mut bodies: Arena<()> = Arena::new();
        let a = bodies.insert(());
        let b = bodies.insert(());
        let mut graph: InteractionGraph<u32> = InteractionGraph::new();
        graph.insert_edge(a, b, 7);

        let from_a: Vec<_> = graph.neighbors(a).map(|e| (e.other, e.payload)).collect();
        let from_b: Vec<_> = graph.neighbors(b).map(|e| (e.other, e.payload)).collect();
        assert_eq!(from_a, vec![(b, 7)]);
        assert_eq!(from_b, vec![(a, 7)]);
    }

    #[test]
    fn remove_node_clears_both_sides() {
        let mut bodies: Arena<()> = Arena::new();
        let a = bodies.insert(());
        let b = bodies.insert(());
        let mut graph: InteractionGraph<u32> = InteractionGraph::new();
        graph.insert_edge(a, b, 1);
        graph.remove_node(a);
        assert_eq!(graph.neighbors(a).count(), 0);
        assert_eq!(graph.neighbors(b).count(), 0);
    }
}
