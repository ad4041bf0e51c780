//! Contact manifolds: the 0–2 contact points the narrow phase hands to the
//! solver, each tagged with a feature id so the contact manager can
//! warm-start impulses across steps.

use crate::math::{Point, Real, Vector};

/// Identifies which geometric feature (vertex or edge) produced a contact
/// point, so the same physical contact can be recognized across frames
/// even as the manifold is rebuilt from scratch each step.
///
/// `Distance` is the sentinel used for shape pairs (e.g. ball-ball) with no
/// stable vertex/edge identity: the contact manager falls back to matching
/// by proximity for these.
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FeatureId {
    /// The `n`th vertex of a shape.
    Vertex(u32),
    /// The edge starting at the `n`th vertex.
    Edge(u32),
    /// No stable feature identity; match by spatial proximity instead.
    Distance,
}

/// A single point of contact between two fixtures.
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug)]
pub struct ContactPoint {
    /// Contact point on shape A's surface, world space.
    pub point_a: Point,
    /// Contact point on shape B's surface, world space.
    pub point_b: Point,
    /// Penetration depth along the manifold normal (negative if separated
    /// within the speculative margin).
    pub separation: Real,
    /// Identifies the feature on A that produced this point.
    pub feature_a: FeatureId,
    /// Identifies the feature on B that produced this point.
    pub feature_b: FeatureId,
    /// Accumulated normal impulse, carried across steps for warm-starting.
    pub normal_impulse: Real,
    /// Accumulated tangent (friction) impulse, carried across steps.
    pub tangent_impulse: Real,
    /// Whether the solver is allowed to touch this point. Cleared when a
    /// [`crate::pipeline::ContactListener`] vetoes `begin`/`persist`.
    pub enabled: bool,
}

impl ContactPoint {
    /// A contact's warm-start key: prefers the feature-id pair, falling
    /// back to `None` when either side reports [`FeatureId::Distance`].
    pub fn feature_key(&self) -> Option<(FeatureId, FeatureId)> {
        if self.feature_a == FeatureId::Distance || self.feature_b == FeatureId::Distance {
            None
        } else {
            Some((self.feature_a, self.feature_b))
        }
    }
}

/// A set of up to two contact points sharing a common normal, produced by
/// narrow-phase collision detection between one pair of fixtures.
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default)]
pub struct ContactManifold {
    /// World-space unit normal, pointing from A toward B.
    pub normal: Vector,
    /// The manifold's contact points (0, 1, or 2 in 2D).
    pub points: Vec<ContactPoint>,
}

impl ContactManifold {
    /// An empty manifold (no contact).
    pub fn empty() -> Self {
        ContactManifold {
            normal: Vector::zeros(),
            points: Vec::new(),
        }
    }

    /// Matches each of `self`'s points against `previous`'s points by
    /// feature id (falling back to nearest-point-within-tolerance for
    /// [`FeatureId::Distance`] pairs), copying over accumulated impulses so
    /// the solver warm-starts instead of re-solving from zero every step.
    ///
    /// `warm_start_distance_squared` bounds how far a `Distance`-tagged
    /// point may have moved between steps and still be considered "the
    /// same" contact.
    ///
    /// Returns, for each of `self`'s points in order, the index into
    /// `previous.points` it matched, or `None` if it's new this step. The
    /// contact manager uses this to tell `persist` from `begin` per point,
    /// and to find which of `previous`'s points went unmatched (and so
    /// should fire `end`).
    pub fn warm_start_from(&mut self, previous: &ContactManifold, warm_start_distance_squared: Real) -> Vec<Option<usize>> {
        self.points
            .iter_mut()
            .map(|point| {
                let matched = match point.feature_key() {
                    Some(key) => previous
                        .points
                        .iter()
                        .position(|p| p.feature_key() == Some(key)),
                    None => previous.points.iter().position(|p| {
                        (p.point_a - point.point_a).norm_squared() <= warm_start_distance_squared
                    }),
                };
                if let Some(index) = matched {
                    point.normal_impulse = previous.points[index].normal_impulse;
                    point.tangent_impulse = previous.points[index].tangent_impulse;
                }
                matched
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(feature_a: FeatureId, feature_b: FeatureId, normal_impulse: Real) -> ContactPoint {
        ContactPoint {
            point_a: Point::origin(),
            point_b: Point::origin(),
            separation: -0.01,
            feature_a,
            feature_b,
            normal_impulse,
            tangent_impulse: 0.0,
            enabled: true,
        }
    }

    #[test]
    fn warm_start_matches_by_feature_id() {
        let previous = ContactManifold {
            normal: Vector::new(1.0, 0.0),
            points: vec![point(FeatureId::Vertex(0), FeatureId::Edge(2), 5.0)],
        };
        let mut current = ContactManifold {
            normal: Vector::new(1.0, 0.0),
            points: vec![point(FeatureId::Vertex(0), FeatureId::Edge(2), 0.0)],
        };
        current.warm_start_from(&previous, 0.01);
        assert_eq!(current.points[0].normal_impulse, 5.0);
    }

    #[test]
    fn warm_start_falls_back_to_proximity_for_distance_sentinel() {
        let previous = ContactManifold {
            normal: Vector::new(0.0, 1.0),
            points: vec![ContactPoint {
                point_a: Point::new(1.0, 1.0),
                ..point(FeatureId::Distance, FeatureId::Distance, 3.0)
            }],
        };
        let mut current = ContactManifold {
            normal: Vector::new(0.0, 1.0),
            points: vec![ContactPoint {
                point_a: Point::new(1.001, 1.0),
                ..point(FeatureId::Distance, FeatureId::Distance, 0.0)
            }],
        };
        current.warm_start_from(&previous, 0.01);
        assert_eq!(current.points[0].normal_impulse, 3.0);
    }

    #[test]
    fn warm_start_does_not_match_unrelated_features() {
        let previous = ContactManifold {
            normal: Vector::new(1.0, 0.0),
            points: vec![point(FeatureId::Vertex(0), FeatureId::Edge(2), 5.0)],
        };
        let mut current = ContactManifold {
            normal: Vector::new(1.0, 0.0),
            points: vec![point(FeatureId::Vertex(1), FeatureId::Edge(3), 0.0)],
        };
        current.warm_start_from(&previous, 0.01);
        assert_eq!(current.points[0].normal_impulse, 0.0);
    }
}
