//! Event surface: traits the embedding application implements to observe
//! (and, for contacts, veto) what the physics step is about to do, plus the
//! solved-contact data handed back after the solver runs.

use crate::data::arena::Index;
use crate::geometry::contact_manifold::ContactPoint;
use crate::math::Real;

/// Hooks into the contact manager's begin/persist/end lifecycle and the
/// solver's pre/post-solve passes.
///
/// Every method has a default: `begin`, `persist`, and `pre_solve` default
/// to allowing the contact, `end`, `sensed`, and `post_solve` default to
/// doing nothing. A world with no listener installed runs with `()` as its
/// `ContactListener`, which is exactly this set of defaults.
pub trait ContactListener {
    /// A contact point appeared between a non-sensor pair that no point
    /// from the previous step matched (by feature id, or by proximity for
    /// the `Distance` sentinel). Returning `false` disables just this
    /// point for the solver; the pair's other points are unaffected.
    fn begin(&self, _a: Index, _b: Index, _point: &ContactPoint) -> bool {
        true
    }

    /// A contact point from the previous step was matched again this step
    /// (it carries warm-started impulses). Returning `false` disables
    /// just this point for this step only; it may be re-enabled on a
    /// later call.
    fn persist(&self, _a: Index, _b: Index, _point: &ContactPoint) -> bool {
        true
    }

    /// A contact point present last step was not matched by any point
    /// this step, either because the pair stopped touching entirely or
    /// because the manifold dropped this particular point while the pair
    /// kept touching.
    fn end(&self, _a: Index, _b: Index, _point: &ContactPoint) {}

    /// A sensor's overlap state with another fixture changed.
    ///
    /// `overlapping` is `true` on `SensedStarted`, `false` on
    /// `SensedStopped`.
    fn sensed(&self, _sensor: Index, _other: Index, _overlapping: bool) {}

    /// Called once per contact point immediately before the solver runs,
    /// with the chance to veto that point for this step (e.g. a one-way
    /// platform checking its feature normal). Returning `false` behaves
    /// like returning `false` from `begin`/`persist` for this point.
    fn pre_solve(&self, _a: Index, _b: Index, _point: &ContactPoint) -> bool {
        true
    }

    /// Called once per contact point after the solver has computed its
    /// impulses.
    fn post_solve(&self, _a: Index, _b: Index, _point: &SolvedContactPoint) {}
}

/// The no-op listener: allows every contact, observes nothing. Used when a
/// [`crate::world::World`] is built without an explicit listener.
impl ContactListener for () {}

/// A contact point's impulses after the solver has run on it, handed to
/// [`ContactListener::post_solve`].
#[derive(Copy, Clone, Debug)]
pub struct SolvedContactPoint {
    /// The impulse the solver applied along the manifold normal.
    pub normal_impulse: Real,
    /// The impulse the solver applied along the manifold tangent (friction).
    pub tangent_impulse: Real,
}

/// Hooks into a world's optional bounds region: bodies that
/// leave the region are reported here before being deactivated.
pub trait BoundsListener {
    /// A body crossed outside the world's bounds and is about to be put to
    /// sleep (or, if `remove_out_of_bounds` is set, removed).
    fn out_of_bounds(&self, _body: Index) {}
}

/// The no-op bounds listener.
impl BoundsListener for () {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::contact_manifold::FeatureId;
    use crate::math::Point;

    struct RejectAll;
    impl ContactListener for RejectAll {
        fn begin(&self, _a: Index, _b: Index, _point: &ContactPoint) -> bool {
            false
        }
    }

    fn dummy_point() -> ContactPoint {
        ContactPoint {
            point_a: Point::origin(),
            point_b: Point::origin(),
            separation: 0.0,
            feature_a: FeatureId::Distance,
            feature_b: FeatureId::Distance,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
            enabled: true,
        }
    }

    #[test]
    fn default_listener_allows_everything() {
        let listener = ();
        let point = dummy_point();
        assert!(listener.begin(Index::INVALID, Index::INVALID, &point));
        assert!(listener.persist(Index::INVALID, Index::INVALID, &point));
        assert!(listener.pre_solve(Index::INVALID, Index::INVALID, &point));
    }

    #[test]
    fn custom_listener_can_veto_begin() {
        let listener = RejectAll;
        let point = dummy_point();
        assert!(!listener.begin(Index::INVALID, Index::INVALID, &point));
        // persist keeps the default (allow) since RejectAll doesn't override it.
        assert!(listener.persist(Index::INVALID, Index::INVALID, &point));
    }
}
