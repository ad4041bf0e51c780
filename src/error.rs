//! Typed errors returned at world-facing boundaries.
//!
//! Per the propagation policy: validation happens at constructors and
//! setters, *before* any state mutates. Numerical degeneracies encountered
//! deep in the pipeline (GJK/EPA non-convergence, CCD non-convergence) are
//! recovered locally and never surface as an `Err` here — see
//! [`crate::geometry::gjk`] and [`crate::dynamics::ccd`].

use thiserror::Error;

/// Errors reported by world-facing constructors and setters.
#[derive(Error, Debug, Copy, Clone, PartialEq)]
pub enum PhysicsError {
    /// A negative or otherwise out-of-range argument was supplied.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A handle did not refer to a body, fixture, or joint present in the
    /// world.
    #[error("handle not found")]
    NotFound,

    /// A broad-phase tree invariant was violated. Named here to document
    /// the failure kind, but it's not a `Result` any call returns: the
    /// check itself (`Bvh::check_containment_invariant`, wired into
    /// `add`/`remove`/`update`) is a `debug_assert!`, so a violation
    /// panics with a diagnostic in debug builds and is never checked at
    /// all in release, only reachable through external misuse of
    /// internal APIs.
    #[error("broad-phase invariant violated: {0}")]
    InvariantViolated(&'static str),
}

/// Result alias for fallible world-facing operations.
pub type PhysicsResult<T> = Result<T, PhysicsError>;
