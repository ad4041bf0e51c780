//! Scalar and linear-algebra type aliases shared across the crate.
//!
//! Everything here is built on top of `nalgebra`; the rest of the crate never
//! spells out `f32` or `nalgebra::Vector2` directly so that a future
//! `impulse2d-f64` sibling crate (mirroring `rapier2d-f64`) could swap this
//! module alone.

/// The scalar type used throughout the simulation.
pub type Real = f32;

/// A 2D vector (a free direction/displacement, no fixed origin).
pub type Vector = nalgebra::Vector2<Real>;
/// A 2D point (a position).
pub type Point = nalgebra::Point2<Real>;
/// A 2D rotation, stored as a cos/sin pair rather than a raw angle so that
/// repeated composition does not require renormalizing a angle into
/// `[-pi, pi]`.
pub type Rotation = nalgebra::Rotation2<Real>;
/// A rigid transform: translation plus rotation.
pub type Isometry = nalgebra::Isometry2<Real>;
/// A 2x2 matrix, used for inertia-like linear maps.
pub type Matrix = nalgebra::Matrix2<Real>;

/// The 2D analog of a cross product: `a.x * b.y - a.y * b.x`.
#[inline]
pub fn cross(a: Vector, b: Vector) -> Real {
    a.x * b.y - a.y * b.x
}

/// Cross product of a scalar (out-of-plane angular velocity) with a 2D
/// vector, yielding the linear velocity contribution `w x r`.
#[inline]
pub fn cross_scalar_vector(w: Real, r: Vector) -> Vector {
    Vector::new(-w * r.y, w * r.x)
}

/// The vector perpendicular to `v`, rotated +90 degrees (`v x 1` in the
/// cross-product-with-the-implicit-z-axis sense).
#[inline]
pub fn perp(v: Vector) -> Vector {
    Vector::new(-v.y, v.x)
}

/// Reciprocal that maps `0` to `0` instead of `inf`, matching the convention
/// that zero inverse-mass/inverse-inertia encodes "infinite".
#[inline]
pub fn safe_recip(x: Real) -> Real {
    if x == 0.0 { 0.0 } else { 1.0 / x }
}
