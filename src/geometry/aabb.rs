//! Axis-aligned bounding boxes.

use crate::math::{Point, Real, Vector};

/// An axis-aligned bounding box, stored as its minimum and maximum corners.
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    /// The corner with the smallest coordinates.
    pub mins: Point,
    /// The corner with the largest coordinates.
    pub maxs: Point,
}

impl Aabb {
    /// An AABB that contains nothing; its `union` with any other AABB
    /// yields the other AABB unchanged.
    pub fn new_invalid() -> Self {
        Aabb {
            mins: Point::new(Real::MAX, Real::MAX),
            maxs: Point::new(-Real::MAX, -Real::MAX),
        }
    }

    /// Builds an AABB from explicit corners. Does not validate `mins <= maxs`;
    /// use [`Aabb::from_points`] when the ordering isn't already known.
    pub fn new(mins: Point, maxs: Point) -> Self {
        Aabb { mins, maxs }
    }

    /// Builds the tightest AABB containing both `a` and `b`, regardless of
    /// their relative ordering.
    pub fn from_points(a: Point, b: Point) -> Self {
        Aabb {
            mins: Point::new(a.x.min(b.x), a.y.min(b.y)),
            maxs: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// The AABB's center.
    pub fn center(&self) -> Point {
        nalgebra::center(&self.mins, &self.maxs)
    }

    /// Half-extents along each axis.
    pub fn half_extents(&self) -> Vector {
        (self.maxs - self.mins) * 0.5
    }

    /// Twice the sum of width and height — used instead of area as the cost
    /// metric for BVH insertion, since axis-aligned segments would otherwise
    /// have zero area in 2D.
    pub fn perimeter(&self) -> Real {
        let d = self.maxs - self.mins;
        2.0 * (d.x + d.y)
    }

    /// The smallest AABB containing both `self` and `other`.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            mins: Point::new(self.mins.x.min(other.mins.x), self.mins.y.min(other.mins.y)),
            maxs: Point::new(self.maxs.x.max(other.maxs.x), self.maxs.y.max(other.maxs.y)),
        }
    }

    /// True if `self` and `other` overlap (touching counts as overlapping).
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.mins.x <= other.maxs.x
            && self.maxs.x >= other.mins.x
            && self.mins.y <= other.maxs.y
            && self.maxs.y >= other.mins.y
    }

    /// True if `self` fully contains `other`.
    pub fn contains(&self, other: &Aabb) -> bool {
        self.mins.x <= other.mins.x
            && self.mins.y <= other.mins.y
            && self.maxs.x >= other.maxs.x
            && self.maxs.y >= other.maxs.y
    }

    /// True if this AABB has not been touched by a union (still carries the
    /// sentinel values from [`Aabb::new_invalid`]).
    pub fn is_invalid(&self) -> bool {
        self.mins.x > self.maxs.x || self.mins.y > self.maxs.y
    }

    /// Returns the AABB expanded uniformly by `margin` on every side. Used
    /// by the broad phase to "fatten" leaf AABBs.
    pub fn expanded(&self, margin: Real) -> Aabb {
        let v = Vector::new(margin, margin);
        Aabb {
            mins: self.mins - v,
            maxs: self.maxs + v,
        }
    }

    /// Translates the AABB by `v`.
    pub fn translated(&self, v: Vector) -> Aabb {
        Aabb {
            mins: self.mins + v,
            maxs: self.maxs + v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_contains_both_inputs() {
        let a = Aabb::new(Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        let b = Aabb::new(Point::new(2.0, -1.0), Point::new(3.0, 0.5));
        let u = a.union(&b);
        assert!(u.contains(&a));
        assert!(u.contains(&b));
    }

    #[test]
    fn perimeter_matches_manual_rectangle() {
        let a = Aabb::new(Point::new(0.0, 0.0), Point::new(3.0, 2.0));
        assert_eq!(a.perimeter(), 2.0 * (3.0 + 2.0));
    }

    #[test]
    fn intersects_is_symmetric_and_inclusive_of_touching() {
        let a = Aabb::new(Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        let b = Aabb::new(Point::new(1.0, 0.0), Point::new(2.0, 1.0));
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn expanded_grows_symmetrically() {
        let a = Aabb::new(Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        let e = a.expanded(0.2);
        assert!((e.mins.x - (-0.2)).abs() < 1e-6);
        assert!((e.maxs.x - 1.2).abs() < 1e-6);
    }
}
