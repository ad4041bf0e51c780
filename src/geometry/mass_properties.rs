//! Mass-property formulas for convex primitives and their aggregation.
//!
//! These formulas are explicitly named as out-of-scope *collaborators* in
//! spec.md §1 ("mass-property formulas... specified only by the contracts
//! they present to the core"), but the core cannot be exercised end-to-end
//! without them, and spec.md's own Testable Properties (§8, scenarios 1–4)
//! pin down their exact numeric results. Kept intentionally small.

use crate::math::{Point, Real, Vector};

/// Mass, local-frame center of mass, and rotational inertia about that
/// center of mass.
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MassProperties {
    /// Total mass.
    pub mass: Real,
    /// Center of mass, in the shape's local frame.
    pub local_center: Point,
    /// Rotational inertia about `local_center`.
    pub inertia: Real,
}

impl MassProperties {
    /// The zero mass properties — contributes nothing when aggregated.
    pub fn zero() -> Self {
        MassProperties {
            mass: 0.0,
            local_center: Point::origin(),
            inertia: 0.0,
        }
    }

    /// A solid circle of the given radius.
    pub fn from_ball(density: Real, radius: Real) -> Self {
        let mass = density * std::f32::consts::PI as Real * radius * radius;
        let inertia = 0.5 * mass * radius * radius;
        MassProperties {
            mass,
            local_center: Point::origin(),
            inertia,
        }
    }

    /// A solid axis-aligned rectangle centered at the origin.
    pub fn from_rectangle(density: Real, width: Real, height: Real) -> Self {
        let mass = density * width * height;
        let inertia = mass * (width * width + height * height) / 12.0;
        MassProperties {
            mass,
            local_center: Point::origin(),
            inertia,
        }
    }

    /// A thin rod coincident with the segment `a..b`.
    pub fn from_segment(density: Real, a: Point, b: Point) -> Self {
        let len = (b - a).norm();
        let mass = density * len;
        let inertia = mass * len * len / 12.0;
        MassProperties {
            mass,
            local_center: nalgebra::center(&a, &b),
            inertia,
        }
    }

    /// A solid convex polygon, via triangle-fan decomposition from its
    /// first vertex (the classic constant-time polygon mass formula).
    pub fn from_polygon(density: Real, vertices: &[Point]) -> Self {
        debug_assert!(vertices.len() >= 3);
        let r = vertices[0];
        let n = vertices.len();
        let k_inv3 = 1.0 / 3.0;

        let mut area = 0.0;
        let mut center_sum = Vector::zeros();
        let mut i_sum = 0.0;

        for i in 0..n {
            let e1 = vertices[i] - r;
            let e2 = vertices[(i + 1) % n] - r;
            let d = crate::math::cross(e1, e2);
            let triangle_area = 0.5 * d;
            area += triangle_area;
            center_sum += triangle_area * k_inv3 * (e1 + e2);

            let intx2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
            let inty2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
            i_sum += (0.25 * k_inv3 * d) * (intx2 + inty2);
        }

        let mass = density * area;
        let center_local = if area.abs() > Real::EPSILON {
            center_sum / area
        } else {
            Vector::zeros()
        };
        let inertia = density * i_sum - mass * center_local.norm_squared();

        MassProperties {
            mass,
            local_center: r + center_local,
            inertia: inertia.max(0.0),
        }
    }

    /// Aggregates several mass properties (e.g. one per fixture of a body)
    /// into a single mass/center/inertia triple, using the parallel-axis
    /// theorem to recenter each component's inertia onto the combined
    /// center of mass.
    pub fn combine(parts: &[MassProperties]) -> Self {
        let total_mass: Real = parts.iter().map(|p| p.mass).sum();
        if total_mass <= 0.0 {
            return MassProperties::zero();
        }

        let center = parts
            .iter()
            .map(|p| p.local_center.coords * p.mass)
            .sum::<Vector>()
            / total_mass;
        let center = Point::from(center);

        let inertia = parts
            .iter()
            .map(|p| {
                let offset = p.local_center - center;
                p.inertia + p.mass * offset.norm_squared()
            })
            .sum();

        MassProperties {
            mass: total_mass,
            local_center: center,
            inertia,
        }
    }

    /// Inverse mass, `0` encoding "infinite mass".
    pub fn inv_mass(&self) -> Real {
        crate::math::safe_recip(self.mass)
    }

    /// Inverse inertia, `0` encoding "infinite inertia".
    pub fn inv_inertia(&self) -> Real {
        crate::math::safe_recip(self.inertia)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rectangle_mass_matches_reference() {
        let m = MassProperties::from_rectangle(1.5, 1.0, 1.0);
        assert_relative_eq!(m.mass, 1.500, epsilon = 1e-3);
        assert_relative_eq!(m.inertia, 0.250, epsilon = 1e-3);
    }

    #[test]
    fn circle_mass_matches_reference() {
        let m = MassProperties::from_ball(2.0, 3.0);
        assert_relative_eq!(m.mass, 56.548, epsilon = 1e-3 * 56.548);
        assert_relative_eq!(m.inertia, 254.469, epsilon = 1e-3 * 254.469);
    }

    #[test]
    fn segment_mass_matches_reference() {
        let m = MassProperties::from_segment(1.0, Point::new(-1.0, 0.0), Point::new(1.0, 0.5));
        assert_relative_eq!(m.mass, 2.061, epsilon = 1e-3 * 2.061);
        assert_relative_eq!(m.inertia, 0.730, epsilon = 1e-3 * 0.730);
    }

    #[test]
    fn polygon_mass_matches_rectangle_reference() {
        let verts = vec![
            Point::new(0.5, -0.5),
            Point::new(0.5, 0.5),
            Point::new(-0.5, 0.5),
            Point::new(-0.5, -0.5),
        ];
        let m = MassProperties::from_polygon(1.5, &verts);
        assert_relative_eq!(m.mass, 1.5, epsilon = 1e-3);
        assert_relative_eq!(m.inertia, 0.25, epsilon = 1e-3);
        assert_relative_eq!(m.local_center.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(m.local_center.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn polygon_mass_is_translation_invariant_about_its_own_com() {
        let verts = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        let shifted: Vec<Point> = verts.iter().map(|v| v + Vector::new(5.0, -3.0)).collect();
        let m1 = MassProperties::from_polygon(1.0, &verts);
        let m2 = MassProperties::from_polygon(1.0, &shifted);
        assert_relative_eq!(m1.mass, m2.mass, epsilon = 1e-3);
        assert_relative_eq!(m1.inertia, m2.inertia, epsilon = 1e-3);
    }

    #[test]
    fn aggregate_mass_matches_reference() {
        let parts = [
            MassProperties {
                mass: 3.0,
                local_center: Point::new(1.0, 1.0),
                inertia: 1.0,
            },
            MassProperties {
                mass: 0.5,
                local_center: Point::new(-1.0, 0.0),
                inertia: 0.02,
            },
            MassProperties {
                mass: 2.0,
                local_center: Point::new(1.0, -2.0),
                inertia: 3.0,
            },
        ];
        let agg = MassProperties::combine(&parts);
        assert_relative_eq!(agg.mass, 5.500, epsilon = 1e-3 * 5.5);
        assert_relative_eq!(agg.inertia, 16.656, epsilon = 1e-3 * 16.656);
        assert_relative_eq!(agg.local_center.x, 0.818, epsilon = 1e-3);
        assert_relative_eq!(agg.local_center.y, -0.181, epsilon = 1e-3);
    }
}
