//! Triangle quality measures.

use glam::{DVec2, DVec3};

use crate::geom::Surface;

/// Gamma quality of a triangle: twice the ratio of inradius to
/// circumradius, normalized to `[0, 1]` with 1 for the equilateral
/// triangle and 0 for a degenerate one.
pub fn gamma(p0: DVec3, p1: DVec3, p2: DVec3) -> f64 {
    let a = (p1 - p0).length();
    let b = (p2 - p1).length();
    let c = (p0 - p2).length();
    let area2 = (p1 - p0).cross(p2 - p0).length_squared();
    let denom = (a + b + c) * a * b * c;
    if denom == 0.0 {
        return 0.0;
    }
    // 2 r / R = 16 A^2 / ((a+b+c) a b c)
    4.0 * area2 / denom
}

/// Unit normal of the triangle `(p0, p1, p2)`, or zero for a degenerate
/// triangle.
pub fn triangle_normal(p0: DVec3, p1: DVec3, p2: DVec3) -> DVec3 {
    (p0 - p1).cross(p0 - p2).normalize_or_zero()
}

/// Cosine between the triangle normal and the surface normal sampled at
/// the parametric centroid. Used to refuse swaps that fold the mesh over
/// the surface.
pub fn cos_surface_normal(
    surface: &dyn Surface,
    p0: (DVec3, DVec2),
    p1: (DVec3, DVec2),
    p2: (DVec3, DVec2),
) -> f64 {
    let n = triangle_normal(p0.0, p1.0, p2.0);
    let uv = (p0.1 + p1.1 + p2.1) / 3.0;
    let (su, sv) = surface.d1(uv);
    n.dot(su.cross(sv).normalize_or_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gamma_is_one_for_equilateral() {
        let p0 = DVec3::new(0.0, 0.0, 0.0);
        let p1 = DVec3::new(1.0, 0.0, 0.0);
        let p2 = DVec3::new(0.5, 3.0_f64.sqrt() / 2.0, 0.0);
        assert!((gamma(p0, p1, p2) - 1.0).abs() < 1.0e-12);
    }

    #[test]
    fn gamma_vanishes_for_degenerate() {
        let p0 = DVec3::ZERO;
        let p1 = DVec3::new(1.0, 0.0, 0.0);
        assert_eq!(gamma(p0, p1, DVec3::new(2.0, 0.0, 0.0)), 0.0);
        assert_eq!(gamma(p0, p1, p1), 0.0);
    }

    #[test]
    fn gamma_degrades_with_aspect_ratio() {
        let p0 = DVec3::ZERO;
        let p1 = DVec3::new(1.0, 0.0, 0.0);
        let fat = gamma(p0, p1, DVec3::new(0.5, 0.8, 0.0));
        let thin = gamma(p0, p1, DVec3::new(0.5, 0.05, 0.0));
        assert!(fat > thin);
        assert!(thin > 0.0);
    }
}
