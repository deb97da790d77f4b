//! Adaptive exact-arithmetic geometric predicates.
//!
//! Thin wrappers over the `robust` crate taking glam vectors. Only the sign
//! of the returned value is meaningful; the magnitude is an unreliable
//! byproduct of the adaptive evaluation. All predicates return exactly `0.0`
//! for truly degenerate (collinear / cocircular / coplanar / cospherical)
//! input.

use glam::{DVec2, DVec3};
use robust::{Coord, Coord3D};

#[inline]
fn c2(p: DVec2) -> Coord<f64> {
    Coord { x: p.x, y: p.y }
}

#[inline]
fn c3(p: DVec3) -> Coord3D<f64> {
    Coord3D {
        x: p.x,
        y: p.y,
        z: p.z,
    }
}

/// Positive iff `a`, `b`, `c` wind counterclockwise; zero iff collinear.
#[inline]
pub fn orient2d(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    robust::orient2d(c2(a), c2(b), c2(c))
}

/// Positive iff `d` lies inside the circle through `a`, `b`, `c` when those
/// wind counterclockwise; the sign flips with the winding of `a b c`.
#[inline]
pub fn incircle(a: DVec2, b: DVec2, c: DVec2, d: DVec2) -> f64 {
    robust::incircle(c2(a), c2(b), c2(c), c2(d))
}

/// Positive iff `d` lies below the plane through `a`, `b`, `c` (with
/// `a b c` appearing counterclockwise seen from above).
#[inline]
pub fn orient3d(a: DVec3, b: DVec3, c: DVec3, d: DVec3) -> f64 {
    robust::orient3d(c3(a), c3(b), c3(c), c3(d))
}

/// Positive iff `e` lies inside the sphere through `a`, `b`, `c`, `d` when
/// those are positively oriented; the sign flips with their orientation.
#[inline]
pub fn insphere(a: DVec3, b: DVec3, c: DVec3, d: DVec3, e: DVec3) -> f64 {
    robust::insphere(c3(a), c3(b), c3(c), c3(d), c3(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orient2d_signs() {
        let a = DVec2::new(0.0, 0.0);
        let b = DVec2::new(1.0, 0.0);
        assert!(orient2d(a, b, DVec2::new(0.0, 1.0)) > 0.0);
        assert!(orient2d(a, b, DVec2::new(0.0, -1.0)) < 0.0);
        assert_eq!(orient2d(a, b, DVec2::new(2.0, 0.0)), 0.0);
    }

    #[test]
    fn incircle_signs() {
        let a = DVec2::new(0.0, 0.0);
        let b = DVec2::new(1.0, 0.0);
        let c = DVec2::new(0.0, 1.0);
        assert!(incircle(a, b, c, DVec2::new(0.3, 0.3)) > 0.0);
        assert!(incircle(a, b, c, DVec2::new(5.0, 5.0)) < 0.0);
        // cocircular
        assert_eq!(incircle(a, b, c, DVec2::new(1.0, 1.0)), 0.0);
    }

    #[test]
    fn incircle_sign_flips_with_orientation() {
        let a = DVec2::new(0.0, 0.0);
        let b = DVec2::new(1.0, 0.0);
        let c = DVec2::new(0.0, 1.0);
        let p = DVec2::new(0.3, 0.3);
        let ccw = incircle(a, b, c, p);
        let cw = incircle(a, c, b, p);
        assert!(ccw > 0.0 && cw < 0.0);
        // the orientation-normalized product is winding-invariant
        assert!(ccw * orient2d(a, b, c) > 0.0);
        assert!(cw * orient2d(a, c, b) > 0.0);
    }

    #[test]
    fn insphere_inside() {
        let a = DVec3::new(0.0, 0.0, 0.0);
        let b = DVec3::new(1.0, 0.0, 0.0);
        let c = DVec3::new(0.0, 1.0, 0.0);
        let d = DVec3::new(0.0, 0.0, 1.0);
        let inside = insphere(a, b, c, d, DVec3::splat(0.25));
        let outside = insphere(a, b, c, d, DVec3::splat(10.0));
        assert!(inside * orient3d(a, b, c, d) > 0.0);
        assert!(outside * orient3d(a, b, c, d) < 0.0);
    }
}
