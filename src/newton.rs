//! Finite-difference Newton iteration intersecting a curve with a surface.
//!
//! The frontal point generator corrects its parametric candidate by
//! intersecting a circle in 3D with the surface; both shapes enter as plain
//! closures evaluated at `(u, v)` and `t`.

use glam::{DMat3, DVec2, DVec3};

const MAX_ITERS: usize = 25;
const FD_STEP: f64 = 1.0e-4;

/// Intersect a parametric curve with a parametric surface by solving
/// `S(u, v) - C(t) = 0` for `(u, v, t)` with a damped finite-difference
/// Newton iteration.
///
/// `uvt` is the starting guess and receives the solution on success.
/// Returns `false` when the iteration does not converge within the
/// iteration budget; the caller is expected to fall back to its initial
/// candidate.
pub fn intersect_curve_surface(
    curve: impl Fn(f64) -> DVec3,
    surface: impl Fn(DVec2) -> DVec3,
    uvt: &mut DVec3,
    epsilon: f64,
) -> bool {
    let residual = |x: DVec3| surface(DVec2::new(x.x, x.y)) - curve(x.z);
    if residual(*uvt).length() < epsilon {
        return true;
    }
    newton_fd(residual, uvt, epsilon)
}

/// Newton iteration on `f(x) = 0` with a forward-difference Jacobian.
/// Converged when the step norm drops below `tol`.
fn newton_fd(f: impl Fn(DVec3) -> DVec3, x: &mut DVec3, tol: f64) -> bool {
    for _ in 0..MAX_ITERS {
        if x.length() > 1.0e6 {
            return false;
        }
        let fx = f(*x);

        let mut cols = [DVec3::ZERO; 3];
        for (j, col) in cols.iter_mut().enumerate() {
            let mut h = FD_STEP * x[j].abs();
            if h == 0.0 {
                h = FD_STEP;
            }
            let mut xh = *x;
            xh[j] += h;
            *col = (f(xh) - fx) / h;
        }
        let jac = DMat3::from_cols(cols[0], cols[1], cols[2]);
        let det = jac.determinant();
        if det == 0.0 || !det.is_finite() {
            return false;
        }

        let dx = jac.inverse() * fx;
        *x -= dx;
        if dx.length() < tol {
            return true;
        }
    }
    false
}

/// Circle of radius `radius` around `center`, spanned by the orthonormal
/// pair `(e0, e1)`; `t = 0` starts at `center + radius * e0`.
pub fn circle_functor(
    center: DVec3,
    e0: DVec3,
    e1: DVec3,
    radius: f64,
) -> impl Fn(f64) -> DVec3 {
    move |t| center + radius * (e0 * t.cos() + e1 * t.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_hits_plane() {
        // plane z = 0, circle in the x-z plane centered above it
        let surface = |uv: DVec2| DVec3::new(uv.x, uv.y, 0.0);
        let circle = circle_functor(
            DVec3::new(0.0, 0.0, 0.5),
            DVec3::Z,
            DVec3::X,
            1.0,
        );
        let mut uvt = DVec3::new(0.8, 0.0, 1.5);
        assert!(intersect_curve_surface(circle, surface, &mut uvt, 1.0e-10));
        // intersection point: z component 0.5 + cos(t) = 0
        let p = DVec3::new(uvt.x, uvt.y, 0.0);
        assert!((p.x - (uvt.z).sin()).abs() < 1.0e-8);
        assert!((0.5 + uvt.z.cos()).abs() < 1.0e-8);
    }

    #[test]
    fn disjoint_circle_does_not_converge() {
        let surface = |uv: DVec2| DVec3::new(uv.x, uv.y, 0.0);
        // circle parallel to the plane, one unit above: no intersection
        let circle = circle_functor(DVec3::new(0.0, 0.0, 1.0), DVec3::X, DVec3::Y, 0.5);
        let mut uvt = DVec3::new(0.5, 0.0, 0.0);
        assert!(!intersect_curve_surface(circle, surface, &mut uvt, 1.0e-10));
    }
}
