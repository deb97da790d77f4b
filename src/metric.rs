//! Surface metric and the anisotropic Delaunay predicate.
//!
//! The metric is the first fundamental form of the surface sampled at one
//! parametric point. Measuring parametric distances in it approximates 3D
//! distances, which is what makes a Delaunay criterion in the parametric
//! plane meaningful on a curved surface.

use glam::{DMat2, DVec2, DVec3};

use crate::geom::Surface;

/// Symmetric positive-definite 2x2 metric `[[a, b], [b, d]]` built from the
/// surface derivatives: `a = Su·Su`, `b = Su·Sv`, `d = Sv·Sv`.
#[derive(Debug, Clone, Copy)]
pub struct Metric {
    pub a: f64,
    pub b: f64,
    pub d: f64,
}

impl Metric {
    /// Sample the first fundamental form at `uv`.
    pub fn at(surface: &dyn Surface, uv: DVec2) -> Self {
        let (su, sv) = surface.d1(uv);
        Self {
            a: su.dot(su),
            b: su.dot(sv),
            d: sv.dot(sv),
        }
    }

    /// Quadratic form `t · M · t`.
    #[inline]
    pub fn quadratic(&self, t: DVec2) -> f64 {
        t.x * t.x * self.a + t.y * t.y * self.d + 2.0 * t.x * t.y * self.b
    }

    /// Distance between two parametric points measured in the metric.
    #[inline]
    pub fn length(&self, p: DVec2, q: DVec2) -> f64 {
        self.quadratic(p - q).sqrt()
    }
}

/// Solve `m x = rhs`; `None` when the system is singular.
pub(crate) fn solve_2x2(m: DMat2, rhs: DVec2) -> Option<DVec2> {
    let det = m.determinant();
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    Some(m.inverse() * rhs)
}

/// Isotropic circumcenter of a triangle in the parametric plane.
/// `None` for collinear points.
pub fn circum_center_xy(p1: DVec2, p2: DVec2, p3: DVec2) -> Option<DVec2> {
    let d = 2.0 * (p1.y * (p2.x - p3.x) + p2.y * (p3.x - p1.x) + p3.y * (p1.x - p2.x));
    if d == 0.0 {
        return None;
    }
    let a1 = p1.length_squared();
    let a2 = p2.length_squared();
    let a3 = p3.length_squared();
    Some(DVec2::new(
        (a1 * (p3.y - p2.y) + a2 * (p1.y - p3.y) + a3 * (p2.y - p1.y)) / d,
        (a1 * (p2.x - p3.x) + a2 * (p3.x - p1.x) + a3 * (p1.x - p2.x)) / d,
    ))
}

/// Circumcenter of a triangle in 3D, computed in the triangle's plane.
/// `None` for degenerate triangles.
pub fn circum_center_xyz(p1: DVec3, p2: DVec3, p3: DVec3) -> Option<DVec3> {
    let v1 = p2 - p1;
    let v2 = p3 - p1;
    let vz = v1.cross(v2);
    if vz.length_squared() == 0.0 {
        return None;
    }
    let vx = v1.normalize();
    let vy = vz.cross(v1).normalize();

    let p2p = DVec2::new(v1.dot(vx), v1.dot(vy));
    let p3p = DVec2::new(v2.dot(vx), v2.dot(vy));
    let c = circum_center_xy(DVec2::ZERO, p2p, p3p)?;
    Some(p1 + c.x * vx + c.y * vy)
}

/// Circumcenter of the triangle `(pa, pb, pc)` with respect to `metric`,
/// together with the squared metric circumradius.
///
/// The center is the parametric point equidistant (in the metric) from the
/// three corners, obtained from the 2x2 normal equations.
pub fn circum_center_metric(
    pa: DVec2,
    pb: DVec2,
    pc: DVec2,
    metric: &Metric,
) -> Option<(DVec2, f64)> {
    let Metric { a, b, d } = *metric;

    let m = DMat2::from_cols(
        DVec2::new(
            2.0 * a * (pa.x - pb.x) + 2.0 * b * (pa.y - pb.y),
            2.0 * a * (pa.x - pc.x) + 2.0 * b * (pa.y - pc.y),
        ),
        DVec2::new(
            2.0 * d * (pa.y - pb.y) + 2.0 * b * (pa.x - pb.x),
            2.0 * d * (pa.y - pc.y) + 2.0 * b * (pa.x - pc.x),
        ),
    );
    let rhs = DVec2::new(
        a * (pa.x * pa.x - pb.x * pb.x)
            + d * (pa.y * pa.y - pb.y * pb.y)
            + 2.0 * b * (pa.x * pa.y - pb.x * pb.y),
        a * (pa.x * pa.x - pc.x * pc.x)
            + d * (pa.y * pa.y - pc.y * pc.y)
            + 2.0 * b * (pa.x * pa.y - pc.x * pc.y),
    );

    let x = solve_2x2(m, rhs)?;
    let radius2 = metric.quadratic(x - pa);
    Some((x, radius2))
}

/// Anisotropic in-circle test used while flooding insertion cavities:
/// true iff `p` lies strictly inside the metric circumcircle of the
/// triangle.
pub fn in_circum_circle_aniso(pa: DVec2, pb: DVec2, pc: DVec2, p: DVec2, metric: &Metric) -> bool {
    let Some((x, radius2)) = circum_center_metric(pa, pb, pc, metric) else {
        return false;
    };
    metric.quadratic(x - p) < radius2
}

/// Tolerant variant used by the Delaunay edge sweep. The tolerance grows
/// with the circumradius so the sweep does not oscillate on quads that are
/// cocircular up to roundoff.
pub fn in_circum_circle_aniso_tolerant(
    pa: DVec2,
    pb: DVec2,
    pc: DVec2,
    p: DVec2,
    metric: &Metric,
) -> bool {
    let Some((x, radius2)) = circum_center_metric(pa, pb, pc, metric) else {
        return false;
    };
    let tolerance = if radius2 <= 1.0e3 {
        1.0e-12
    } else if radius2 <= 1.0e5 {
        1.0e-11
    } else {
        1.0e-9
    };
    metric.quadratic(x - p) < radius2 - tolerance
}
