use glam::{DVec2, DVec3};

use crate::geom::Surface;
use crate::metric::{Metric, circum_center_metric};
use crate::newton::{circle_functor, intersect_curve_surface};

use super::data::MeshData;
use super::tri::{FrontTri, TriIdx};

/// Candidate insertion point for the active edge `active_edge` of
/// triangle `worst`, following the frontal rule of Rebay extended to an
/// anisotropic metric: start from the edge midpoint and move toward the
/// metric circumcenter by the distance that would create a triangle of
/// the target size, never overshooting the circumcenter.
///
/// `None` when the triangle is too degenerate to carry a circumcenter.
pub(crate) fn optimal_point(
    surface: &dyn Surface,
    data: &MeshData,
    tris: &[FrontTri],
    worst: TriIdx,
    active_edge: usize,
    extend: bool,
) -> Option<(DVec2, Metric)> {
    let verts = tris[worst].verts;
    let centroid = (data.uv[verts[0]] + data.uv[verts[1]] + data.uv[verts[2]]) / 3.0;
    let metric = Metric::at(surface, centroid);
    let (center, _) =
        circum_center_metric(data.uv[verts[0]], data.uv[verts[1]], data.uv[verts[2]], &metric)?;

    let ip1 = (active_edge + 2) % 3;
    let ip2 = active_edge;
    let p = data.uv[verts[ip1]];
    let q = data.uv[verts[ip2]];
    let midpoint = 0.5 * (p + q);

    let dir = center - midpoint;
    let norm = dir.length();
    if norm == 0.0 {
        return None;
    }
    let dir = dir / norm;
    let ratio = metric.quadratic(dir).sqrt();

    // target size at the edge, from the prescribed and background fields
    let rho1 = 0.5 * (data.size[verts[ip1]] + data.size[verts[ip2]]);
    let rho2 = 0.5 * (data.size_bgm[verts[ip1]] + data.size_bgm[verts[ip2]]);
    let rho = if extend { rho1.min(rho2) } else { rho2 };

    let q_dist = metric.length(center, midpoint);
    let d = rho * 3.0_f64.sqrt() * 0.5;
    let l = d.min(q_dist);

    let mut candidate = midpoint + (l / ratio) * dir;

    // Correction: the parametric step assumed the metric is constant.
    // Intersect the circle of radius `l` around the 3D edge midpoint,
    // in the plane orthogonal to the edge through the third vertex,
    // with the actual surface.
    let v1 = data.position[verts[ip1]];
    let v2 = data.position[verts[ip2]];
    let v3 = data.position[verts[(active_edge + 1) % 3]];
    let middle = 0.5 * (v1 + v2);
    let v1v2 = v2 - v1;
    let n1 = v1v2.cross(v3 - middle);
    if n1.length() >= 1.0e-12 {
        let n2 = n1.cross(v1v2).normalize();
        let n1 = n1.normalize();
        let circle = circle_functor(middle, n2, n1, l);
        let mut uvt = DVec3::new(candidate.x, candidate.y, 0.0);
        if intersect_curve_surface(circle, |uv| surface.point(uv), &mut uvt, l * 1.0e-8) {
            candidate = DVec2::new(uvt.x, uvt.y);
        }
        // non-convergence keeps the parametric candidate
    }

    Some((candidate, metric))
}
