use glam::{DMat2, DVec2};

use crate::geom::{RadiusNorm, SizeField, Surface};
use crate::metric::{Metric, in_circum_circle_aniso, solve_2x2};
use crate::predicates::orient2d;

use super::data::MeshData;
use super::tri::{FrontTri, ShellEdge, TriIdx, active_edge, connect_tris};

/// Why a candidate point was not inserted. [`CavityStatus::Inserted`] is
/// the single success outcome; the rejections are expected and frequent.
pub(crate) enum CavityStatus {
    Inserted,
    /// The cavity is a single triangle; the point breaks nothing.
    CavityTooSmall,
    /// The shell does not satisfy the disk Euler relation.
    EulerViolation,
    /// The retriangulated cavity does not cover the same parametric
    /// area: the cavity was not star-shaped around the point.
    AreaDrift,
    /// The point lands too close to an existing vertex or edge.
    TooClose,
    /// None of the above held, which only happens for a point outside
    /// the parametric domain.
    OutOfDomain,
}

/// Barycentric coordinates of `p` in triangle `t`, and whether they put
/// `p` inside (within `tol`).
pub(crate) fn inv_map_uv(
    data: &MeshData,
    verts: [usize; 3],
    p: DVec2,
    tol: f64,
) -> (DVec2, bool) {
    let u0 = data.uv[verts[0]];
    let u1 = data.uv[verts[1]];
    let u2 = data.uv[verts[2]];
    let m = DMat2::from_cols(
        DVec2::new(u1.x - u0.x, u1.y - u0.y),
        DVec2::new(u2.x - u0.x, u2.y - u0.y),
    );
    match solve_2x2(m, p - u0) {
        Some(l) => {
            let inside = l.x >= -tol
                && l.y >= -tol
                && l.x <= 1.0 + tol
                && l.y <= 1.0 + tol
                && 1.0 - l.x - l.y > -tol;
            (l, inside)
        }
        None => (DVec2::ZERO, false),
    }
}

/// Signed parametric area of a data triangle.
pub(crate) fn surf_uv(data: &MeshData, verts: [usize; 3]) -> f64 {
    let u1 = data.uv[verts[0]];
    let u2 = data.uv[verts[1]];
    let u3 = data.uv[verts[2]];
    0.5 * (u2 - u1).perp_dot(u3 - u1)
}

/// Open-segment intersection by orientation signs.
fn segments_cross(p1: DVec2, p2: DVec2, q1: DVec2, q2: DVec2) -> bool {
    if orient2d(p1, p2, q1) * orient2d(p1, p2, q2) > 0.0 {
        return false;
    }
    if orient2d(q1, q2, p1) * orient2d(q1, q2, p2) > 0.0 {
        return false;
    }
    true
}

/// Anisotropic in-circle test of one queue triangle against `p`.
pub(crate) fn tri_in_circle(
    tris: &[FrontTri],
    t: TriIdx,
    data: &MeshData,
    p: DVec2,
    metric: &Metric,
) -> bool {
    let [a, b, c] = tris[t].verts;
    in_circum_circle_aniso(data.uv[a], data.uv[b], data.uv[c], p, metric)
}

/// Walk toward `pt` from `start`, crossing the edge the target segment
/// exits through. Falls back to a full scan when `force` is set (after a
/// failed cavity test nothing cheaper is available).
pub(crate) fn search_for_triangle(
    tris: &[FrontTri],
    data: &MeshData,
    start: TriIdx,
    pt: DVec2,
    force: bool,
) -> Option<TriIdx> {
    let (_, inside) = inv_map_uv(data, tris[start].verts, pt, 1.0e-8);
    if inside {
        return Some(start);
    }

    let mut t = start;
    let mut iter = 0;
    loop {
        let verts = tris[t].verts;
        let q2 = (data.uv[verts[0]] + data.uv[verts[1]] + data.uv[verts[2]]) / 3.0;
        let mut crossing = None;
        for i in 0..3 {
            let (a, b) = tris[t].edge_verts(i);
            if segments_cross(data.uv[a], data.uv[b], pt, q2) {
                crossing = Some(i);
                break;
            }
        }
        let Some(i) = crossing else {
            break;
        };
        let Some(next) = tris[t].neigh[i] else {
            break;
        };
        t = next;
        let (_, inside) = inv_map_uv(data, tris[t].verts, pt, 1.0e-8);
        if inside {
            return Some(t);
        }
        iter += 1;
        if iter > tris.len() {
            break;
        }
    }

    if !force {
        return None;
    }
    for (idx, tri) in tris.iter().enumerate() {
        if !tri.deleted {
            let (_, inside) = inv_map_uv(data, tri.verts, pt, 1.0e-8);
            if inside {
                return Some(idx);
            }
        }
    }
    None
}

/// Flood the cavity of triangles whose metric circumcircle contains `p`,
/// starting from `start` (which must pass the test itself). Flooded
/// triangles are tombstoned; the boundary of the flooded region is
/// recorded in `shell`. Protected internal edges act as cavity boundary.
pub(crate) fn find_cavity(
    tris: &mut Vec<FrontTri>,
    data: &MeshData,
    metric: &Metric,
    p: DVec2,
    start: TriIdx,
    shell: &mut Vec<ShellEdge>,
    cavity: &mut Vec<TriIdx>,
) {
    tris[start].deleted = true;
    cavity.push(start);
    let mut stack = vec![start];

    while let Some(t) = stack.pop() {
        for i in 0..3 {
            let exf = ShellEdge::new(tris, t, i);
            let neigh = tris[t].neigh[i];
            if data.is_internal_edge(exf.v[0], exf.v[1]) || neigh.is_none() {
                shell.push(exf);
                continue;
            }
            let n = neigh.expect("checked above");
            if tris[n].deleted {
                continue;
            }
            if tri_in_circle(tris, n, data, p, metric) {
                tris[n].deleted = true;
                cavity.push(n);
                stack.push(n);
            } else {
                shell.push(exf);
            }
        }
    }
}

/// Retriangulate the cavity with `row` as apex of every shell edge.
///
/// Validates the star-shape conditions before committing: disk Euler
/// relation, parametric area preservation (1e-12 relative), no new edge
/// shorter than half the local size, no almost-flat apex angle. On
/// success the new triangles are appended to `tris`, linked to their
/// ring, inserted into the radius-ordered `all` set and, when an active
/// set is maintained, into `active`. On rejection everything is rolled
/// back except the cavity tombstones (the caller restores those).
#[allow(clippy::too_many_arguments)]
pub(crate) fn insert_vertex(
    tris: &mut Vec<FrontTri>,
    data: &MeshData,
    surface: &dyn Surface,
    row: usize,
    shell: &[ShellEdge],
    cavity: &[TriIdx],
    extend: bool,
    norm: RadiusNorm,
    limit: f64,
    all: &mut std::collections::BTreeSet<super::tri::TriKey>,
    active: Option<&mut std::collections::BTreeSet<super::tri::TriKey>>,
) -> CavityStatus {
    if cavity.len() == 1 {
        return CavityStatus::CavityTooSmall;
    }
    if shell.len() != cavity.len() + 2 {
        return CavityStatus::EulerViolation;
    }

    let old_volume: f64 = cavity
        .iter()
        .map(|&t| surf_uv(data, tris[t].verts).abs())
        .sum();

    let first_new = tris.len();
    let mut new_volume = 0.0;
    let mut one_point_too_close = false;
    let mut new_cavity: Vec<TriIdx> = Vec::with_capacity(2 * shell.len());

    for exf in shell {
        let (v0, v1) = if exf.ori > 0 {
            (exf.v[0], exf.v[1])
        } else {
            (exf.v[1], exf.v[0])
        };
        let verts = [v0, v1, row];
        let lc = (data.size[v0] + data.size[v1] + data.size[row]) / 3.0;
        let lc_bgm = (data.size_bgm[v0] + data.size_bgm[v1] + data.size_bgm[row]) / 3.0;
        let ll_min = lc.min(lc_bgm);
        let ll = if extend { ll_min } else { lc_bgm };

        let d1 = (data.position[v0] - data.position[row]).length();
        let d2 = (data.position[v1] - data.position[row]).length();
        let d3 = (data.position[v0] - data.position[v1]).length();
        // angle at the new vertex must stay well below flat
        let cosv = if d1 * d2 == 0.0 {
            -1.0
        } else {
            (d1 * d1 + d2 * d2 - d3 * d3) / (2.0 * d1 * d2)
        };
        let d4 = if data.dim[v0] != 2 && data.dim[v1] != 2 && d3 != 0.0 {
            // distance of the new vertex to a boundary edge
            (data.position[v1] - data.position[v0])
                .cross(data.position[row] - data.position[v0])
                .length()
                / d3
        } else {
            1.0e22
        };
        if d1 < ll_min * 0.5 || d2 < ll_min * 0.5 || d4 < ll_min * 0.4 || cosv < -0.9999 {
            one_point_too_close = true;
        }

        let tri = FrontTri::new(verts, ll, data, surface, norm);
        let mut ss = surf_uv(data, verts).abs();
        if ss < 1.0e-25 {
            ss = 1.0e22;
        }
        new_volume += ss;

        let idx = tris.len();
        tris.push(tri);
        new_cavity.push(idx);
        if let Some(other) = tris[exf.t].neigh[exf.i] {
            new_cavity.push(other);
        }
    }

    if (old_volume - new_volume).abs() < 1.0e-12 * old_volume && !one_point_too_close {
        connect_tris(tris, new_cavity.iter().copied());
        for idx in first_new..tris.len() {
            all.insert(super::tri::TriKey::of(tris, idx));
        }
        if let Some(active) = active {
            for &idx in &new_cavity {
                if active_edge(tris, idx, limit).is_some() && tris[idx].radius > limit {
                    active.insert(super::tri::TriKey::of(tris, idx));
                }
            }
        }
        CavityStatus::Inserted
    } else {
        tris.truncate(first_new);
        if (old_volume - new_volume).abs() > 1.0e-12 * old_volume {
            return CavityStatus::AreaDrift;
        }
        if one_point_too_close {
            return CavityStatus::TooClose;
        }
        CavityStatus::OutOfDomain
    }
}

/// Try to insert a point at parameters `center` against the queue
/// triangle `worst`. On success the new triangles have been linked and
/// queued; on failure the cavity is restored and `worst` is re-queued
/// with a radius that keeps it from being revisited (0 when the point
/// could not even be located, -1 when the cavity was rejected).
#[allow(clippy::too_many_arguments)]
pub(crate) fn insert_a_point(
    tris: &mut Vec<FrontTri>,
    data: &mut MeshData,
    surface: &dyn Surface,
    field: &dyn SizeField,
    center: DVec2,
    metric: &Metric,
    worst: TriIdx,
    extend: bool,
    norm: RadiusNorm,
    limit: f64,
    all: &mut std::collections::BTreeSet<super::tri::TriKey>,
    active: &mut std::collections::BTreeSet<super::tri::TriKey>,
) -> bool {
    let mut shell: Vec<ShellEdge> = Vec::new();
    let mut cavity: Vec<TriIdx> = Vec::new();

    let ptin = if tri_in_circle(tris, worst, data, center, metric) {
        find_cavity(tris, data, metric, center, worst, &mut shell, &mut cavity);
        cavity
            .iter()
            .copied()
            .find(|&t| inv_map_uv(data, tris[t].verts, center, 1.0e-8).1)
    } else {
        let found = search_for_triangle(tris, data, worst, center, false);
        if let Some(t) = found {
            find_cavity(tris, data, metric, center, t, &mut shell, &mut cavity);
        }
        found
    };

    let Some(ptin) = ptin else {
        for &t in &cavity {
            tris[t].deleted = false;
        }
        requeue(tris, worst, 0.0, all);
        return false;
    };

    let [a, b, c] = tris[ptin].verts;
    let size = (data.size[a] + data.size[b] + data.size[c]) / 3.0;
    let position = surface.point(center);
    let size_bgm = field.size_at(center, position);
    let row = data.add_vertex(center, position, size, size_bgm, 2, None);

    let status = insert_vertex(
        tris,
        data,
        surface,
        row,
        &shell,
        &cavity,
        extend,
        norm,
        limit,
        all,
        Some(active),
    );
    if matches!(status, CavityStatus::Inserted) {
        true
    } else {
        data.pop_vertex();
        for &t in &cavity {
            tris[t].deleted = false;
        }
        requeue(tris, worst, -1.0, all);
        false
    }
}

/// Move `worst` to the tail of the radius queue by forcing its radius.
fn requeue(
    tris: &mut [FrontTri],
    worst: TriIdx,
    radius: f64,
    all: &mut std::collections::BTreeSet<super::tri::TriKey>,
) {
    all.remove(&super::tri::TriKey::of(tris, worst));
    tris[worst].radius = radius;
    all.insert(super::tri::TriKey::of(tris, worst));
}
