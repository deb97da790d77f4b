//! Frontal-Delaunay refinement of the recovered triangulation.
//!
//! Triangles are queued by their cached circumradius-to-size ratio. The
//! loop repeatedly pops the worst triangle that still touches the
//! advancing front, generates an optimal insertion point off its active
//! edge, and inserts it through cavity retriangulation. Refinement stops
//! when no triangle above the ratio limit touches the front anymore.

mod cavity;
mod data;
mod optimal;
mod tri;

pub use data::MeshData;

use std::collections::BTreeSet;

use tracing::debug;

use crate::geom::{MeshingOptions, SizeField, Surface};
use crate::predicates::orient2d;

use cavity::insert_a_point;
use optimal::optimal_point;
use tri::{FrontTri, TriKey, active_edge, connect_tris};

/// A triangle whose radius criterion is below this needs no refinement.
pub const LIMIT: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Refine `triangles` (rows into `data`) until every triangle meets the
/// radius limit or its front edge cannot be improved. Returns the final
/// triangle list, oriented counterclockwise in the parametric plane and
/// with seam copies collapsed onto their primary rows.
pub fn refine_frontal(
    surface: &dyn Surface,
    field: &dyn SizeField,
    options: &MeshingOptions,
    data: &mut MeshData,
    triangles: &[[usize; 3]],
) -> Vec<[usize; 3]> {
    let extend = options.extend_size;
    let norm = options.radius_norm;

    let mut tris: Vec<FrontTri> = triangles
        .iter()
        .map(|&verts| {
            let lc = verts.iter().map(|&v| data.size[v]).sum::<f64>() / 3.0;
            let lc_bgm = verts.iter().map(|&v| data.size_bgm[v]).sum::<f64>() / 3.0;
            let ll = if extend { lc.min(lc_bgm) } else { lc_bgm };
            FrontTri::new(verts, ll, data, surface, norm)
        })
        .collect();
    let n = tris.len();
    connect_tris(&mut tris, 0..n);

    let mut all: BTreeSet<TriKey> = (0..n).map(|i| TriKey::of(&tris, i)).collect();
    let mut active: BTreeSet<TriKey> = BTreeSet::new();
    for key in &all {
        if active_edge(&tris, key.idx, LIMIT).is_some() {
            active.insert(*key);
        } else if key.radius < LIMIT {
            break;
        }
    }

    let mut inserted = 0usize;
    while let Some(key) = active.pop_first() {
        let worst = key.idx;
        if tris[worst].deleted || tris[worst].radius <= LIMIT {
            continue;
        }
        let Some(edge) = active_edge(&tris, worst, LIMIT) else {
            continue;
        };
        let Some((center, metric)) =
            optimal_point(surface, data, &tris, worst, edge, extend)
        else {
            continue;
        };
        if insert_a_point(
            &mut tris,
            data,
            surface,
            field,
            center,
            &metric,
            worst,
            extend,
            norm,
            LIMIT,
            &mut all,
            &mut active,
        ) {
            inserted += 1;
        }
    }
    debug!("frontal refinement inserted {inserted} interior points");

    transfer(data, tris.iter().filter(|t| !t.deleted).map(|t| t.verts))
}

/// Normalize triangle orientation to counterclockwise in the parametric
/// plane and collapse seam copies onto their primary rows, dropping
/// triangles that degenerate in the process.
pub fn transfer(
    data: &MeshData,
    triangles: impl IntoIterator<Item = [usize; 3]>,
) -> Vec<[usize; 3]> {
    triangles
        .into_iter()
        .filter_map(|verts| {
            let [a, b, c] = verts;
            let oriented = if orient2d(data.uv[a], data.uv[b], data.uv[c]) < 0.0 {
                [a, c, b]
            } else {
                [a, b, c]
            };
            let mapped = oriented.map(|v| data.primary(v));
            let [a, b, c] = mapped;
            // seam-degenerate triangles collapse onto themselves
            (a != b && b != c && c != a).then_some(mapped)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use glam::{DVec2, DVec3};

    use super::*;
    use crate::geom::NoSizeField;

    struct Plane;

    impl Surface for Plane {
        fn point(&self, uv: DVec2) -> DVec3 {
            DVec3::new(uv.x, uv.y, 0.0)
        }
        fn d1(&self, _uv: DVec2) -> (DVec3, DVec3) {
            (DVec3::X, DVec3::Y)
        }
        fn param_range(&self) -> (DVec2, DVec2) {
            (DVec2::ZERO, DVec2::ONE)
        }
        fn nearest_point(&self, p: DVec3) -> DVec2 {
            DVec2::new(p.x, p.y)
        }
    }

    /// A coarse unit square (two triangles) with a fine target size
    /// refines to many triangles that tile the same area.
    #[test]
    fn refinement_fills_a_square() {
        let mut data = MeshData::new();
        for (i, uv) in [
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(0.0, 1.0),
        ]
        .into_iter()
        .enumerate()
        {
            data.add_vertex(
                uv,
                DVec3::new(uv.x, uv.y, 0.0),
                0.25,
                0.25,
                1,
                Some(i as i32),
            );
        }
        let triangles = vec![[0, 1, 2], [0, 2, 3]];

        let options = MeshingOptions::default();
        let out = refine_frontal(&Plane, &NoSizeField, &options, &mut data, &triangles);

        assert!(out.len() > 8, "expected refinement, got {}", out.len());
        assert!(data.len() > 4);

        // area is preserved and every triangle is counterclockwise
        let mut area = 0.0;
        for t in &out {
            let s = cavity::surf_uv(&data, *t);
            assert!(s > 0.0);
            area += s;
        }
        assert!((area - 1.0).abs() < 1.0e-9, "area {area}");

        // interior points stay inside the square
        for row in 4..data.len() {
            let uv = data.uv[row];
            assert!((-1.0e-9..=1.0 + 1.0e-9).contains(&uv.x));
            assert!((-1.0e-9..=1.0 + 1.0e-9).contains(&uv.y));
        }
    }
}
