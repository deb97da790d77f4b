use std::cmp::Ordering;

use crate::geom::{RadiusNorm, Surface};
use crate::metric::{Metric, circum_center_xyz};
use crate::quality::gamma;

use super::data::MeshData;

pub type TriIdx = usize;

/// A triangle of the frontal refinement queue, caching the radius
/// criterion it is ordered by and its three neighbors across edges.
///
/// Edge `i` joins vertices `verts[(i + 2) % 3]` and `verts[i]`, matching
/// the neighbor slot `neigh[i]`.
pub struct FrontTri {
    pub verts: [usize; 3],
    pub radius: f64,
    pub deleted: bool,
    pub neigh: [Option<TriIdx>; 3],
}

impl FrontTri {
    /// Build a triangle and cache its radius criterion: the circumradius
    /// relative to the local size `ll`, measured according to `norm`.
    pub fn new(
        verts: [usize; 3],
        ll: f64,
        data: &MeshData,
        surface: &dyn Surface,
        norm: RadiusNorm,
    ) -> Self {
        let pa = data.position[verts[0]];
        let pb = data.position[verts[1]];
        let pc = data.position[verts[2]];

        let radius = match norm {
            RadiusNorm::Quality => {
                let q = gamma(pa, pb, pc);
                if q == 0.0 { 1.0e22 } else { 1.0 / q }
            }
            RadiusNorm::Euclidean => match circum_center_xyz(pa, pb, pc) {
                Some(center) => (pa - center).length() / ll,
                // degenerate triangles never drive refinement
                None => 0.0,
            },
            RadiusNorm::Infinity => {
                let ua = data.uv[verts[0]];
                let ub = data.uv[verts[1]];
                let uc = data.uv[verts[2]];
                let centroid = (ua + ub + uc) / 3.0;
                let metric = Metric::at(surface, centroid);
                let ratio =
                    (metric.a * metric.d - metric.b * metric.b).powf(-0.25);
                let xmax = ua.x.max(ub.x).max(uc.x);
                let xmin = ua.x.min(ub.x).min(uc.x);
                let ymax = ua.y.max(ub.y).max(uc.y);
                let ymin = ua.y.min(ub.y).min(uc.y);
                (xmax - xmin).max(ymax - ymin) / (ratio * ll)
            }
        };

        Self {
            verts,
            radius,
            deleted: false,
            neigh: [None; 3],
        }
    }

    /// Endpoints of edge `i`.
    #[inline]
    pub fn edge_verts(&self, i: usize) -> (usize, usize) {
        (self.verts[(i + 2) % 3], self.verts[i])
    }
}

/// Key of the radius-ordered triangle sets: radius descending, then the
/// triangle serial so ties break deterministically.
#[derive(Debug, Clone, Copy)]
pub struct TriKey {
    pub radius: f64,
    pub idx: TriIdx,
}

impl TriKey {
    pub fn of(tris: &[FrontTri], idx: TriIdx) -> Self {
        Self {
            radius: tris[idx].radius,
            idx,
        }
    }
}

impl PartialEq for TriKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TriKey {}

impl PartialOrd for TriKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TriKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .radius
            .total_cmp(&self.radius)
            .then_with(|| self.idx.cmp(&other.idx))
    }
}

/// An edge of a triangle paired for neighbor matching: endpoints in
/// canonical (ascending row) order, remembering which triangle edge it
/// came from and whether the canonical order flipped it.
#[derive(Debug, Clone, Copy)]
pub struct ShellEdge {
    pub v: [usize; 2],
    pub t: TriIdx,
    pub i: usize,
    pub ori: i8,
}

impl ShellEdge {
    pub fn new(tris: &[FrontTri], t: TriIdx, i: usize) -> Self {
        let (v0, v1) = tris[t].edge_verts(i);
        if v0 > v1 {
            Self {
                v: [v1, v0],
                t,
                i,
                ori: -1,
            }
        } else {
            Self {
                v: [v0, v1],
                t,
                i,
                ori: 1,
            }
        }
    }

    #[inline]
    pub fn same_edge(&self, other: &ShellEdge) -> bool {
        self.v == other.v
    }
}

/// Recompute mutual neighbor links among `idxs` by lexicographically
/// pairing their edges.
pub fn connect_tris(tris: &mut [FrontTri], idxs: impl IntoIterator<Item = TriIdx>) {
    let mut conn: Vec<ShellEdge> = Vec::new();
    for t in idxs {
        if !tris[t].deleted {
            for i in 0..3 {
                conn.push(ShellEdge::new(tris, t, i));
            }
        }
    }
    if conn.is_empty() {
        return;
    }
    conn.sort_by_key(|e| (e.v, e.t));

    let mut k = 0;
    while k + 1 < conn.len() {
        let (a, b) = (conn[k], conn[k + 1]);
        if a.same_edge(&b) && a.t != b.t {
            tris[a.t].neigh[a.i] = Some(b.t);
            tris[b.t].neigh[b.i] = Some(a.t);
            k += 1;
        }
        k += 1;
    }
}

/// The first edge of `t` facing the front: no neighbor, or a neighbor
/// whose cached radius already meets the limit.
pub fn active_edge(tris: &[FrontTri], t: TriIdx, limit: f64) -> Option<usize> {
    if tris[t].deleted {
        return None;
    }
    (0..3).find(|&i| match tris[t].neigh[i] {
        None => true,
        Some(n) => tris[n].radius < limit && tris[n].radius > 0.0,
    })
}

#[cfg(test)]
mod tests {
    use glam::{DVec2, DVec3};

    use super::*;

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

    fn two_triangle_data() -> MeshData {
        let mut data = MeshData::new();
        for uv in [
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(0.0, 1.0),
        ] {
            data.add_vertex(uv, DVec3::new(uv.x, uv.y, 0.0), 1.0, 1.0, 1, None);
        }
        data
    }

    #[test]
    fn connect_pairs_shared_edges() {
        let data = two_triangle_data();
        let mut tris = vec![
            FrontTri::new([0, 1, 2], 1.0, &data, &Plane, RadiusNorm::Euclidean),
            FrontTri::new([0, 2, 3], 1.0, &data, &Plane, RadiusNorm::Euclidean),
        ];
        connect_tris(&mut tris, 0..2);

        let neighbors0: Vec<_> = tris[0].neigh.iter().flatten().collect();
        assert_eq!(neighbors0, vec![&1]);
        let neighbors1: Vec<_> = tris[1].neigh.iter().flatten().collect();
        assert_eq!(neighbors1, vec![&0]);

        // the shared edge is (0, 2) on both sides
        let i0 = tris[0].neigh.iter().position(|n| n.is_some()).unwrap();
        let (a, b) = tris[0].edge_verts(i0);
        assert_eq!(ordered(a, b), (0, 2));
    }

    #[test]
    fn euclidean_radius_is_circumradius_over_size() {
        let data = two_triangle_data();
        let t = FrontTri::new([0, 1, 2], 2.0, &data, &Plane, RadiusNorm::Euclidean);
        // right triangle with hypotenuse sqrt(2): circumradius sqrt(2)/2
        assert!((t.radius - 2.0_f64.sqrt() / 2.0 / 2.0).abs() < 1.0e-12);
    }

    #[test]
    fn key_order_is_radius_descending_with_serial_ties() {
        let mut set = std::collections::BTreeSet::new();
        set.insert(TriKey { radius: 1.0, idx: 4 });
        set.insert(TriKey { radius: 3.0, idx: 9 });
        set.insert(TriKey { radius: 3.0, idx: 2 });
        let order: Vec<usize> = set.iter().map(|k| k.idx).collect();
        assert_eq!(order, vec![2, 9, 4]);
    }

    fn ordered(a: usize, b: usize) -> (usize, usize) {
        if a < b { (a, b) } else { (b, a) }
    }
}
