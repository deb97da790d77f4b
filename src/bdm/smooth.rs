use glam::{DMat2, DVec2, DVec3};

use super::BdmMesh;
use crate::geom::{Degeneracy, Surface};
use crate::metric::solve_2x2;
use crate::predicates::orient2d;

/// Read-only snapshot of a one-ring neighbor used by the smoothing move.
#[derive(Clone, Copy)]
struct Neighbor {
    uv: DVec2,
    position: DVec3,
    size: f64,
    degenerated: Degeneracy,
}

impl BdmMesh {
    /// Tutte-style smoothing of an interior point with safety checks.
    ///
    /// The point is moved to a weighted centroid of the visibility kernel
    /// of its one-ring, first parametrically, then (if that fails) by
    /// projecting the 3D area-weighted centroid back to the surface.
    /// A move is kept only when it lowers the Tutte energy and every
    /// one-ring triangle keeps its orientation. Points whose incident
    /// edge lengths are already balanced beyond `threshold` are skipped.
    ///
    /// Returns `true` iff the point moved.
    pub fn smooth_point_centroid(
        &mut self,
        p: i32,
        surface: &dyn Surface,
        threshold: f64,
    ) -> bool {
        {
            let point = &self.points[&p];
            if point.degenerated.is_degenerate() {
                return false;
            }
            if let Some(g) = point.g {
                if g.dim <= 1 {
                    return false;
                }
                if g.tag < 0 {
                    self.points.get_mut(&p).expect("point exists").config_modified = true;
                    return true;
                }
            }
        }

        let Some(ring) = self.ordered_ring(p) else {
            return false;
        };
        let neighbors: Vec<Neighbor> = ring
            .iter()
            .map(|id| {
                let q = &self.points[id];
                Neighbor {
                    uv: q.uv,
                    position: q.position,
                    size: q.size,
                    degenerated: q.degenerated,
                }
            })
            .collect();

        let (old_position, old_uv, old_size) = {
            let point = &self.points[&p];
            (point.position, point.uv, point.size)
        };

        let (energy, ratio) = tutte_energy(old_position, &neighbors);
        if ratio > threshold {
            return false;
        }

        let (kernel, kernel_sizes) = visibility_kernel(old_uv, old_size, &neighbors);

        // parametric centroid move, weighted by 3D distance per parametric
        // distance so stretched regions pull harder
        if let Some((uv, size)) =
            weighted_centroid(surface, old_uv, old_position, &kernel, &kernel_sizes)
        {
            let position = surface.point(uv);
            let (moved_energy, moved_ratio) = tutte_energy(position, &neighbors);
            if moved_energy < energy && cavity_valid(uv, &neighbors) {
                let point = self.points.get_mut(&p).expect("point exists");
                point.uv = uv;
                point.position = position;
                point.size = size;
                point.config_modified = true;
                if moved_ratio > 0.25 {
                    return true;
                }
            }
        }

        if self.project_move(p, surface, &neighbors, energy) {
            // a second projection from the new location tightens the move
            let (energy2, _) = tutte_energy(self.points[&p].position, &neighbors);
            self.project_move(p, surface, &neighbors, energy2);
            return true;
        }
        // the parametric move may have been applied without being "good
        // enough"; it still counts as a move
        self.points[&p].uv != old_uv
    }

    /// Projection move: the area-weighted 3D centroid of the one-ring fan
    /// projected back to the surface. Applied only when it lowers the
    /// energy below `energy_bound` and the ring stays valid.
    fn project_move(
        &mut self,
        p: i32,
        surface: &dyn Surface,
        neighbors: &[Neighbor],
        energy_bound: f64,
    ) -> bool {
        let centroid = area_weighted_centroid(self.points[&p].position, neighbors);
        let uv = surface.nearest_point(centroid);
        let position = surface.point(uv);
        if !cavity_valid(uv, neighbors) {
            return false;
        }
        let (moved_energy, _) = tutte_energy(position, neighbors);
        if moved_energy >= energy_bound {
            return false;
        }
        let point = self.points.get_mut(&p).expect("point exists");
        point.uv = uv;
        point.position = position;
        point.config_modified = true;
        true
    }

    /// The one-ring of `p` ordered by walking adjacent triangles. `None`
    /// when the ring does not close into a single fan.
    fn ordered_ring(&self, p: i32) -> Option<Vec<i32>> {
        let tris = self.points[&p].triangles(self);
        if tris.is_empty() {
            return None;
        }
        let pairs: Vec<[i32; 2]> = tris
            .iter()
            .filter_map(|&f| {
                let nodes = self.faces[f].nodes(self)?;
                let others: Vec<i32> = nodes.into_iter().filter(|&n| n != p).collect();
                match others[..] {
                    [a, b] => Some([a, b]),
                    _ => None,
                }
            })
            .collect();
        if pairs.len() != tris.len() {
            return None;
        }

        let mut ring: Vec<i32> = Vec::with_capacity(pairs.len());
        loop {
            let mut found = false;
            for pp in &pairs {
                if ring.is_empty() {
                    ring.push(pp[0]);
                    ring.push(pp[1]);
                    found = true;
                    break;
                }
                let p0 = ring[ring.len() - 2];
                let p1 = ring[ring.len() - 1];
                if p1 == pp[0] && p0 != pp[1] {
                    ring.push(pp[1]);
                    found = true;
                    break;
                }
                if p1 == pp[1] && p0 != pp[0] {
                    ring.push(pp[0]);
                    found = true;
                    break;
                }
            }
            if ring.len() == pairs.len() {
                return Some(ring);
            }
            if !found {
                return None;
            }
        }
    }
}

/// Sum of squared 3D edge lengths from `p` to its ring, plus the min/max
/// squared-length ratio.
fn tutte_energy(p: DVec3, neighbors: &[Neighbor]) -> (f64, f64) {
    if neighbors.is_empty() {
        return (1.0e22, 0.0);
    }
    let mut energy = 0.0;
    let mut min = f64::MAX;
    let mut max: f64 = 0.0;
    for n in neighbors {
        let l2 = (p - n.position).length_squared();
        min = min.min(l2);
        max = max.max(l2);
        energy += l2;
    }
    if max == 0.0 {
        return (1.0e22, 0.0);
    }
    (energy, min / max)
}

/// Approximate visibility kernel of the one-ring polygon: start from the
/// neighbor polygon (with degenerate corners spliced on the collapsed
/// axis), then truncate the ray from `p` to each polygon vertex against
/// every non-adjacent polygon edge.
fn visibility_kernel(
    p_uv: DVec2,
    p_size: f64,
    neighbors: &[Neighbor],
) -> (Vec<DVec2>, Vec<f64>) {
    let n = neighbors.len();
    let mut kernel = Vec::with_capacity(n);
    let mut sizes = Vec::with_capacity(n);
    for i in 0..n {
        let nb = &neighbors[i];
        let nx = &neighbors[(i + 1) % n];
        match (nb.degenerated, nx.degenerated) {
            (Degeneracy::U, _) => {
                kernel.push(DVec2::new(p_uv.x, nb.uv.y));
                kernel.push(DVec2::new(nx.uv.x, nb.uv.y));
                sizes.push(nb.size);
                sizes.push(nb.size);
            }
            (Degeneracy::V, _) => {
                kernel.push(DVec2::new(nb.uv.x, p_uv.y));
                kernel.push(DVec2::new(nb.uv.x, nx.uv.y));
                sizes.push(nb.size);
                sizes.push(nb.size);
            }
            (_, Degeneracy::U) => {
                kernel.push(nb.uv);
                kernel.push(DVec2::new(nb.uv.x, nx.uv.y));
                sizes.push(nb.size);
                sizes.push(nb.size);
            }
            (_, Degeneracy::V) => {
                kernel.push(nb.uv);
                kernel.push(DVec2::new(nx.uv.x, nb.uv.y));
                sizes.push(nb.size);
                sizes.push(nb.size);
            }
            _ => {
                kernel.push(nb.uv);
                sizes.push(nb.size);
            }
        }
    }

    let len = kernel.len();
    for i in 0..len {
        let mut q = kernel[i];
        let mut size = sizes[i];
        for j in 0..len {
            if i == j || i == (j + 1) % len {
                continue;
            }
            let e0 = kernel[j];
            let e1 = kernel[(j + 1) % len];
            let m = DMat2::from_cols(
                DVec2::new(q.x - p_uv.x, q.y - p_uv.y),
                DVec2::new(e0.x - e1.x, e0.y - e1.y),
            );
            let Some(x) = solve_2x2(m, e0 - p_uv) else {
                continue;
            };
            if x.x > 0.0 && x.x < 1.0 {
                q = p_uv * (1.0 - x.x) + q * x.x;
                size = p_size * (1.0 - x.x) + size * x.x;
            }
        }
        kernel[i] = q;
        sizes[i] = size;
    }
    (kernel, sizes)
}

/// Kernel centroid weighted by 3D stretch (distance on the surface per
/// parametric distance). `None` when every weight degenerates.
fn weighted_centroid(
    surface: &dyn Surface,
    p_uv: DVec2,
    p_position: DVec3,
    kernel: &[DVec2],
    sizes: &[f64],
) -> Option<(DVec2, f64)> {
    let mut uv_sum = DVec2::ZERO;
    let mut size_sum = 0.0;
    let mut weight_sum = 0.0;
    for (k, &size) in kernel.iter().zip(sizes) {
        let denom = (p_uv - *k).length_squared();
        if denom == 0.0 {
            continue;
        }
        let gp = surface.point(*k);
        let weight = ((p_position - gp).length_squared() / denom).sqrt();
        uv_sum += *k * weight;
        size_sum += size * weight;
        weight_sum += weight;
    }
    if weight_sum == 0.0 {
        return None;
    }
    Some((uv_sum / weight_sum, size_sum / weight_sum))
}

/// Area-weighted centroid of the 3D triangles of the one-ring fan.
fn area_weighted_centroid(p: DVec3, neighbors: &[Neighbor]) -> DVec3 {
    let n = neighbors.len();
    let mut x = DVec3::ZERO;
    let mut sum = 0.0;
    for i in 0..n {
        let pi = neighbors[i].position;
        let pip = neighbors[(i + 1) % n].position;
        let nrm = (pi - p).cross(pip - p).length();
        x += (pi + p + pip) * (nrm / 3.0);
        sum += nrm;
    }
    if sum == 0.0 { p } else { x / sum }
}

/// Every pair of consecutive ring vertices must see `p_uv` from the same
/// side, with degenerate corners read on the surviving axis.
fn cavity_valid(p_uv: DVec2, neighbors: &[Neighbor]) -> bool {
    let n = neighbors.len();
    if n < 3 {
        return false;
    }
    let corner = |a: &Neighbor, b: &Neighbor| {
        DVec2::new(
            if a.degenerated == Degeneracy::U {
                b.uv.x
            } else {
                a.uv.x
            },
            if a.degenerated == Degeneracy::V {
                b.uv.y
            } else {
                a.uv.y
            },
        )
    };
    let sign = orient2d(
        p_uv,
        corner(&neighbors[0], &neighbors[1]),
        corner(&neighbors[1], &neighbors[0]),
    );
    for i in 1..n {
        let a = &neighbors[i];
        let b = &neighbors[(i + 1) % n];
        let s = orient2d(p_uv, corner(a, b), corner(b, a));
        if sign * s <= 0.0 {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::GeomRef;

    struct Plane;

    impl Surface for Plane {
        fn point(&self, uv: DVec2) -> DVec3 {
            DVec3::new(uv.x, uv.y, 0.0)
        }
        fn d1(&self, _uv: DVec2) -> (DVec3, DVec3) {
            (DVec3::X, DVec3::Y)
        }
        fn param_range(&self) -> (DVec2, DVec2) {
            (DVec2::splat(-10.0), DVec2::splat(10.0))
        }
        fn nearest_point(&self, p: DVec3) -> DVec2 {
            DVec2::new(p.x, p.y)
        }
    }

    fn lopsided_fan() -> BdmMesh {
        let mut m = BdmMesh::new();
        // interior point well off the centroid of its ring
        let c = m.add_point(0, DVec3::new(0.7, 0.5, 0.0));
        c.uv = DVec2::new(0.7, 0.5);
        c.g = Some(GeomRef::new(1, 2));
        for i in 0..6 {
            let a = std::f64::consts::TAU * i as f64 / 6.0;
            let uv = DVec2::new(a.cos(), a.sin());
            let p = m.add_point(1 + i as i32, DVec3::new(uv.x, uv.y, 0.0));
            p.uv = uv;
            p.g = Some(GeomRef::new(2, 1));
        }
        for i in 0..6 {
            m.add_triangle_by_points(0, 1 + i, 1 + (i + 1) % 6);
        }
        m
    }

    #[test]
    fn smoothing_centers_a_lopsided_point() {
        let mut m = lopsided_fan();
        let before = m.points[&0].uv;
        assert!(m.smooth_point_centroid(0, &Plane, 0.9));
        let after = m.points[&0].uv;
        assert!(after.length() < before.length(), "{after} vs {before}");
        // all one-ring triangles stay positively oriented
        for n in m.triangle_nodes() {
            let a = crate::bdm::parametric_area(
                &m.points[&n[0]],
                &m.points[&n[1]],
                &m.points[&n[2]],
            );
            assert!(a != 0.0);
        }
    }

    #[test]
    fn regular_points_are_skipped() {
        let mut m = lopsided_fan();
        {
            let p = m.points.get_mut(&0).unwrap();
            p.uv = DVec2::ZERO;
            p.position = DVec3::ZERO;
        }
        // perfectly regular ring: the length ratio is 1, above threshold
        assert!(!m.smooth_point_centroid(0, &Plane, 0.9));
    }

    #[test]
    fn boundary_points_are_never_moved() {
        let mut m = lopsided_fan();
        m.points.get_mut(&1).unwrap().g = Some(GeomRef::new(2, 1));
        assert!(!m.smooth_point_centroid(1, &Plane, 0.9));
    }
}
