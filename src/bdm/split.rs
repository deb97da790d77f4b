use glam::DVec2;

use super::{BdmMesh, EdgeId, parametric_area};
use crate::geom::{Degeneracy, Surface};

impl BdmMesh {
    /// Insert the existing point `mid` on edge `e`, replacing the two
    /// adjacent triangles by four.
    ///
    /// The split edge halves inherit the edge's classification, the
    /// spokes and the four new faces inherit their parent face's. With
    /// `check_area_param` the split is refused (mesh left untouched) when
    /// the parametric area of the four new triangles drifts more than
    /// ±10% from the original two, which happens around degenerate
    /// points.
    pub fn split_edge(&mut self, e: EdgeId, mid: i32, check_area_param: bool) -> bool {
        if self.edges[e].num_faces() != 2 {
            return false;
        }
        let (p1n, p2n) = (self.edges[e].p1, self.edges[e].p2);
        let [Some(op0n), Some(op1n)] = self.edges[e].opposite_points(self) else {
            return false;
        };

        if check_area_param {
            let p1 = &self.points[&p1n];
            let p2 = &self.points[&p2n];
            let op0 = &self.points[&op0n];
            let op1 = &self.points[&op1n];
            let m = &self.points[&mid];
            let area0 = parametric_area(p2, p1, op0).abs() + parametric_area(p2, p1, op1).abs();
            let area1 = parametric_area(m, p1, op1).abs()
                + parametric_area(m, op1, p2).abs()
                + parametric_area(m, p2, op0).abs()
                + parametric_area(m, op0, p1).abs();
            if area1 > 1.1 * area0 || area1 < 0.9 * area0 {
                return false;
            }
        }

        let f0 = self.edges[e].faces[0];
        let f1 = self.edges[e].faces[1];
        let Some(pts1) = self.faces[f0].nodes(self) else {
            return false;
        };
        let mut orientation = 0;
        for i in 0..3 {
            if pts1[i] == p1n {
                orientation = if pts1[(i + 1) % 3] == p2n { 1 } else { -1 };
                break;
            }
        }

        let Some(p1_op1) = self.find_edge_in_face(p1n, op0n, f0) else {
            return false;
        };
        let Some(op1_p2) = self.find_edge_in_face(op0n, p2n, f0) else {
            return false;
        };
        let Some(p1_op2) = self.find_edge_in_face(p1n, op1n, f1) else {
            return false;
        };
        let Some(op2_p2) = self.find_edge_in_face(op1n, p2n, f1) else {
            return false;
        };

        let g1 = self.faces[f0].g;
        let g2 = self.faces[f1].g;
        let ge = self.edges[e].g;

        self.del_face(f0);
        self.del_face(f1);
        self.del_edge(e);

        let p1_mid = self.add_edge(p1n, mid);
        let mid_p2 = self.add_edge(mid, p2n);
        let op1_mid = self.add_edge(op0n, mid);
        let mid_op2 = self.add_edge(mid, op1n);

        let (t1, t2, t3, t4) = if orientation == 1 {
            (
                self.add_triangle(op1_mid, p1_op1, p1_mid),
                self.add_triangle(mid_op2, op2_p2, mid_p2),
                self.add_triangle(op1_p2, op1_mid, mid_p2),
                self.add_triangle(p1_op2, mid_op2, p1_mid),
            )
        } else {
            (
                self.add_triangle(p1_op1, op1_mid, p1_mid),
                self.add_triangle(op2_p2, mid_op2, mid_p2),
                self.add_triangle(op1_mid, op1_p2, mid_p2),
                self.add_triangle(mid_op2, p1_op2, p1_mid),
            )
        };
        self.faces[t1].g = g1;
        self.faces[t2].g = g2;
        self.faces[t3].g = g1;
        self.faces[t4].g = g2;

        self.edges[p1_mid].g = ge;
        self.edges[mid_p2].g = ge;
        self.edges[op1_mid].g = g1;
        self.edges[mid_op2].g = g2;
        self.points.get_mut(&mid).expect("midpoint exists").g = ge;

        for id in [p1n, p2n, op0n, op1n] {
            self.points.get_mut(&id).expect("split corners exist").config_modified = true;
        }
        true
    }

    /// Split every edge joining a degenerate point (a pole) to a regular
    /// one through the parametric midpoint taken on the non-degenerate
    /// axis. Boundary recovery retries after this when a required edge
    /// crosses the pole.
    ///
    /// Returns the number of edges split. Stops early when a split would
    /// distort the parametric area, which means the remaining neighborhood
    /// is already unsalvageable by this device.
    pub fn split_edges_at_degeneracy(&mut self, surface: &dyn Surface) -> usize {
        let candidates: Vec<EdgeId> = self
            .edges
            .iter()
            .filter(|(_, e)| {
                !e.deleted && {
                    let d1 = self.points[&e.p1].degenerated.is_degenerate();
                    let d2 = self.points[&e.p2].degenerated.is_degenerate();
                    d1 != d2
                }
            })
            .map(|(id, _)| id)
            .collect();

        let mut n_split = 0;
        for e in candidates {
            if self.edges[e].deleted || self.edges[e].num_faces() != 2 {
                continue;
            }
            let (p1n, p2n) = (self.edges[e].p1, self.edges[e].p2);
            let (mut uv1, mut uv2, size1, size2) = {
                let p1 = &self.points[&p1n];
                let p2 = &self.points[&p2n];
                (p1.uv, p2.uv, p1.size, p2.size)
            };
            match self.points[&p1n].degenerated {
                Degeneracy::U => uv1.x = uv2.x,
                Degeneracy::V => uv1.y = uv2.y,
                Degeneracy::None => {}
            }
            match self.points[&p2n].degenerated {
                Degeneracy::U => uv2.x = uv1.x,
                Degeneracy::V => uv2.y = uv1.y,
                Degeneracy::None => {}
            }
            let mid_uv: DVec2 = 0.5 * (uv1 + uv2);

            let mid = self.max_point_id + 1;
            let p = self.add_point_on(mid, mid_uv, surface);
            p.size = 0.5 * (size1 + size2);

            if self.split_edge(e, mid, true) {
                n_split += 1;
            } else {
                self.del_point(mid);
                break;
            }
        }
        n_split
    }
}

#[cfg(test)]
mod tests {
    use glam::{DVec2, DVec3};

    use super::*;
    use crate::geom::GeomRef;

    fn quad() -> BdmMesh {
        let mut m = BdmMesh::new();
        let uv = [
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, -1.0),
            DVec2::new(2.0, 0.0),
            DVec2::new(1.0, 1.0),
        ];
        for (i, p) in uv.into_iter().enumerate() {
            let pt = m.add_point(i as i32, DVec3::new(p.x, p.y, 0.0));
            pt.uv = p;
        }
        m.add_triangle_by_points(0, 1, 2);
        m.add_triangle_by_points(0, 2, 3);
        m
    }

    #[test]
    fn split_creates_four_triangles_and_inherits_classification() {
        let mut m = quad();
        let e = m.find_edge(0, 2).unwrap();
        let curve = GeomRef::new(9, 1);
        m.edges[e].g = Some(curve);
        let surf = GeomRef::new(1, 2);
        for f in m.edges[e].faces.clone() {
            m.faces[f].g = Some(surf);
        }

        let mid = m.max_point_id + 1;
        let p = m.add_point(mid, DVec3::new(1.0, 0.0, 0.0));
        p.uv = DVec2::new(1.0, 0.0);
        assert!(m.split_edge(e, mid, false));
        m.cleanup();

        assert_eq!(m.faces.len(), 4);
        assert_eq!(m.edges.len(), 8);
        // halves of the split edge keep the curve classification
        let h1 = m.find_edge(0, mid).unwrap();
        let h2 = m.find_edge(mid, 2).unwrap();
        assert_eq!(m.edges[h1].g, Some(curve));
        assert_eq!(m.edges[h2].g, Some(curve));
        assert_eq!(m.points[&mid].g, Some(curve));
        // spokes and faces inherit from the faces
        let s1 = m.find_edge(1, mid).unwrap();
        assert_eq!(m.edges[s1].g, Some(surf));
        assert!(m.faces.values().all(|f| f.g == Some(surf)));
        // every new triangle contains the midpoint
        for nodes in m.triangle_nodes() {
            assert!(nodes.contains(&mid));
        }
    }

    #[test]
    fn split_preserves_orientation() {
        let mut m = quad();
        let before: Vec<f64> = m
            .triangle_nodes()
            .iter()
            .map(|n| {
                parametric_area(&m.points[&n[0]], &m.points[&n[1]], &m.points[&n[2]])
            })
            .collect();
        let sign = before[0].signum();
        assert!(before.iter().all(|a| a.signum() == sign));

        let e = m.find_edge(0, 2).unwrap();
        let mid = m.max_point_id + 1;
        let p = m.add_point(mid, DVec3::new(1.0, 0.0, 0.0));
        p.uv = DVec2::new(1.0, 0.0);
        assert!(m.split_edge(e, mid, false));

        for n in m.triangle_nodes() {
            let a = parametric_area(&m.points[&n[0]], &m.points[&n[1]], &m.points[&n[2]]);
            assert!(a.signum() == sign, "orientation flipped: {a}");
        }
    }

    #[test]
    fn off_edge_midpoint_fails_the_area_check() {
        let mut m = quad();
        let e = m.find_edge(0, 2).unwrap();
        let mid = m.max_point_id + 1;
        let p = m.add_point(mid, DVec3::new(1.0, 1.5, 0.0));
        p.uv = DVec2::new(1.0, 1.5);
        assert!(!m.split_edge(e, mid, true));
        // untouched
        assert_eq!(m.triangle_nodes().len(), 2);
        assert!(m.find_edge(0, 2).is_some());
    }
}
