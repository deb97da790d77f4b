use super::{BdmMesh, EdgeId, parametric_area};

impl BdmMesh {
    /// Collapse `e` by moving `p` onto the other endpoint of `e`,
    /// removing `p`, the edge and both adjacent triangles, and rewiring
    /// the remaining triangles around `p`.
    ///
    /// Unless `force`, the collapse is refused when `p` is classified on
    /// a model vertex or curve, when it would identify periodic copies,
    /// when any rewired triangle loses more than 98% of its parametric
    /// area or the total parametric area drifts, or when an opposite
    /// vertex would be left with too few edges.
    pub fn collapse_edge_parametric(&mut self, e: EdgeId, p: i32, force: bool) -> bool {
        if !force && self.edges[e].num_faces() != 2 {
            return false;
        }
        if !force {
            if let Some(g) = self.points[&p].g {
                // collapsing points off model curves keeps the boundary intact
                if g.dim <= 1 {
                    return false;
                }
                if let Some(eg) = self.edges[e].g {
                    if eg.dim == 2 && g != eg {
                        return false;
                    }
                }
            }
        }

        let (ep1, ep2) = (self.edges[e].p1, self.edges[e].p2);
        if !force {
            // collapsing must not glue a periodic copy onto its counterpart
            for &ei in &self.points[&ep1].edges {
                let o1 = self.edges[ei].other_vertex(ep1).expect("incident edge");
                let counterpart = self.points[&o1].periodic_counterpart;
                if counterpart.is_none() {
                    continue;
                }
                for &ej in &self.points[&ep2].edges {
                    let o2 = self.edges[ej].other_vertex(ep2).expect("incident edge");
                    if counterpart == Some(o2) {
                        return false;
                    }
                }
            }
        }

        if self.edges[e].num_faces() == 2 {
            let [Some(o0), Some(o1)] = self.edges[e].opposite_points(self) else {
                return false;
            };
            // the opposite vertices lose one edge each
            if self.find_edge(o0, o1).is_some() {
                return false;
            }
            if !force {
                for id in [o0, o1] {
                    let point = &self.points[&id];
                    if let Some(g) = point.g {
                        if g.dim == 2 && point.edges.len() <= 4 {
                            return false;
                        }
                        if g.dim < 2 && point.edges.len() <= 3 {
                            return false;
                        }
                    }
                }
            }
        }

        let Some(o) = self.edges[e].other_vertex(p) else {
            return false;
        };
        let incident = self.points[&p].triangles(self);

        let mut kept: Vec<([i32; 3], Option<crate::geom::GeomRef>)> = Vec::new();
        let mut area_old = 0.0;
        let mut area_new = 0.0;
        for &f in &incident {
            let Some(nodes) = self.faces[f].nodes(self) else {
                continue;
            };
            let sold = parametric_area(
                &self.points[&nodes[0]],
                &self.points[&nodes[1]],
                &self.points[&nodes[2]],
            )
            .abs();
            area_old += sold;
            if self.faces[f].has_edge(e) {
                continue;
            }
            let replaced = nodes.map(|n| if n == p { o } else { n });
            let snew = parametric_area(
                &self.points[&replaced[0]],
                &self.points[&replaced[1]],
                &self.points[&replaced[2]],
            )
            .abs();
            if !force && snew < 0.02 * sold {
                return false;
            }
            area_new += snew;
            kept.push((replaced, self.faces[f].g));
        }

        if !force && (area_old - area_new).abs() > 1.0e-12 * (area_old + area_new) {
            return false;
        }

        for f in incident {
            self.del_face(f);
        }

        let mut replaced_edges: Vec<((i32, i32), Option<crate::geom::GeomRef>)> = Vec::new();
        for ei in self.points[&p].edges.clone() {
            let (a, b, g) = {
                let edge = &self.edges[ei];
                (edge.p1, edge.p2, edge.g)
            };
            for id in [a, b] {
                self.points.get_mut(&id).expect("endpoint exists").config_modified = true;
            }
            let pair = (if a == p { o } else { a }, if b == p { o } else { b });
            replaced_edges.push((pair, g));
            self.del_edge(ei);
        }

        self.del_point(p);

        for (nodes, g) in kept {
            let f = self.add_triangle_by_points(nodes[0], nodes[1], nodes[2]);
            self.faces[f].g = g;
        }
        for ((a, b), g) in replaced_edges {
            if a == b {
                continue;
            }
            if let Some(edge) = self.find_edge(a, b) {
                if self.edges[edge].g.is_none() {
                    self.edges[edge].g = g;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use glam::{DVec2, DVec3};

    use super::*;
    use crate::geom::GeomRef;

    /// A hexagonal fan around a center point plus one extra ring vertex,
    /// so degree guards have room.
    fn fan() -> BdmMesh {
        let mut m = BdmMesh::new();
        let c = m.add_point(0, DVec3::ZERO);
        c.uv = DVec2::ZERO;
        for i in 0..6 {
            let a = std::f64::consts::TAU * i as f64 / 6.0;
            let uv = DVec2::new(a.cos(), a.sin());
            let p = m.add_point(1 + i as i32, DVec3::new(uv.x, uv.y, 0.0));
            p.uv = uv;
        }
        for i in 0..6 {
            let a = 1 + i;
            let b = 1 + (i + 1) % 6;
            let f = m.add_triangle_by_points(0, a, b);
            m.faces[f].g = Some(GeomRef::new(1, 2));
        }
        m
    }

    #[test]
    fn collapse_removes_center_and_rewires() {
        let mut m = fan();
        let e = m.find_edge(0, 1).unwrap();
        assert!(m.collapse_edge_parametric(e, 0, false));
        m.cleanup();

        assert!(!m.points.contains_key(&0));
        // 6 fan triangles become 4 around vertex 1
        assert_eq!(m.faces.len(), 4);
        for nodes in m.triangle_nodes() {
            assert!(!nodes.contains(&0));
        }
        // total parametric area of the hexagon is preserved
        let total: f64 = m
            .triangle_nodes()
            .iter()
            .map(|n| {
                parametric_area(&m.points[&n[0]], &m.points[&n[1]], &m.points[&n[2]]).abs()
            })
            .sum();
        let hexagon = 6.0 * 0.5 * (std::f64::consts::TAU / 6.0).sin();
        assert!((total - hexagon).abs() < 1.0e-12);
    }

    #[test]
    fn collapse_refuses_model_curve_points() {
        let mut m = fan();
        m.points.get_mut(&0).unwrap().g = Some(GeomRef::new(3, 1));
        let e = m.find_edge(0, 1).unwrap();
        assert!(!m.collapse_edge_parametric(e, 0, false));
        assert!(m.points.contains_key(&0));
    }

    #[test]
    fn collapse_refuses_periodic_identification() {
        let mut m = fan();
        // vertices 2 and 6 are both neighbors of the edge endpoints;
        // making them periodic copies blocks the collapse
        m.points.get_mut(&2).unwrap().periodic_counterpart = Some(6);
        m.points.get_mut(&6).unwrap().periodic_counterpart = Some(2);
        let e = m.find_edge(0, 1).unwrap();
        assert!(!m.collapse_edge_parametric(e, 0, false));
    }
}
