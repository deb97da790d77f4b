use super::{BdmMesh, BdmPoint, EdgeId, parametric_area};
use crate::geom::Surface;
use crate::predicates::orient2d;
use crate::quality::{cos_surface_normal, gamma};

/// Criterion deciding whether [`BdmMesh::swap_edge`] may flip an edge.
///
/// Each variant is consulted twice: once on the quadrilateral around the
/// edge (`quad`) and once on the old-versus-new triangle pairs
/// (`triangles`).
pub enum SwapTest<'a> {
    /// Boundary recovery: only require the quadrilateral to be strictly
    /// convex in parameter space, so the swap cannot invert triangles.
    Recover,
    /// Mesh improvement: refuse swaps that strand low-degree vertices,
    /// change the parametric area, or (optionally) do not improve the
    /// worst triangle quality.
    Quality { quality: bool, small: bool },
    /// Final smoothing pass: accept only swaps that strictly improve the
    /// worst orientation-weighted alignment with the surface normal, and
    /// only where that alignment is poor.
    Normals {
        surface: &'a dyn Surface,
        orientation: f64,
    },
}

impl SwapTest<'_> {
    /// Four-point test on the edge endpoints `p1`, `p2` and the opposite
    /// points `q1`, `q2`.
    pub fn quad(&self, p1: &BdmPoint, p2: &BdmPoint, q1: &BdmPoint, q2: &BdmPoint) -> bool {
        match self {
            SwapTest::Recover => {
                let t1 = orient2d(q1.uv, p1.uv, q2.uv);
                let t2 = orient2d(q1.uv, q2.uv, p2.uv);
                // the quadrilateral was strictly convex
                t1 * t2 > 0.0
            }
            SwapTest::Quality { small, .. } => {
                if !small {
                    return true;
                }
                // avoid stranding vertices with too few neighbors
                for p in [p1, p2] {
                    if let Some(g) = p.g {
                        if g.dim == 2 && p.edges.len() <= 4 {
                            return false;
                        }
                        if g.dim < 2 && p.edges.len() <= 3 {
                            return false;
                        }
                    }
                }
                quad_area_preserved(p1, p2, q1, q2)
            }
            SwapTest::Normals { .. } => quad_area_preserved(p1, p2, q1, q2),
        }
    }

    /// Twelve-point test on the two old triangles and the two candidate
    /// triangles.
    pub fn triangles(
        &self,
        old1: [&BdmPoint; 3],
        old2: [&BdmPoint; 3],
        new1: [&BdmPoint; 3],
        new2: [&BdmPoint; 3],
    ) -> bool {
        match self {
            SwapTest::Recover => true,
            SwapTest::Quality { quality, .. } => {
                // endpoints of the edge the swap would create are the two
                // corners shared by both new triangles
                let in_new2 = |p: &BdmPoint| new2.iter().any(|q| q.id == p.id);
                let shared: Vec<&BdmPoint> =
                    new1.iter().copied().filter(|p| in_new2(p)).collect();
                if let [a, b] = shared[..] {
                    if a.degenerated.is_degenerate() && b.degenerated.is_degenerate() {
                        return false;
                    }
                    if a.periodic_counterpart.is_some() && b.periodic_counterpart.is_some() {
                        return false;
                    }
                } else {
                    tracing::warn!("could not identify the edge created by the swap");
                }

                if !quality {
                    return true;
                }
                let min_old = tri_gamma(old1).min(tri_gamma(old2));
                let min_new = tri_gamma(new1).min(tri_gamma(new2));
                min_new > min_old
            }
            SwapTest::Normals {
                surface,
                orientation,
            } => {
                let score = |t: [&BdmPoint; 3]| {
                    orientation
                        * tri_gamma(t)
                        * cos_surface_normal(
                            *surface,
                            (t[0].position, t[0].uv),
                            (t[1].position, t[1].uv),
                            (t[2].position, t[2].uv),
                        )
                };
                let old = score(old1).min(score(old2));
                let new = score(new1).min(score(new2));
                old < 0.5 && old < new
            }
        }
    }
}

fn tri_gamma(t: [&BdmPoint; 3]) -> f64 {
    gamma(t[0].position, t[1].position, t[2].position)
}

fn quad_area_preserved(p1: &BdmPoint, p2: &BdmPoint, q1: &BdmPoint, q2: &BdmPoint) -> bool {
    let s1 = parametric_area(p1, p2, q1).abs();
    let s2 = parametric_area(p1, p2, q2).abs();
    let s3 = parametric_area(p1, q1, q2).abs();
    let s4 = parametric_area(p2, q1, q2).abs();
    (s1 + s2 - s3 - s4).abs() <= 1.0e-12 * (s3 + s4)
}

impl BdmMesh {
    /// Flip `e` to the other diagonal of the quadrilateral formed by its
    /// two adjacent triangles, if `test` allows it.
    ///
    /// Preconditions checked here: the edge is alive, has exactly two
    /// triangles, is not classified on a model curve, and (unless
    /// `force`) at least one of the four involved points was recently
    /// modified. Returns `true` iff the mesh changed.
    pub fn swap_edge(&mut self, e: EdgeId, test: &SwapTest, force: bool) -> bool {
        {
            let edge = &self.edges[e];
            if edge.deleted || edge.num_faces() != 2 {
                return false;
            }
            if edge.g.is_some_and(|g| g.dim == 1) {
                return false;
            }
        }

        let (p1n, p2n) = (self.edges[e].p1, self.edges[e].p2);
        let f0 = self.edges[e].faces[0];
        let f1 = self.edges[e].faces[1];

        let Some(pts1) = self.faces[f0].nodes(self) else {
            return false;
        };
        let Some(op0n) = self.faces[f0].opposite_vertex(e, self) else {
            return false;
        };
        let Some(op1n) = self.faces[f1].opposite_vertex(e, self) else {
            return false;
        };
        if op0n == op1n {
            return false;
        }

        // orientation of the first face with respect to p1 -> p2
        let mut orientation = 0;
        for i in 0..3 {
            if pts1[i] == p1n {
                orientation = if pts1[(i + 1) % 3] == p2n { 1 } else { -1 };
                break;
            }
        }

        {
            let p1 = &self.points[&p1n];
            let p2 = &self.points[&p2n];
            let op0 = &self.points[&op0n];
            let op1 = &self.points[&op1n];

            if !force
                && !p1.config_modified
                && !p2.config_modified
                && !op0.config_modified
                && !op1.config_modified
            {
                return false;
            }

            let ok = if orientation == 1 {
                test.triangles(
                    [p1, p2, op0],
                    [p2, p1, op1],
                    [p1, op1, op0],
                    [op1, p2, op0],
                )
            } else {
                test.triangles(
                    [p2, p1, op0],
                    [p1, p2, op1],
                    [p1, op0, op1],
                    [op1, op0, p2],
                )
            };
            if !ok {
                return false;
            }
            if !test.quad(p1, p2, op0, op1) {
                return false;
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
        // the outer edges would collide
        if p1_op1 == p1_op2 || op2_p2 == op1_p2 {
            return false;
        }

        let g1 = self.faces[f0].g;
        let g2 = self.faces[f1].g;
        let ge = self.edges[e].g;

        self.del_face(f0);
        self.del_face(f1);
        self.del_edge(e);

        let new_edge = self.add_edge(op0n, op1n);
        self.edges[new_edge].g = ge;

        let (t1, t2) = if orientation == 1 {
            (
                self.add_triangle(p1_op1, p1_op2, new_edge),
                self.add_triangle(new_edge, op2_p2, op1_p2),
            )
        } else {
            (
                self.add_triangle(p1_op2, p1_op1, new_edge),
                self.add_triangle(op2_p2, new_edge, op1_p2),
            )
        };
        self.faces[t1].g = g1;
        self.faces[t2].g = g2;

        for id in [p1n, p2n, op0n, op1n] {
            self.points.get_mut(&id).expect("swap corners exist").config_modified = true;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use glam::{DVec2, DVec3};

    use super::*;

    /// Two triangles over a convex kite; swapping the diagonal is
    /// geometrically valid.
    fn kite() -> BdmMesh {
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
    fn swap_replaces_the_diagonal() {
        let mut m = kite();
        let e = m.find_edge(0, 2).unwrap();
        assert!(m.swap_edge(e, &SwapTest::Recover, true));
        assert!(m.find_edge(1, 3).is_some());
        // old diagonal is gone
        assert!(m.find_edge(0, 2).is_none());
        m.cleanup();
        assert_eq!(m.faces.len(), 2);
        assert_eq!(m.edges.len(), 5);

        // both new triangles reference the new diagonal
        let d = m.find_edge(1, 3).unwrap();
        assert_eq!(m.edges[d].num_faces(), 2);
        for nodes in m.triangle_nodes() {
            assert!(nodes.contains(&1) && nodes.contains(&3));
        }
    }

    #[test]
    fn swap_refuses_model_curve_edges() {
        let mut m = kite();
        let e = m.find_edge(0, 2).unwrap();
        m.edges[e].g = Some(crate::geom::GeomRef::new(5, 1));
        assert!(!m.swap_edge(e, &SwapTest::Recover, true));
    }

    #[test]
    fn swap_respects_config_modified() {
        let mut m = kite();
        for p in m.points.values_mut() {
            p.config_modified = false;
        }
        let e = m.find_edge(0, 2).unwrap();
        assert!(!m.swap_edge(e, &SwapTest::Recover, false));
        m.points.get_mut(&1).unwrap().config_modified = true;
        assert!(m.swap_edge(e, &SwapTest::Recover, false));
    }

    #[test]
    fn recover_test_refuses_folded_quads() {
        let mut m = kite();
        // fold point 3 onto the same side as point 1: the candidate
        // diagonal no longer separates the edge endpoints
        let p = m.points.get_mut(&3).unwrap();
        p.uv = DVec2::new(3.0, -1.0);
        p.position = DVec3::new(3.0, -1.0, 0.0);
        let e = m.find_edge(0, 2).unwrap();
        assert!(!m.swap_edge(e, &SwapTest::Recover, true));
    }

    #[test]
    fn quality_test_guards_low_degree_corners() {
        let mut m = kite();
        let e = m.find_edge(0, 2).unwrap();
        // endpoints classified on the surface with minimal degree
        for id in [0, 2] {
            m.points.get_mut(&id).unwrap().g = Some(crate::geom::GeomRef::new(1, 2));
        }
        assert!(!m.swap_edge(
            e,
            &SwapTest::Quality {
                quality: false,
                small: true
            },
            true
        ));
        // without the small-triangle guard the swap goes through
        assert!(m.swap_edge(
            e,
            &SwapTest::Quality {
                quality: false,
                small: false
            },
            true
        ));
    }

    #[test]
    fn quality_test_demands_improvement() {
        // a tall kite: the short diagonal 0-2 gives two decent triangles,
        // the long diagonal 1-3 would give two slivers
        let mut m = BdmMesh::new();
        let uv = [
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, -3.0),
            DVec2::new(2.0, 0.0),
            DVec2::new(1.0, 3.0),
        ];
        for (i, p) in uv.into_iter().enumerate() {
            let pt = m.add_point(i as i32, DVec3::new(p.x, p.y, 0.0));
            pt.uv = p;
        }
        m.add_triangle_by_points(0, 1, 2);
        m.add_triangle_by_points(0, 2, 3);

        let e = m.find_edge(0, 2).unwrap();
        assert!(!m.swap_edge(
            e,
            &SwapTest::Quality {
                quality: true,
                small: false
            },
            true
        ));
        // the degrading swap is still available to the recovery test
        assert!(m.swap_edge(e, &SwapTest::Recover, true));
    }
}
