//! Halfedge triangulation of the parametric plane.
//!
//! This is the substrate for the *initial* mesh only: a rectangle covering
//! the parametric domain is triangulated, boundary points are inserted one
//! by one by walk-and-split, and the planar Delaunay criterion drives
//! diagonal swaps after each split. The working triangulation that the
//! mesher refines afterwards is [`crate::bdm::BdmMesh`].
//!
//! Faces are wound clockwise in the parametric plane (the walk tests use
//! the negated orientation predicate), which is an internal convention of
//! this module only; the output mesh is re-oriented later.

use glam::DVec2;
use slotmap::{SlotMap, new_key_type};

use crate::predicates::{incircle, orient2d};

new_key_type! {
    pub struct PlaneVertexId;
    pub struct PlaneHalfedgeId;
    pub struct PlaneFaceId;
}

/// A vertex of the plane triangulation. `data` carries the caller's id:
/// negative for the four super-vertices of the initial rectangle,
/// non-negative for inserted points.
#[derive(Debug, Clone, Copy)]
pub struct PlaneVertex {
    pub position: DVec2,
    /// One outgoing halfedge.
    pub halfedge: Option<PlaneHalfedgeId>,
    pub data: i32,
}

/// A directed edge. `opposite` is `None` on the rectangle border.
#[derive(Debug, Clone, Copy)]
pub struct PlaneHalfedge {
    /// Origin vertex.
    pub vertex: PlaneVertexId,
    pub face: Option<PlaneFaceId>,
    pub prev: Option<PlaneHalfedgeId>,
    pub next: Option<PlaneHalfedgeId>,
    pub opposite: Option<PlaneHalfedgeId>,
    pub data: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct PlaneFace {
    /// One halfedge of the face; `None` tombstones the face until
    /// [`PlaneMesh::clean`].
    pub halfedge: Option<PlaneHalfedgeId>,
    pub data: i32,
}

/// Halfedge mesh over the parametric plane.
#[derive(Default)]
pub struct PlaneMesh {
    pub vertices: SlotMap<PlaneVertexId, PlaneVertex>,
    pub halfedges: SlotMap<PlaneHalfedgeId, PlaneHalfedge>,
    pub faces: SlotMap<PlaneFaceId, PlaneFace>,
}

impl PlaneMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_vertex(&mut self, position: DVec2, data: i32) -> PlaneVertexId {
        self.vertices.insert(PlaneVertex {
            position,
            halfedge: None,
            data,
        })
    }

    fn insert_halfedge(&mut self, vertex: PlaneVertexId) -> PlaneHalfedgeId {
        self.halfedges.insert(PlaneHalfedge {
            vertex,
            face: None,
            prev: None,
            next: None,
            opposite: None,
            data: -1,
        })
    }

    /// Wire three halfedges and three vertices into `face`, fixing all
    /// prev/next/face/vertex links.
    fn link_face(
        &mut self,
        face: PlaneFaceId,
        v: [PlaneVertexId; 3],
        he: [PlaneHalfedgeId; 3],
    ) {
        for i in 0..3 {
            let h = &mut self.halfedges[he[i]];
            h.vertex = v[i];
            h.next = Some(he[(i + 1) % 3]);
            h.prev = Some(he[(i + 2) % 3]);
            h.face = Some(face);
            self.vertices[v[i]].halfedge = Some(he[i]);
        }
        self.faces[face].halfedge = Some(he[0]);
    }

    /// Two triangles covering `[min, max]`, wound clockwise. The four
    /// corner vertices carry `data` -1..-4 so they can be recognized as
    /// super-vertices later.
    pub fn initialize_rectangle(&mut self, min: DVec2, max: DVec2) {
        self.vertices.clear();
        self.halfedges.clear();
        self.faces.clear();

        let v_mm = self.insert_vertex(DVec2::new(min.x, min.y), -1);
        let v_mx = self.insert_vertex(DVec2::new(min.x, max.y), -2);
        let v_xx = self.insert_vertex(DVec2::new(max.x, max.y), -3);
        let v_xm = self.insert_vertex(DVec2::new(max.x, min.y), -4);

        let he0 = [
            self.insert_halfedge(v_mm),
            self.insert_halfedge(v_xx),
            self.insert_halfedge(v_xm),
        ];
        let f0 = self.faces.insert(PlaneFace {
            halfedge: None,
            data: -1,
        });
        self.link_face(f0, [v_mm, v_xx, v_xm], he0);

        let he1 = [
            self.insert_halfedge(v_xx),
            self.insert_halfedge(v_mm),
            self.insert_halfedge(v_mx),
        ];
        let f1 = self.faces.insert(PlaneFace {
            halfedge: None,
            data: -1,
        });
        self.link_face(f1, [v_xx, v_mm, v_mx], he1);

        self.halfedges[he0[0]].opposite = Some(he1[0]);
        self.halfedges[he1[0]].opposite = Some(he0[0]);
    }

    /// Corner vertices of a face.
    pub fn face_vertices(&self, face: PlaneFaceId) -> [PlaneVertexId; 3] {
        let he0 = self.faces[face].halfedge.expect("face is not deleted");
        let he1 = self.halfedges[he0].next.expect("face halfedges are linked");
        let he2 = self.halfedges[he1].next.expect("face halfedges are linked");
        [
            self.halfedges[he0].vertex,
            self.halfedges[he1].vertex,
            self.halfedges[he2].vertex,
        ]
    }

    /// Halfedge from `v0` toward `v1` if one exists in `v0`'s outgoing
    /// ring. The circulation bails out at the rectangle border.
    pub fn get_edge(&self, v0: PlaneVertexId, v1: PlaneVertexId) -> Option<PlaneHalfedgeId> {
        let start = self.vertices[v0].halfedge?;
        let mut he = start;
        loop {
            let next = self.halfedges[he].next?;
            if self.halfedges[next].vertex == v1 {
                return Some(he);
            }
            he = self.halfedges[he].opposite?;
            he = self.halfedges[he].next?;
            if he == start {
                return None;
            }
        }
    }

    /// Locate the face containing `p` by walking across edges whose two
    /// adjacent orientations have opposite sign, starting from `face`.
    /// Returns `None` when the walk leaves the triangulated domain.
    pub fn walk(&self, face: PlaneFaceId, p: DVec2) -> Option<PlaneFaceId> {
        let mut he = self.faces[face].halfedge.expect("face is not deleted");
        loop {
            let he_n = self.halfedges[he].next.expect("face halfedges are linked");
            let he_nn = self.halfedges[he_n].next.expect("face halfedges are linked");

            let p0 = self.vertices[self.halfedges[he].vertex].position;
            let p1 = self.vertices[self.halfedges[he_n].vertex].position;
            let p2 = self.vertices[self.halfedges[he_nn].vertex].position;

            // faces are clockwise, hence the negated orientations
            let s0 = -orient2d(p0, p1, p);
            let s1 = -orient2d(p1, p2, p);
            let s2 = -orient2d(p2, p0, p);

            let step = if s0 >= 0.0 && s1 >= 0.0 && s2 >= 0.0 {
                return self.halfedges[he].face;
            } else if s0 <= 0.0 && s1 >= 0.0 && s2 >= 0.0 {
                he
            } else if s1 <= 0.0 && s0 >= 0.0 && s2 >= 0.0 {
                he_n
            } else if s2 <= 0.0 && s0 >= 0.0 && s1 >= 0.0 {
                he_nn
            } else if s0 <= 0.0 && s1 <= 0.0 {
                if s0 > s1 { he } else { he_n }
            } else if s0 <= 0.0 && s2 <= 0.0 {
                if s0 > s2 { he } else { he_nn }
            } else if s1 <= 0.0 && s2 <= 0.0 {
                if s1 > s2 { he_n } else { he_nn }
            } else {
                tracing::error!("walk lost its way, orientations {s0} {s1} {s2}");
                return None;
            };
            he = self.halfedges[step].opposite?;
        }
    }

    /// Flip the diagonal of the quad formed by the two faces incident to
    /// `he0`. Returns `false` when `he0` has no opposite.
    pub fn swap_edge(&mut self, he0: PlaneHalfedgeId) -> bool {
        let Some(heo0) = self.halfedges[he0].opposite else {
            return false;
        };

        let he1 = self.halfedges[he0].next.expect("face halfedges are linked");
        let he2 = self.halfedges[he1].next.expect("face halfedges are linked");
        let heo1 = self.halfedges[heo0].next.expect("face halfedges are linked");
        let heo2 = self.halfedges[heo1].next.expect("face halfedges are linked");

        let v0 = self.halfedges[heo1].vertex;
        let v1 = self.halfedges[heo2].vertex;
        let v2 = self.halfedges[heo0].vertex;
        let v3 = self.halfedges[he2].vertex;

        let f0 = self.halfedges[he0].face.expect("interior halfedge");
        let f1 = self.halfedges[heo2].face.expect("interior halfedge");
        self.link_face(f0, [v0, v1, v3], [heo1, heo0, he2]);
        self.link_face(f1, [v1, v2, v3], [heo2, he1, he0]);
        true
    }

    /// Insert `position` inside `face`, splitting it into three. When a
    /// swap predicate is given, walk the depth-first stack of affected
    /// edges and flip each edge the predicate accepts, in the manner of
    /// incremental Delaunay insertion.
    ///
    /// Returns the new vertex.
    pub fn split_triangle(
        &mut self,
        position: DVec2,
        data: i32,
        face: PlaneFaceId,
        mut do_swap: Option<&dyn Fn(&PlaneMesh, PlaneHalfedgeId) -> bool>,
    ) -> PlaneVertexId {
        let v = self.insert_vertex(position, data);

        let he0 = self.faces[face].halfedge.expect("face is not deleted");
        let he1 = self.halfedges[he0].next.expect("face halfedges are linked");
        let he2 = self.halfedges[he1].next.expect("face halfedges are linked");

        let v0 = self.halfedges[he0].vertex;
        let v1 = self.halfedges[he1].vertex;
        let v2 = self.halfedges[he2].vertex;

        let hev0 = self.insert_halfedge(v);
        let hev1 = self.insert_halfedge(v);
        let hev2 = self.insert_halfedge(v);
        let he0v = self.insert_halfedge(v0);
        let he1v = self.insert_halfedge(v1);
        let he2v = self.insert_halfedge(v2);

        for (a, b) in [(hev0, he0v), (hev1, he1v), (hev2, he2v)] {
            self.halfedges[a].opposite = Some(b);
            self.halfedges[b].opposite = Some(a);
        }

        let data0 = self.faces[face].data;
        let f0 = face;
        let f1 = self.faces.insert(PlaneFace {
            halfedge: None,
            data: data0,
        });
        let f2 = self.faces.insert(PlaneFace {
            halfedge: None,
            data: data0,
        });

        self.link_face(f0, [v0, v1, v], [he0, he1v, hev0]);
        self.link_face(f1, [v1, v2, v], [he1, he2v, hev1]);
        self.link_face(f2, [v2, v0, v], [he2, he0v, hev2]);

        if let Some(test) = do_swap.take() {
            let mut stack = vec![he0, he1, he2];
            let mut touched: Vec<PlaneHalfedgeId> = Vec::new();
            while let Some(he) = stack.pop() {
                touched.push(he);
                if !test(self, he) {
                    continue;
                }
                self.swap_edge(he);

                for h in [Some(he), self.halfedges[he].opposite] {
                    let Some(h) = h else { continue };
                    let mut hb = self.halfedges[h].next.expect("face halfedges are linked");
                    for _ in 0..2 {
                        let hbo = self.halfedges[hb].opposite;
                        if !touched.contains(&hb) && hbo.is_none_or(|o| !touched.contains(&o)) {
                            stack.push(hb);
                        }
                        hb = self.halfedges[hb].next.expect("face halfedges are linked");
                    }
                }
            }
        }

        v
    }

    /// Split the edge `he0` at `position`, creating four faces out of the
    /// two incident ones. Returns `false` on a border edge.
    pub fn split_edge(&mut self, he0: PlaneHalfedgeId, position: DVec2, data: i32) -> bool {
        let Some(he1) = self.halfedges[he0].opposite else {
            return false;
        };

        let mid = self.insert_vertex(position, data);

        let he12 = self.halfedges[he0].next.expect("face halfedges are linked");
        let he20 = self.halfedges[he12].next.expect("face halfedges are linked");
        let he03 = self.halfedges[he1].next.expect("face halfedges are linked");
        let he31 = self.halfedges[he03].next.expect("face halfedges are linked");

        let v0 = self.halfedges[he03].vertex;
        let v1 = self.halfedges[he12].vertex;
        let v2 = self.halfedges[he20].vertex;
        let v3 = self.halfedges[he31].vertex;

        let hem = [
            self.insert_halfedge(mid),
            self.insert_halfedge(mid),
            self.insert_halfedge(mid),
            self.insert_halfedge(mid),
        ];
        let he2m = self.insert_halfedge(v2);
        let he3m = self.insert_halfedge(v3);

        for (a, b) in [(he0, hem[0]), (he1, hem[1]), (he2m, hem[2]), (he3m, hem[3])] {
            self.halfedges[a].opposite = Some(b);
            self.halfedges[b].opposite = Some(a);
        }

        let f0 = self.halfedges[he0].face.expect("interior halfedge");
        let f1 = self.halfedges[he1].face.expect("interior halfedge");
        let f2 = self.faces.insert(PlaneFace {
            halfedge: None,
            data: self.faces[f0].data,
        });
        let f3 = self.faces.insert(PlaneFace {
            halfedge: None,
            data: self.faces[f1].data,
        });

        self.link_face(f0, [v0, mid, v2], [he0, hem[2], he20]);
        self.link_face(f1, [v1, mid, v3], [he1, hem[3], he31]);
        self.link_face(f2, [v2, mid, v1], [he2m, hem[1], he12]);
        self.link_face(f3, [v3, mid, v0], [he3m, hem[0], he03]);
        true
    }

    /// Merge the two faces incident to `he`, tombstoning `he`, its
    /// opposite and the second face. Returns `false` on a border edge.
    pub fn merge_faces(&mut self, he: PlaneHalfedgeId) -> bool {
        let Some(heo) = self.halfedges[he].opposite else {
            return false;
        };

        let keep = self.halfedges[he].face.expect("interior halfedge");
        let drop = self.halfedges[heo].face.expect("interior halfedge");

        let mut h = heo;
        loop {
            self.halfedges[h].face = Some(keep);
            h = self.halfedges[h].next.expect("face halfedges are linked");
            if h == heo {
                break;
            }
        }

        let he_next = self.halfedges[he].next.expect("face halfedges are linked");
        let he_prev = self.halfedges[he].prev.expect("face halfedges are linked");
        let heo_next = self.halfedges[heo].next.expect("face halfedges are linked");
        let heo_prev = self.halfedges[heo].prev.expect("face halfedges are linked");

        self.halfedges[he_next].prev = Some(heo_prev);
        self.halfedges[heo_prev].next = Some(he_next);
        self.halfedges[he_prev].next = Some(heo_next);
        self.halfedges[heo_next].prev = Some(he_prev);

        self.faces[keep].halfedge = Some(he_next);
        let v = self.halfedges[he].vertex;
        let vo = self.halfedges[heo].vertex;
        self.vertices[v].halfedge = Some(heo_next);
        self.vertices[vo].halfedge = Some(he_next);

        // tombstone; removed at clean()
        self.halfedges[he].face = None;
        self.halfedges[heo].face = None;
        self.faces[drop].halfedge = None;
        true
    }

    /// Drop tombstoned faces and halfedges.
    pub fn clean(&mut self) {
        self.faces.retain(|_, f| f.halfedge.is_some());
        self.halfedges.retain(|_, h| h.face.is_some());
    }
}

/// Planar Delaunay swap criterion on the clockwise faces of a
/// [`PlaneMesh`]: true iff the vertex opposite `he` lies inside the
/// circumcircle of `he`'s face.
pub fn planar_delaunay_criterion(mesh: &PlaneMesh, he: PlaneHalfedgeId) -> bool {
    let Some(heo) = mesh.halfedges[he].opposite else {
        return false;
    };
    let he_n = mesh.halfedges[he].next.expect("face halfedges are linked");
    let he_nn = mesh.halfedges[he_n].next.expect("face halfedges are linked");
    let heo_nn = {
        let n = mesh.halfedges[heo].next.expect("face halfedges are linked");
        mesh.halfedges[n].next.expect("face halfedges are linked")
    };

    let v0 = mesh.vertices[mesh.halfedges[he].vertex].position;
    let v1 = mesh.vertices[mesh.halfedges[he_n].vertex].position;
    let v2 = mesh.vertices[mesh.halfedges[he_nn].vertex].position;
    let v = mesh.vertices[mesh.halfedges[heo_nn].vertex].position;

    // faces are clockwise, so the incircle sign is negated
    -incircle(v0, v1, v2, v) > 0.0
}
