use slotmap::new_key_type;

use super::{BdmMesh, FaceId};
use crate::geom::GeomRef;

new_key_type! {
    pub struct EdgeId;
}

/// An edge of the working triangulation, endpoints stored in increasing
/// id order.
///
/// Invariant: each adjacent face appears exactly once in `faces`, and
/// `faces.len() <= 2`.
#[derive(Debug, Clone)]
pub struct BdmEdge {
    pub p1: i32,
    pub p2: i32,
    pub deleted: bool,
    pub g: Option<GeomRef>,
    pub faces: Vec<FaceId>,
}

impl BdmEdge {
    pub(crate) fn new(a: i32, b: i32) -> Self {
        let (p1, p2) = if a < b { (a, b) } else { (b, a) };
        Self {
            p1,
            p2,
            deleted: false,
            g: None,
            faces: Vec::with_capacity(2),
        }
    }

    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn has_endpoint(&self, p: i32) -> bool {
        self.p1 == p || self.p2 == p
    }

    /// The other endpoint of the edge; `None` when `p` is not an endpoint.
    pub fn other_vertex(&self, p: i32) -> Option<i32> {
        if self.p1 == p {
            Some(self.p2)
        } else if self.p2 == p {
            Some(self.p1)
        } else {
            None
        }
    }

    /// Endpoint shared with `other`, if any.
    pub fn common_vertex(&self, other: &BdmEdge) -> Option<i32> {
        if other.has_endpoint(self.p1) {
            Some(self.p1)
        } else if other.has_endpoint(self.p2) {
            Some(self.p2)
        } else {
            None
        }
    }

    /// The face on the other side of the edge from `f`; `None` unless the
    /// edge has exactly two faces and `f` is one of them.
    pub fn other_face(&self, f: FaceId) -> Option<FaceId> {
        if self.faces.len() != 2 {
            return None;
        }
        if self.faces[0] == f {
            Some(self.faces[1])
        } else if self.faces[1] == f {
            Some(self.faces[0])
        } else {
            None
        }
    }

    /// The points opposite this edge in its adjacent faces.
    pub fn opposite_points(&self, mesh: &BdmMesh) -> [Option<i32>; 2] {
        let mut op = [None, None];
        for (i, &f) in self.faces.iter().take(2).enumerate() {
            if let Some(nodes) = mesh.faces[f].nodes(mesh) {
                op[i] = nodes.into_iter().find(|&n| !self.has_endpoint(n));
            }
        }
        op
    }

    pub(crate) fn remove_face(&mut self, f: FaceId) {
        self.faces.retain(|&x| x != f);
    }

    /// 3D length of the edge.
    pub fn length(&self, mesh: &BdmMesh) -> f64 {
        let p1 = &mesh.points[&self.p1];
        let p2 = &mesh.points[&self.p2];
        (p1.position - p2.position).length()
    }
}
