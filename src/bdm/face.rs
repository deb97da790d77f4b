use slotmap::new_key_type;

use super::{BdmMesh, EdgeId};
use crate::geom::GeomRef;

new_key_type! {
    pub struct FaceId;
}

/// A triangular face of the working triangulation: a closed loop of three
/// edges. Corner nodes are derived from edge adjacency, not stored.
#[derive(Debug, Clone)]
pub struct BdmFace {
    pub edges: [EdgeId; 3],
    pub deleted: bool,
    pub g: Option<GeomRef>,
}

impl BdmFace {
    pub(crate) fn new(e1: EdgeId, e2: EdgeId, e3: EdgeId) -> Self {
        Self {
            edges: [e1, e2, e3],
            deleted: false,
            g: None,
        }
    }

    /// Corner nodes `[e1 ∩ e3, e1 ∩ e2, e2 ∩ e3]`; `None` when the edge
    /// loop is inconsistent.
    pub fn nodes(&self, mesh: &BdmMesh) -> Option<[i32; 3]> {
        let e1 = &mesh.edges[self.edges[0]];
        let e2 = &mesh.edges[self.edges[1]];
        let e3 = &mesh.edges[self.edges[2]];
        Some([
            e1.common_vertex(e3)?,
            e1.common_vertex(e2)?,
            e2.common_vertex(e3)?,
        ])
    }

    /// The edge not touching `p`; `None` when `p` is not a corner.
    pub fn opposite_edge(&self, p: i32, mesh: &BdmMesh) -> Option<EdgeId> {
        self.edges
            .into_iter()
            .find(|&e| !mesh.edges[e].has_endpoint(p))
    }

    /// The corner not on edge `e`.
    pub fn opposite_vertex(&self, e: EdgeId, mesh: &BdmMesh) -> Option<i32> {
        let [e1, e2, e3] = self.edges;
        if e == e1 {
            mesh.edges[e2].common_vertex(&mesh.edges[e3])
        } else if e == e2 {
            mesh.edges[e1].common_vertex(&mesh.edges[e3])
        } else if e == e3 {
            mesh.edges[e1].common_vertex(&mesh.edges[e2])
        } else {
            None
        }
    }

    #[inline]
    pub fn has_edge(&self, e: EdgeId) -> bool {
        self.edges.contains(&e)
    }
}
