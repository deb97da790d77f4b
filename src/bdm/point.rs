use glam::{DVec2, DVec3};

use super::{BdmMesh, EdgeId, FaceId};
use crate::geom::{Degeneracy, GeomRef, MAX_SIZE};

/// A point of the working triangulation.
///
/// Invariant: every edge in `edges` has this point as one of its
/// endpoints.
#[derive(Debug, Clone)]
pub struct BdmPoint {
    /// Stable id; negative for the super-vertices of the initial
    /// rectangle. Never reused within one meshing call.
    pub id: i32,
    pub position: DVec3,
    pub uv: DVec2,
    /// Size propagated from prescribed boundary spacing.
    pub size: f64,
    /// Size dictated by the background field.
    pub size_bgm: f64,
    /// Set whenever a mutation touches the neighborhood of this point;
    /// passes only revisit modified regions.
    pub config_modified: bool,
    pub degenerated: Degeneracy,
    /// Id of the point this one is identified with across a periodic
    /// seam. Identity only; never dereferenced for geometry.
    pub periodic_counterpart: Option<i32>,
    /// Classification of the point.
    pub g: Option<GeomRef>,
    /// Incident edges.
    pub edges: Vec<EdgeId>,
}

impl BdmPoint {
    pub fn new(id: i32, position: DVec3) -> Self {
        Self {
            id,
            position,
            uv: DVec2::ZERO,
            size: MAX_SIZE,
            size_bgm: MAX_SIZE,
            config_modified: true,
            degenerated: Degeneracy::None,
            periodic_counterpart: None,
            g: None,
            edges: Vec::new(),
        }
    }

    /// Effective local size: the minimum of the propagated and background
    /// sizes when boundary sizes extend into the surface, else the
    /// background size alone.
    #[inline]
    pub fn effective_size(&self, extend: bool) -> f64 {
        if extend {
            self.size.min(self.size_bgm)
        } else {
            self.size_bgm
        }
    }

    /// Faces incident to this point, each reported once, in the order
    /// first encountered around the incident edges.
    pub fn triangles(&self, mesh: &BdmMesh) -> Vec<FaceId> {
        let mut faces = Vec::with_capacity(self.edges.len());
        for &e in &self.edges {
            for &f in &mesh.edges[e].faces {
                if !faces.contains(&f) {
                    faces.push(f);
                }
            }
        }
        faces
    }

    pub(crate) fn remove_edge(&mut self, e: EdgeId) {
        self.edges.retain(|&x| x != e);
    }
}
