//! The working triangulation of the mesher.
//!
//! A point-edge-face structure with O(1) neighborhood queries in both
//! directions: every point lists its incident edges, every edge lists its
//! adjacent faces (at most two), and faces are closed loops of three
//! edges. Points live in an id-ordered map, edges and faces in slotmap
//! arenas; mutations tombstone elements and [`BdmMesh::cleanup`] drops
//! them between phases so in-flight traversals stay valid.

mod collapse;
mod edge;
mod face;
mod mesh;
mod point;
mod recover;
mod smooth;
mod split;
mod swap;

pub use edge::{BdmEdge, EdgeId};
pub use face::{BdmFace, FaceId};
pub use mesh::BdmMesh;
pub use point::BdmPoint;
pub use recover::RecoverOutcome;
pub use swap::SwapTest;

use crate::geom::Degeneracy;

/// Signed parametric area of the triangle `(p1, p2, p3)`.
///
/// A corner flagged degenerate sits on a collapsed parametric axis, so the
/// triangle is measured as the trapezoid spanned on the non-degenerate
/// axis instead of the vanishing determinant.
pub fn parametric_area(p1: &BdmPoint, p2: &BdmPoint, p3: &BdmPoint) -> f64 {
    let n_degenerated = [p1, p2, p3]
        .iter()
        .filter(|p| p.degenerated.is_degenerate())
        .count();

    let c = if n_degenerated > 1 {
        0.0
    } else if p1.degenerated == Degeneracy::U {
        2.0 * (0.5 * (p3.uv.y + p2.uv.y) - p1.uv.y).abs() * (p3.uv.x - p2.uv.x).abs()
    } else if p2.degenerated == Degeneracy::U {
        2.0 * (0.5 * (p3.uv.y + p1.uv.y) - p2.uv.y).abs() * (p3.uv.x - p1.uv.x).abs()
    } else if p3.degenerated == Degeneracy::U {
        2.0 * (0.5 * (p2.uv.y + p1.uv.y) - p3.uv.y).abs() * (p2.uv.x - p1.uv.x).abs()
    } else if p1.degenerated == Degeneracy::V {
        2.0 * (0.5 * (p3.uv.x + p2.uv.x) - p1.uv.x).abs() * (p3.uv.y - p2.uv.y).abs()
    } else if p2.degenerated == Degeneracy::V {
        2.0 * (0.5 * (p3.uv.x + p1.uv.x) - p2.uv.x).abs() * (p3.uv.y - p1.uv.y).abs()
    } else if p3.degenerated == Degeneracy::V {
        2.0 * (0.5 * (p2.uv.x + p1.uv.x) - p3.uv.x).abs() * (p2.uv.y - p1.uv.y).abs()
    } else {
        let a = p1.uv - p2.uv;
        let b = p1.uv - p3.uv;
        a.perp_dot(b)
    };
    0.5 * c
}
