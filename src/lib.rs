//! mesh-frontal triangulates trimmed parametric surfaces with a
//! frontal-Delaunay scheme.
//!
//! Given a surface patch whose bounding curves have already been
//! discretized into vertex sequences, [`mesh_surface`] produces a
//! conforming triangulation that reproduces the boundary segmentation
//! exactly, honors embedded curves and points, and refines until every
//! triangle's circumradius matches the local size field, measured in the
//! anisotropic metric of the surface's first fundamental form.
//!
//! ## Pipeline
//!
//! 1. Boundary vertices are checked for closed loops and reparameterized
//!    onto the surface (a seam vertex keeps one copy per side).
//! 2. An initial Delaunay triangulation of the parametric plane is built
//!    by walk-and-split over an inflated bounding square
//!    ([`plane::PlaneMesh`]).
//! 3. Every 1D segment is recovered as a mesh edge by diagonal swaps in
//!    the working triangulation ([`bdm::BdmMesh`]); the exterior is
//!    flood-filled away.
//! 4. Edge swaps restore the anisotropic Delaunay property, then a
//!    frontal loop inserts optimal points off the advancing front until
//!    all triangles meet the size target.
//!
//! ## Usage
//!
//! ```
//! use glam::{DVec2, DVec3};
//! use mesh_frontal::{
//!     GeomRef, InputCurve, InputVertex, MeshingOptions, NoSizeField, Surface, mesh_surface,
//! };
//!
//! // the z = 0 plane parameterized by (u, v)
//! struct Plane;
//!
//! impl Surface for Plane {
//!     fn point(&self, uv: DVec2) -> DVec3 {
//!         DVec3::new(uv.x, uv.y, 0.0)
//!     }
//!     fn d1(&self, _uv: DVec2) -> (DVec3, DVec3) {
//!         (DVec3::X, DVec3::Y)
//!     }
//!     fn param_range(&self) -> (DVec2, DVec2) {
//!         (DVec2::ZERO, DVec2::ONE)
//!     }
//!     fn nearest_point(&self, p: DVec3) -> DVec2 {
//!         DVec2::new(p.x, p.y)
//!     }
//! }
//!
//! let corners = [
//!     DVec2::new(0.0, 0.0),
//!     DVec2::new(1.0, 0.0),
//!     DVec2::new(1.0, 1.0),
//!     DVec2::new(0.0, 1.0),
//! ];
//! let vertices: Vec<InputVertex> = corners
//!     .iter()
//!     .enumerate()
//!     .map(|(i, uv)| {
//!         InputVertex::new(i as i32, DVec3::new(uv.x, uv.y, 0.0), *uv, GeomRef::new(0, 0))
//!     })
//!     .collect();
//! let boundary = vec![InputCurve::new(
//!     1,
//!     vec![(0, 1), (1, 2), (2, 3), (3, 0)],
//! )];
//!
//! let mesh = mesh_surface(
//!     &Plane,
//!     &vertices,
//!     &boundary,
//!     &[],
//!     &[],
//!     &NoSizeField,
//!     &MeshingOptions::default(),
//! )
//! .unwrap();
//!
//! assert!(!mesh.triangles.is_empty());
//! ```

pub mod bdm;
mod error;
mod front;
mod generator;
mod geom;
mod metric;
mod newton;
pub mod plane;
pub mod predicates;
mod quality;

pub use error::MeshError;
pub use generator::mesh_surface;
pub use geom::*;
pub use metric::{
    Metric, circum_center_metric, circum_center_xy, circum_center_xyz, in_circum_circle_aniso,
    in_circum_circle_aniso_tolerant,
};
pub use quality::gamma;
