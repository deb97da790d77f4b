use glam::{DVec2, DVec3};

/// Size returned by [`SizeField`] implementations that do not prescribe one.
/// Effectively "unbounded": a triangle is never refined against it.
pub const MAX_SIZE: f64 = 1.0e22;

/// A trimmed parametric surface patch.
///
/// The mesher only ever evaluates the surface; it never modifies it, so a
/// shared reference is enough and evaluation is assumed reentrant.
pub trait Surface {
    /// Evaluate the surface at parameters `(u, v)`.
    fn point(&self, uv: DVec2) -> DVec3;

    /// First derivatives `(S_u, S_v)` at `(u, v)`.
    fn d1(&self, uv: DVec2) -> (DVec3, DVec3);

    /// Parametric bounding box as `(min, max)` corners.
    fn param_range(&self) -> (DVec2, DVec2);

    /// Parameters of the surface point nearest to `p`.
    fn nearest_point(&self, p: DVec3) -> DVec2;
}

/// Background mesh size field sampled at insertion candidates.
pub trait SizeField {
    /// Desired local mesh size at the given parametric and spatial location.
    fn size_at(&self, uv: DVec2, position: DVec3) -> f64;
}

/// Size field that prescribes nothing; sizes then come entirely from the
/// boundary discretization.
pub struct NoSizeField;

impl SizeField for NoSizeField {
    fn size_at(&self, _uv: DVec2, _position: DVec3) -> f64 {
        MAX_SIZE
    }
}

/// Constant target edge length everywhere on the surface.
pub struct UniformSize(pub f64);

impl SizeField for UniformSize {
    fn size_at(&self, _uv: DVec2, _position: DVec3) -> f64 {
        self.0
    }
}

/// Reference to the geometric entity a mesh element is classified on:
/// the entity tag plus its dimension (0 = model vertex, 1 = model curve,
/// 2 = surface interior).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeomRef {
    pub tag: i32,
    pub dim: u8,
}

impl GeomRef {
    pub const fn new(tag: i32, dim: u8) -> Self {
        Self { tag, dim }
    }
}

/// Marks a parametric point where one surface derivative vanishes, e.g. the
/// pole of a sphere. The variant names the axis along which the parameter
/// is degenerate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Degeneracy {
    #[default]
    None,
    U,
    V,
}

impl Degeneracy {
    #[inline]
    pub fn is_degenerate(self) -> bool {
        self != Degeneracy::None
    }
}

/// A boundary or embedded mesh vertex handed to the mesher.
///
/// `uv` holds the reparameterizations of the vertex onto the surface. A
/// vertex lying on a periodic seam carries one copy per side of the seam
/// (up to four at a corner of two seams); every other vertex carries
/// exactly one.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputVertex {
    /// Stable id, unique among all input vertices.
    pub num: i32,
    pub position: DVec3,
    pub uv: Vec<DVec2>,
    /// Entity the vertex is classified on.
    pub on: GeomRef,
    pub degenerated: Degeneracy,
    /// Prescribed size for embedded vertices; `None` leaves the size to the
    /// boundary discretization and the background field.
    pub size: Option<f64>,
}

impl InputVertex {
    /// Plain vertex with a single `(u, v)` copy, classified on `on`.
    pub fn new(num: i32, position: DVec3, uv: DVec2, on: GeomRef) -> Self {
        Self {
            num,
            position,
            uv: vec![uv],
            on,
            degenerated: Degeneracy::None,
            size: None,
        }
    }
}

/// A 1D-meshed model curve: an ordered list of segments between input
/// vertex ids.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputCurve {
    /// Model curve tag; recovered edges are classified on it.
    pub tag: i32,
    /// Segments as `(v0, v1)` vertex ids, ordered along the curve.
    pub segments: Vec<(i32, i32)>,
    /// True for curves whose 1D mesh degenerates to a point (e.g. a pole).
    pub degenerated: bool,
    /// True iff the curve coincides with a periodic seam of the surface;
    /// its segments then bound the domain on both sides of the seam.
    pub seam: bool,
}

impl InputCurve {
    pub fn new(tag: i32, segments: Vec<(i32, i32)>) -> Self {
        Self {
            tag,
            segments,
            degenerated: false,
            seam: false,
        }
    }
}

/// Which cached radius drives the frontal refinement queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RadiusNorm {
    /// 3D circumradius divided by the local size.
    #[default]
    Euclidean,
    /// Rotated bounding-box extent in the metric, for grid-aligned meshes.
    Infinity,
    /// Inverse triangle quality.
    Quality,
}

/// Knobs of a single meshing call. `Default` gives the production settings.
#[derive(Debug, Clone)]
pub struct MeshingOptions {
    /// Propagate the 1D boundary sizes into the surface (`min` of boundary
    /// size and background size). When off, only the background field
    /// drives refinement.
    pub extend_size: bool,
    /// Stop after boundary recovery and Delaunay repair; skip frontal
    /// refinement.
    pub only_initial: bool,
    /// On a self-intersecting 1D mesh, split the crossing segments and
    /// retry instead of failing.
    pub repair_self_intersect: bool,
    pub radius_norm: RadiusNorm,
}

impl Default for MeshingOptions {
    fn default() -> Self {
        Self {
            extend_size: true,
            only_initial: false,
            repair_self_intersect: true,
            radius_norm: RadiusNorm::Euclidean,
        }
    }
}

/// A vertex of the output triangulation.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputVertex {
    /// Input id for boundary vertices; a fresh id for inserted interior
    /// vertices.
    pub num: i32,
    pub position: DVec3,
    pub uv: DVec2,
}

/// Result of meshing one surface: vertices plus triangles indexing them,
/// counterclockwise in the parametric plane.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceMesh {
    pub vertices: Vec<OutputVertex>,
    pub triangles: Vec<[usize; 3]>,
}
