use thiserror::Error;

/// Fatal failures of a surface meshing call.
///
/// Local rejections (a refused cavity, a non-convergent Newton correction)
/// are handled inside the insertion loop and never surface here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    /// A boundary vertex appears an odd number of times in the boundary
    /// segments, so the 1D mesh cannot bound a surface.
    #[error("boundary is not a set of closed loops: {count} vertices are referenced an odd number of times")]
    BoundaryNotClosed { count: usize },

    /// An input vertex carries no `(u, v)` parameters on this surface.
    #[error("vertex {num} has no parameters on the surface")]
    ReparameterizationFailed { num: i32 },

    /// A curve references a vertex id that was not supplied.
    #[error("vertex {num} is referenced by curve {curve} but was not supplied")]
    UnknownVertex { num: i32, curve: i32 },

    /// Two required boundary edges cross each other in parameter space.
    /// The 1D mesh of the named curves must be refined before retrying.
    #[error("required edge {p1}-{p2} on curve {curve} crosses another required boundary edge")]
    RecoveryBlockedBySelfIntersection { p1: i32, p2: i32, curve: i32 },

    /// The swap budget ran out before a required edge appeared in the
    /// triangulation.
    #[error("required edge {p1}-{p2} could not be recovered within the swap budget")]
    RecoveryBudgetExhausted { p1: i32, p2: i32 },
}
