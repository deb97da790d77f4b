use std::collections::BTreeSet;

use glam::{DVec2, DVec3};
use hashbrown::HashMap;

/// Packed per-vertex working state of the frontal loop.
///
/// Rows are dense indices; boundary rows are created from the recovered
/// triangulation, interior rows are appended by insertion. A vertex
/// duplicated across a periodic seam owns one row per `(u, v)` copy, tied
/// together through `equivalent`.
#[derive(Default)]
pub struct MeshData {
    pub uv: Vec<DVec2>,
    pub position: Vec<DVec3>,
    /// Size propagated from the boundary discretization.
    pub size: Vec<f64>,
    /// Size dictated by the background field.
    pub size_bgm: Vec<f64>,
    /// Dimension of the entity each vertex is classified on (2 = surface
    /// interior).
    pub dim: Vec<u8>,
    /// Stable output id; `None` until the vertex is emitted.
    pub num: Vec<Option<i32>>,
    /// Embedded-curve edges (as sorted row pairs) that no cavity may
    /// swallow.
    pub internal_edges: BTreeSet<(usize, usize)>,
    /// Secondary seam copy -> primary row.
    pub equivalent: HashMap<usize, usize>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.uv.len()
    }

    pub fn add_vertex(
        &mut self,
        uv: DVec2,
        position: DVec3,
        size: f64,
        size_bgm: f64,
        dim: u8,
        num: Option<i32>,
    ) -> usize {
        let row = self.uv.len();
        self.uv.push(uv);
        self.position.push(position);
        self.size.push(size);
        self.size_bgm.push(size_bgm);
        self.dim.push(dim);
        self.num.push(num);
        row
    }

    /// Drop the most recently added vertex (a rejected insertion).
    pub(crate) fn pop_vertex(&mut self) {
        self.uv.pop();
        self.position.pop();
        self.size.pop();
        self.size_bgm.pop();
        self.dim.pop();
        self.num.pop();
    }

    /// Row this one is identified with across a seam (itself if none).
    #[inline]
    pub fn primary(&self, row: usize) -> usize {
        self.equivalent.get(&row).copied().unwrap_or(row)
    }

    #[inline]
    pub fn is_internal_edge(&self, a: usize, b: usize) -> bool {
        let pair = if a < b { (a, b) } else { (b, a) };
        self.internal_edges.contains(&pair)
    }
}
