//! Shared surfaces and mesh checks for the end-to-end scenarios.
#![allow(dead_code)] // not every scenario uses every helper

use std::collections::BTreeMap;

use glam::{DVec2, DVec3};
use mesh_frontal::{GeomRef, InputCurve, InputVertex, Surface, SurfaceMesh};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The z = 0 plane with identity parameterization.
pub struct PlanePatch;

impl Surface for PlanePatch {
    fn point(&self, uv: DVec2) -> DVec3 {
        DVec3::new(uv.x, uv.y, 0.0)
    }
    fn d1(&self, _uv: DVec2) -> (DVec3, DVec3) {
        (DVec3::X, DVec3::Y)
    }
    fn param_range(&self) -> (DVec2, DVec2) {
        (DVec2::splat(-100.0), DVec2::splat(100.0))
    }
    fn nearest_point(&self, p: DVec3) -> DVec2 {
        DVec2::new(p.x, p.y)
    }
}

/// Side of a cylinder of the given radius and height, parameterized by
/// `(u, v) = (angle, height)` with a periodic seam at `u = 0 = 2 pi`.
pub struct CylinderPatch {
    pub radius: f64,
    pub height: f64,
}

impl Surface for CylinderPatch {
    fn point(&self, uv: DVec2) -> DVec3 {
        DVec3::new(
            self.radius * uv.x.cos(),
            self.radius * uv.x.sin(),
            uv.y,
        )
    }
    fn d1(&self, uv: DVec2) -> (DVec3, DVec3) {
        (
            DVec3::new(-self.radius * uv.x.sin(), self.radius * uv.x.cos(), 0.0),
            DVec3::Z,
        )
    }
    fn param_range(&self) -> (DVec2, DVec2) {
        (
            DVec2::ZERO,
            DVec2::new(std::f64::consts::TAU, self.height),
        )
    }
    fn nearest_point(&self, p: DVec3) -> DVec2 {
        let mut u = p.y.atan2(p.x);
        if u < 0.0 {
            u += std::f64::consts::TAU;
        }
        DVec2::new(u, p.z)
    }
}

/// A plain planar vertex classified on curve `tag`.
pub fn planar_vertex(num: i32, uv: DVec2, tag: i32) -> InputVertex {
    InputVertex::new(num, DVec3::new(uv.x, uv.y, 0.0), uv, GeomRef::new(tag, 1))
}

/// `n` vertices equally spaced on a circle, numbered from `first`, plus
/// the closed polygon over them as one curve.
pub fn circle_loop(
    first: i32,
    n: usize,
    center: DVec2,
    radius: f64,
    tag: i32,
) -> (Vec<InputVertex>, InputCurve) {
    let vertices: Vec<InputVertex> = (0..n)
        .map(|i| {
            let a = std::f64::consts::TAU * i as f64 / n as f64;
            planar_vertex(
                first + i as i32,
                center + radius * DVec2::new(a.cos(), a.sin()),
                tag,
            )
        })
        .collect();
    let segments: Vec<(i32, i32)> = (0..n)
        .map(|i| (first + i as i32, first + ((i + 1) % n) as i32))
        .collect();
    (vertices, InputCurve::new(tag, segments))
}

/// Undirected edge -> number of adjacent triangles.
pub fn edge_valences(mesh: &SurfaceMesh) -> BTreeMap<(usize, usize), usize> {
    let mut valences = BTreeMap::new();
    for t in &mesh.triangles {
        for k in 0..3 {
            let (a, b) = (t[k], t[(k + 1) % 3]);
            let pair = if a < b { (a, b) } else { (b, a) };
            *valences.entry(pair).or_insert(0) += 1;
        }
    }
    valences
}

/// Euler characteristic `V - E + F` of the output triangulation.
pub fn euler_characteristic(mesh: &SurfaceMesh) -> i64 {
    let v = mesh.triangles.iter().flatten().collect::<std::collections::BTreeSet<_>>().len() as i64;
    let e = edge_valences(mesh).len() as i64;
    let f = mesh.triangles.len() as i64;
    v - e + f
}

/// Index of the output vertex carrying input id `num`.
pub fn index_of_num(mesh: &SurfaceMesh, num: i32) -> Option<usize> {
    mesh.vertices.iter().position(|v| v.num == num)
}

/// Every input segment must appear as an edge of the output adjacent to
/// exactly `expected_valence` triangles (1 for an outer boundary, 2 for
/// a seam that the output crosses).
pub fn assert_boundary_preserved(mesh: &SurfaceMesh, segments: &[(i32, i32)], expected_valence: usize) {
    let valences = edge_valences(mesh);
    for &(a, b) in segments {
        let ia = index_of_num(mesh, a).unwrap_or_else(|| panic!("vertex {a} missing"));
        let ib = index_of_num(mesh, b).unwrap_or_else(|| panic!("vertex {b} missing"));
        let pair = if ia < ib { (ia, ib) } else { (ib, ia) };
        assert_eq!(
            valences.get(&pair),
            Some(&expected_valence),
            "boundary edge {a}-{b} has the wrong triangle count"
        );
    }
}

/// All interior (valence-2) edges adjoin exactly two triangles and
/// nothing exceeds valence 2.
pub fn assert_edge_valences(mesh: &SurfaceMesh) {
    for ((a, b), valence) in edge_valences(mesh) {
        assert!(
            (1..=2).contains(&valence),
            "edge {a}-{b} adjoins {valence} triangles"
        );
    }
}

/// Every triangle is counterclockwise in the parametric plane.
pub fn assert_ccw_in_uv(mesh: &SurfaceMesh) {
    for t in &mesh.triangles {
        let a = mesh.vertices[t[0]].uv;
        let b = mesh.vertices[t[1]].uv;
        let c = mesh.vertices[t[2]].uv;
        let area = (b - a).perp_dot(c - a);
        assert!(area > 0.0, "triangle {t:?} is not counterclockwise ({area})");
    }
}

/// Smallest corner angle over all triangles, in degrees, measured in 3D.
pub fn min_angle_degrees(mesh: &SurfaceMesh) -> f64 {
    let mut min = 180.0_f64;
    for t in &mesh.triangles {
        for k in 0..3 {
            let p = mesh.vertices[t[k]].position;
            let q = mesh.vertices[t[(k + 1) % 3]].position;
            let r = mesh.vertices[t[(k + 2) % 3]].position;
            let v1 = (q - p).normalize();
            let v2 = (r - p).normalize();
            let angle = v1.dot(v2).clamp(-1.0, 1.0).acos().to_degrees();
            min = min.min(angle);
        }
    }
    min
}
