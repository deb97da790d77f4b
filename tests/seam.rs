//! Meshing across a periodic seam: the side of a cylinder whose
//! parameter domain is closed by a seam curve carrying duplicated
//! `(u, v)` copies.

mod common;

use common::*;
use glam::{DVec2, DVec3};
use mesh_frontal::{
    GeomRef, InputCurve, InputVertex, MeshingOptions, NoSizeField, Surface, mesh_surface,
};

const TAU: f64 = std::f64::consts::TAU;

/// A vertex on one of the cylinder's circular rims. The seam vertex
/// (angle 0) carries both parameter copies.
fn rim_vertex(num: i32, cylinder: &CylinderPatch, i: usize, n: usize, z: f64, tag: i32) -> InputVertex {
    let u = TAU * i as f64 / n as f64;
    let uv = DVec2::new(u, z);
    let mut vertex = InputVertex::new(num, cylinder.point(uv), uv, GeomRef::new(tag, 1));
    if i == 0 {
        vertex.uv.push(DVec2::new(TAU, z));
    }
    vertex
}

#[test]
fn cylinder_side_with_seam() {
    init_tracing();
    let cylinder = CylinderPatch {
        radius: 1.0,
        height: 1.0,
    };
    let n = 8;

    // bottom rim 0..8, top rim 8..16, one mid-seam vertex 16
    let mut vertices: Vec<InputVertex> = Vec::new();
    for i in 0..n {
        vertices.push(rim_vertex(i as i32, &cylinder, i, n, 0.0, 1));
    }
    for i in 0..n {
        vertices.push(rim_vertex(n as i32 + i as i32, &cylinder, i, n, 1.0, 2));
    }
    let mut mid_seam = InputVertex::new(
        16,
        cylinder.point(DVec2::new(0.0, 0.5)),
        DVec2::new(0.0, 0.5),
        GeomRef::new(3, 1),
    );
    mid_seam.uv.push(DVec2::new(TAU, 0.5));
    vertices.push(mid_seam);

    let bottom = InputCurve::new(
        1,
        (0..n as i32).map(|i| (i, (i + 1) % n as i32)).collect(),
    );
    let top = InputCurve::new(
        2,
        (0..n as i32)
            .map(|i| (8 + i, 8 + (i + 1) % n as i32))
            .collect(),
    );
    let mut seam = InputCurve::new(3, vec![(0, 16), (16, 8)]);
    seam.seam = true;
    let boundary = vec![bottom.clone(), top.clone(), seam.clone()];

    let mesh = mesh_surface(
        &cylinder,
        &vertices,
        &boundary,
        &[],
        &[],
        &NoSizeField,
        &MeshingOptions::default(),
    )
    .unwrap();

    // all 17 input vertices survive, each exactly once
    for num in 0..17 {
        assert!(index_of_num(&mesh, num).is_some(), "vertex {num} missing");
    }
    let mut nums: Vec<i32> = mesh.vertices.iter().map(|v| v.num).collect();
    nums.sort();
    nums.dedup();
    assert_eq!(nums.len(), mesh.vertices.len(), "duplicated output vertex");

    // the rims stay boundary edges; the seam is interior after the two
    // parameter sides are identified, so its segments adjoin two
    // triangles
    assert_boundary_preserved(&mesh, &bottom.segments, 1);
    assert_boundary_preserved(&mesh, &top.segments, 1);
    assert_boundary_preserved(&mesh, &seam.segments, 2);
    assert_edge_valences(&mesh);

    // a closed tube has Euler characteristic 0
    assert_eq!(euler_characteristic(&mesh), 0);

    // no degenerate triangle, and everything lies on the cylinder
    for t in &mesh.triangles {
        assert!(t[0] != t[1] && t[1] != t[2] && t[2] != t[0]);
        let p = [
            mesh.vertices[t[0]].position,
            mesh.vertices[t[1]].position,
            mesh.vertices[t[2]].position,
        ];
        let area = (p[1] - p[0]).cross(p[2] - p[0]).length();
        assert!(area > 1.0e-12, "degenerate triangle {t:?}");
    }
    for v in &mesh.vertices {
        let r = DVec3::new(v.position.x, v.position.y, 0.0).length();
        assert!((r - 1.0).abs() < 1.0e-9, "vertex off the cylinder: {r}");
        assert!((-1.0e-9..=1.0 + 1.0e-9).contains(&v.position.z));
    }
}
