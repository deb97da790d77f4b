//! Per-surface meshing pipeline: boundary collection, initial parametric
//! triangulation, boundary recovery, classification, Delaunay repair and
//! frontal refinement.

use std::collections::{BTreeMap, BTreeSet};

use glam::DVec2;
use itertools::Itertools;
use tracing::{debug, warn};

use crate::bdm::{BdmMesh, SwapTest};
use crate::error::MeshError;
use crate::front::{MeshData, refine_frontal, transfer};
use crate::geom::{
    GeomRef, InputCurve, InputVertex, MAX_SIZE, MeshingOptions, OutputVertex, SizeField, Surface,
    SurfaceMesh,
};
use crate::metric::{Metric, in_circum_circle_aniso_tolerant};
use crate::plane::{PlaneMesh, planar_delaunay_criterion};

/// Classification of everything lying in the surface interior.
const CLASS_SURFACE: GeomRef = GeomRef::new(1, 2);
/// Transient classification of the triangles outside the recovered
/// boundary, stripped before refinement.
const CLASS_EXTERIOR: GeomRef = GeomRef::new(1, 3);

/// One `(u, v)` copy of an input vertex and the working-mesh point
/// created for it.
#[derive(Debug, Clone, Copy)]
struct CopyEntry {
    uv: DVec2,
    id: i32,
}

type Copies = BTreeMap<i32, Vec<CopyEntry>>;

/// Triangulate one surface. See the crate documentation for the
/// pipeline; this is the only entry point.
pub fn mesh_surface(
    surface: &dyn Surface,
    vertices: &[InputVertex],
    boundary_curves: &[InputCurve],
    embedded_curves: &[InputCurve],
    embedded_points: &[i32],
    size_field: &dyn SizeField,
    options: &MeshingOptions,
) -> Result<SurfaceMesh, MeshError> {
    let vertex_map: BTreeMap<i32, InputVertex> =
        vertices.iter().map(|v| (v.num, v.clone())).collect();
    let boundary = boundary_curves.to_vec();
    mesh_generator(
        surface,
        vertex_map,
        boundary,
        embedded_curves,
        embedded_points,
        size_field,
        options,
        0,
    )
}

#[allow(clippy::too_many_arguments)]
fn mesh_generator(
    surface: &dyn Surface,
    vertices: BTreeMap<i32, InputVertex>,
    boundary_curves: Vec<InputCurve>,
    embedded_curves: &[InputCurve],
    embedded_points: &[i32],
    size_field: &dyn SizeField,
    options: &MeshingOptions,
    attempt: usize,
) -> Result<SurfaceMesh, MeshError> {
    // Phase A: collect the boundary vertex set and check closedness.
    // Every vertex must be referenced an even number of times, counting
    // seam curves once per side.
    let mut all: BTreeSet<i32> = BTreeSet::new();
    let mut open: BTreeSet<i32> = BTreeSet::new();
    for curve in &boundary_curves {
        if curve.degenerated {
            debug!("curve {} carries a degenerated 1D mesh", curve.tag);
            continue;
        }
        let sides = if curve.seam { 2 } else { 1 };
        for _ in 0..sides {
            for &(a, b) in &curve.segments {
                for num in [a, b] {
                    if !vertices.contains_key(&num) {
                        return Err(MeshError::UnknownVertex {
                            num,
                            curve: curve.tag,
                        });
                    }
                    all.insert(num);
                    if !open.insert(num) {
                        open.remove(&num);
                    }
                }
            }
        }
    }
    if !open.is_empty() {
        return Err(MeshError::BoundaryNotClosed { count: open.len() });
    }
    for curve in embedded_curves {
        if curve.degenerated {
            continue;
        }
        for &(a, b) in &curve.segments {
            for num in [a, b] {
                if !vertices.contains_key(&num) {
                    return Err(MeshError::UnknownVertex {
                        num,
                        curve: curve.tag,
                    });
                }
                all.insert(num);
            }
        }
    }
    for &num in embedded_points {
        if !vertices.contains_key(&num) {
            return Err(MeshError::UnknownVertex { num, curve: 0 });
        }
        all.insert(num);
    }

    if all.len() < 3 {
        warn!("only {} vertices on the boundary, nothing to mesh", all.len());
        return Ok(SurfaceMesh::default());
    }
    if all.len() == 3 {
        return Ok(single_triangle(&vertices, &all));
    }

    // Build the working mesh: one point per (u, v) copy.
    let mut m = BdmMesh::new();
    let mut copies: Copies = BTreeMap::new();
    let mut id_to_num: BTreeMap<i32, i32> = BTreeMap::new();
    let mut next_id = 0;
    for &num in &all {
        let vertex = &vertices[&num];
        let mut entries: Vec<CopyEntry> = Vec::with_capacity(vertex.uv.len());
        for &uv in &vertex.uv {
            // seam reparameterizations may repeat up to roundoff
            if entries
                .iter()
                .any(|e| (e.uv.x - uv.x).abs() < 1.0e-9 && (e.uv.y - uv.y).abs() < 1.0e-9)
            {
                continue;
            }
            let id = next_id;
            next_id += 1;
            let p = m.add_point_on(id, uv, surface);
            p.g = Some(vertex.on);
            p.degenerated = vertex.degenerated;
            p.size_bgm = size_field.size_at(uv, p.position);
            p.size = p.size_bgm;
            entries.push(CopyEntry { uv, id });
            id_to_num.insert(id, num);
        }
        if entries.is_empty() {
            return Err(MeshError::ReparameterizationFailed { num });
        }
        if let [a, b] = entries[..] {
            m.points.get_mut(&a.id).expect("just added").periodic_counterpart = Some(b.id);
            m.points.get_mut(&b.id).expect("just added").periodic_counterpart = Some(a.id);
        }
        copies.insert(num, entries);
    }

    // Phase B: initial triangulation of the parametric plane, then
    // transfer into the working mesh.
    initial_triangulation(surface, &mut m, &copies);

    // Phase C: recover every 1D segment as an edge of the triangulation.
    let mut required: BTreeSet<(i32, i32)> = BTreeSet::new();
    for curve in boundary_curves.iter().chain(embedded_curves) {
        if curve.degenerated {
            continue;
        }
        for &(a, b) in &curve.segments {
            for pair in segment_point_pairs(&copies, a, b) {
                required.insert(ordered(pair));
            }
        }
    }

    let mut crossings: BTreeSet<(i32, i32)> = BTreeSet::new();
    let mut crossing_example: Option<(i32, i32, i32)> = None;
    let mut degeneracy_split_done = false;
    for curve in &boundary_curves {
        if curve.degenerated {
            continue;
        }
        let g = GeomRef::new(curve.tag, 1);
        for &(a, b) in &curve.segments {
            for pair in segment_point_pairs(&copies, a, b) {
                let mut outcome = m.recover_edge(pair.0, pair.1, &required);
                if outcome.edge.is_none() && outcome.fatal {
                    // a pole in the way: split its incident edges through
                    // parametric midpoints and retry once
                    let has_pole = m
                        .points
                        .values()
                        .any(|p| p.degenerated.is_degenerate());
                    if has_pole && !degeneracy_split_done {
                        degeneracy_split_done = true;
                        m.split_edges_at_degeneracy(surface);
                        outcome = m.recover_edge(pair.0, pair.1, &required);
                    }
                }
                if !outcome.crossings.is_empty() {
                    for &(p, q) in &outcome.crossings {
                        crossings.insert((p, q));
                    }
                    crossing_example.get_or_insert((a, b, curve.tag));
                    continue;
                }
                match outcome.edge {
                    Some(e) => m.edges[e].g = Some(g),
                    None => {
                        return Err(MeshError::RecoveryBudgetExhausted { p1: a, p2: b });
                    }
                }
            }
        }
    }

    if let Some((p1, p2, curve)) = crossing_example {
        if options.repair_self_intersect && attempt < 10 {
            debug!(
                "{} required edges intersect in parameter space, splitting and retrying",
                crossings.len()
            );
            let (vertices, boundary_curves) =
                split_crossing_segments(surface, vertices, boundary_curves, &id_to_num, &crossings);
            return mesh_generator(
                surface,
                vertices,
                boundary_curves,
                embedded_curves,
                embedded_points,
                size_field,
                options,
                attempt + 1,
            );
        }
        return Err(MeshError::RecoveryBlockedBySelfIntersection { p1, p2, curve });
    }
    if attempt > 0 {
        debug!("all edges recovered after {attempt} retries");
    }

    // Phase D: classify by flood fill and strip the exterior.
    classify_and_prune(&mut m, embedded_curves, &copies, &required);

    // Phase E: repair the anisotropic Delaunay property by edge swaps.
    let nb_swap = delaunayize(&mut m, surface);
    debug!("initial mesh Delaunayized with {nb_swap} swaps");

    // Hand over to the frontal loop.
    let (mut data, triangles) =
        build_mesh_data(&m, &vertices, &copies, &boundary_curves, embedded_curves, size_field);

    let final_triangles = if options.only_initial {
        transfer(&data, triangles)
    } else {
        refine_frontal(surface, size_field, options, &mut data, &triangles)
    };

    // Phase G: emit only the vertices the final triangles reference.
    Ok(emit(&data, &vertices, final_triangles))
}

/// Degenerate input: exactly three boundary vertices give one triangle.
fn single_triangle(vertices: &BTreeMap<i32, InputVertex>, all: &BTreeSet<i32>) -> SurfaceMesh {
    let corners: Vec<&InputVertex> = all.iter().map(|num| &vertices[num]).collect();
    let out: Vec<OutputVertex> = corners
        .iter()
        .map(|v| OutputVertex {
            num: v.num,
            position: v.position,
            uv: v.uv.first().copied().unwrap_or(DVec2::ZERO),
        })
        .collect();
    let ccw = crate::predicates::orient2d(out[0].uv, out[1].uv, out[2].uv) >= 0.0;
    SurfaceMesh {
        vertices: out,
        triangles: vec![if ccw { [0, 1, 2] } else { [0, 2, 1] }],
    }
}

/// Walk-and-split every boundary point into a Delaunay triangulation of
/// the inflated parametric bounding square, then copy the faces into the
/// working mesh (super-vertices keep their negative ids).
fn initial_triangulation(surface: &dyn Surface, m: &mut BdmMesh, copies: &Copies) {
    let mut min = DVec2::splat(f64::MAX);
    let mut max = DVec2::splat(f64::MIN);
    for entries in copies.values() {
        for e in entries {
            min = min.min(e.uv);
            max = max.max(e.uv);
        }
    }
    let center = 0.5 * (min + max);
    let extent = max - min;
    let half = DVec2::splat(0.5 * 1.1 * extent.x.max(extent.y).max(1.0e-12));

    let mut pm = PlaneMesh::new();
    pm.initialize_rectangle(center - half, center + half);

    for vertex in pm.vertices.values() {
        let p = m.add_point_on(vertex.data, vertex.position, surface);
        p.g = Some(GeomRef::new(0, 2));
    }

    let mut face = pm.faces.keys().next().expect("rectangle has faces");
    for entries in copies.values() {
        for e in entries {
            face = pm
                .walk(face, e.uv)
                .expect("the inflated rectangle covers every parametric point");
            pm.split_triangle(e.uv, e.id, face, Some(&planar_delaunay_criterion));
        }
    }

    let faces: Vec<_> = pm.faces.keys().collect();
    for f in faces {
        let [a, b, c] = pm.face_vertices(f).map(|v| pm.vertices[v].data);
        m.add_triangle_by_points(a, b, c);
    }
}

/// Point-id pairs realizing the 1D segment `(a, b)`, one per seam side.
/// Each copy of the endpoint with fewer copies connects to the
/// parametrically closest copy of the other.
fn segment_point_pairs(copies: &Copies, a: i32, b: i32) -> Vec<(i32, i32)> {
    let ca = &copies[&a];
    let cb = &copies[&b];
    let (small, large) = if ca.len() <= cb.len() { (ca, cb) } else { (cb, ca) };
    small
        .iter()
        .map(|s| {
            let closest = large
                .iter()
                .min_by(|x, y| {
                    (x.uv - s.uv)
                        .length_squared()
                        .total_cmp(&(y.uv - s.uv).length_squared())
                })
                .expect("copy lists are non-empty");
            (s.id, closest.id)
        })
        .collect()
}

/// Split every crossing segment at the surface point of its parametric
/// midpoint, producing the refined inputs for a retry.
fn split_crossing_segments(
    surface: &dyn Surface,
    mut vertices: BTreeMap<i32, InputVertex>,
    mut boundary_curves: Vec<InputCurve>,
    id_to_num: &BTreeMap<i32, i32>,
    crossings: &BTreeSet<(i32, i32)>,
) -> (BTreeMap<i32, InputVertex>, Vec<InputCurve>) {
    let mut next_num = vertices.keys().max().copied().unwrap_or(0) + 1;
    for &(pa, pb) in crossings {
        let (Some(&na), Some(&nb)) = (id_to_num.get(&pa), id_to_num.get(&pb)) else {
            continue;
        };
        for curve in &mut boundary_curves {
            let Some(pos) = curve
                .segments
                .iter()
                .position(|&(x, y)| (x == na && y == nb) || (x == nb && y == na))
            else {
                continue;
            };
            let (x, y) = curve.segments[pos];
            let uv_mid = 0.5 * (vertices[&x].uv[0] + vertices[&y].uv[0]);
            let mid = InputVertex::new(
                next_num,
                surface.point(uv_mid),
                uv_mid,
                GeomRef::new(curve.tag, 1),
            );
            vertices.insert(next_num, mid);
            curve.segments[pos] = (x, next_num);
            curve.segments.insert(pos + 1, (next_num, y));
            next_num += 1;
            break;
        }
    }
    (vertices, boundary_curves)
}

/// Flood-fill the exterior from a super-vertex triangle, flood the
/// surface interior from across a recovered boundary edge, recover the
/// embedded curves, then strip everything unclassified and drop the
/// super-vertices.
fn classify_and_prune(
    m: &mut BdmMesh,
    embedded_curves: &[InputCurve],
    copies: &Copies,
    required: &BTreeSet<(i32, i32)>,
) {
    let face_ids: Vec<_> = m.faces.keys().collect();
    for &f in &face_ids {
        m.faces[f].g = None;
    }

    for &f in &face_ids {
        if let Some(nodes) = m.faces[f].nodes(m) {
            if nodes.iter().any(|&n| n < 0) {
                m.flood_tag(f, CLASS_EXTERIOR);
                break;
            }
        }
    }

    let edge_ids: Vec<_> = m.edges.keys().collect();
    for &e in &edge_ids {
        let edge = &m.edges[e];
        if edge.g.is_none() || edge.num_faces() != 2 {
            continue;
        }
        let (f0, f1) = (edge.faces[0], edge.faces[1]);
        if m.faces[f0].g == Some(CLASS_EXTERIOR) {
            m.flood_tag(f1, CLASS_SURFACE);
            break;
        }
        if m.faces[f1].g == Some(CLASS_EXTERIOR) {
            m.flood_tag(f0, CLASS_SURFACE);
            break;
        }
    }
    for &f in &face_ids {
        if m.faces[f].g == Some(CLASS_EXTERIOR) {
            m.faces[f].g = None;
        }
    }
    for &e in &edge_ids {
        let edge = &m.edges[e];
        if edge.g.is_none() || edge.num_faces() != 2 {
            continue;
        }
        let [Some(o1), Some(o2)] = edge.opposite_points(m) else {
            continue;
        };
        let (f0, f1) = (edge.faces[0], edge.faces[1]);
        if o1 < 0 {
            m.flood_tag(f1, CLASS_SURFACE);
            break;
        }
        if o2 < 0 {
            m.flood_tag(f0, CLASS_SURFACE);
            break;
        }
    }

    // embedded curves become classified, protected interior edges
    for curve in embedded_curves {
        if curve.degenerated {
            continue;
        }
        let g = GeomRef::new(curve.tag, 1);
        for &(a, b) in &curve.segments {
            for pair in segment_point_pairs(copies, a, b) {
                let outcome = m.recover_edge(pair.0, pair.1, required);
                match outcome.edge {
                    Some(e) => m.edges[e].g = Some(g),
                    None => warn!(
                        "embedded edge {} {} could not be recovered; constraint dropped",
                        a, b
                    ),
                }
            }
        }
    }

    let face_ids: Vec<_> = m.faces.keys().collect();
    for f in face_ids {
        if m.faces[f].g.is_none() {
            m.del_face(f);
        }
    }
    m.cleanup();

    let edge_ids: Vec<_> = m.edges.keys().collect();
    for e in edge_ids {
        if m.edges[e].num_faces() == 0 {
            m.del_edge(e);
            continue;
        }
        if m.edges[e].g.is_none() {
            m.edges[e].g = Some(CLASS_SURFACE);
        }
        let g = m.edges[e].g.expect("just classified");
        for id in [m.edges[e].p1, m.edges[e].p2] {
            let p = m.points.get_mut(&id).expect("edge endpoints exist");
            if p.g.is_none_or(|pg| pg.dim > g.dim) {
                p.g = Some(g);
            }
        }
    }
    m.cleanup();

    for id in [-1, -2, -3, -4] {
        m.del_point(id);
    }
}

/// Sweep all edges, swapping any whose opposite vertex violates the
/// anisotropic in-circle test, until a full sweep swaps nothing. Each
/// four-point configuration is attempted at most once.
fn delaunayize(m: &mut BdmMesh, surface: &dyn Surface) -> usize {
    let mut configs: BTreeSet<[i32; 4]> = BTreeSet::new();
    let mut nb_swap = 0;
    loop {
        let mut swapped_this_sweep = 0;
        let edge_ids: Vec<_> = m.edges.keys().collect();
        for e in edge_ids {
            if m.edges[e].deleted {
                continue;
            }
            if !violates_aniso_delaunay(m, e, surface, &mut configs) {
                continue;
            }
            if m.swap_edge(
                e,
                &SwapTest::Quality {
                    quality: false,
                    small: true,
                },
                false,
            ) {
                swapped_this_sweep += 1;
            }
        }
        nb_swap += swapped_this_sweep;
        if swapped_this_sweep == 0 {
            return nb_swap;
        }
    }
}

fn violates_aniso_delaunay(
    m: &BdmMesh,
    e: crate::bdm::EdgeId,
    surface: &dyn Surface,
    configs: &mut BTreeSet<[i32; 4]>,
) -> bool {
    let edge = &m.edges[e];
    let p1 = &m.points[&edge.p1];
    let p2 = &m.points[&edge.p2];
    if !p1.config_modified && !p2.config_modified {
        return false;
    }
    if edge.num_faces() != 2 {
        return false;
    }
    let [Some(o1), Some(o2)] = edge.opposite_points(m) else {
        return false;
    };

    let mut quad = [edge.p1, edge.p2, o1, o2];
    quad.sort();
    if !configs.insert(quad) {
        return false;
    }

    let edge_center = 0.5 * (p1.uv + p2.uv);
    let metric = Metric::at(surface, edge_center);
    in_circum_circle_aniso_tolerant(
        p1.uv,
        p2.uv,
        m.points[&o1].uv,
        m.points[&o2].uv,
        &metric,
    )
}

/// Pack the recovered triangulation into the dense working state of the
/// frontal loop: per-vertex parameters, positions, sizes derived from
/// incident edge lengths, seam equivalences and protected embedded
/// edges.
fn build_mesh_data(
    m: &BdmMesh,
    vertices: &BTreeMap<i32, InputVertex>,
    copies: &Copies,
    boundary_curves: &[InputCurve],
    embedded_curves: &[InputCurve],
    size_field: &dyn SizeField,
) -> (MeshData, Vec<[usize; 3]>) {
    let mut data = MeshData::new();
    let mut row_of: BTreeMap<i32, usize> = BTreeMap::new();

    let mut id_to_num: BTreeMap<i32, i32> = BTreeMap::new();
    for (num, entries) in copies {
        for e in entries {
            id_to_num.insert(e.id, *num);
        }
    }

    for (&id, p) in &m.points {
        let row = data.add_vertex(
            p.uv,
            p.position,
            -1.0,
            size_field.size_at(p.uv, p.position),
            p.g.map(|g| g.dim).unwrap_or(2),
            id_to_num.get(&id).copied(),
        );
        row_of.insert(id, row);
    }

    for entries in copies.values() {
        if entries.len() < 2 {
            continue;
        }
        let Some(&primary) = row_of.get(&entries[0].id) else {
            continue;
        };
        for e in &entries[1..] {
            if let Some(&row) = row_of.get(&e.id) {
                data.equivalent.insert(row, primary);
            }
        }
    }

    let triangles: Vec<[usize; 3]> = m
        .triangle_nodes()
        .into_iter()
        .map(|nodes| nodes.map(|n| row_of[&n]))
        .collect();

    // vertex size := length of the shortest incident edge, ignoring
    // edges that connect seam copies of the same vertex
    for t in &triangles {
        for (i, j) in t.iter().copied().tuple_combinations() {
            if data.primary(i) == data.primary(j) {
                continue;
            }
            let l = (data.position[i] - data.position[j]).length();
            for v in [i, j] {
                if data.size[v] < 0.0 || data.size[v] > l {
                    data.size[v] = l;
                }
            }
        }
    }
    for v in 0..data.len() {
        if data.size[v] < 0.0 {
            data.size[v] = MAX_SIZE;
        }
    }

    // prescribed sizes on embedded vertices
    for (num, vertex) in vertices {
        let Some(size) = vertex.size else { continue };
        if let Some(entries) = copies.get(num) {
            for e in entries {
                if let Some(&row) = row_of.get(&e.id) {
                    data.size[row] = data.size[row].min(size);
                }
            }
        }
    }

    // boundary segments must not drag sizes below half their own length
    for curve in boundary_curves {
        if curve.degenerated {
            continue;
        }
        for &(a, b) in &curve.segments {
            for (pa, pb) in segment_point_pairs(copies, a, b) {
                let (Some(&ra), Some(&rb)) = (row_of.get(&pa), row_of.get(&pb)) else {
                    continue;
                };
                let d = (data.position[ra] - data.position[rb]).length();
                for r in [ra, rb] {
                    if data.size[r] < 0.5 * d {
                        data.size[r] = 0.5 * d;
                    }
                }
            }
        }
    }

    // embedded segments are protected from cavity flooding
    for curve in embedded_curves {
        if curve.degenerated {
            continue;
        }
        for &(a, b) in &curve.segments {
            for (pa, pb) in segment_point_pairs(copies, a, b) {
                let (Some(&ra), Some(&rb)) = (row_of.get(&pa), row_of.get(&pb)) else {
                    continue;
                };
                let pair = if ra < rb { (ra, rb) } else { (rb, ra) };
                data.internal_edges.insert(pair);
            }
        }
    }

    (data, triangles)
}

/// Build the output mesh from the rows the final triangles reference.
/// Boundary vertices keep their input id and position; interior vertices
/// receive fresh ids above the input range.
fn emit(
    data: &MeshData,
    vertices: &BTreeMap<i32, InputVertex>,
    triangles: Vec<[usize; 3]>,
) -> SurfaceMesh {
    let used: BTreeSet<usize> = triangles.iter().flatten().copied().collect();

    let mut next_num = vertices.keys().max().copied().unwrap_or(0) + 1;
    let mut index_of: BTreeMap<usize, usize> = BTreeMap::new();
    let mut out_vertices: Vec<OutputVertex> = Vec::with_capacity(used.len());
    for &row in &used {
        let (num, position) = match data.num[row] {
            Some(num) => {
                let position = vertices
                    .get(&num)
                    .map(|v| v.position)
                    .unwrap_or(data.position[row]);
                (num, position)
            }
            None => {
                let num = next_num;
                next_num += 1;
                (num, data.position[row])
            }
        };
        index_of.insert(row, out_vertices.len());
        out_vertices.push(OutputVertex {
            num,
            position,
            uv: data.uv[row],
        });
    }

    let out_triangles: Vec<[usize; 3]> = triangles
        .into_iter()
        .map(|t| t.map(|row| index_of[&row]))
        .collect();

    debug!(
        "meshed surface with {} vertices and {} triangles",
        out_vertices.len(),
        out_triangles.len()
    );
    SurfaceMesh {
        vertices: out_vertices,
        triangles: out_triangles,
    }
}

#[inline]
fn ordered(pair: (i32, i32)) -> (i32, i32) {
    if pair.0 < pair.1 { pair } else { (pair.1, pair.0) }
}
