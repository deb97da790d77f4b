use std::collections::BTreeMap;

use glam::{DVec2, DVec3};
use slotmap::SlotMap;

use super::{BdmEdge, BdmFace, BdmPoint, EdgeId, FaceId};
use crate::geom::{GeomRef, Surface};

/// The working triangulation. See the [module docs](super).
#[derive(Default)]
pub struct BdmMesh {
    /// Points ordered by id.
    pub points: BTreeMap<i32, BdmPoint>,
    pub edges: SlotMap<EdgeId, BdmEdge>,
    pub faces: SlotMap<FaceId, BdmFace>,
    /// Highest id handed out so far; new interior points take
    /// `max_point_id + 1`.
    pub max_point_id: i32,
}

impl BdmMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a point with the given id and 3D position.
    pub fn add_point(&mut self, id: i32, position: DVec3) -> &mut BdmPoint {
        self.max_point_id = self.max_point_id.max(id);
        self.points.entry(id).or_insert_with(|| BdmPoint::new(id, position))
    }

    /// Insert a point at parameters `uv`, evaluating the surface for its
    /// position.
    pub fn add_point_on(&mut self, id: i32, uv: DVec2, surface: &dyn Surface) -> &mut BdmPoint {
        let position = surface.point(uv);
        let p = self.add_point(id, position);
        p.uv = uv;
        p
    }

    /// Remove a point. Its incident edges must have been deleted first.
    pub fn del_point(&mut self, id: i32) {
        self.points.remove(&id);
    }

    /// The edge between two points, if present, found by scanning the
    /// first point's incident edges.
    pub fn find_edge(&self, p1: i32, p2: i32) -> Option<EdgeId> {
        let p = self.points.get(&p1)?;
        p.edges
            .iter()
            .copied()
            .find(|&e| self.edges[e].other_vertex(p1) == Some(p2))
    }

    /// The edge `(p1, p2)` among the three edges of face `f`.
    pub fn find_edge_in_face(&self, p1: i32, p2: i32, f: FaceId) -> Option<EdgeId> {
        let (a, b) = if p1 < p2 { (p1, p2) } else { (p2, p1) };
        self.faces[f]
            .edges
            .into_iter()
            .find(|&e| self.edges[e].p1 == a && self.edges[e].p2 == b)
    }

    /// The existing edge between two points, or a newly created one added
    /// to both endpoints' incidence lists.
    pub fn add_edge(&mut self, p1: i32, p2: i32) -> EdgeId {
        if let Some(e) = self.find_edge(p1, p2) {
            return e;
        }
        debug_assert!(self.points.contains_key(&p1) && self.points.contains_key(&p2));
        let e = self.edges.insert(BdmEdge::new(p1, p2));
        self.points.get_mut(&p1).expect("endpoint exists").edges.push(e);
        self.points.get_mut(&p2).expect("endpoint exists").edges.push(e);
        e
    }

    /// Create a triangle from three edges assumed to form a closed loop,
    /// linking the face back into each edge's adjacency list.
    pub fn add_triangle(&mut self, e1: EdgeId, e2: EdgeId, e3: EdgeId) -> FaceId {
        let f = self.faces.insert(BdmFace::new(e1, e2, e3));
        self.edges[e1].faces.push(f);
        self.edges[e2].faces.push(f);
        self.edges[e3].faces.push(f);
        f
    }

    /// Create a triangle from three point ids, creating missing edges.
    pub fn add_triangle_by_points(&mut self, p1: i32, p2: i32, p3: i32) -> FaceId {
        let e1 = self.add_edge(p1, p2);
        let e2 = self.add_edge(p2, p3);
        let e3 = self.add_edge(p3, p1);
        self.add_triangle(e1, e2, e3)
    }

    /// Tombstone a face and unlink it from its edges.
    pub fn del_face(&mut self, f: FaceId) {
        let edges = self.faces[f].edges;
        for e in edges {
            self.edges[e].remove_face(f);
        }
        self.faces[f].deleted = true;
    }

    /// Tombstone an edge and unlink it from its endpoints.
    pub fn del_edge(&mut self, e: EdgeId) {
        let (p1, p2) = {
            let edge = &self.edges[e];
            (edge.p1, edge.p2)
        };
        if let Some(p) = self.points.get_mut(&p1) {
            p.remove_edge(e);
        }
        if let Some(p) = self.points.get_mut(&p2) {
            p.remove_edge(e);
        }
        self.edges[e].deleted = true;
    }

    /// The triangle made of exactly these three edges, in any order.
    pub fn find_triangle(&self, e1: EdgeId, e2: EdgeId, e3: EdgeId) -> Option<FaceId> {
        let is_match = |f: FaceId| {
            let face = &self.faces[f];
            face.has_edge(e1) && face.has_edge(e2) && face.has_edge(e3)
        };
        for &e in &[e1, e2, e3] {
            if let Some(f) = self.edges[e].faces.iter().copied().find(|&f| is_match(f)) {
                return Some(f);
            }
        }
        None
    }

    /// Flood-fill classification: tag `start` and every face reachable
    /// through unclassified edges with two faces, stopping at classified
    /// edges (recovered boundaries) and at already-tagged faces.
    pub fn flood_tag(&mut self, start: FaceId, g: GeomRef) {
        let mut stack = vec![start];
        while let Some(f) = stack.pop() {
            if self.faces[f].g.is_some() {
                continue;
            }
            self.faces[f].g = Some(g);
            for e in self.faces[f].edges {
                let edge = &self.edges[e];
                if edge.g.is_none() && edge.num_faces() == 2 {
                    if let Some(other) = edge.other_face(f) {
                        stack.push(other);
                    }
                }
            }
        }
    }

    /// Drop tombstoned edges and faces. Only called between phases, so no
    /// live traversal can hold a stale key.
    pub fn cleanup(&mut self) {
        self.faces.retain(|_, f| !f.deleted);
        self.edges.retain(|_, e| !e.deleted);
    }

    /// Non-deleted triangles as point-id triples.
    pub fn triangle_nodes(&self) -> Vec<[i32; 3]> {
        self.faces
            .iter()
            .filter(|(_, f)| !f.deleted)
            .filter_map(|(_, f)| f.nodes(self))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bdm::parametric_area;
    use crate::geom::Degeneracy;

    fn quad_mesh() -> BdmMesh {
        // two triangles over the unit square
        let mut m = BdmMesh::new();
        for (i, (x, y)) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .into_iter()
            .enumerate()
        {
            let p = m.add_point(i as i32, DVec3::new(x, y, 0.0));
            p.uv = DVec2::new(x, y);
        }
        m.add_triangle_by_points(0, 1, 2);
        m.add_triangle_by_points(0, 2, 3);
        m
    }

    #[test]
    fn adjacency_is_bidirectional() {
        let m = quad_mesh();
        assert_eq!(m.points.len(), 4);
        assert_eq!(m.edges.len(), 5);
        assert_eq!(m.faces.len(), 2);

        let diagonal = m.find_edge(0, 2).unwrap();
        assert_eq!(m.edges[diagonal].num_faces(), 2);
        for (id, point) in &m.points {
            for &e in &point.edges {
                assert!(m.edges[e].has_endpoint(*id));
            }
        }
    }

    #[test]
    fn nodes_and_opposites() {
        let m = quad_mesh();
        let diagonal = m.find_edge(0, 2).unwrap();
        let ops = m.edges[diagonal].opposite_points(&m);
        let mut got: Vec<i32> = ops.into_iter().flatten().collect();
        got.sort();
        assert_eq!(got, vec![1, 3]);

        let f = m.edges[diagonal].faces[0];
        let nodes = m.faces[f].nodes(&m).unwrap();
        assert_eq!(m.faces[f].opposite_vertex(diagonal, &m), Some(1));
        assert!(nodes.contains(&0) && nodes.contains(&1) && nodes.contains(&2));
    }

    #[test]
    fn find_triangle_is_permutation_insensitive() {
        let m = quad_mesh();
        let e1 = m.find_edge(0, 1).unwrap();
        let e2 = m.find_edge(1, 2).unwrap();
        let e3 = m.find_edge(0, 2).unwrap();
        let f = m.find_triangle(e1, e2, e3).unwrap();
        assert_eq!(m.find_triangle(e3, e1, e2), Some(f));
        let e4 = m.find_edge(2, 3).unwrap();
        assert_eq!(m.find_triangle(e1, e2, e4), None);
    }

    #[test]
    fn delete_and_cleanup() {
        let mut m = quad_mesh();
        let diagonal = m.find_edge(0, 2).unwrap();
        let f = m.edges[diagonal].faces[0];
        m.del_face(f);
        assert!(m.faces[f].deleted);
        assert_eq!(m.edges[diagonal].num_faces(), 1);
        m.del_edge(diagonal);
        assert!(!m.points[&0].edges.contains(&diagonal));
        m.cleanup();
        assert_eq!(m.faces.len(), 1);
        assert_eq!(m.edges.len(), 4);
    }

    #[test]
    fn flood_tag_stops_at_classified_edges() {
        let mut m = quad_mesh();
        let diagonal = m.find_edge(0, 2).unwrap();
        m.edges[diagonal].g = Some(GeomRef::new(7, 1));
        let f = m.edges[diagonal].faces[0];
        m.flood_tag(f, GeomRef::new(1, 2));
        let tagged = m.faces.values().filter(|f| f.g.is_some()).count();
        assert_eq!(tagged, 1);
    }

    #[test]
    fn degenerate_corner_measures_a_trapezoid() {
        let mut a = BdmPoint::new(0, DVec3::ZERO);
        let mut b = BdmPoint::new(1, DVec3::ZERO);
        let mut c = BdmPoint::new(2, DVec3::ZERO);
        a.uv = DVec2::new(0.0, 0.0);
        b.uv = DVec2::new(1.0, 0.0);
        c.uv = DVec2::new(0.5, 1.0);

        let plain = parametric_area(&a, &b, &c).abs();
        assert!((plain - 0.5).abs() < 1.0e-14);

        // a pole at the parametric v-origin spans u like a collapsed strip
        c.degenerated = Degeneracy::U;
        let trapezoid = parametric_area(&a, &b, &c).abs();
        assert!((trapezoid - 1.0).abs() < 1.0e-14);

        a.degenerated = Degeneracy::U;
        assert_eq!(parametric_area(&a, &b, &c), 0.0);
    }
}
