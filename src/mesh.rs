//! Quadratic triangle meshes for section geometries.
//!
//! The outline and the holes become constraint edges of a Delaunay
//! triangulation, which is refined until every triangle is smaller than the
//! requested size and has no angle below [`MIN_ANGLE`]. Triangles outside the
//! outline or inside a hole are dropped. Every remaining triangle then gets a
//! node at the middle of each edge, shared with the neighbour across that edge.

use std::collections::HashMap;

use petgraph::algo::connected_components;
use petgraph::graph::UnGraph;
use spade::{
    AngleLimit, ConstrainedDelaunayTriangulation, Point2, RefinementParameters, Triangulation,
};
use tracing::debug;

use crate::errors::MeshError;
use crate::geometry::{cross, Geometry, Point};

/// Upper bound on the number of elements a single mesh may contain.
pub const MAX_ELEMENTS: usize = 250_000;

/// Upper bound on the number of boundary points of a meshed geometry.
pub const MAX_BOUNDARY_NODES: usize = 20_000;

/// Smallest interior angle in degrees the refinement allows.
pub const MIN_ANGLE: f64 = 25.0;

type Cdt = ConstrainedDelaunayTriangulation<Point2<f64>>;

/// Corner triangles of each element, as local node indices, used to draw
/// quadratic elements with four flat pieces.
pub(crate) const SUBTRIANGLES: [[usize; 3]; 4] = [[0, 3, 5], [3, 1, 4], [5, 4, 2], [3, 4, 5]];

/// Conforming mesh of six-node triangles.
///
/// Element nodes are stored as the three counter-clockwise corners followed by
/// the midpoints of edges 0-1, 1-2 and 2-0.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Node coordinates in millimetres.
    nodes: Vec<Point>,
    /// Node indices of each element.
    elements: Vec<[usize; 6]>,
    /// Maximum element area requested when the mesh was generated.
    mesh_size: f64,
}

impl Mesh {
    /// Mesh `geometry` so that no element exceeds `mesh_size` mm² in area.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError`] when the size is invalid, the outline cannot be
    /// triangulated or the mesh would be too large.
    ///
    /// # Examples
    /// ```
    /// use sectionx::{point, Geometry, Mesh};
    ///
    /// let square = vec![point(0.0, 0.0), point(10.0, 0.0), point(10.0, 10.0), point(0.0, 10.0)];
    /// let geometry = Geometry::new(square, vec![]).unwrap();
    /// let mesh = Mesh::generate(&geometry, 5.0).unwrap();
    /// assert!(mesh.element_count() >= 20);
    /// assert!(mesh.min_angle() >= 20.0);
    /// ```
    pub fn generate(geometry: &Geometry, mesh_size: f64) -> Result<Self, MeshError> {
        if !(mesh_size > 0.0 && mesh_size.is_finite()) {
            return Err(MeshError::InvalidMeshSize(mesh_size));
        }
        let boundary_nodes =
            geometry.outer().len() + geometry.holes().iter().map(Vec::len).sum::<usize>();
        if boundary_nodes > MAX_BOUNDARY_NODES {
            return Err(MeshError::TooManyBoundaryNodes {
                count: boundary_nodes,
                max: MAX_BOUNDARY_NODES,
            });
        }
        if geometry.area() / mesh_size > MAX_ELEMENTS as f64 {
            return Err(MeshError::TooManyElements(MAX_ELEMENTS));
        }

        let mut cdt = Cdt::new();
        add_ring(&mut cdt, geometry.outer())?;
        for hole in geometry.holes() {
            add_ring(&mut cdt, hole)?;
        }

        let refinement = cdt.refine(
            RefinementParameters::<f64>::new()
                .exclude_outer_faces(true)
                .with_angle_limit(AngleLimit::from_deg(MIN_ANGLE))
                .with_max_allowed_area(mesh_size)
                .with_max_additional_vertices(MAX_ELEMENTS / 2),
        );
        if !refinement.refinement_complete {
            return Err(MeshError::TooManyElements(MAX_ELEMENTS));
        }

        let mut corners = vec![Point::new(0.0, 0.0); cdt.num_vertices()];
        for vertex in cdt.vertices() {
            let position = vertex.position();
            corners[vertex.fix().index()] = Point::new(position.x, position.y);
        }
        let mut triangles = Vec::with_capacity(cdt.num_inner_faces());
        for face in cdt.inner_faces() {
            if refinement.excluded_faces.contains(&face.fix()) {
                continue;
            }
            let [a, b, c] = face.vertices().map(|vertex| vertex.fix().index());
            if cross(corners[a], corners[b], corners[c]) >= 0.0 {
                triangles.push([a, b, c]);
            } else {
                triangles.push([a, c, b]);
            }
        }
        if triangles.len() > MAX_ELEMENTS {
            return Err(MeshError::TooManyElements(MAX_ELEMENTS));
        }

        let mesh = Self::quadratic(corners, triangles, mesh_size);
        mesh.check_connected()?;
        debug!(
            nodes = mesh.node_count(),
            elements = mesh.element_count(),
            min_angle = mesh.min_angle(),
            mesh_size,
            "generated mesh"
        );
        Ok(mesh)
    }

    /// Renumber the corners used by `triangles` and add one shared node per edge.
    fn quadratic(corners: Vec<Point>, triangles: Vec<[usize; 3]>, mesh_size: f64) -> Self {
        let mut remap = vec![usize::MAX; corners.len()];
        let mut nodes = Vec::with_capacity(4 * triangles.len());
        let mut renumbered = Vec::with_capacity(triangles.len());
        for triangle in triangles {
            let mut mapped = [0; 3];
            for (slot, &corner) in mapped.iter_mut().zip(triangle.iter()) {
                if remap[corner] == usize::MAX {
                    remap[corner] = nodes.len();
                    nodes.push(corners[corner]);
                }
                *slot = remap[corner];
            }
            renumbered.push(mapped);
        }

        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
        let mut elements = Vec::with_capacity(renumbered.len());
        for [a, b, c] in renumbered {
            let mut element = [a, b, c, 0, 0, 0];
            for (slot, (p, q)) in [(a, b), (b, c), (c, a)].into_iter().enumerate() {
                let key = edge_key(p, q);
                element[3 + slot] = match midpoints.get(&key) {
                    Some(&node) => node,
                    None => {
                        let node = nodes.len();
                        nodes.push(nodes[p].midpoint(nodes[q]));
                        midpoints.insert(key, node);
                        node
                    }
                };
            }
            elements.push(element);
        }

        Self {
            nodes,
            elements,
            mesh_size,
        }
    }

    /// Verify that the elements form one edge-connected region.
    fn check_connected(&self) -> Result<(), MeshError> {
        let mut graph = UnGraph::<(), ()>::with_capacity(self.nodes.len(), 6 * self.elements.len());
        let indices: Vec<_> = self.nodes.iter().map(|_| graph.add_node(())).collect();
        for element in &self.elements {
            for (corner, middle) in [(0, 3), (1, 4), (2, 5)] {
                graph.add_edge(indices[element[corner]], indices[element[middle]], ());
                graph.add_edge(indices[element[middle]], indices[element[(corner + 1) % 3]], ());
            }
        }
        match connected_components(&graph) {
            1 => Ok(()),
            regions => Err(MeshError::Disconnected(regions)),
        }
    }

    /// Node coordinates, corners and edge midpoints.
    #[must_use]
    pub fn nodes(&self) -> &[Point] {
        &self.nodes
    }

    /// Element connectivity: three corners, then the edge midpoints.
    #[must_use]
    pub fn elements(&self) -> &[[usize; 6]] {
        &self.elements
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of elements.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Requested maximum element area in mm².
    #[must_use]
    pub fn mesh_size(&self) -> f64 {
        self.mesh_size
    }

    /// Corner coordinates of element `index`.
    #[must_use]
    pub fn element_points(&self, index: usize) -> [Point; 3] {
        let [a, b, c, ..] = self.elements[index];
        [self.nodes[a], self.nodes[b], self.nodes[c]]
    }

    /// Iterate over the corner coordinates of every element.
    pub fn triangles(&self) -> impl Iterator<Item = [Point; 3]> + '_ {
        (0..self.elements.len()).map(|index| self.element_points(index))
    }

    /// Sum of the element areas in mm².
    #[must_use]
    pub fn area(&self) -> f64 {
        self.triangles()
            .map(|[a, b, c]| 0.5 * cross(a, b, c))
            .sum()
    }

    /// Smallest interior angle over all elements, in degrees.
    #[must_use]
    pub fn min_angle(&self) -> f64 {
        self.triangles()
            .map(smallest_angle)
            .fold(f64::INFINITY, f64::min)
    }
}

/// Insert a closed ring as constraint edges.
fn add_ring(cdt: &mut Cdt, ring: &[Point]) -> Result<(), MeshError> {
    let mut handles = Vec::with_capacity(ring.len());
    for p in ring {
        let handle = cdt
            .insert(Point2::new(p.x, p.y))
            .map_err(|_| MeshError::InvalidVertex { x: p.x, y: p.y })?;
        handles.push(handle);
    }
    for (i, &from) in handles.iter().enumerate() {
        let to = handles[(i + 1) % handles.len()];
        if from == to {
            continue;
        }
        if !cdt.can_add_constraint(from, to) {
            return Err(MeshError::CrossingBoundary);
        }
        cdt.add_constraint(from, to);
    }
    Ok(())
}

/// Sorted key identifying an undirected edge.
fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn smallest_angle([a, b, c]: [Point; 3]) -> f64 {
    let angle = |p: Point, q: Point, r: Point| {
        let u = q.to_vector() - p.to_vector();
        let v = r.to_vector() - p.to_vector();
        u.angle(&v).to_degrees()
    };
    angle(a, b, c).min(angle(b, c, a)).min(angle(c, a, b))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::{point, ring_area, ring_perimeter};
    use crate::library::{circular_hollow_section, i_section, CircularHollow, ISection};

    fn rectangle(b: f64, d: f64) -> Geometry {
        Geometry::new(
            vec![point(0.0, 0.0), point(b, 0.0), point(b, d), point(0.0, d)],
            vec![],
        )
        .expect("valid rectangle")
    }

    /// Checks that interior edges are shared by exactly two elements, that the
    /// free edges trace the boundary and that midside nodes sit on their edges.
    fn assert_conforming(mesh: &Mesh, geometry: &Geometry) {
        let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
        for element in mesh.elements() {
            for (corner, middle) in [(0, 3), (1, 4), (2, 5)] {
                let (p, q) = (element[corner], element[(corner + 1) % 3]);
                *counts.entry(edge_key(p, q)).or_default() += 1;
                let expected = mesh.nodes()[p].midpoint(mesh.nodes()[q]);
                assert!(mesh.nodes()[element[middle]].distance_squared(expected) < 1.0e-20);
            }
        }
        assert!(counts.values().all(|&count| count <= 2));
        let free_length: f64 = counts
            .iter()
            .filter(|(_, &count)| count == 1)
            .map(|(&(p, q), _)| mesh.nodes()[p].distance_squared(mesh.nodes()[q]).sqrt())
            .sum();
        let boundary_length = ring_perimeter(geometry.outer())
            + geometry.holes().iter().map(|h| ring_perimeter(h)).sum::<f64>();
        assert_relative_eq!(free_length, boundary_length, max_relative = 1.0e-9);
    }

    #[test]
    fn rectangle_mesh_respects_size_limit() {
        let geometry = rectangle(100.0, 10.0);
        let mesh = Mesh::generate(&geometry, 10.0).expect("mesh generated");
        assert_relative_eq!(mesh.area(), 1_000.0, max_relative = 1.0e-12);
        for [a, b, c] in mesh.triangles() {
            let area = 0.5 * cross(a, b, c);
            assert!(area > 0.0);
            assert!(area <= 10.0 + 1.0e-9);
        }
        assert!(mesh.element_count() >= 100);
        assert!(mesh.min_angle() >= 20.0);
        assert_conforming(&mesh, &geometry);
    }

    #[test]
    fn hollow_section_mesh_excludes_hole() {
        let geometry = circular_hollow_section(&CircularHollow {
            d: 100.0,
            t: 6.0,
            n: 48,
        })
        .expect("valid section");
        let mesh = Mesh::generate(&geometry, 5.0).expect("mesh generated");
        assert_relative_eq!(mesh.area(), geometry.area(), max_relative = 1.0e-9);
        for [a, b, c] in mesh.triangles() {
            let centroid = point((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0);
            assert!(centroid.x.hypot(centroid.y) > 44.0 - 0.5);
        }
        assert_conforming(&mesh, &geometry);
    }

    #[test]
    fn i_section_mesh_has_no_slivers() {
        let geometry = i_section(&ISection {
            d: 300.0,
            b: 300.0,
            t_f: 19.0,
            t_w: 11.0,
            r: 27.0,
            n_r: 10,
        })
        .expect("valid section");
        let mesh = Mesh::generate(&geometry, 10.0).expect("mesh generated");
        assert_relative_eq!(mesh.area(), ring_area(geometry.outer()), max_relative = 1.0e-9);
        assert!(mesh.element_count() > 1_490);
        assert!(mesh.min_angle() >= 20.0, "min angle {}", mesh.min_angle());
        assert_conforming(&mesh, &geometry);
    }

    #[test]
    fn elements_carry_shared_midside_nodes() {
        let mesh = Mesh::generate(&rectangle(20.0, 20.0), 50.0).expect("mesh generated");
        let corners: std::collections::HashSet<usize> = mesh
            .elements()
            .iter()
            .flat_map(|element| element[..3].to_vec())
            .collect();
        // Euler: midside nodes = edges = corners + faces - 1 for a disc.
        let midsides = mesh.node_count() - corners.len();
        assert_eq!(midsides, corners.len() + mesh.element_count() - 1);
    }

    #[test]
    fn invalid_mesh_size_is_rejected() {
        let error = Mesh::generate(&rectangle(1.0, 1.0), 0.0).expect_err("zero size rejected");
        assert_eq!(error, MeshError::InvalidMeshSize(0.0));
    }

    #[test]
    fn oversized_refinement_is_rejected() {
        let error =
            Mesh::generate(&rectangle(1_000.0, 1_000.0), 1.0).expect_err("too many elements");
        assert_eq!(error, MeshError::TooManyElements(MAX_ELEMENTS));
    }

    #[test]
    fn dense_outline_is_rejected_before_triangulation() {
        let n = MAX_BOUNDARY_NODES + 1;
        let circle = (0..n)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / n as f64;
                point(1_000.0 * angle.cos(), 1_000.0 * angle.sin())
            })
            .collect();
        let geometry = Geometry::new(circle, vec![]).expect("valid ring");
        let error = Mesh::generate(&geometry, 10.0).expect_err("too many points");
        assert_eq!(
            error,
            MeshError::TooManyBoundaryNodes {
                count: n,
                max: MAX_BOUNDARY_NODES
            }
        );
    }

    #[test]
    fn crossing_outline_is_rejected() {
        let bow_tie = vec![point(0.0, 0.0), point(10.0, 10.0), point(10.0, 0.0), point(0.0, 4.0)];
        let geometry = Geometry::new(bow_tie, vec![]).expect("non-zero signed area");
        assert_eq!(
            Mesh::generate(&geometry, 5.0).expect_err("self intersecting"),
            MeshError::CrossingBoundary
        );
    }
}
