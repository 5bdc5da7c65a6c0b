//! Quadratic triangle elements, sparse assembly and the iterative solver used by
//! the warping analysis.

use sprs::{CsMat, TriMat};
use tracing::debug;

use crate::errors::AnalysisError;
use crate::geometry::{cross, Point};
use crate::mesh::Mesh;

/// Six-point rule exact for polynomials up to degree four: area coordinates of
/// each point and the fraction of the element area it carries.
pub(crate) const QUADRATURE: [([f64; 3], f64); 6] = [
    (
        [0.108_103_018_168_070, 0.445_948_490_915_965, 0.445_948_490_915_965],
        0.223_381_589_678_011,
    ),
    (
        [0.445_948_490_915_965, 0.108_103_018_168_070, 0.445_948_490_915_965],
        0.223_381_589_678_011,
    ),
    (
        [0.445_948_490_915_965, 0.445_948_490_915_965, 0.108_103_018_168_070],
        0.223_381_589_678_011,
    ),
    (
        [0.816_847_572_980_459, 0.091_576_213_509_771, 0.091_576_213_509_771],
        0.109_951_743_655_322,
    ),
    (
        [0.091_576_213_509_771, 0.816_847_572_980_459, 0.091_576_213_509_771],
        0.109_951_743_655_322,
    ),
    (
        [0.091_576_213_509_771, 0.091_576_213_509_771, 0.816_847_572_980_459],
        0.109_951_743_655_322,
    ),
];

/// Area coordinates of the six element nodes.
pub(crate) const NODE_COORDINATES: [[f64; 3]; 6] = [
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.5, 0.5, 0.0],
    [0.0, 0.5, 0.5],
    [0.5, 0.0, 0.5],
];

/// Straight-sided six-node triangle.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Element {
    /// Element area in mm².
    pub area: f64,
    corners: [Point; 3],
    /// Gradients of the three area coordinates.
    coordinate_gradients: [(f64, f64); 3],
}

impl Element {
    pub(crate) fn new(corners: [Point; 3]) -> Self {
        let [a, b, c] = corners;
        let twice_area = cross(a, b, c);
        Self {
            area: 0.5 * twice_area,
            corners,
            coordinate_gradients: [
                ((b.y - c.y) / twice_area, (c.x - b.x) / twice_area),
                ((c.y - a.y) / twice_area, (a.x - c.x) / twice_area),
                ((a.y - b.y) / twice_area, (b.x - a.x) / twice_area),
            ],
        }
    }

    /// Physical position of the point with area coordinates `l`.
    pub(crate) fn position(&self, l: [f64; 3]) -> Point {
        let x: f64 = (0..3).map(|i| l[i] * self.corners[i].x).sum();
        let y: f64 = (0..3).map(|i| l[i] * self.corners[i].y).sum();
        Point::new(x, y)
    }

    /// Shape functions at area coordinates `l`.
    pub(crate) fn shape(l: [f64; 3]) -> [f64; 6] {
        [
            l[0] * (2.0 * l[0] - 1.0),
            l[1] * (2.0 * l[1] - 1.0),
            l[2] * (2.0 * l[2] - 1.0),
            4.0 * l[0] * l[1],
            4.0 * l[1] * l[2],
            4.0 * l[2] * l[0],
        ]
    }

    /// Cartesian shape function gradients at area coordinates `l`.
    pub(crate) fn shape_gradients(&self, l: [f64; 3]) -> [(f64, f64); 6] {
        let g = self.coordinate_gradients;
        let corner = |i: usize| {
            let f = 4.0 * l[i] - 1.0;
            (f * g[i].0, f * g[i].1)
        };
        let middle = |i: usize, j: usize| {
            (
                4.0 * (l[i] * g[j].0 + l[j] * g[i].0),
                4.0 * (l[i] * g[j].1 + l[j] * g[i].1),
            )
        };
        [
            corner(0),
            corner(1),
            corner(2),
            middle(0, 1),
            middle(1, 2),
            middle(2, 0),
        ]
    }

    /// Value of a field with the given nodal values.
    pub(crate) fn interpolate(l: [f64; 3], values: [f64; 6]) -> f64 {
        Self::shape(l).iter().zip(values).map(|(n, v)| n * v).sum()
    }

    /// Gradient of a field with the given nodal values.
    pub(crate) fn gradient(&self, l: [f64; 3], values: [f64; 6]) -> (f64, f64) {
        self.shape_gradients(l)
            .iter()
            .zip(values)
            .fold((0.0, 0.0), |(gx, gy), ((dx, dy), v)| (gx + dx * v, gy + dy * v))
    }

    /// Element Laplacian stiffness `∫ B^T B dA`.
    pub(crate) fn stiffness(&self) -> [[f64; 6]; 6] {
        let mut k = [[0.0; 6]; 6];
        for (l, weight) in QUADRATURE {
            let b = self.shape_gradients(l);
            let w = weight * self.area;
            for (i, row) in k.iter_mut().enumerate() {
                for (j, value) in row.iter_mut().enumerate() {
                    *value += w * (b[i].0 * b[j].0 + b[i].1 * b[j].1);
                }
            }
        }
        k
    }
}

/// Assemble the global Laplacian stiffness matrix of `mesh`.
pub(crate) fn assemble_stiffness(mesh: &Mesh) -> CsMat<f64> {
    let n = mesh.node_count();
    let mut triplets = TriMat::with_capacity((n, n), 36 * mesh.element_count());
    for (nodes, corners) in mesh.elements().iter().zip(mesh.triangles()) {
        let k = Element::new(corners).stiffness();
        for i in 0..6 {
            for j in 0..6 {
                triplets.add_triplet(nodes[i], nodes[j], k[i][j]);
            }
        }
    }
    triplets.to_csr()
}

/// Fix `node` to zero by replacing its row and column with the identity.
///
/// Removes the constant null space of a pure Neumann problem.
pub(crate) fn pin_node(matrix: &CsMat<f64>, node: usize) -> CsMat<f64> {
    let n = matrix.rows();
    let mut triplets = TriMat::with_capacity((n, n), matrix.nnz());
    for (row, values) in matrix.outer_iterator().enumerate() {
        if row == node {
            triplets.add_triplet(row, row, 1.0);
            continue;
        }
        for (col, &value) in values.iter() {
            if col != node {
                triplets.add_triplet(row, col, value);
            }
        }
    }
    triplets.to_csr()
}

/// `matrix * x` for a CSR matrix.
pub(crate) fn multiply(matrix: &CsMat<f64>, x: &[f64]) -> Vec<f64> {
    matrix
        .outer_iterator()
        .map(|row| row.iter().map(|(col, &value)| value * x[col]).sum())
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Jacobi preconditioned conjugate gradient for symmetric positive definite systems.
#[derive(Clone, Debug)]
pub struct ConjugateGradient {
    max_iterations: usize,
    tolerance: f64,
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        Self::new()
    }
}

impl ConjugateGradient {
    /// Solver with a relative residual tolerance of `1e-10`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_iterations: 20_000,
            tolerance: 1.0e-10,
        }
    }

    /// Solve `a x = b`. `problem` names the system in logs and errors.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NotConverged`] when the residual does not drop below the
    /// tolerance within the iteration limit.
    pub fn solve(
        &self,
        a: &CsMat<f64>,
        b: &[f64],
        problem: &'static str,
    ) -> Result<Vec<f64>, AnalysisError> {
        let n = b.len();
        let b_norm = dot(b, b).sqrt();
        if b_norm == 0.0 {
            return Ok(vec![0.0; n]);
        }

        let inverse_diagonal: Vec<f64> = (0..n)
            .map(|i| match a.get(i, i) {
                Some(&d) if d > 0.0 => 1.0 / d,
                _ => 1.0,
            })
            .collect();
        let precondition =
            |r: &[f64]| -> Vec<f64> { r.iter().zip(&inverse_diagonal).map(|(r, d)| r * d).collect() };

        let mut x = vec![0.0; n];
        let mut r = b.to_vec();
        let mut z = precondition(&r);
        let mut p = z.clone();
        let mut rz = dot(&r, &z);
        let mut residual = 1.0;

        for iteration in 1..=self.max_iterations {
            let ap = multiply(a, &p);
            let p_ap = dot(&p, &ap);
            if p_ap.abs() < f64::MIN_POSITIVE {
                break;
            }
            let alpha = rz / p_ap;
            for i in 0..n {
                x[i] += alpha * p[i];
                r[i] -= alpha * ap[i];
            }
            residual = dot(&r, &r).sqrt() / b_norm;
            if residual < self.tolerance {
                debug!(problem, iterations = iteration, residual, "conjugate gradient converged");
                return Ok(x);
            }
            z = precondition(&r);
            let rz_next = dot(&r, &z);
            let beta = rz_next / rz;
            rz = rz_next;
            for i in 0..n {
                p[i] = z[i] + beta * p[i];
            }
        }

        Err(AnalysisError::NotConverged {
            problem,
            iterations: self.max_iterations,
            residual,
        })
    }
}

#[cfg(test)]
impl ConjugateGradient {
    fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}
