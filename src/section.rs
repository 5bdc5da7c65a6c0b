//! Meshed cross-section and its analyses.

use tracing::info;

use crate::errors::{AnalysisError, MeshError};
use crate::geometry::Geometry;
use crate::mesh::Mesh;
use crate::properties::{geometric_properties, GeometricProperties, WarpingProperties};
use crate::solver::{assemble_stiffness, multiply, pin_node, ConjugateGradient, Element, QUADRATURE};

/// Nodal solutions of the warping and shear function problems.
#[derive(Clone, Debug)]
pub(crate) struct WarpingFields {
    /// Warping function about the centroid.
    pub omega: Vec<f64>,
    /// Shear function for loads along x.
    pub psi: Vec<f64>,
    /// Shear function for loads along y.
    pub phi: Vec<f64>,
}

/// A meshed geometry ready for analysis.
///
/// Results are cached: each `calculate_*` call computes its property set once and
/// returns the stored value afterwards.
#[derive(Clone, Debug)]
pub struct Section {
    geometry: Geometry,
    mesh: Mesh,
    geometric: Option<GeometricProperties>,
    warping: Option<(WarpingProperties, WarpingFields)>,
}

impl Section {
    /// Mesh `geometry` with elements no larger than `mesh_size` mm².
    ///
    /// # Errors
    ///
    /// Returns [`MeshError`] when the geometry cannot be meshed.
    ///
    /// # Examples
    /// ```
    /// use sectionx::{i_section, ISection, Section};
    ///
    /// let geometry = i_section(&ISection {
    ///     d: 200.0, b: 100.0, t_f: 8.5, t_w: 5.6, r: 12.0, n_r: 6,
    /// }).unwrap();
    /// let mut section = Section::new(geometry, 20.0).unwrap();
    /// let props = section.calculate_geometric_properties().unwrap();
    /// assert!(props.ixx_c > props.iyy_c);
    /// ```
    pub fn new(geometry: Geometry, mesh_size: f64) -> Result<Self, MeshError> {
        let mesh = Mesh::generate(&geometry, mesh_size)?;
        Ok(Self {
            geometry,
            mesh,
            geometric: None,
            warping: None,
        })
    }

    /// Geometry the section was meshed from.
    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Finite element mesh.
    #[must_use]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Geometric properties, when calculated.
    #[must_use]
    pub fn geometric_properties(&self) -> Option<&GeometricProperties> {
        self.geometric.as_ref()
    }

    /// Warping properties, when calculated.
    #[must_use]
    pub fn warping_properties(&self) -> Option<&WarpingProperties> {
        self.warping.as_ref().map(|(props, _)| props)
    }

    pub(crate) fn warping_fields(&self) -> Option<&WarpingFields> {
        self.warping.as_ref().map(|(_, fields)| fields)
    }

    /// Calculate area, centroid, second moments, section moduli and plastic properties.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Degenerate`] for sections without area or stiffness.
    pub fn calculate_geometric_properties(&mut self) -> Result<&GeometricProperties, AnalysisError> {
        if self.geometric.is_none() {
            let props = geometric_properties(&self.geometry, &self.mesh)?;
            info!(
                area = props.area,
                ixx_c = props.ixx_c,
                iyy_c = props.iyy_c,
                "calculated geometric properties"
            );
            self.geometric = Some(props);
        }
        self.geometric
            .as_ref()
            .ok_or(AnalysisError::MissingGeometricProperties)
    }

    /// Solve the warping and shear function problems and derive the torsion
    /// constant, shear centre and warping constant.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::MissingGeometricProperties`] when the geometric
    /// properties have not been calculated and [`AnalysisError::NotConverged`] when a
    /// solve fails.
    pub fn calculate_warping_properties(&mut self) -> Result<&WarpingProperties, AnalysisError> {
        if self.warping.is_none() {
            let geometric = self
                .geometric
                .as_ref()
                .ok_or(AnalysisError::MissingGeometricProperties)?;
            let nu = self.geometry.material.poissons_ratio;
            let solved = solve_warping(&self.mesh, geometric, nu)?;
            info!(
                j = solved.0.j,
                gamma = solved.0.gamma,
                x_st = solved.0.x_st,
                y_st = solved.0.y_st,
                "calculated warping properties"
            );
            self.warping = Some(solved);
        }
        self.warping
            .as_ref()
            .map(|(props, _)| props)
            .ok_or(AnalysisError::MissingWarpingProperties)
    }
}

fn solve_warping(
    mesh: &Mesh,
    props: &GeometricProperties,
    nu: f64,
) -> Result<(WarpingProperties, WarpingFields), AnalysisError> {
    let n = mesh.node_count();
    let (ixx, iyy, ixy) = (props.ixx_c, props.iyy_c, props.ixy_c);
    let stiffness = assemble_stiffness(mesh);

    let mut f_omega = vec![0.0; n];
    let mut f_psi = vec![0.0; n];
    let mut f_phi = vec![0.0; n];
    for (nodes, corners) in mesh.elements().iter().zip(mesh.triangles()) {
        let element = Element::new(corners);
        for (l, weight) in QUADRATURE {
            let w = weight * element.area;
            let p = element.position(l);
            let (x, y) = (p.x - props.cx, p.y - props.cy);
            let (d1, d2, h1, h2) = shear_parameters(x, y, ixx, iyy, ixy);
            let shape = Element::shape(l);
            let gradients = element.shape_gradients(l);
            for i in 0..6 {
                let (bx, by) = gradients[i];
                f_omega[nodes[i]] += w * (bx * y - by * x);
                f_psi[nodes[i]] += w
                    * (0.5 * nu * (bx * d1 + by * d2)
                        + 2.0 * (1.0 + nu) * shape[i] * (ixx * x - ixy * y));
                f_phi[nodes[i]] += w
                    * (0.5 * nu * (bx * h1 + by * h2)
                        + 2.0 * (1.0 + nu) * shape[i] * (iyy * y - ixy * x));
            }
        }
    }

    let pinned = pin_node(&stiffness, 0);
    let solver = ConjugateGradient::new();
    let solve = |mut load: Vec<f64>, problem: &'static str| {
        load[0] = 0.0;
        solver.solve(&pinned, &load, problem)
    };
    let omega = solve(f_omega, "warping function")?;

    let k_omega = multiply(&stiffness, &omega);
    let omega_energy: f64 = omega.iter().zip(&k_omega).map(|(a, b)| a * b).sum();
    let j = ixx + iyy - omega_energy;
    if j <= 0.0 {
        return Err(AnalysisError::Degenerate("torsion constant is not positive"));
    }

    let mut q_omega = 0.0;
    let mut i_omega = 0.0;
    let mut i_xomega = 0.0;
    let mut i_yomega = 0.0;
    for (nodes, corners) in mesh.elements().iter().zip(mesh.triangles()) {
        let element = Element::new(corners);
        let values = nodes.map(|node| omega[node]);
        for (l, weight) in QUADRATURE {
            let w = weight * element.area;
            let p = element.position(l);
            let value = Element::interpolate(l, values);
            q_omega += w * value;
            i_omega += w * value * value;
            i_xomega += w * (p.x - props.cx) * value;
            i_yomega += w * (p.y - props.cy) * value;
        }
    }
    let determinant = props.bending_determinant();
    let x_offset = (ixy * i_xomega - iyy * i_yomega) / determinant;
    let y_offset = (ixx * i_xomega - ixy * i_yomega) / determinant;
    let gamma = i_omega - q_omega * q_omega / props.area - y_offset * i_xomega + x_offset * i_yomega;

    let psi = solve(f_psi, "shear function psi")?;
    let phi = solve(f_phi, "shear function phi")?;

    Ok((
        WarpingProperties {
            j,
            gamma,
            x_st: props.cx + x_offset,
            y_st: props.cy + y_offset,
            x_s_offset: x_offset,
            y_s_offset: y_offset,
            nu,
        },
        WarpingFields { omega, psi, phi },
    ))
}

/// Polynomial terms `(d1, d2, h1, h2)` of the shear function boundary
/// conditions at centroidal coordinates `(x, y)`.
pub(crate) fn shear_parameters(x: f64, y: f64, ixx: f64, iyy: f64, ixy: f64) -> (f64, f64, f64, f64) {
    let r = x * x - y * y;
    let q = 2.0 * x * y;
    (
        ixx * r - ixy * q,
        ixy * r + ixx * q,
        -ixy * r + iyy * q,
        -iyy * r - ixy * q,
    )
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::point;
    use crate::library::{channel_section, circular_hollow_section, i_section, CircularHollow, ISection};

    fn rectangle(b: f64, d: f64, mesh_size: f64) -> Section {
        let geometry = Geometry::new(
            vec![point(0.0, 0.0), point(b, 0.0), point(b, d), point(0.0, d)],
            vec![],
        )
        .expect("valid rectangle");
        Section::new(geometry, mesh_size).expect("mesh")
    }

    /// Series solution for the torsion constant of a solid `b` by `d` rectangle, `b <= d`.
    fn rectangle_torsion_constant(b: f64, d: f64) -> f64 {
        let series: f64 = (0..50)
            .map(|k| {
                let n = (2 * k + 1) as f64;
                (n * PI * d / (2.0 * b)).tanh() / n.powi(5)
            })
            .sum();
        b.powi(3) * d / 3.0 * (1.0 - 192.0 * b / (PI.powi(5) * d) * series)
    }

    #[test]
    fn warping_requires_geometric_properties() {
        let mut section = rectangle(10.0, 20.0, 10.0);
        assert_eq!(
            section.calculate_warping_properties().expect_err("order enforced"),
            AnalysisError::MissingGeometricProperties
        );
    }

    #[test]
    fn rectangle_torsion_constant_matches_series() {
        let mut section = rectangle(20.0, 60.0, 2.0);
        section.calculate_geometric_properties().expect("properties");
        let polar = {
            let props = section.geometric_properties().expect("cached");
            props.ixx_c + props.iyy_c
        };
        let warping = section.calculate_warping_properties().expect("warping");
        let expected = rectangle_torsion_constant(20.0, 60.0);
        assert!(warping.j < polar);
        assert_relative_eq!(warping.j, expected, max_relative = 0.01);
        assert_relative_eq!(warping.x_st, 10.0, epsilon = 0.5);
        assert_relative_eq!(warping.y_st, 30.0, epsilon = 0.5);
    }

    #[test]
    fn circular_hollow_torsion_constant_is_polar_moment() {
        let geometry = circular_hollow_section(&CircularHollow {
            d: 100.0,
            t: 5.0,
            n: 64,
        })
        .expect("valid section");
        let mut section = Section::new(geometry, 5.0).expect("mesh");
        let polar = {
            let props = section.calculate_geometric_properties().expect("properties");
            props.ixx_c + props.iyy_c
        };
        let warping = section.calculate_warping_properties().expect("warping");
        assert!(warping.j <= polar * (1.0 + 1.0e-9));
        assert_relative_eq!(warping.j, polar, max_relative = 0.01);
        assert!(warping.gamma.abs() < 1.0e-3 * polar * 50.0 * 50.0);
    }

    #[test]
    fn doubly_symmetric_shear_centre_is_centroid() {
        let geometry = i_section(&ISection {
            d: 200.0,
            b: 100.0,
            t_f: 8.5,
            t_w: 5.6,
            r: 0.0,
            n_r: 1,
        })
        .expect("valid section");
        let mut section = Section::new(geometry, 10.0).expect("mesh");
        let (cx, cy) = {
            let props = section.calculate_geometric_properties().expect("properties");
            (props.cx, props.cy)
        };
        let warping = section.calculate_warping_properties().expect("warping");
        assert_relative_eq!(warping.x_st, cx, epsilon = 0.5);
        assert_relative_eq!(warping.y_st, cy, epsilon = 0.5);
        assert!(warping.gamma > 0.0);
    }

    #[test]
    fn channel_shear_centre_lies_behind_web() {
        let geometry = channel_section(&ISection {
            d: 200.0,
            b: 75.0,
            t_f: 12.0,
            t_w: 6.0,
            r: 0.0,
            n_r: 1,
        })
        .expect("valid section");
        let mut section = Section::new(geometry, 10.0).expect("mesh");
        section.calculate_geometric_properties().expect("properties");
        let warping = section.calculate_warping_properties().expect("warping");
        assert!(warping.x_st < 0.0);
        assert_relative_eq!(warping.y_st, 100.0, epsilon = 0.5);
    }

    #[test]
    fn results_are_cached() {
        let mut section = rectangle(10.0, 10.0, 5.0);
        let first = section.calculate_geometric_properties().expect("properties").clone();
        let second = section.calculate_geometric_properties().expect("properties").clone();
        assert_eq!(first, second);
        assert!(section.warping_properties().is_none());
    }
}
