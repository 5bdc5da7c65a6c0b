//! Cross-section stresses for a combination of internal forces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AnalysisError;
use crate::mesh::Mesh;
use crate::section::{shear_parameters, Section};
use crate::solver::{Element, NODE_COORDINATES};

/// Internal forces acting on the section. Forces in N, moments in N·mm.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadCase {
    /// Axial force.
    pub n: f64,
    /// Shear force along x.
    pub vx: f64,
    /// Shear force along y.
    pub vy: f64,
    /// Bending moment about the centroidal x axis.
    pub mxx: f64,
    /// Bending moment about the centroidal y axis.
    pub myy: f64,
    /// Bending moment about the 11 principal axis.
    pub m11: f64,
    /// Bending moment about the 22 principal axis.
    pub m22: f64,
    /// Torsion moment.
    pub mzz: f64,
}

impl LoadCase {
    /// Whether the load case needs the warping analysis (torsion or shear).
    #[must_use]
    pub fn needs_warping(&self) -> bool {
        self.mzz != 0.0 || self.vx != 0.0 || self.vy != 0.0
    }
}

/// Stress contributions at one node of one element, in MPa.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointStress {
    /// Axial stress from the axial force.
    pub n_zz: f64,
    /// Axial stress from `mxx`.
    pub mxx_zz: f64,
    /// Axial stress from `myy`.
    pub myy_zz: f64,
    /// Axial stress from `m11`.
    pub m11_zz: f64,
    /// Axial stress from `m22`.
    pub m22_zz: f64,
    /// Shear stress in x from torsion.
    pub mzz_zx: f64,
    /// Shear stress in y from torsion.
    pub mzz_zy: f64,
    /// Shear stress in x from `vx`.
    pub vx_zx: f64,
    /// Shear stress in y from `vx`.
    pub vx_zy: f64,
    /// Shear stress in x from `vy`.
    pub vy_zx: f64,
    /// Shear stress in y from `vy`.
    pub vy_zy: f64,
}

impl PointStress {
    /// Value of a stress component at this point.
    #[must_use]
    pub fn value(&self, component: StressComponent) -> f64 {
        use StressComponent::*;
        let m_zz = self.mxx_zz + self.myy_zz + self.m11_zz + self.m22_zz;
        let v_zx = self.vx_zx + self.vy_zx;
        let v_zy = self.vx_zy + self.vy_zy;
        let zz = self.n_zz + m_zz;
        let zx = self.mzz_zx + v_zx;
        let zy = self.mzz_zy + v_zy;
        match component {
            NZz => self.n_zz,
            MxxZz => self.mxx_zz,
            MyyZz => self.myy_zz,
            M11Zz => self.m11_zz,
            M22Zz => self.m22_zz,
            MZz => m_zz,
            MzzZx => self.mzz_zx,
            MzzZy => self.mzz_zy,
            MzzZxy => self.mzz_zx.hypot(self.mzz_zy),
            VxZx => self.vx_zx,
            VxZy => self.vx_zy,
            VxZxy => self.vx_zx.hypot(self.vx_zy),
            VyZx => self.vy_zx,
            VyZy => self.vy_zy,
            VyZxy => self.vy_zx.hypot(self.vy_zy),
            VZx => v_zx,
            VZy => v_zy,
            VZxy => v_zx.hypot(v_zy),
            Zz => zz,
            Zx => zx,
            Zy => zy,
            Zxy => zx.hypot(zy),
            Vm => (zz * zz + 3.0 * (zx * zx + zy * zy)).sqrt(),
        }
    }
}

/// Plottable stress components, named as `<action>_<component>`.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StressComponent {
    NZz,
    MxxZz,
    MyyZz,
    M11Zz,
    M22Zz,
    MZz,
    MzzZx,
    MzzZy,
    MzzZxy,
    VxZx,
    VxZy,
    VxZxy,
    VyZx,
    VyZy,
    VyZxy,
    VZx,
    VZy,
    VZxy,
    Zz,
    Zx,
    Zy,
    Zxy,
    Vm,
}

impl StressComponent {
    /// Every component with its canonical name.
    pub const ALL: [(StressComponent, &'static str); 23] = [
        (StressComponent::NZz, "n_zz"),
        (StressComponent::MxxZz, "mxx_zz"),
        (StressComponent::MyyZz, "myy_zz"),
        (StressComponent::M11Zz, "m11_zz"),
        (StressComponent::M22Zz, "m22_zz"),
        (StressComponent::MZz, "m_zz"),
        (StressComponent::MzzZx, "mzz_zx"),
        (StressComponent::MzzZy, "mzz_zy"),
        (StressComponent::MzzZxy, "mzz_zxy"),
        (StressComponent::VxZx, "vx_zx"),
        (StressComponent::VxZy, "vx_zy"),
        (StressComponent::VxZxy, "vx_zxy"),
        (StressComponent::VyZx, "vy_zx"),
        (StressComponent::VyZy, "vy_zy"),
        (StressComponent::VyZxy, "vy_zxy"),
        (StressComponent::VZx, "v_zx"),
        (StressComponent::VZy, "v_zy"),
        (StressComponent::VZxy, "v_zxy"),
        (StressComponent::Zz, "zz"),
        (StressComponent::Zx, "zx"),
        (StressComponent::Zy, "zy"),
        (StressComponent::Zxy, "zxy"),
        (StressComponent::Vm, "vm"),
    ];

    /// Canonical name, e.g. `m11_zz`.
    #[must_use]
    pub fn name(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(component, _)| *component == self)
            .map_or("vm", |(_, name)| *name)
    }

    /// Human readable description for plot titles.
    #[must_use]
    pub fn description(self) -> &'static str {
        use StressComponent::*;
        match self {
            NZz => "Axial stress from axial force",
            MxxZz => "Bending stress from Mxx",
            MyyZz => "Bending stress from Myy",
            M11Zz => "Bending stress from M11",
            M22Zz => "Bending stress from M22",
            MZz => "Bending stress from all moments",
            MzzZx | MzzZy | MzzZxy => "Torsion shear stress",
            VxZx | VxZy | VxZxy => "Shear stress from Vx",
            VyZx | VyZy | VyZxy => "Shear stress from Vy",
            VZx | VZy | VZxy => "Shear stress from all shear forces",
            Zz => "Axial stress",
            Zx | Zy | Zxy => "Shear stress",
            Vm => "von Mises stress",
        }
    }
}

impl fmt::Display for StressComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StressComponent {
    type Err = String;

    /// Parse a canonical name, a `sig_` prefixed name or a plain word such as
    /// `axial`, `shear` or `von mises`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalised = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        let key = normalised.strip_prefix("sig_").unwrap_or(&normalised);
        let alias = match key {
            "axial" | "normal" | "sigma_zz" => Some(StressComponent::Zz),
            "shear" | "tau" => Some(StressComponent::Zxy),
            "von_mises" | "vonmises" | "mises" => Some(StressComponent::Vm),
            "torsion" => Some(StressComponent::MzzZxy),
            "bending" => Some(StressComponent::MZz),
            _ => None,
        };
        alias
            .or_else(|| {
                Self::ALL
                    .iter()
                    .find(|(_, name)| *name == key)
                    .map(|(component, _)| *component)
            })
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|(_, name)| *name).collect();
                format!("unknown stress component '{value}'; expected one of {}", names.join(", "))
            })
    }
}

/// Minimum and maximum of the summary stresses over all element nodes, in MPa.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StressSummary {
    /// Largest axial stress `sig_zz`.
    pub max_axial_stress: f64,
    /// Smallest axial stress `sig_zz`.
    pub min_axial_stress: f64,
    /// Largest resultant shear stress `sig_zxy`.
    pub max_shear_stress: f64,
    /// Smallest resultant shear stress `sig_zxy`.
    pub min_shear_stress: f64,
    /// Largest von Mises stress `sig_vm`.
    pub max_von_mises_stress: f64,
    /// Smallest von Mises stress `sig_vm`.
    pub min_von_mises_stress: f64,
}

/// Stresses at every element node of a section for one load case.
#[derive(Clone, Debug)]
pub struct StressResult {
    load: LoadCase,
    values: Vec<[PointStress; 6]>,
}

impl StressResult {
    /// Load case the stresses belong to.
    #[must_use]
    pub fn load(&self) -> &LoadCase {
        &self.load
    }

    /// Stresses at the six nodes of every element, ordered like [`Mesh::elements`].
    #[must_use]
    pub fn element_stresses(&self) -> &[[PointStress; 6]] {
        &self.values
    }

    /// Range `(min, max)` of a component over all element nodes.
    #[must_use]
    pub fn range(&self, component: StressComponent) -> (f64, f64) {
        self.values
            .iter()
            .flatten()
            .map(|point| point.value(component))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
    }

    /// Extremes of the axial, resultant shear and von Mises stresses.
    #[must_use]
    pub fn summary(&self) -> StressSummary {
        let (min_axial_stress, max_axial_stress) = self.range(StressComponent::Zz);
        let (min_shear_stress, max_shear_stress) = self.range(StressComponent::Zxy);
        let (min_von_mises_stress, max_von_mises_stress) = self.range(StressComponent::Vm);
        StressSummary {
            max_axial_stress,
            min_axial_stress,
            max_shear_stress,
            min_shear_stress,
            max_von_mises_stress,
            min_von_mises_stress,
        }
    }

    /// Average of the element node values at each mesh node.
    #[must_use]
    pub fn nodal_average(&self, mesh: &Mesh, component: StressComponent) -> Vec<f64> {
        let mut sums = vec![0.0; mesh.node_count()];
        let mut counts = vec![0_u32; mesh.node_count()];
        for (nodes, stresses) in mesh.elements().iter().zip(&self.values) {
            for (&node, stress) in nodes.iter().zip(stresses) {
                sums[node] += stress.value(component);
                counts[node] += 1;
            }
        }
        sums.iter()
            .zip(&counts)
            .map(|(sum, &count)| if count == 0 { 0.0 } else { sum / f64::from(count) })
            .collect()
    }
}

impl Section {
    /// Calculate the stresses caused by `load`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::MissingGeometricProperties`] before the geometric
    /// analysis and [`AnalysisError::MissingWarpingProperties`] when the load contains
    /// torsion or shear but the warping analysis has not been run.
    pub fn calculate_stress(&self, load: &LoadCase) -> Result<StressResult, AnalysisError> {
        let props = self
            .geometric_properties()
            .ok_or(AnalysisError::MissingGeometricProperties)?;
        let warping = match (self.warping_properties(), self.warping_fields()) {
            (Some(props), Some(fields)) => Some((props, fields)),
            _ if load.needs_warping() => return Err(AnalysisError::MissingWarpingProperties),
            _ => None,
        };

        let (ixx, iyy, ixy) = (props.ixx_c, props.iyy_c, props.ixy_c);
        let determinant = props.bending_determinant();
        let mesh = self.mesh();
        let mut values = Vec::with_capacity(mesh.element_count());
        for (nodes, corners) in mesh.elements().iter().zip(mesh.triangles()) {
            let element = Element::new(corners);
            let mut element_values = [PointStress::default(); 6];
            for (stress, l) in element_values.iter_mut().zip(NODE_COORDINATES) {
                let p = element.position(l);
                let x = p.x - props.cx;
                let y = p.y - props.cy;
                let (u, v) = props.principal_coordinates(p);

                stress.n_zz = load.n / props.area;
                stress.mxx_zz = (-ixy * load.mxx * x + iyy * load.mxx * y) / determinant;
                stress.myy_zz = (-ixx * load.myy * x + ixy * load.myy * y) / determinant;
                stress.m11_zz = load.m11 / props.i11_c * v;
                stress.m22_zz = -load.m22 / props.i22_c * u;

                if let Some((warping, fields)) = warping {
                    let gradient = |values: &[f64]| element.gradient(l, nodes.map(|node| values[node]));
                    let omega = gradient(&fields.omega);
                    let psi = gradient(&fields.psi);
                    let phi = gradient(&fields.phi);

                    stress.mzz_zx = load.mzz / warping.j * (omega.0 - y);
                    stress.mzz_zy = load.mzz / warping.j * (omega.1 + x);

                    let nu = warping.nu;
                    let delta_s = 2.0 * (1.0 + nu) * determinant;
                    let (d1, d2, h1, h2) = shear_parameters(x, y, ixx, iyy, ixy);
                    stress.vx_zx = load.vx / delta_s * (psi.0 - 0.5 * nu * d1);
                    stress.vx_zy = load.vx / delta_s * (psi.1 - 0.5 * nu * d2);
                    stress.vy_zx = load.vy / delta_s * (phi.0 - 0.5 * nu * h1);
                    stress.vy_zy = load.vy / delta_s * (phi.1 - 0.5 * nu * h2);
                }
            }
            values.push(element_values);
        }

        let result = StressResult {
            load: *load,
            values,
        };
        let summary = result.summary();
        info!(
            max_axial = summary.max_axial_stress,
            max_von_mises = summary.max_von_mises_stress,
            "calculated stresses"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::{cross, point, Geometry};

    fn analysed_rectangle(b: f64, d: f64, mesh_size: f64, warping: bool) -> Section {
        let geometry = Geometry::new(
            vec![point(0.0, 0.0), point(b, 0.0), point(b, d), point(0.0, d)],
            vec![],
        )
        .expect("valid rectangle");
        let mut section = Section::new(geometry, mesh_size).expect("mesh");
        section.calculate_geometric_properties().expect("properties");
        if warping {
            section.calculate_warping_properties().expect("warping");
        }
        section
    }

    #[test]
    fn load_case_defaults_to_zero() {
        let load: LoadCase = serde_json::from_str(r#"{"m11": 5e6}"#).expect("valid load");
        assert_eq!(load.n, 0.0);
        assert_eq!(load.m11, 5.0e6);
        assert!(!load.needs_warping());
        assert!(serde_json::from_str::<LoadCase>(r#"{"torque": 1}"#).is_err());
    }

    #[test]
    fn component_names_parse() {
        assert_eq!("vm".parse::<StressComponent>(), Ok(StressComponent::Vm));
        assert_eq!("sig_zz".parse::<StressComponent>(), Ok(StressComponent::Zz));
        assert_eq!("Von Mises".parse::<StressComponent>(), Ok(StressComponent::Vm));
        assert_eq!("m11_zz".parse::<StressComponent>(), Ok(StressComponent::M11Zz));
        assert!("hoop".parse::<StressComponent>().is_err());
        for (component, name) in StressComponent::ALL {
            assert_eq!(component.name(), name);
        }
    }

    #[test]
    fn axial_and_bending_stresses_are_exact() {
        let (b, d) = (50.0, 100.0);
        let section = analysed_rectangle(b, d, 25.0, false);
        let load = LoadCase {
            n: 10_000.0,
            mxx: 1.0e6,
            ..LoadCase::default()
        };
        let result = section.calculate_stress(&load).expect("stresses");
        let z = b * d * d / 6.0;
        let (min, max) = result.range(StressComponent::Zz);
        assert_relative_eq!(max, 10_000.0 / (b * d) + 1.0e6 / z, max_relative = 1.0e-9);
        assert_relative_eq!(min, 10_000.0 / (b * d) - 1.0e6 / z, max_relative = 1.0e-9);

        let summary = result.summary();
        assert_eq!(summary.max_shear_stress, 0.0);
        assert!(summary.max_von_mises_stress >= summary.max_axial_stress.abs());
    }

    #[test]
    fn torsion_requires_warping_analysis() {
        let section = analysed_rectangle(10.0, 10.0, 5.0, false);
        let load = LoadCase {
            mzz: 1.0,
            ..LoadCase::default()
        };
        assert_eq!(
            section.calculate_stress(&load).expect_err("warping missing"),
            AnalysisError::MissingWarpingProperties
        );
    }

    #[test]
    fn transverse_shear_matches_beam_theory() {
        let (b, d) = (10.0, 100.0);
        let section = analysed_rectangle(b, d, 2.0, true);
        let vy = 1_000.0;
        let load = LoadCase {
            vy,
            ..LoadCase::default()
        };
        let result = section.calculate_stress(&load).expect("stresses");

        // Resultant of the element shear stresses equals the applied force. Corner
        // shape functions integrate to zero, midside ones to a third of the area.
        let mesh = section.mesh();
        let resultant: f64 = mesh
            .triangles()
            .zip(result.element_stresses())
            .map(|([p, q, r], stresses)| {
                let area = 0.5 * cross(p, q, r);
                area * stresses[3..].iter().map(|s| s.vy_zy).sum::<f64>() / 3.0
            })
            .sum();
        assert_relative_eq!(resultant, vy, max_relative = 0.01);

        let (_, max) = result.range(StressComponent::VyZxy);
        assert_relative_eq!(max, 1.5 * vy / (b * d), max_relative = 0.05);
    }

    #[test]
    fn nodal_average_matches_linear_field() {
        let section = analysed_rectangle(20.0, 20.0, 10.0, false);
        let load = LoadCase {
            mxx: 1.0e5,
            ..LoadCase::default()
        };
        let result = section.calculate_stress(&load).expect("stresses");
        let averaged = result.nodal_average(section.mesh(), StressComponent::MxxZz);
        let ixx = 20.0 * 20.0_f64.powi(3) / 12.0;
        for (value, p) in averaged.iter().zip(section.mesh().nodes()) {
            assert_relative_eq!(*value, 1.0e5 * (p.y - 10.0) / ixx, epsilon = 1.0e-9);
        }
    }
}
