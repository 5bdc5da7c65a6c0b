//! Geometric and warping property sets of an analysed section.
//!
//! Property names follow the conventions engineers know from `sectionproperties`
//! (`ixx_c`, `zxx_plus`, `sf_yy_minus`, ...) because they are handed to the model
//! verbatim. Values that cannot be computed serialise as `null`.

use serde::Serialize;

use crate::errors::AnalysisError;
use crate::geometry::{cross, Geometry, Point};
use crate::mesh::Mesh;

/// Cross-section properties that only depend on the shape and material.
///
/// Units are mm, N and kg.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GeometricProperties {
    /// Cross-sectional area.
    pub area: f64,
    /// Length of the outer boundary.
    pub perimeter: f64,
    /// Mass per unit length in kg/mm.
    pub mass: f64,
    /// Axial rigidity `E * A` in N.
    pub ea: f64,
    /// First moment of area about the global x axis.
    pub qx: f64,
    /// First moment of area about the global y axis.
    pub qy: f64,
    /// Second moment of area about the global x axis.
    pub ixx_g: f64,
    /// Second moment of area about the global y axis.
    pub iyy_g: f64,
    /// Product of area about the global axes.
    pub ixy_g: f64,
    /// Centroid x coordinate.
    pub cx: f64,
    /// Centroid y coordinate.
    pub cy: f64,
    /// Second moment of area about the centroidal x axis.
    pub ixx_c: f64,
    /// Second moment of area about the centroidal y axis.
    pub iyy_c: f64,
    /// Product of area about the centroidal axes.
    pub ixy_c: f64,
    /// Elastic section modulus about x for the top fibre.
    pub zxx_plus: f64,
    /// Elastic section modulus about x for the bottom fibre.
    pub zxx_minus: f64,
    /// Elastic section modulus about y for the right fibre.
    pub zyy_plus: f64,
    /// Elastic section modulus about y for the left fibre.
    pub zyy_minus: f64,
    /// Radius of gyration about the centroidal x axis.
    pub rx_c: f64,
    /// Radius of gyration about the centroidal y axis.
    pub ry_c: f64,
    /// Major principal second moment of area.
    pub i11_c: f64,
    /// Minor principal second moment of area.
    pub i22_c: f64,
    /// Angle from the x axis to the 11 axis in degrees.
    pub phi: f64,
    /// Elastic section modulus about the 11 axis, positive side.
    pub z11_plus: f64,
    /// Elastic section modulus about the 11 axis, negative side.
    pub z11_minus: f64,
    /// Elastic section modulus about the 22 axis, positive side.
    pub z22_plus: f64,
    /// Elastic section modulus about the 22 axis, negative side.
    pub z22_minus: f64,
    /// Radius of gyration about the 11 axis.
    pub r11_c: f64,
    /// Radius of gyration about the 22 axis.
    pub r22_c: f64,
    /// x coordinate of the plastic neutral axis for bending about y.
    pub x_pc: f64,
    /// y coordinate of the plastic neutral axis for bending about x.
    pub y_pc: f64,
    /// Plastic section modulus about the x axis.
    pub sxx: f64,
    /// Plastic section modulus about the y axis.
    pub syy: f64,
    /// Plastic section modulus about the 11 axis.
    pub s11: f64,
    /// Plastic section modulus about the 22 axis.
    pub s22: f64,
    /// Shape factor `sxx / zxx_plus`.
    pub sf_xx_plus: f64,
    /// Shape factor `sxx / zxx_minus`.
    pub sf_xx_minus: f64,
    /// Shape factor `syy / zyy_plus`.
    pub sf_yy_plus: f64,
    /// Shape factor `syy / zyy_minus`.
    pub sf_yy_minus: f64,
    /// Shape factor `s11 / z11_plus`.
    pub sf_11_plus: f64,
    /// Shape factor `s11 / z11_minus`.
    pub sf_11_minus: f64,
    /// Shape factor `s22 / z22_plus`.
    pub sf_22_plus: f64,
    /// Shape factor `s22 / z22_minus`.
    pub sf_22_minus: f64,
}

impl GeometricProperties {
    /// Determinant `ixx_c * iyy_c - ixy_c²` used by the bending and shear formulas.
    #[must_use]
    pub fn bending_determinant(&self) -> f64 {
        self.ixx_c * self.iyy_c - self.ixy_c * self.ixy_c
    }

    /// Principal coordinates `(u, v)` of a global point.
    #[must_use]
    pub fn principal_coordinates(&self, p: Point) -> (f64, f64) {
        let (sin, cos) = self.phi.to_radians().sin_cos();
        let x = p.x - self.cx;
        let y = p.y - self.cy;
        (x * cos + y * sin, y * cos - x * sin)
    }
}

/// Torsion and warping properties from the warping function.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WarpingProperties {
    /// St Venant torsion constant.
    pub j: f64,
    /// Warping constant.
    pub gamma: f64,
    /// Shear centre x coordinate (Trefftz definition).
    pub x_st: f64,
    /// Shear centre y coordinate (Trefftz definition).
    pub y_st: f64,
    /// Shear centre offset from the centroid along x.
    pub x_s_offset: f64,
    /// Shear centre offset from the centroid along y.
    pub y_s_offset: f64,
    /// Poisson's ratio used by the shear functions.
    pub nu: f64,
}

/// `∫ f g dA` over one triangle for fields varying linearly between the corner
/// values `f` and `g`.
pub(crate) fn product_integral(area: f64, f: [f64; 3], g: [f64; 3]) -> f64 {
    let diagonal: f64 = (0..3).map(|i| f[i] * g[i]).sum();
    let sums = f.iter().sum::<f64>() * g.iter().sum::<f64>();
    area / 12.0 * (diagonal + sums)
}

/// Area and first moment `∫ (s - offset) dA` of the parts of a triangle below
/// and above the line `s = offset`, where `s = normal · p`.
fn split_triangle(points: [Point; 3], normal: (f64, f64), offset: f64) -> [(f64, f64); 2] {
    let s = |p: Point| normal.0 * p.x + normal.1 * p.y - offset;
    let mut below: Vec<Point> = Vec::with_capacity(4);
    let mut above: Vec<Point> = Vec::with_capacity(4);
    for i in 0..3 {
        let (a, b) = (points[i], points[(i + 1) % 3]);
        let (sa, sb) = (s(a), s(b));
        if sa <= 0.0 {
            below.push(a);
        }
        if sa >= 0.0 {
            above.push(a);
        }
        if (sa < 0.0 && sb > 0.0) || (sa > 0.0 && sb < 0.0) {
            let t = sa / (sa - sb);
            let crossing = Point::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y));
            below.push(crossing);
            above.push(crossing);
        }
    }
    let moments = |polygon: &[Point]| {
        let mut area = 0.0;
        let mut moment = 0.0;
        for i in 1..polygon.len().saturating_sub(1) {
            let (a, b, c) = (polygon[0], polygon[i], polygon[i + 1]);
            let part = 0.5 * cross(a, b, c);
            area += part;
            moment += part * (s(a) + s(b) + s(c)) / 3.0;
        }
        (area, moment)
    };
    [moments(&below), moments(&above)]
}

/// Plastic neutral axis offset and plastic modulus for bending about the axis
/// perpendicular to `normal`.
fn plastic_axis(mesh: &Mesh, normal: (f64, f64), total_area: f64) -> (f64, f64) {
    let projections = mesh.nodes().iter().map(|p| normal.0 * p.x + normal.1 * p.y);
    let (mut low, mut high) = projections.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
        (lo.min(s), hi.max(s))
    });
    let area_below = |offset: f64| -> f64 {
        mesh.triangles()
            .map(|points| split_triangle(points, normal, offset)[0].0)
            .sum()
    };
    for _ in 0..100 {
        let middle = 0.5 * (low + high);
        if area_below(middle) < 0.5 * total_area {
            low = middle;
        } else {
            high = middle;
        }
        if high - low <= 1.0e-12 * high.abs().max(1.0) {
            break;
        }
    }
    let offset = 0.5 * (low + high);
    let modulus = mesh
        .triangles()
        .map(|points| {
            let [(_, below), (_, above)] = split_triangle(points, normal, offset);
            above - below
        })
        .sum();
    (offset, modulus)
}

/// Compute the geometric properties of a meshed section.
///
/// # Errors
///
/// Returns [`AnalysisError::Degenerate`] when the section has no area or no bending
/// stiffness.
pub(crate) fn geometric_properties(
    geometry: &Geometry,
    mesh: &Mesh,
) -> Result<GeometricProperties, AnalysisError> {
    let mut props = GeometricProperties {
        perimeter: geometry.perimeter(),
        ..GeometricProperties::default()
    };
    for [a, b, c] in mesh.triangles() {
        let area = 0.5 * cross(a, b, c);
        let xs = [a.x, b.x, c.x];
        let ys = [a.y, b.y, c.y];
        props.area += area;
        props.qx += area * ys.iter().sum::<f64>() / 3.0;
        props.qy += area * xs.iter().sum::<f64>() / 3.0;
        props.ixx_g += product_integral(area, ys, ys);
        props.iyy_g += product_integral(area, xs, xs);
        props.ixy_g += product_integral(area, xs, ys);
    }
    if props.area <= 0.0 {
        return Err(AnalysisError::Degenerate("section has no area"));
    }

    let material = &geometry.material;
    props.mass = props.area * material.density;
    props.ea = props.area * material.elastic_modulus;
    props.cx = props.qy / props.area;
    props.cy = props.qx / props.area;
    props.ixx_c = props.ixx_g - props.area * props.cy * props.cy;
    props.iyy_c = props.iyy_g - props.area * props.cx * props.cx;
    props.ixy_c = props.ixy_g - props.area * props.cx * props.cy;
    if props.ixx_c <= 0.0 || props.iyy_c <= 0.0 || props.bending_determinant() <= 0.0 {
        return Err(AnalysisError::Degenerate("section has no bending stiffness"));
    }

    let mean = 0.5 * (props.ixx_c + props.iyy_c);
    let radius = (0.25 * (props.ixx_c - props.iyy_c).powi(2) + props.ixy_c.powi(2)).sqrt();
    props.i11_c = mean + radius;
    props.i22_c = mean - radius;
    props.phi = (-2.0 * props.ixy_c)
        .atan2(props.ixx_c - props.iyy_c)
        .to_degrees()
        / 2.0;

    let (min, max) = geometry.bounds();
    props.zxx_plus = props.ixx_c / (max.y - props.cy);
    props.zxx_minus = props.ixx_c / (props.cy - min.y);
    props.zyy_plus = props.iyy_c / (max.x - props.cx);
    props.zyy_minus = props.iyy_c / (props.cx - min.x);

    let (mut u_min, mut u_max, mut v_min, mut v_max) = (0.0_f64, 0.0_f64, 0.0_f64, 0.0_f64);
    for &p in mesh.nodes() {
        let (u, v) = props.principal_coordinates(p);
        u_min = u_min.min(u);
        u_max = u_max.max(u);
        v_min = v_min.min(v);
        v_max = v_max.max(v);
    }
    props.z11_plus = props.i11_c / v_max;
    props.z11_minus = props.i11_c / -v_min;
    props.z22_plus = props.i22_c / u_max;
    props.z22_minus = props.i22_c / -u_min;

    props.rx_c = (props.ixx_c / props.area).sqrt();
    props.ry_c = (props.iyy_c / props.area).sqrt();
    props.r11_c = (props.i11_c / props.area).sqrt();
    props.r22_c = (props.i22_c / props.area).sqrt();

    let (sin, cos) = props.phi.to_radians().sin_cos();
    let (y_pc, sxx) = plastic_axis(mesh, (0.0, 1.0), props.area);
    let (x_pc, syy) = plastic_axis(mesh, (1.0, 0.0), props.area);
    let (_, s11) = plastic_axis(mesh, (-sin, cos), props.area);
    let (_, s22) = plastic_axis(mesh, (cos, sin), props.area);
    props.x_pc = x_pc;
    props.y_pc = y_pc;
    props.sxx = sxx;
    props.syy = syy;
    props.s11 = s11;
    props.s22 = s22;

    props.sf_xx_plus = sxx / props.zxx_plus;
    props.sf_xx_minus = sxx / props.zxx_minus;
    props.sf_yy_plus = syy / props.zyy_plus;
    props.sf_yy_minus = syy / props.zyy_minus;
    props.sf_11_plus = s11 / props.z11_plus;
    props.sf_11_minus = s11 / props.z11_minus;
    props.sf_22_plus = s22 / props.z22_plus;
    props.sf_22_minus = s22 / props.z22_minus;

    Ok(props)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::point;
    use crate::library::{angle_section, AngleSection};

    fn rectangle(b: f64, d: f64) -> (Geometry, Mesh) {
        let geometry = Geometry::new(
            vec![point(0.0, 0.0), point(b, 0.0), point(b, d), point(0.0, d)],
            vec![],
        )
        .expect("valid rectangle");
        let mesh = Mesh::generate(&geometry, 20.0).expect("mesh");
        (geometry, mesh)
    }

    #[test]
    fn rectangle_properties_are_exact() {
        let (b, d) = (40.0, 100.0);
        let (geometry, mesh) = rectangle(b, d);
        let props = geometric_properties(&geometry, &mesh).expect("properties");

        assert_relative_eq!(props.area, b * d, max_relative = 1.0e-12);
        assert_relative_eq!(props.perimeter, 2.0 * (b + d), max_relative = 1.0e-12);
        assert_relative_eq!(props.cx, b / 2.0, max_relative = 1.0e-12);
        assert_relative_eq!(props.cy, d / 2.0, max_relative = 1.0e-12);
        assert_relative_eq!(props.ixx_c, b * d.powi(3) / 12.0, max_relative = 1.0e-10);
        assert_relative_eq!(props.iyy_c, d * b.powi(3) / 12.0, max_relative = 1.0e-10);
        assert_relative_eq!(props.ixx_g, b * d.powi(3) / 3.0, max_relative = 1.0e-10);
        assert!(props.ixy_c.abs() < 1.0e-6 * props.ixx_c);
        assert_relative_eq!(props.i11_c, props.ixx_c, max_relative = 1.0e-10);
        assert_relative_eq!(props.zxx_plus, b * d * d / 6.0, max_relative = 1.0e-10);
        assert_relative_eq!(props.zxx_minus, b * d * d / 6.0, max_relative = 1.0e-10);
        assert_relative_eq!(props.y_pc, d / 2.0, max_relative = 1.0e-8);
        assert_relative_eq!(props.sxx, b * d * d / 4.0, max_relative = 1.0e-8);
        assert_relative_eq!(props.syy, d * b * b / 4.0, max_relative = 1.0e-8);
        assert_relative_eq!(props.sf_xx_plus, 1.5, max_relative = 1.0e-8);
        assert_relative_eq!(props.ea, 210_000.0 * b * d, max_relative = 1.0e-12);
        assert_relative_eq!(props.mass, 7.85e-6 * b * d, max_relative = 1.0e-12);
    }

    #[test]
    fn equal_angle_principal_axes_are_diagonal() {
        let geometry = angle_section(&AngleSection {
            d: 100.0,
            b: 100.0,
            t: 10.0,
            r_r: 0.0,
            r_t: 0.0,
            n_r: 1,
        })
        .expect("valid angle");
        let mesh = Mesh::generate(&geometry, 20.0).expect("mesh");
        let props = geometric_properties(&geometry, &mesh).expect("properties");
        assert_relative_eq!(props.ixx_c, props.iyy_c, max_relative = 1.0e-9);
        assert!(props.ixy_c < 0.0);
        assert_relative_eq!(props.phi.abs(), 45.0, epsilon = 1.0e-6);
        assert!(props.i11_c > props.ixx_c);
        assert!(props.i22_c < props.iyy_c);
        assert_relative_eq!(
            props.i11_c + props.i22_c,
            props.ixx_c + props.iyy_c,
            max_relative = 1.0e-12
        );
    }

    #[test]
    fn split_triangle_conserves_area() {
        let points = [point(0.0, 0.0), point(4.0, 0.0), point(0.0, 4.0)];
        let [(below, _), (above, _)] = split_triangle(points, (0.0, 1.0), 2.0);
        assert_relative_eq!(below + above, 8.0, max_relative = 1.0e-12);
        assert_relative_eq!(above, 2.0, max_relative = 1.0e-12);
    }

    #[test]
    fn product_integral_matches_second_moment() {
        // ∫ y² over the unit right triangle is 1/12.
        let ys = [0.0, 0.0, 1.0];
        assert_relative_eq!(product_integral(0.5, ys, ys), 1.0 / 12.0, max_relative = 1.0e-12);
    }
}
