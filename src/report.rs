use std::fmt::{self, Write};

use sectionx::{GeometricProperties, StressResult, WarpingProperties};

/// Render a textual summary of a section analysis.
///
/// Lengths in mm, forces in N, stresses in MPa.
pub fn render_summary(
    name: &str,
    geometric: &GeometricProperties,
    warping: Option<&WarpingProperties>,
    stress: &StressResult,
) -> Result<String, fmt::Error> {
    let mut output = String::new();

    writeln!(&mut output, "{name}")?;
    writeln!(
        &mut output,
        "Area A = {:.1} mm², perimeter = {:.1} mm, mass = {:.2} kg/m",
        geometric.area,
        geometric.perimeter,
        geometric.mass * 1000.0
    )?;
    writeln!(
        &mut output,
        "Centroid (cx, cy) = ({:.2}, {:.2}) mm",
        geometric.cx, geometric.cy
    )?;
    writeln!(
        &mut output,
        "Ixx = {:.4e} mm⁴, Iyy = {:.4e} mm⁴, Ixy = {:+.4e} mm⁴",
        geometric.ixx_c, geometric.iyy_c, geometric.ixy_c
    )?;
    writeln!(
        &mut output,
        "I11 = {:.4e} mm⁴, I22 = {:.4e} mm⁴, phi = {:.2} deg",
        geometric.i11_c, geometric.i22_c, geometric.phi
    )?;
    writeln!(
        &mut output,
        "Zxx+ = {:.4e} mm³, Sxx = {:.4e} mm³, shape factor = {:.3}",
        geometric.zxx_plus, geometric.sxx, geometric.sf_xx_plus
    )?;

    if let Some(warping) = warping {
        writeln!(
            &mut output,
            "J = {:.4e} mm⁴, Iw = {:.4e} mm⁶, shear centre = ({:.2}, {:.2}) mm",
            warping.j, warping.gamma, warping.x_st, warping.y_st
        )?;
    } else {
        output.push_str("Warping properties: not calculated\n");
    }

    let load = stress.load();
    writeln!(
        &mut output,
        "Load case: N = {:.1} N, M11 = {:.1} Nmm, Mxx = {:.1} Nmm, Mzz = {:.1} Nmm",
        load.n, load.m11, load.mxx, load.mzz
    )?;
    let summary = stress.summary();
    writeln!(
        &mut output,
        "sig_zz: {:+.3} .. {:+.3} MPa",
        summary.min_axial_stress, summary.max_axial_stress
    )?;
    writeln!(
        &mut output,
        "sig_zxy: {:.3} .. {:.3} MPa",
        summary.min_shear_stress, summary.max_shear_stress
    )?;
    writeln!(
        &mut output,
        "sig_vm: {:.3} .. {:.3} MPa",
        summary.min_von_mises_stress, summary.max_von_mises_stress
    )?;

    Ok(output)
}
