use std::path::Path;

use anyhow::Context;
use tracing::info;

use sectionx::plot::{mesh_plot, stress_plot};
use sectionx::{i_section, ISection, LoadCase, Section, StressComponent};

use crate::report::render_summary;

/// Analyse a HEB 300 under N = 50 kN and M11 = 5 kNm and print the results.
pub fn run(mesh_size: f64, figure_dir: Option<&Path>) -> anyhow::Result<()> {
    let geometry = i_section(&ISection {
        d: 300.0,
        b: 300.0,
        t_f: 19.0,
        t_w: 11.0,
        r: 27.0,
        n_r: 10,
    })?;
    let mut section = Section::new(geometry, mesh_size)?;
    info!(elements = section.mesh().element_count(), "HEB 300 meshed");

    let geometric = section.calculate_geometric_properties()?.clone();
    let warping = section.calculate_warping_properties()?.clone();
    let stress = section.calculate_stress(&LoadCase {
        n: 50.0e3,
        m11: 5.0e6,
        ..LoadCase::default()
    })?;

    println!("{}", render_summary("HEB 300", &geometric, Some(&warping), &stress)?);

    if let Some(dir) = figure_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        for (file, figure) in [
            ("heb300-mesh.svg", mesh_plot(&section)?),
            ("heb300-vm.svg", stress_plot(&section, &stress, StressComponent::Vm)?),
        ] {
            let path = dir.join(file);
            std::fs::write(&path, figure.svg)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("{} -> {}", figure.title, path.display());
        }
    }
    Ok(())
}
