//! SVG figures of meshes and stress contours.

use std::fmt::{self, Write};

use serde::Serialize;

use crate::geometry::Point;
use crate::mesh::SUBTRIANGLES;
use crate::section::Section;
use crate::stress::{StressComponent, StressResult};

const WIDTH: f64 = 480.0;
const HEIGHT: f64 = 360.0;
const MARGIN: f64 = 30.0;
const TITLE_HEIGHT: f64 = 24.0;
const COLOUR_BAR_WIDTH: f64 = 70.0;

/// Rendered figure.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Figure {
    /// Caption shown above the plot.
    pub title: String,
    /// Standalone SVG document.
    pub svg: String,
}

/// Maps section coordinates into the drawing area with equal scaling on both axes.
struct Frame {
    scale: f64,
    origin: Point,
    left: f64,
    bottom: f64,
}

impl Frame {
    fn fit(nodes: &[Point], right_reserve: f64) -> Self {
        let (mut min, mut max) = (
            Point::new(f64::INFINITY, f64::INFINITY),
            Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        );
        for p in nodes {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        let available_width = WIDTH - 2.0 * MARGIN - right_reserve;
        let available_height = HEIGHT - 2.0 * MARGIN - TITLE_HEIGHT;
        let span_x = (max.x - min.x).max(f64::MIN_POSITIVE);
        let span_y = (max.y - min.y).max(f64::MIN_POSITIVE);
        let scale = (available_width / span_x).min(available_height / span_y);
        Self {
            scale,
            origin: min,
            left: MARGIN + 0.5 * (available_width - scale * span_x),
            bottom: HEIGHT - MARGIN - 0.5 * (available_height - scale * span_y),
        }
    }

    fn map(&self, p: Point) -> (f64, f64) {
        (
            self.left + self.scale * (p.x - self.origin.x),
            self.bottom - self.scale * (p.y - self.origin.y),
        )
    }
}

/// Diverging blue to red colour map.
fn colour(t: f64) -> (u8, u8, u8) {
    const STOPS: [(f64, [f64; 3]); 5] = [
        (0.0, [59.0, 76.0, 192.0]),
        (0.25, [141.0, 176.0, 254.0]),
        (0.5, [221.0, 221.0, 221.0]),
        (0.75, [244.0, 154.0, 123.0]),
        (1.0, [180.0, 4.0, 38.0]),
    ];
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 };
    let upper = STOPS
        .iter()
        .position(|(stop, _)| *stop >= t)
        .unwrap_or(STOPS.len() - 1)
        .max(1);
    let (t0, c0) = STOPS[upper - 1];
    let (t1, c1) = STOPS[upper];
    let f = (t - t0) / (t1 - t0);
    let channel = |i: usize| (c0[i] + f * (c1[i] - c0[i])).round() as u8;
    (channel(0), channel(1), channel(2))
}

fn open(svg: &mut String, title: &str) -> fmt::Result {
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
    )?;
    writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
    writeln!(
        svg,
        r#"<text x="{}" y="{}" font-size="13" text-anchor="middle">{}</text>"#,
        WIDTH / 2.0,
        MARGIN,
        escape(title)
    )
}

fn triangle(
    svg: &mut String,
    frame: &Frame,
    points: [Point; 3],
    fill: &str,
    stroke: &str,
) -> fmt::Result {
    let [a, b, c] = points.map(|p| frame.map(p));
    writeln!(
        svg,
        r#"<polygon points="{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}" fill="{fill}" stroke="{stroke}" stroke-width="0.3"/>"#,
        a.0, a.1, b.0, b.1, c.0, c.1
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Plot the finite element mesh filled with the material colour.
///
/// # Errors
///
/// Returns [`fmt::Error`] when the document cannot be written.
pub fn mesh_plot(section: &Section) -> Result<Figure, fmt::Error> {
    let mesh = section.mesh();
    let material = &section.geometry().material;
    let title = format!(
        "Finite Element Mesh ({} elements, {})",
        mesh.element_count(),
        material.name
    );
    let frame = Frame::fit(mesh.nodes(), 0.0);
    let mut svg = String::new();
    open(&mut svg, &title)?;
    for points in mesh.triangles() {
        triangle(&mut svg, &frame, points, &material.color, "black")?;
    }
    writeln!(svg, "</svg>")?;
    Ok(Figure { title, svg })
}

/// Plot a stress component as a contour over the mesh with a colour bar.
///
/// # Errors
///
/// Returns [`fmt::Error`] when the document cannot be written.
pub fn stress_plot(
    section: &Section,
    stress: &StressResult,
    component: StressComponent,
) -> Result<Figure, fmt::Error> {
    let mesh = section.mesh();
    let values = stress.nodal_average(mesh, component);
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = max - min;
    let normalise = |v: f64| if span > 0.0 { (v - min) / span } else { 0.5 };

    let title = format!(
        "Stress Contour Plot - {} (sig_{})",
        component.description(),
        component.name()
    );
    let frame = Frame::fit(mesh.nodes(), COLOUR_BAR_WIDTH);
    let mut svg = String::new();
    open(&mut svg, &title)?;
    for element in mesh.elements() {
        for piece in SUBTRIANGLES {
            let nodes = piece.map(|local| element[local]);
            let average = nodes.iter().map(|&node| values[node]).sum::<f64>() / 3.0;
            let (r, g, b) = colour(normalise(average));
            let points = nodes.map(|node| mesh.nodes()[node]);
            triangle(&mut svg, &frame, points, &format!("rgb({r},{g},{b})"), "none")?;
        }
    }

    // Colour bar with five labelled ticks.
    let bar_left = WIDTH - MARGIN - COLOUR_BAR_WIDTH + 10.0;
    let bar_top = MARGIN + TITLE_HEIGHT;
    let bar_height = HEIGHT - 2.0 * MARGIN - TITLE_HEIGHT;
    let steps = 50;
    for step in 0..steps {
        let t = (step as f64 + 0.5) / steps as f64;
        let (r, g, b) = colour(t);
        let y = bar_top + bar_height * (1.0 - (step + 1) as f64 / steps as f64);
        writeln!(
            svg,
            r#"<rect x="{bar_left:.2}" y="{y:.2}" width="14" height="{:.2}" fill="rgb({r},{g},{b})"/>"#,
            bar_height / steps as f64 + 0.5
        )?;
    }
    for tick in 0..=4 {
        let t = f64::from(tick) / 4.0;
        let value = if span > 0.0 { min + t * span } else { min };
        let y = bar_top + bar_height * (1.0 - t);
        writeln!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" font-size="10">{value:.3e}</text>"#,
            bar_left + 18.0,
            y + 3.0
        )?;
    }
    writeln!(svg, "</svg>")?;
    Ok(Figure { title, svg })
}
