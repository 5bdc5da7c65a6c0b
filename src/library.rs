//! Parametric steel section builders.
//!
//! Every builder returns a [`Geometry`] carrying the default material. Open
//! sections are placed with the bottom-left corner of their bounding box at the
//! origin; circular, elliptical and polygonal hollow sections are centred on the
//! origin.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use nalgebra::Vector2;
use serde::{Deserialize, Deserializer};

use crate::errors::GeometryError;
use crate::geometry::{point, Geometry, Point};

/// Default number of points used to discretise a root or corner radius.
pub const DEFAULT_RADIUS_POINTS: usize = 8;

/// Largest accepted number of points on one curve or polygon.
pub const MAX_CURVE_POINTS: usize = 360;

fn default_radius_points() -> usize {
    DEFAULT_RADIUS_POINTS
}

/// Accept point counts sent as JSON floats (`10.0`), which function-calling models
/// commonly produce for integer parameters.
fn count<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Ok(value as usize)
    } else {
        Err(serde::de::Error::custom(format!(
            "expected a non-negative integer, found {value}"
        )))
    }
}

/// Dimensions of a circular hollow section.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CircularHollow {
    /// Outer diameter.
    pub d: f64,
    /// Wall thickness.
    pub t: f64,
    /// Number of points on each circle.
    #[serde(deserialize_with = "count")]
    pub n: usize,
}

/// Dimensions of an elliptical hollow section.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EllipticalHollow {
    /// Outer diameter along y.
    pub d_y: f64,
    /// Outer diameter along x.
    pub d_x: f64,
    /// Wall thickness.
    pub t: f64,
    /// Number of points on each ellipse.
    #[serde(deserialize_with = "count")]
    pub n: usize,
}

/// Dimensions of a rectangular hollow section.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RectangularHollow {
    /// Depth.
    pub d: f64,
    /// Width.
    pub b: f64,
    /// Wall thickness.
    pub t: f64,
    /// Outer corner radius.
    #[serde(default)]
    pub r_out: f64,
    /// Points per corner radius.
    #[serde(default = "default_radius_points", deserialize_with = "count")]
    pub n_r: usize,
}

/// Dimensions of a doubly symmetric I-section.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ISection {
    /// Depth.
    pub d: f64,
    /// Flange width.
    pub b: f64,
    /// Flange thickness.
    pub t_f: f64,
    /// Web thickness.
    pub t_w: f64,
    /// Root radius.
    #[serde(default)]
    pub r: f64,
    /// Points per root radius.
    #[serde(default = "default_radius_points", deserialize_with = "count")]
    pub n_r: usize,
}

/// Dimensions of a monosymmetric I-section.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MonoISection {
    /// Depth.
    pub d: f64,
    /// Top flange width.
    pub b_t: f64,
    /// Bottom flange width.
    pub b_b: f64,
    /// Top flange thickness.
    pub t_ft: f64,
    /// Bottom flange thickness.
    pub t_fb: f64,
    /// Web thickness.
    pub t_w: f64,
    /// Root radius.
    #[serde(default)]
    pub r: f64,
    /// Points per root radius.
    #[serde(default = "default_radius_points", deserialize_with = "count")]
    pub n_r: usize,
}

/// Dimensions of a parallel flange channel, given with the I-section parameters.
pub type ChannelSection = ISection;

/// Dimensions of a tee section, given with the I-section parameters.
pub type TeeSection = ISection;

/// Dimensions of an angle section.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AngleSection {
    /// Depth (vertical leg).
    pub d: f64,
    /// Width (horizontal leg).
    pub b: f64,
    /// Leg thickness.
    pub t: f64,
    /// Root radius.
    #[serde(default)]
    pub r_r: f64,
    /// Toe radius.
    #[serde(default)]
    pub r_t: f64,
    /// Points per radius.
    #[serde(default = "default_radius_points", deserialize_with = "count")]
    pub n_r: usize,
}

/// Dimensions of a regular polygonal hollow section.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PolygonHollow {
    /// Diameter of the circle through the outer corners of the unrounded polygon.
    pub d: f64,
    /// Wall thickness.
    pub t: f64,
    /// Number of sides.
    #[serde(deserialize_with = "count")]
    pub n_sides: usize,
    /// Inner corner radius; the outer radius is `r_in + t`.
    #[serde(default)]
    pub r_in: f64,
    /// Points per corner radius.
    #[serde(default = "default_radius_points", deserialize_with = "count")]
    pub n_r: usize,
    /// Counter-clockwise rotation in degrees. At zero the bottom face is horizontal.
    #[serde(default)]
    pub rot: f64,
}

/// Dimensions of a tapered flange I-section or channel.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TaperedFlange {
    /// Depth.
    pub d: f64,
    /// Flange width.
    pub b: f64,
    /// Flange thickness halfway between the web face and the flange tip.
    pub t_f: f64,
    /// Web thickness.
    pub t_w: f64,
    /// Root radius.
    #[serde(default)]
    pub r_r: f64,
    /// Flange toe radius.
    #[serde(default)]
    pub r_f: f64,
    /// Slope of the inner flange face in degrees.
    pub alpha: f64,
    /// Points per radius.
    #[serde(default = "default_radius_points", deserialize_with = "count")]
    pub n_r: usize,
}

/// Dimensions of a lipped channel (cee) with constant wall thickness.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CeeSection {
    /// Depth.
    pub d: f64,
    /// Flange width.
    pub b: f64,
    /// Lip length.
    pub l: f64,
    /// Wall thickness.
    pub t: f64,
    /// Outer corner radius; the inner radius is `max(r_out - t, 0)`.
    #[serde(default)]
    pub r_out: f64,
    /// Points per corner radius.
    #[serde(default = "default_radius_points", deserialize_with = "count")]
    pub n_r: usize,
}

/// Dimensions of a lipped zed with constant wall thickness.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ZedSection {
    /// Depth.
    pub d: f64,
    /// Width of the top flange, which points left.
    pub b_l: f64,
    /// Width of the bottom flange, which points right.
    pub b_r: f64,
    /// Lip length.
    pub l: f64,
    /// Wall thickness.
    pub t: f64,
    /// Outer corner radius; the inner radius is `max(r_out - t, 0)`.
    #[serde(default)]
    pub r_out: f64,
    /// Points per corner radius.
    #[serde(default = "default_radius_points", deserialize_with = "count")]
    pub n_r: usize,
}

/// Dimensions of a trapezoidal box girder.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BoxGirder {
    /// Depth.
    pub d: f64,
    /// Outer width at the top.
    pub b_t: f64,
    /// Outer width at the bottom.
    pub b_b: f64,
    /// Top flange thickness.
    pub t_ft: f64,
    /// Bottom flange thickness.
    pub t_fb: f64,
    /// Web thickness, measured square to the web.
    pub t_w: f64,
}

/// Dimensions of a bulb flat with the bulb at the top right.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BulbSection {
    /// Depth.
    pub d: f64,
    /// Width over the bulb.
    pub b: f64,
    /// Web thickness.
    pub t: f64,
    /// Bulb tip and root radius.
    #[serde(default)]
    pub r: f64,
    /// Points per radius.
    #[serde(default = "default_radius_points", deserialize_with = "count")]
    pub n_r: usize,
    /// Depth of the bulb; defaults to `b - t + 2 r`.
    #[serde(default)]
    pub d_b: Option<f64>,
}

/// One of the supported parametric sections.
#[derive(Clone, Debug, PartialEq)]
pub enum SectionSpec {
    /// Circular hollow section.
    CircularHollow(CircularHollow),
    /// Elliptical hollow section.
    EllipticalHollow(EllipticalHollow),
    /// Rectangular hollow section.
    RectangularHollow(RectangularHollow),
    /// I-section.
    I(ISection),
    /// Monosymmetric I-section.
    MonoI(MonoISection),
    /// Parallel flange channel.
    Channel(ChannelSection),
    /// Tee section.
    Tee(TeeSection),
    /// Angle section.
    Angle(AngleSection),
    /// Regular polygonal hollow section.
    PolygonHollow(PolygonHollow),
    /// Tapered flange I-section.
    TaperedFlangeI(TaperedFlange),
    /// Tapered flange channel.
    TaperedFlangeChannel(TaperedFlange),
    /// Lipped channel.
    Cee(CeeSection),
    /// Lipped zed.
    Zed(ZedSection),
    /// Trapezoidal box girder.
    BoxGirder(BoxGirder),
    /// Bulb flat.
    Bulb(BulbSection),
}

impl SectionSpec {
    /// Build the outline described by these dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] when the dimensions are invalid.
    pub fn build(&self) -> Result<Geometry, GeometryError> {
        match self {
            SectionSpec::CircularHollow(s) => circular_hollow_section(s),
            SectionSpec::EllipticalHollow(s) => elliptical_hollow_section(s),
            SectionSpec::RectangularHollow(s) => rectangular_hollow_section(s),
            SectionSpec::I(s) => i_section(s),
            SectionSpec::MonoI(s) => mono_i_section(s),
            SectionSpec::Channel(s) => channel_section(s),
            SectionSpec::Tee(s) => tee_section(s),
            SectionSpec::Angle(s) => angle_section(s),
            SectionSpec::PolygonHollow(s) => polygon_hollow_section(s),
            SectionSpec::TaperedFlangeI(s) => tapered_flange_i_section(s),
            SectionSpec::TaperedFlangeChannel(s) => tapered_flange_channel(s),
            SectionSpec::Cee(s) => cee_section(s),
            SectionSpec::Zed(s) => zed_section(s),
            SectionSpec::BoxGirder(s) => box_girder_section(s),
            SectionSpec::Bulb(s) => bulb_section(s),
        }
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), GeometryError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(GeometryError::NonPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), GeometryError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(GeometryError::Negative { name, value })
    }
}

fn point_count(name: &'static str, value: usize, min: usize) -> Result<(), GeometryError> {
    if value < min {
        Err(GeometryError::TooFewPoints { name, min, value })
    } else if value > MAX_CURVE_POINTS {
        Err(GeometryError::TooManyPoints {
            name,
            max: MAX_CURVE_POINTS,
            value,
        })
    } else {
        Ok(())
    }
}

fn ensure(condition: bool, message: &str) -> Result<(), GeometryError> {
    if condition {
        Ok(())
    } else {
        Err(GeometryError::Inconsistent(message.to_string()))
    }
}

/// Points along an arc of radius `r` about `centre`, starting at angle `start`
/// and sweeping `sweep` radians (counter-clockwise when positive).
fn draw_arc(centre: Point, r: f64, start: f64, sweep: f64, n: usize) -> Vec<Point> {
    if r == 0.0 || n < 2 {
        return vec![centre];
    }
    (0..n)
        .map(|i| {
            let angle = start + sweep * (i as f64) / ((n - 1) as f64);
            point(centre.x + r * angle.cos(), centre.y + r * angle.sin())
        })
        .collect()
}

/// Points along a quarter circle of radius `r` about `centre`, starting at angle
/// `theta` and sweeping counter-clockwise when `ccw` is set.
///
/// A zero radius collapses to the single corner point `centre`.
fn draw_radius(centre: Point, r: f64, theta: f64, n: usize, ccw: bool) -> Vec<Point> {
    let sweep = if ccw { FRAC_PI_2 } else { -FRAC_PI_2 };
    draw_arc(centre, r, theta, sweep, n)
}

/// Round the corner of the path `previous → corner → next` with radius `r`.
///
/// Returns the arc and the distance from the corner to either tangent point.
/// Convex corners lose material, concave corners gain it.
fn fillet(previous: Point, corner: Point, next: Point, r: f64, n: usize) -> (Vec<Point>, f64) {
    let apex = Vector2::from(corner);
    let u1 = (Vector2::from(previous) - apex).normalize();
    let u2 = (Vector2::from(next) - apex).normalize();
    let opening = u1.angle(&u2);
    if r == 0.0 || opening >= PI - 1.0e-9 {
        return (vec![corner], 0.0);
    }
    let half = 0.5 * opening;
    let tangent = r / half.tan();
    let centre = apex + (u1 + u2).normalize() * (r / half.sin());
    let start = apex + u1 * tangent - centre;
    let end = apex + u2 * tangent - centre;
    let a1 = start.y.atan2(start.x);
    let mut sweep = end.y.atan2(end.x) - a1;
    if sweep > PI {
        sweep -= TAU;
    } else if sweep <= -PI {
        sweep += TAU;
    }
    (draw_arc(Point::from(centre), r, a1, sweep, n), tangent)
}

/// Closed ring through `corners`, each rounded with its own radius.
fn rounded_ring(corners: &[(Point, f64)], n_r: usize) -> Result<Vec<Point>, GeometryError> {
    let n = corners.len();
    let mut ring = Vec::new();
    let mut tangents = Vec::with_capacity(n);
    for (i, &(corner, r)) in corners.iter().enumerate() {
        let (arc, tangent) = fillet(corners[(i + n - 1) % n].0, corner, corners[(i + 1) % n].0, r, n_r);
        ring.extend(arc);
        tangents.push(tangent);
    }
    for i in 0..n {
        let j = (i + 1) % n;
        let length = corners[i].0.distance_squared(corners[j].0).sqrt();
        ensure(
            tangents[i] + tangents[j] <= length * (1.0 + 1.0e-9),
            "radii do not fit along the section edges",
        )?;
    }
    Ok(ring)
}

fn check_radius(name: &'static str, r: f64, n_r: usize) -> Result<(), GeometryError> {
    non_negative(name, r)?;
    point_count("n_r", n_r, if r > 0.0 { 2 } else { 1 })
}

fn ellipse(rx: f64, ry: f64, n: usize) -> Vec<Point> {
    (0..n)
        .map(|i| {
            let angle = 2.0 * PI * (i as f64) / (n as f64);
            point(rx * angle.cos(), ry * angle.sin())
        })
        .collect()
}

/// Circular hollow section centred on the origin.
///
/// # Errors
///
/// Returns [`GeometryError`] when `t` is not smaller than the radius or `n < 3`.
pub fn circular_hollow_section(s: &CircularHollow) -> Result<Geometry, GeometryError> {
    positive("d", s.d)?;
    positive("t", s.t)?;
    point_count("n", s.n, 3)?;
    ensure(2.0 * s.t < s.d, "wall thickness must be less than half the diameter")?;
    let outer = ellipse(0.5 * s.d, 0.5 * s.d, s.n);
    let inner = ellipse(0.5 * s.d - s.t, 0.5 * s.d - s.t, s.n);
    Geometry::new(outer, vec![inner])
}

/// Elliptical hollow section centred on the origin.
///
/// # Errors
///
/// Returns [`GeometryError`] when the wall does not fit inside either diameter.
pub fn elliptical_hollow_section(s: &EllipticalHollow) -> Result<Geometry, GeometryError> {
    positive("d_y", s.d_y)?;
    positive("d_x", s.d_x)?;
    positive("t", s.t)?;
    point_count("n", s.n, 3)?;
    ensure(
        2.0 * s.t < s.d_x.min(s.d_y),
        "wall thickness must be less than half of each diameter",
    )?;
    let outer = ellipse(0.5 * s.d_x, 0.5 * s.d_y, s.n);
    let inner = ellipse(0.5 * s.d_x - s.t, 0.5 * s.d_y - s.t, s.n);
    Geometry::new(outer, vec![inner])
}

/// Rectangular hollow section with rounded corners.
///
/// The inner corner radius is `max(r_out - t, 0)`.
///
/// # Errors
///
/// Returns [`GeometryError`] when the walls or radii do not fit.
pub fn rectangular_hollow_section(s: &RectangularHollow) -> Result<Geometry, GeometryError> {
    positive("d", s.d)?;
    positive("b", s.b)?;
    positive("t", s.t)?;
    check_radius("r_out", s.r_out, s.n_r)?;
    ensure(2.0 * s.t < s.d.min(s.b), "walls must leave an opening")?;
    ensure(
        2.0 * s.r_out <= s.d.min(s.b),
        "corner radius must fit within the depth and width",
    )?;

    let rounded = |x0: f64, y0: f64, x1: f64, y1: f64, r: f64| -> Vec<Point> {
        let mut ring = Vec::new();
        ring.extend(draw_radius(point(x0 + r, y0 + r), r, PI, s.n_r, true));
        ring.extend(draw_radius(point(x1 - r, y0 + r), r, 1.5 * PI, s.n_r, true));
        ring.extend(draw_radius(point(x1 - r, y1 - r), r, 0.0, s.n_r, true));
        ring.extend(draw_radius(point(x0 + r, y1 - r), r, FRAC_PI_2, s.n_r, true));
        ring
    };

    let r_in = (s.r_out - s.t).max(0.0);
    let outer = rounded(0.0, 0.0, s.b, s.d, s.r_out);
    let inner = rounded(s.t, s.t, s.b - s.t, s.d - s.t, r_in);
    Geometry::new(outer, vec![inner])
}

/// Doubly symmetric I-section.
///
/// # Errors
///
/// Returns [`GeometryError`] when the flanges, web or root radii do not fit.
pub fn i_section(s: &ISection) -> Result<Geometry, GeometryError> {
    mono_i_section(&MonoISection {
        d: s.d,
        b_t: s.b,
        b_b: s.b,
        t_ft: s.t_f,
        t_fb: s.t_f,
        t_w: s.t_w,
        r: s.r,
        n_r: s.n_r,
    })
}

/// Monosymmetric I-section with the web centred on the wider flange.
///
/// # Errors
///
/// Returns [`GeometryError`] when the flanges, web or root radii do not fit.
pub fn mono_i_section(s: &MonoISection) -> Result<Geometry, GeometryError> {
    positive("d", s.d)?;
    positive("b_t", s.b_t)?;
    positive("b_b", s.b_b)?;
    positive("t_ft", s.t_ft)?;
    positive("t_fb", s.t_fb)?;
    positive("t_w", s.t_w)?;
    check_radius("r", s.r, s.n_r)?;
    ensure(
        s.t_ft + s.t_fb + 2.0 * s.r < s.d,
        "flanges and root radii must leave room for the web",
    )?;
    ensure(
        s.t_w + 2.0 * s.r <= s.b_t.min(s.b_b),
        "web and root radii must fit within both flanges",
    )?;

    let b = s.b_t.max(s.b_b);
    let xc = 0.5 * b;
    let (xb0, xb1) = (xc - 0.5 * s.b_b, xc + 0.5 * s.b_b);
    let (xt0, xt1) = (xc - 0.5 * s.b_t, xc + 0.5 * s.b_t);
    let web_right = xc + 0.5 * s.t_w;
    let web_left = xc - 0.5 * s.t_w;

    let mut ring = vec![point(xb0, 0.0), point(xb1, 0.0), point(xb1, s.t_fb)];
    ring.extend(draw_radius(
        point(web_right + s.r, s.t_fb + s.r),
        s.r,
        1.5 * PI,
        s.n_r,
        false,
    ));
    ring.extend(draw_radius(
        point(web_right + s.r, s.d - s.t_ft - s.r),
        s.r,
        PI,
        s.n_r,
        false,
    ));
    ring.extend([
        point(xt1, s.d - s.t_ft),
        point(xt1, s.d),
        point(xt0, s.d),
        point(xt0, s.d - s.t_ft),
    ]);
    ring.extend(draw_radius(
        point(web_left - s.r, s.d - s.t_ft - s.r),
        s.r,
        FRAC_PI_2,
        s.n_r,
        false,
    ));
    ring.extend(draw_radius(
        point(web_left - s.r, s.t_fb + s.r),
        s.r,
        0.0,
        s.n_r,
        false,
    ));
    ring.push(point(xb0, s.t_fb));
    Geometry::new(ring, vec![])
}

/// Parallel flange channel with the web on the left.
///
/// # Errors
///
/// Returns [`GeometryError`] when the flanges, web or root radii do not fit.
pub fn channel_section(s: &ChannelSection) -> Result<Geometry, GeometryError> {
    positive("d", s.d)?;
    positive("b", s.b)?;
    positive("t_f", s.t_f)?;
    positive("t_w", s.t_w)?;
    check_radius("r", s.r, s.n_r)?;
    ensure(
        2.0 * (s.t_f + s.r) < s.d,
        "flanges and root radii must leave room for the web",
    )?;
    ensure(s.t_w + s.r < s.b, "web and root radius must fit within the flange")?;

    let mut ring = vec![point(0.0, 0.0), point(s.b, 0.0), point(s.b, s.t_f)];
    ring.extend(draw_radius(
        point(s.t_w + s.r, s.t_f + s.r),
        s.r,
        1.5 * PI,
        s.n_r,
        false,
    ));
    ring.extend(draw_radius(
        point(s.t_w + s.r, s.d - s.t_f - s.r),
        s.r,
        PI,
        s.n_r,
        false,
    ));
    ring.extend([point(s.b, s.d - s.t_f), point(s.b, s.d), point(0.0, s.d)]);
    Geometry::new(ring, vec![])
}

/// Tee section with the flange on top.
///
/// # Errors
///
/// Returns [`GeometryError`] when the flange, web or root radii do not fit.
pub fn tee_section(s: &TeeSection) -> Result<Geometry, GeometryError> {
    positive("d", s.d)?;
    positive("b", s.b)?;
    positive("t_f", s.t_f)?;
    positive("t_w", s.t_w)?;
    check_radius("r", s.r, s.n_r)?;
    ensure(s.t_f + s.r < s.d, "flange and root radius must leave room for the stem")?;
    ensure(
        s.t_w + 2.0 * s.r <= s.b,
        "stem and root radii must fit within the flange",
    )?;

    let xc = 0.5 * s.b;
    let mut ring = vec![point(xc - 0.5 * s.t_w, 0.0), point(xc + 0.5 * s.t_w, 0.0)];
    ring.extend(draw_radius(
        point(xc + 0.5 * s.t_w + s.r, s.d - s.t_f - s.r),
        s.r,
        PI,
        s.n_r,
        false,
    ));
    ring.extend([
        point(s.b, s.d - s.t_f),
        point(s.b, s.d),
        point(0.0, s.d),
        point(0.0, s.d - s.t_f),
    ]);
    ring.extend(draw_radius(
        point(xc - 0.5 * s.t_w - s.r, s.d - s.t_f - s.r),
        s.r,
        FRAC_PI_2,
        s.n_r,
        false,
    ));
    Geometry::new(ring, vec![])
}

/// Angle section with the heel at the origin.
///
/// # Errors
///
/// Returns [`GeometryError`] when the legs or radii do not fit.
pub fn angle_section(s: &AngleSection) -> Result<Geometry, GeometryError> {
    positive("d", s.d)?;
    positive("b", s.b)?;
    positive("t", s.t)?;
    non_negative("r_r", s.r_r)?;
    non_negative("r_t", s.r_t)?;
    point_count("n_r", s.n_r, if s.r_r > 0.0 || s.r_t > 0.0 { 2 } else { 1 })?;
    ensure(
        s.t + s.r_r < s.d.min(s.b),
        "leg thickness and root radius must fit within both legs",
    )?;
    ensure(s.r_t <= s.t, "toe radius cannot exceed the leg thickness")?;

    let mut ring = vec![point(0.0, 0.0), point(s.b, 0.0)];
    ring.extend(draw_radius(point(s.b - s.r_t, s.t - s.r_t), s.r_t, 0.0, s.n_r, true));
    ring.extend(draw_radius(
        point(s.t + s.r_r, s.t + s.r_r),
        s.r_r,
        1.5 * PI,
        s.n_r,
        false,
    ));
    ring.extend(draw_radius(point(s.t - s.r_t, s.d - s.r_t), s.r_t, 0.0, s.n_r, true));
    ring.push(point(0.0, s.d));
    Geometry::new(ring, vec![])
}

/// Regular polygonal hollow section centred on the origin.
///
/// The outer and inner corners share centres, so the outer radius is `r_in + t`.
///
/// # Errors
///
/// Returns [`GeometryError`] when the wall and inner radius do not fit inside
/// the polygon or `n_sides < 3`.
pub fn polygon_hollow_section(s: &PolygonHollow) -> Result<Geometry, GeometryError> {
    positive("d", s.d)?;
    positive("t", s.t)?;
    point_count("n_sides", s.n_sides, 3)?;
    check_radius("r_in", s.r_in, s.n_r)?;
    ensure(s.rot.is_finite(), "rotation must be finite")?;
    let pitch = TAU / s.n_sides as f64;
    let apothem = 0.5 * s.d * (0.5 * pitch).cos();
    ensure(
        s.t + s.r_in < apothem,
        "wall thickness and inner radius must fit inside the polygon",
    )?;

    let first = -FRAC_PI_2 + 0.5 * pitch + s.rot.to_radians();
    let mut outer = Vec::new();
    let mut inner = Vec::new();
    for k in 0..s.n_sides {
        let theta = first + k as f64 * pitch;
        let (sin, cos) = theta.sin_cos();
        if s.r_in > 0.0 {
            let r_out = s.r_in + s.t;
            let rho = (apothem - r_out) / (0.5 * pitch).cos();
            let centre = point(rho * cos, rho * sin);
            let start = theta - 0.5 * pitch;
            outer.extend(draw_arc(centre, r_out, start, pitch, s.n_r));
            inner.extend(draw_arc(centre, s.r_in, start, pitch, s.n_r));
        } else {
            let r_outer = 0.5 * s.d;
            let r_inner = (apothem - s.t) / (0.5 * pitch).cos();
            outer.push(point(r_outer * cos, r_outer * sin));
            inner.push(point(r_inner * cos, r_inner * sin));
        }
    }
    Geometry::new(outer, vec![inner])
}

/// Validate a tapered flange and return its thickness at the tip and at the web
/// face, `run` away from the point where `t_f` is measured.
fn flange_taper(s: &TaperedFlange, run: f64) -> Result<(f64, f64), GeometryError> {
    positive("d", s.d)?;
    positive("b", s.b)?;
    positive("t_f", s.t_f)?;
    positive("t_w", s.t_w)?;
    non_negative("r_r", s.r_r)?;
    non_negative("r_f", s.r_f)?;
    point_count("n_r", s.n_r, if s.r_r > 0.0 || s.r_f > 0.0 { 2 } else { 1 })?;
    ensure(
        s.alpha.is_finite() && (0.0..45.0).contains(&s.alpha),
        "flange slope must be between 0 and 45 degrees",
    )?;
    ensure(s.t_w < s.b, "web must be narrower than the flange")?;
    let rise = s.alpha.to_radians().tan() * run;
    let (tip, root) = (s.t_f - rise, s.t_f + rise);
    ensure(tip > 0.0, "flange tip thickness must be positive")?;
    ensure(2.0 * root < s.d, "flanges must leave room for the web")?;
    Ok((tip, root))
}

/// I-section with sloping inner flange faces, bottom-left corner at the origin.
///
/// `t_f` is the flange thickness halfway between the web face and the tip.
///
/// # Errors
///
/// Returns [`GeometryError`] when the flanges, web or radii do not fit.
pub fn tapered_flange_i_section(s: &TaperedFlange) -> Result<Geometry, GeometryError> {
    let (tip, root) = flange_taper(s, 0.25 * (s.b - s.t_w))?;
    let (left, right) = (0.5 * (s.b - s.t_w), 0.5 * (s.b + s.t_w));
    let corners = [
        (point(0.0, 0.0), 0.0),
        (point(s.b, 0.0), 0.0),
        (point(s.b, tip), s.r_f),
        (point(right, root), s.r_r),
        (point(right, s.d - root), s.r_r),
        (point(s.b, s.d - tip), s.r_f),
        (point(s.b, s.d), 0.0),
        (point(0.0, s.d), 0.0),
        (point(0.0, s.d - tip), s.r_f),
        (point(left, s.d - root), s.r_r),
        (point(left, root), s.r_r),
        (point(0.0, tip), s.r_f),
    ];
    Geometry::new(rounded_ring(&corners, s.n_r)?, vec![])
}

/// Channel with sloping inner flange faces, web on the left.
///
/// `t_f` is the flange thickness halfway between the web face and the tip.
///
/// # Errors
///
/// Returns [`GeometryError`] when the flanges, web or radii do not fit.
pub fn tapered_flange_channel(s: &TaperedFlange) -> Result<Geometry, GeometryError> {
    let (tip, root) = flange_taper(s, 0.5 * (s.b - s.t_w))?;
    let corners = [
        (point(0.0, 0.0), 0.0),
        (point(s.b, 0.0), 0.0),
        (point(s.b, tip), s.r_f),
        (point(s.t_w, root), s.r_r),
        (point(s.t_w, s.d - root), s.r_r),
        (point(s.b, s.d - tip), s.r_f),
        (point(s.b, s.d), 0.0),
        (point(0.0, s.d), 0.0),
    ];
    Geometry::new(rounded_ring(&corners, s.n_r)?, vec![])
}

fn lipped_checks(t: f64, l: f64, d: f64, r_out: f64, n_r: usize) -> Result<f64, GeometryError> {
    positive("d", d)?;
    positive("t", t)?;
    positive("l", l)?;
    check_radius("r_out", r_out, n_r)?;
    ensure(t < l, "lips must be longer than the wall thickness")?;
    ensure(2.0 * l < d, "lips must be shorter than half the depth")?;
    Ok((r_out - t).max(0.0))
}

/// Lipped channel with the web on the left and lips turned inwards.
///
/// # Errors
///
/// Returns [`GeometryError`] when the walls, lips or radii do not fit.
pub fn cee_section(s: &CeeSection) -> Result<Geometry, GeometryError> {
    positive("b", s.b)?;
    let r_in = lipped_checks(s.t, s.l, s.d, s.r_out, s.n_r)?;
    ensure(2.0 * s.t < s.b, "flanges must be wider than two walls")?;
    let (b, d, t, l) = (s.b, s.d, s.t, s.l);
    let corners = [
        (point(0.0, 0.0), s.r_out),
        (point(b, 0.0), s.r_out),
        (point(b, l), 0.0),
        (point(b - t, l), 0.0),
        (point(b - t, t), r_in),
        (point(t, t), r_in),
        (point(t, d - t), r_in),
        (point(b - t, d - t), r_in),
        (point(b - t, d - l), 0.0),
        (point(b, d - l), 0.0),
        (point(b, d), s.r_out),
        (point(0.0, d), s.r_out),
    ];
    Geometry::new(rounded_ring(&corners, s.n_r)?, vec![])
}

/// Lipped zed: the bottom flange runs right with its lip up, the top flange
/// runs left with its lip down.
///
/// # Errors
///
/// Returns [`GeometryError`] when the walls, lips or radii do not fit.
pub fn zed_section(s: &ZedSection) -> Result<Geometry, GeometryError> {
    positive("b_l", s.b_l)?;
    positive("b_r", s.b_r)?;
    let r_in = lipped_checks(s.t, s.l, s.d, s.r_out, s.n_r)?;
    ensure(
        2.0 * s.t < s.b_l.min(s.b_r),
        "flanges must be wider than two walls",
    )?;
    let (d, t, l) = (s.d, s.t, s.l);
    let web = s.b_l - t;
    let toe = web + s.b_r;
    let corners = [
        (point(web, 0.0), s.r_out),
        (point(toe, 0.0), s.r_out),
        (point(toe, l), 0.0),
        (point(toe - t, l), 0.0),
        (point(toe - t, t), r_in),
        (point(s.b_l, t), r_in),
        (point(s.b_l, d), s.r_out),
        (point(0.0, d), s.r_out),
        (point(0.0, d - l), 0.0),
        (point(t, d - l), 0.0),
        (point(t, d - t), r_in),
        (point(web, d - t), r_in),
    ];
    Geometry::new(rounded_ring(&corners, s.n_r)?, vec![])
}

/// Trapezoidal box girder, symmetric about the vertical axis, bottom-left of
/// its bounding box at the origin.
///
/// # Errors
///
/// Returns [`GeometryError`] when the flanges or webs close the opening.
pub fn box_girder_section(s: &BoxGirder) -> Result<Geometry, GeometryError> {
    positive("d", s.d)?;
    positive("b_t", s.b_t)?;
    positive("b_b", s.b_b)?;
    positive("t_ft", s.t_ft)?;
    positive("t_fb", s.t_fb)?;
    positive("t_w", s.t_w)?;
    ensure(s.t_ft + s.t_fb < s.d, "flanges must leave an opening")?;

    let xc = 0.5 * s.b_t.max(s.b_b);
    // Horizontal run of the outer web face per unit height.
    let slope = 0.5 * (s.b_t - s.b_b) / s.d;
    let web = s.t_w * (1.0 + slope * slope).sqrt();
    let outer_half = |y: f64| 0.5 * s.b_b + slope * y;
    let (bottom, top) = (s.t_fb, s.d - s.t_ft);
    let (inner_bottom, inner_top) = (outer_half(bottom) - web, outer_half(top) - web);
    ensure(
        inner_bottom > 0.0 && inner_top > 0.0,
        "webs must leave an opening",
    )?;

    let outer = vec![
        point(xc - 0.5 * s.b_b, 0.0),
        point(xc + 0.5 * s.b_b, 0.0),
        point(xc + 0.5 * s.b_t, s.d),
        point(xc - 0.5 * s.b_t, s.d),
    ];
    let inner = vec![
        point(xc - inner_bottom, bottom),
        point(xc + inner_bottom, bottom),
        point(xc + inner_top, top),
        point(xc - inner_top, top),
    ];
    Geometry::new(outer, vec![inner])
}

/// Bulb flat with the web on the left and the bulb at the top right.
///
/// The underside of the bulb runs from the web at depth `d - d_b` tangent to
/// the tip radius, with a root radius of the same size where it meets the web.
///
/// # Errors
///
/// Returns [`GeometryError`] when the bulb does not fit on the web.
pub fn bulb_section(s: &BulbSection) -> Result<Geometry, GeometryError> {
    positive("d", s.d)?;
    positive("b", s.b)?;
    positive("t", s.t)?;
    check_radius("r", s.r, s.n_r)?;
    ensure(s.t < s.b, "bulb must be wider than the web")?;
    ensure(s.r < s.b - s.t, "bulb radius must be less than the bulb outstand")?;
    let d_b = s.d_b.unwrap_or(s.b - s.t + 2.0 * s.r);
    positive("d_b", d_b)?;
    ensure(d_b > s.r && d_b < s.d, "bulb depth must lie within the section depth")?;

    let root = point(s.t, s.d - d_b);
    let centre = point(s.b - s.r, s.d - s.r);
    let reach = Vector2::from(centre) - Vector2::from(root);
    let distance = reach.norm();
    ensure(distance > s.r, "bulb radius must be less than the bulb depth")?;
    // Rotate the reach clockwise so the tip circle sits left of the underside.
    let lean = (s.r / distance).asin();
    let (sin, cos) = lean.sin_cos();
    let along = reach / distance;
    let direction = Vector2::new(along.x * cos + along.y * sin, -along.x * sin + along.y * cos);
    let tangent = Point::from(Vector2::from(root) + direction * (distance * distance - s.r * s.r).sqrt());

    let web_foot = point(s.t, 0.0);
    let (root_arc, root_reach) = fillet(web_foot, root, tangent, s.r, s.n_r);
    ensure(
        root_reach <= (s.d - d_b).min((distance * distance - s.r * s.r).sqrt()),
        "root radius does not fit below the bulb",
    )?;

    let mut ring = vec![point(0.0, 0.0), web_foot];
    ring.extend(root_arc);
    if s.r > 0.0 {
        let start = (tangent.y - centre.y).atan2(tangent.x - centre.x);
        ring.extend(draw_arc(centre, s.r, start, FRAC_PI_2 - start, s.n_r));
    } else {
        ring.push(centre);
    }
    ring.push(point(0.0, s.d));
    Geometry::new(ring, vec![])
}
