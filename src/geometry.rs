//! Fundamental geometric types for cross-section modelling.

use nalgebra::Vector2;
use serde::Serialize;

use crate::errors::GeometryError;

/// Position in the section plane measured in millimetres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
    /// Distance along the global x axis.
    pub x: f64,
    /// Distance along the global y axis.
    pub y: f64,
}

impl Point {
    /// Create a [`Point`] with explicit coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convert the point into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    /// Midpoint between `self` and `other`.
    #[must_use]
    pub fn midpoint(self, other: Point) -> Point {
        Point::new(0.5 * (self.x + other.x), 0.5 * (self.y + other.y))
    }

    /// Squared distance to `other`.
    #[must_use]
    pub fn distance_squared(self, other: Point) -> f64 {
        (self.to_vector() - other.to_vector()).norm_squared()
    }
}

impl From<Vector2<f64>> for Point {
    fn from(value: Vector2<f64>) -> Self {
        Self::new(value.x, value.y)
    }
}

impl From<Point> for Vector2<f64> {
    fn from(value: Point) -> Self {
        value.to_vector()
    }
}

/// Convenience helper for creating [`Point`] instances.
///
/// # Examples
/// ```
/// use sectionx::point;
///
/// let origin = point(0.0, 0.0);
/// assert_eq!(origin.x, 0.0);
/// ```
#[must_use]
pub const fn point(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

/// Twice the signed area of the triangle `a`, `b`, `c` (positive when counter-clockwise).
#[must_use]
pub fn cross(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Signed area of a closed ring (positive when counter-clockwise).
#[must_use]
pub fn ring_area(ring: &[Point]) -> f64 {
    let n = ring.len();
    let mut twice = 0.0;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        twice += a.x * b.y - b.x * a.y;
    }
    0.5 * twice
}

/// Length of a closed ring.
#[must_use]
pub fn ring_perimeter(ring: &[Point]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| ring[i].distance_squared(ring[(i + 1) % n]).sqrt())
        .sum()
}

/// Even-odd point in ring test. Points exactly on the boundary may land either side.
#[must_use]
pub fn ring_contains(ring: &[Point], p: Point) -> bool {
    let n = ring.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = ring[i];
        let b = ring[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Isotropic linear elastic material. Units follow N and mm.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Material {
    /// Display name.
    pub name: String,
    /// Elastic modulus in MPa.
    pub elastic_modulus: f64,
    /// Poisson's ratio.
    pub poissons_ratio: f64,
    /// Density in kg/mm³.
    pub density: f64,
    /// Yield strength in MPa.
    pub yield_strength: f64,
    /// Fill colour used by the mesh plot.
    pub color: String,
}

impl Material {
    /// Structural steel S235, the material attached to every generated section.
    #[must_use]
    pub fn s235() -> Self {
        Self {
            name: "S235".to_string(),
            elastic_modulus: 210_000.0,
            poissons_ratio: 0.3,
            density: 7.85e-6,
            yield_strength: 235.0,
            color: "cyan".to_string(),
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::s235()
    }
}

/// A single-material section outline: one outer ring and any number of holes.
///
/// Rings are stored without a repeated closing point. The outer ring is kept
/// counter-clockwise and holes clockwise.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    outer: Vec<Point>,
    holes: Vec<Vec<Point>>,
    /// Material assigned to the whole section.
    pub material: Material,
}

impl Geometry {
    /// Create a geometry from an outer ring and holes, normalising orientation and
    /// dropping consecutive duplicate points.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::DegenerateRing`] when a ring has fewer than three distinct
    /// points or encloses no area.
    pub fn new(outer: Vec<Point>, holes: Vec<Vec<Point>>) -> Result<Self, GeometryError> {
        let outer = normalise_ring(outer, true)?;
        let holes = holes
            .into_iter()
            .map(|hole| normalise_ring(hole, false))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            outer,
            holes,
            material: Material::default(),
        })
    }

    /// Replace the material.
    #[must_use]
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Outer boundary, counter-clockwise.
    #[must_use]
    pub fn outer(&self) -> &[Point] {
        &self.outer
    }

    /// Hole boundaries, clockwise.
    #[must_use]
    pub fn holes(&self) -> &[Vec<Point>] {
        &self.holes
    }

    /// Net enclosed area in mm².
    #[must_use]
    pub fn area(&self) -> f64 {
        ring_area(&self.outer) + self.holes.iter().map(|h| ring_area(h)).sum::<f64>()
    }

    /// Length of the outer boundary in mm.
    #[must_use]
    pub fn perimeter(&self) -> f64 {
        ring_perimeter(&self.outer)
    }

    /// Whether `p` lies in the material (inside the outer ring, outside every hole).
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        ring_contains(&self.outer, p) && !self.holes.iter().any(|h| ring_contains(h, p))
    }

    /// Axis-aligned bounding box as `(min, max)`.
    #[must_use]
    pub fn bounds(&self) -> (Point, Point) {
        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &self.outer {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        (min, max)
    }
}

/// Remove duplicate points and enforce the requested orientation.
fn normalise_ring(ring: Vec<Point>, ccw: bool) -> Result<Vec<Point>, GeometryError> {
    let tolerance = 1.0e-9;
    let mut cleaned: Vec<Point> = Vec::with_capacity(ring.len());
    for p in ring {
        if cleaned
            .last()
            .map_or(true, |last| last.distance_squared(p) > tolerance)
        {
            cleaned.push(p);
        }
    }
    while cleaned.len() > 1 && cleaned[0].distance_squared(cleaned[cleaned.len() - 1]) <= tolerance
    {
        cleaned.pop();
    }
    if cleaned.len() < 3 {
        return Err(GeometryError::DegenerateRing);
    }
    let area = ring_area(&cleaned);
    if area.abs() <= tolerance {
        return Err(GeometryError::DegenerateRing);
    }
    if (area > 0.0) != ccw {
        cleaned.reverse();
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Vec<Point> {
        vec![
            point(0.0, 0.0),
            point(size, 0.0),
            point(size, size),
            point(0.0, size),
        ]
    }

    #[test]
    fn point_to_vector_roundtrip() {
        let p = Point::new(1.0, 2.0);
        let vector: Vector2<f64> = p.into();
        assert_eq!(vector, Vector2::new(1.0, 2.0));
        assert_eq!(Point::from(vector), p);
    }

    #[test]
    fn rings_are_normalised() {
        let mut clockwise = square(10.0);
        clockwise.reverse();
        let hole = vec![point(2.0, 2.0), point(4.0, 2.0), point(4.0, 4.0), point(2.0, 4.0)];
        let geometry = Geometry::new(clockwise, vec![hole]).expect("valid rings");
        assert!(ring_area(geometry.outer()) > 0.0);
        assert!(ring_area(&geometry.holes()[0]) < 0.0);
        assert!((geometry.area() - 96.0).abs() < 1.0e-12);
    }

    #[test]
    fn closing_point_is_dropped() {
        let mut ring = square(1.0);
        ring.push(point(0.0, 0.0));
        let geometry = Geometry::new(ring, vec![]).expect("valid ring");
        assert_eq!(geometry.outer().len(), 4);
        assert!((geometry.perimeter() - 4.0).abs() < 1.0e-12);
    }

    #[test]
    fn degenerate_ring_is_rejected() {
        let line = vec![point(0.0, 0.0), point(1.0, 0.0), point(2.0, 0.0)];
        assert_eq!(
            Geometry::new(line, vec![]).expect_err("no area"),
            GeometryError::DegenerateRing
        );
    }

    #[test]
    fn containment_respects_holes() {
        let hole = vec![point(2.0, 2.0), point(4.0, 2.0), point(4.0, 4.0), point(2.0, 4.0)];
        let geometry = Geometry::new(square(10.0), vec![hole]).expect("valid rings");
        assert!(geometry.contains(point(1.0, 1.0)));
        assert!(!geometry.contains(point(3.0, 3.0)));
        assert!(!geometry.contains(point(11.0, 3.0)));
    }

    #[test]
    fn default_material_is_s235() {
        let material = Material::default();
        assert_eq!(material.name, "S235");
        assert!((material.elastic_modulus - 210_000.0).abs() < f64::EPSILON);
    }
}
