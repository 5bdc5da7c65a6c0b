//! Error types produced while building, meshing and analysing sections, and while
//! talking to the model service.

use thiserror::Error;

/// Error returned when a section builder receives dimensions that do not describe a
/// valid shape.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GeometryError {
    /// Returned when a dimension must be strictly positive.
    #[error("{name} must be positive (received {value})")]
    NonPositive {
        /// Name of the offending parameter.
        name: &'static str,
        /// Rejected value in millimetres.
        value: f64,
    },
    /// Returned when a dimension must not be negative.
    #[error("{name} must not be negative (received {value})")]
    Negative {
        /// Name of the offending parameter.
        name: &'static str,
        /// Rejected value in millimetres.
        value: f64,
    },
    /// Returned when the parameters are individually valid but do not fit together.
    #[error("inconsistent dimensions: {0}")]
    Inconsistent(String),
    /// Returned when a ring has fewer than three distinct points or no area.
    #[error("boundary ring is degenerate")]
    DegenerateRing,
    /// Returned when a curve is discretised with too few points.
    #[error("{name} needs at least {min} points (received {value})")]
    TooFewPoints {
        /// Name of the offending parameter.
        name: &'static str,
        /// Minimum accepted count.
        min: usize,
        /// Rejected count.
        value: usize,
    },
    /// Returned when a curve is discretised with more points than accepted.
    #[error("{name} accepts at most {max} points (received {value})")]
    TooManyPoints {
        /// Name of the offending parameter.
        name: &'static str,
        /// Maximum accepted count.
        max: usize,
        /// Rejected count.
        value: usize,
    },
}

/// Error returned when a geometry cannot be turned into a finite element mesh.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MeshError {
    /// Returned when the requested element size is zero, negative or not finite.
    #[error("mesh size must be a positive area in mm² (received {0})")]
    InvalidMeshSize(f64),
    /// Returned when a boundary point cannot be inserted into the triangulation.
    #[error("boundary point ({x}, {y}) cannot be triangulated")]
    InvalidVertex {
        /// x coordinate of the rejected point.
        x: f64,
        /// y coordinate of the rejected point.
        y: f64,
    },
    /// Returned when two boundary segments cross each other.
    #[error("section boundary intersects itself")]
    CrossingBoundary,
    /// Returned when the outline has more points than the mesher accepts.
    #[error("section boundary has {count} points; at most {max} are supported")]
    TooManyBoundaryNodes {
        /// Number of boundary points of the geometry.
        count: usize,
        /// Accepted maximum.
        max: usize,
    },
    /// Returned when the mesh splits into several unconnected regions.
    #[error("section is made of {0} disconnected regions")]
    Disconnected(usize),
    /// Returned when refinement would exceed the element budget.
    #[error("mesh would exceed {0} elements; use a larger mesh size")]
    TooManyElements(usize),
}

/// Error returned when an analysis step is requested out of order or fails numerically.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum AnalysisError {
    /// Returned when a step needs the geometric properties first.
    #[error("geometric properties have not been calculated; run calculate_geometric_properties first")]
    MissingGeometricProperties,
    /// Returned when a step needs the warping properties first.
    #[error("warping properties have not been calculated; run calculate_warping_properties first")]
    MissingWarpingProperties,
    /// Returned when the section has zero area or zero second moment.
    #[error("section properties are degenerate: {0}")]
    Degenerate(&'static str),
    /// Returned when the iterative solver fails to converge.
    #[error("{problem} solve did not converge after {iterations} iterations (relative residual {residual:.3e})")]
    NotConverged {
        /// Which finite element problem was being solved.
        problem: &'static str,
        /// Iterations performed.
        iterations: usize,
        /// Final relative residual.
        residual: f64,
    },
}

/// Error raised while executing a single tool call.
///
/// The dispatcher converts every variant into an error [`ToolResult`](crate::ToolResult)
/// so the model can decide how to recover.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ToolError {
    /// Returned when the model asks for a function outside the known tool set.
    #[error("Tool '{0}' is not implemented or not available.")]
    Unknown(String),
    /// Returned when the arguments do not match the tool's parameter schema.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// Returned when a property or stress tool runs before a section exists.
    #[error("no section has been generated yet; create a section geometry first")]
    MissingSection,
    /// Returned when plotting runs before stresses exist.
    #[error("Stresses have not been calculated yet. Please calculate stresses before plotting.")]
    MissingStresses,
    /// Wrapped builder failure.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    /// Wrapped meshing failure.
    #[error(transparent)]
    Mesh(#[from] MeshError),
    /// Wrapped analysis failure.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    /// Returned when a figure cannot be written.
    #[error("figure could not be rendered")]
    Plot(#[from] std::fmt::Error),
    /// Returned when a result cannot be converted to JSON.
    #[error("result could not be encoded: {0}")]
    Encode(String),
}

/// Error returned when the tool declaration file cannot be used.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Returned when the file cannot be read.
    #[error("failed to read tool declarations from {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Returned when the file is not a JSON array of declarations.
    #[error("tool declarations are not valid: {0}")]
    Json(#[from] serde_json::Error),
    /// Returned when two declarations share a name.
    #[error("tool '{0}' is declared more than once")]
    Duplicate(String),
}

/// Error returned while contacting the model service.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Returned when no API key is configured.
    #[error("no API key configured; set GEMINI_API_KEY or pass --api-key")]
    MissingApiKey,
    /// Returned when the HTTP request fails before a response arrives.
    #[error("request to model service failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Returned when the service answers with a non-success status.
    #[error("model service returned HTTP {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, usually a JSON error object.
        body: String,
    },
    /// Returned when the response body cannot be decoded.
    #[error("model service response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}
