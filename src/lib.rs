#![warn(clippy::all)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod conversation;
pub mod driver;
pub mod errors;
pub mod geometry;
pub mod library;
pub mod llm;
pub mod mesh;
pub mod plot;
pub mod properties;
pub mod section;
pub mod session;
mod solver;
pub mod stress;
pub mod tools;

pub use conversation::{Content, Conversation, FunctionCall, FunctionResponse, Part, Role};
pub use driver::{TurnDriver, TurnEnd, TurnOutcome, DEFAULT_MAX_TOOL_ROUNDS};
pub use errors::{AnalysisError, GeometryError, LlmError, MeshError, SchemaError, ToolError};
pub use geometry::{point, Geometry, Material, Point};
pub use library::{
    angle_section, box_girder_section, bulb_section, cee_section, channel_section,
    circular_hollow_section, elliptical_hollow_section, i_section, mono_i_section,
    polygon_hollow_section, rectangular_hollow_section, tapered_flange_channel,
    tapered_flange_i_section, tee_section, zed_section, AngleSection, BoxGirder, BulbSection,
    CeeSection, ChannelSection, CircularHollow, EllipticalHollow, ISection, MonoISection,
    PolygonHollow, RectangularHollow, SectionSpec, TaperedFlange, TeeSection, ZedSection,
    MAX_CURVE_POINTS,
};
pub use llm::{GeminiClient, GeminiConfig, GenerationConfig, LlmClient, ModelReply};
pub use mesh::Mesh;
pub use plot::Figure;
pub use properties::{GeometricProperties, WarpingProperties};
pub use section::Section;
pub use session::SessionState;
pub use stress::{LoadCase, PointStress, StressComponent, StressResult, StressSummary};
pub use tools::dispatch::Dispatcher;
pub use tools::schema::ToolSchema;
pub use tools::{ToolKind, ToolOutput, ToolResult, ToolStatus};
