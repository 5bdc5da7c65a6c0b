//! Tool catalogue, results and dispatch.

pub mod dispatch;
pub mod schema;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::ToolError;
use crate::plot::Figure;

/// Every function the model may call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Build a circular hollow section.
    CircularHollowSection,
    /// Build an elliptical hollow section.
    EllipticalHollowSection,
    /// Build a rectangular hollow section.
    RectangularHollowSection,
    /// Build a doubly symmetric I-section.
    ISection,
    /// Build a monosymmetric I-section.
    MonoISection,
    /// Build a parallel flange channel.
    ChannelSection,
    /// Build a tee section.
    TeeSection,
    /// Build an angle section.
    AngleSection,
    /// Build a regular polygonal hollow section.
    PolygonHollowSection,
    /// Build a tapered flange I-section.
    TaperedFlangeISection,
    /// Build a tapered flange channel.
    TaperedFlangeChannel,
    /// Build a lipped channel.
    CeeSection,
    /// Build a lipped zed.
    ZedSection,
    /// Build a trapezoidal box girder.
    BoxGirderSection,
    /// Build a bulb flat.
    BulbSection,
    /// Run the geometric analysis.
    CalculateGeometricProperties,
    /// Run the warping analysis.
    CalculateWarpingProperties,
    /// Calculate stresses for a load case.
    CalculateStress,
    /// Plot a stress component.
    PlotStress,
}

impl ToolKind {
    /// Every tool in declaration order.
    pub const ALL: [ToolKind; 19] = [
        ToolKind::CircularHollowSection,
        ToolKind::EllipticalHollowSection,
        ToolKind::RectangularHollowSection,
        ToolKind::ISection,
        ToolKind::MonoISection,
        ToolKind::ChannelSection,
        ToolKind::TeeSection,
        ToolKind::AngleSection,
        ToolKind::PolygonHollowSection,
        ToolKind::TaperedFlangeISection,
        ToolKind::TaperedFlangeChannel,
        ToolKind::CeeSection,
        ToolKind::ZedSection,
        ToolKind::BoxGirderSection,
        ToolKind::BulbSection,
        ToolKind::CalculateGeometricProperties,
        ToolKind::CalculateWarpingProperties,
        ToolKind::CalculateStress,
        ToolKind::PlotStress,
    ];

    /// Name used in declarations and function calls.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::CircularHollowSection => "circular_hollow_section",
            ToolKind::EllipticalHollowSection => "elliptical_hollow_section",
            ToolKind::RectangularHollowSection => "rectangular_hollow_section",
            ToolKind::ISection => "i_section",
            ToolKind::MonoISection => "mono_i_section",
            ToolKind::ChannelSection => "channel_section",
            ToolKind::TeeSection => "tee_section",
            ToolKind::AngleSection => "angle_section",
            ToolKind::PolygonHollowSection => "polygon_hollow_section",
            ToolKind::TaperedFlangeISection => "tapered_flange_i_section",
            ToolKind::TaperedFlangeChannel => "tapered_flange_channel",
            ToolKind::CeeSection => "cee_section",
            ToolKind::ZedSection => "zed_section",
            ToolKind::BoxGirderSection => "box_girder_section",
            ToolKind::BulbSection => "bulb_section",
            ToolKind::CalculateGeometricProperties => "calculate_geometric_properties",
            ToolKind::CalculateWarpingProperties => "calculate_warping_properties",
            ToolKind::CalculateStress => "calculate_stress",
            ToolKind::PlotStress => "plot_stress",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolKind {
    type Err = ToolError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| ToolError::Unknown(name.to_string()))
    }
}

/// Outcome flag of a tool call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    /// The call succeeded.
    Success,
    /// The call failed; the message explains why.
    Error,
}

/// Structured result returned to the model as a function response.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolResult {
    /// Success or error.
    pub status: ToolStatus,
    /// Human readable summary.
    pub message: String,
    /// Tool specific fields, serialised next to `status` and `message`.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ToolResult {
    /// Successful result with a message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            message: message.into(),
            payload: Map::new(),
        }
    }

    /// Failed result with a message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            message: message.into(),
            payload: Map::new(),
        }
    }

    /// Add a payload field.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    /// Whether the call succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    /// JSON object sent back to the model.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert(
            "status".to_string(),
            Value::from(match self.status {
                ToolStatus::Success => "success",
                ToolStatus::Error => "error",
            }),
        );
        object.insert("message".to_string(), Value::from(self.message.clone()));
        object.extend(self.payload.clone());
        Value::Object(object)
    }
}

/// Result of one dispatched call plus the figure it produced, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolOutput {
    /// Result for the model.
    pub result: ToolResult,
    /// Figure for the user.
    pub figure: Option<Figure>,
}

impl From<ToolResult> for ToolOutput {
    fn from(result: ToolResult) -> Self {
        Self {
            result,
            figure: None,
        }
    }
}
