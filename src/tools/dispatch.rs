//! Executes function calls against the session state.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::errors::ToolError;
use crate::library::SectionSpec;
use crate::plot::{mesh_plot, stress_plot};
use crate::section::Section;
use crate::session::SessionState;
use crate::stress::{LoadCase, StressComponent};
use crate::tools::{ToolKind, ToolOutput, ToolResult};

/// Default maximum triangle area in mm².
pub const DEFAULT_MESH_SIZE: f64 = 10.0;

/// Arguments of the property tools, which take none.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PlotArgs {
    #[serde(alias = "plot_type", default = "default_plot")]
    stress: String,
}

fn default_plot() -> String {
    StressComponent::Vm.name().to_string()
}

/// Decode tool arguments. A missing argument object counts as empty.
fn decode<T: DeserializeOwned>(args: &Value) -> Result<T, ToolError> {
    let args = match args {
        Value::Null => Value::Object(Map::new()),
        other => other.clone(),
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

fn encode(value: &impl Serialize) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::Encode(e.to_string()))
}

/// Routes function calls to the section engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dispatcher {
    mesh_size: f64,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MESH_SIZE)
    }
}

impl Dispatcher {
    /// Dispatcher meshing new sections with triangles of at most `mesh_size` mm².
    #[must_use]
    pub fn new(mesh_size: f64) -> Self {
        Self { mesh_size }
    }

    /// Element size used for new sections.
    #[must_use]
    pub fn mesh_size(&self) -> f64 {
        self.mesh_size
    }

    /// Execute one call. Every failure is folded into an error result.
    pub fn dispatch(&self, session: &mut SessionState, name: &str, args: &Value) -> ToolOutput {
        session.log_call(name, args);
        let kind = match name.parse::<ToolKind>() {
            Ok(kind) => kind,
            Err(e) => {
                warn!(tool = name, "model requested an unknown tool");
                return ToolResult::error(e.to_string()).into();
            }
        };
        info!(tool = name, "dispatching tool call");
        match self.run(kind, session, args) {
            Ok(output) => output,
            Err(ToolError::MissingStresses) => {
                warn!(tool = name, "plot requested before stresses");
                ToolResult::error(ToolError::MissingStresses.to_string()).into()
            }
            Err(e) => {
                warn!(tool = name, error = %e, "tool call failed");
                ToolResult::error(format!("Error calling {name}: {e}")).into()
            }
        }
    }

    fn run(
        &self,
        kind: ToolKind,
        session: &mut SessionState,
        args: &Value,
    ) -> Result<ToolOutput, ToolError> {
        let spec = match kind {
            ToolKind::CircularHollowSection => SectionSpec::CircularHollow(decode(args)?),
            ToolKind::EllipticalHollowSection => SectionSpec::EllipticalHollow(decode(args)?),
            ToolKind::RectangularHollowSection => SectionSpec::RectangularHollow(decode(args)?),
            ToolKind::ISection => SectionSpec::I(decode(args)?),
            ToolKind::MonoISection => SectionSpec::MonoI(decode(args)?),
            ToolKind::ChannelSection => SectionSpec::Channel(decode(args)?),
            ToolKind::TeeSection => SectionSpec::Tee(decode(args)?),
            ToolKind::AngleSection => SectionSpec::Angle(decode(args)?),
            ToolKind::PolygonHollowSection => SectionSpec::PolygonHollow(decode(args)?),
            ToolKind::TaperedFlangeISection => SectionSpec::TaperedFlangeI(decode(args)?),
            ToolKind::TaperedFlangeChannel => SectionSpec::TaperedFlangeChannel(decode(args)?),
            ToolKind::CeeSection => SectionSpec::Cee(decode(args)?),
            ToolKind::ZedSection => SectionSpec::Zed(decode(args)?),
            ToolKind::BoxGirderSection => SectionSpec::BoxGirder(decode(args)?),
            ToolKind::BulbSection => SectionSpec::Bulb(decode(args)?),
            ToolKind::CalculateGeometricProperties => {
                decode::<NoArgs>(args)?;
                return geometric(session).map(Into::into);
            }
            ToolKind::CalculateWarpingProperties => {
                decode::<NoArgs>(args)?;
                return warping(session).map(Into::into);
            }
            ToolKind::CalculateStress => return stress(session, args).map(Into::into),
            ToolKind::PlotStress => return plot(session, args),
        };
        self.build(session, &spec)
    }

    fn build(&self, session: &mut SessionState, spec: &SectionSpec) -> Result<ToolOutput, ToolError> {
        let geometry = spec.build()?;
        let section = Section::new(geometry.clone(), self.mesh_size)?;
        let figure = mesh_plot(&section)?;
        let size = if self.mesh_size == DEFAULT_MESH_SIZE {
            "A default element size"
        } else {
            "An element size"
        };
        let result = ToolResult::success(format!(
            "Geometry of the section generated and meshed successfully. {size} of {} mm² and Material {} was used. A plot was generated showing the section mesh.",
            self.mesh_size, geometry.material.name
        ))
        .with("element_count", section.mesh().element_count())
        .with(
            "next_steps_suggestion",
            "Would you like to evaluate the section properties or perform a stress analysis?",
        );
        info!(
            elements = section.mesh().element_count(),
            nodes = section.mesh().node_count(),
            "section meshed"
        );
        session.set_section(geometry, section);
        session.set_figure(figure.clone());
        Ok(ToolOutput {
            result,
            figure: Some(figure),
        })
    }
}

fn geometric(session: &mut SessionState) -> Result<ToolResult, ToolError> {
    let section = session.section_mut().ok_or(ToolError::MissingSection)?;
    let properties = encode(section.calculate_geometric_properties()?)?;
    Ok(
        ToolResult::success("Geometric section properties have been calculated successfully.")
            .with("section_properties", properties)
            .with(
                "next_steps_suggestion",
                "Would you like to calculate warping properties or perform a stress analysis?",
            ),
    )
}

fn warping(session: &mut SessionState) -> Result<ToolResult, ToolError> {
    let section = session.section_mut().ok_or(ToolError::MissingSection)?;
    let properties = encode(section.calculate_warping_properties()?)?;
    Ok(
        ToolResult::success("Warping properties of the section have been calculated successfully.")
            .with("warping_properties", properties)
            .with(
                "next_steps_suggestion",
                "Would you like to continue with a stress analysis?",
            ),
    )
}

fn stress(session: &mut SessionState, args: &Value) -> Result<ToolResult, ToolError> {
    let load: LoadCase = decode(args)?;
    let section = session.section().ok_or(ToolError::MissingSection)?;
    let result = section.calculate_stress(&load)?;
    let summary = encode(&result.summary())?;
    session.set_stress(result);

    let mut tool_result = ToolResult::success("Section stresses have been calculated successfully.");
    if let Value::Object(fields) = summary {
        tool_result.payload.extend(fields);
    }
    Ok(tool_result.with(
        "next_steps_suggestion",
        "Would you like to view the stress results? I could plot the Axial, Shear or von Mises stresses for you.",
    ))
}

fn plot(session: &mut SessionState, args: &Value) -> Result<ToolOutput, ToolError> {
    let args: PlotArgs = decode(args)?;
    let component: StressComponent = args.stress.parse().map_err(ToolError::InvalidArguments)?;
    let stress = session.stress().ok_or(ToolError::MissingStresses)?;
    let section = session.section().ok_or(ToolError::MissingSection)?;
    let figure = stress_plot(section, stress, component)?;
    session.set_figure(figure.clone());
    let result = ToolResult::success(format!("Plot of {} stresses generated.", component.name()))
        .with("plot_description", "A plot of the stresses over the section.")
        .with("caption_suggestion", "Here's the section stress plot.");
    Ok(ToolOutput {
        result,
        figure: Some(figure),
    })
}
