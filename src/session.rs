//! Per-conversation state shared by the dispatcher and the turn driver.

use serde_json::Value;

use crate::conversation::Conversation;
use crate::geometry::Geometry;
use crate::plot::Figure;
use crate::section::Section;
use crate::stress::StressResult;

/// Everything one conversation owns: the history and at most one object per
/// analysis slot.
///
/// Each slot is replaced wholesale by the latest successful tool call of its kind.
#[derive(Debug, Default)]
pub struct SessionState {
    conversation: Conversation,
    geometry: Option<Geometry>,
    section: Option<Section>,
    stress: Option<StressResult>,
    figure: Option<Figure>,
    tool_log: Vec<String>,
}

impl SessionState {
    /// Fresh session with an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Conversation history.
    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Mutable conversation history.
    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    /// Current geometry.
    #[must_use]
    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    /// Current analysis section.
    #[must_use]
    pub fn section(&self) -> Option<&Section> {
        self.section.as_ref()
    }

    /// Mutable analysis section.
    pub fn section_mut(&mut self) -> Option<&mut Section> {
        self.section.as_mut()
    }

    /// Last stress result.
    #[must_use]
    pub fn stress(&self) -> Option<&StressResult> {
        self.stress.as_ref()
    }

    /// Last generated figure.
    #[must_use]
    pub fn figure(&self) -> Option<&Figure> {
        self.figure.as_ref()
    }

    /// Log of tool calls, one line per call.
    #[must_use]
    pub fn tool_log(&self) -> &[String] {
        &self.tool_log
    }

    /// Replace the geometry and section. Stresses of the previous section are dropped.
    pub fn set_section(&mut self, geometry: Geometry, section: Section) {
        self.geometry = Some(geometry);
        self.section = Some(section);
        self.stress = None;
    }

    /// Replace the stress result.
    pub fn set_stress(&mut self, stress: StressResult) {
        self.stress = Some(stress);
    }

    /// Replace the last figure.
    pub fn set_figure(&mut self, figure: Figure) {
        self.figure = Some(figure);
    }

    /// Record a tool call in the log.
    pub fn log_call(&mut self, name: &str, args: &Value) {
        self.tool_log.push(format!("{name} with args: {args}"));
    }

    /// Forget the conversation and every analysis object.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
