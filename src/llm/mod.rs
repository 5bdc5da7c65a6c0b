//! Boundary to the hosted function-calling model.

mod gemini;

pub use gemini::{GeminiClient, GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};

use async_trait::async_trait;

use crate::conversation::Content;
use crate::errors::LlmError;
use crate::tools::schema::ToolSchema;

/// System instruction sent with every request unless overridden.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that uses specific functions to analyse sections. \
If a suitable function is found but not all required parameters are provided, ask the user for the missing parameters or propose defaults. \
Never blindly guess parameters and move forward without confirmation. \
Also describe the function you are going to use. \
If a function call was detected, always provide text output to the user based on the function response.";

/// First message shown by the shells.
pub const GREETING: &str =
    "This is an app build around sectionproperties to analyse sections. How can I help you?";

/// Fixed part of every request.
#[derive(Clone, Debug)]
pub struct GenerationConfig {
    /// Behavioural instruction for the model.
    pub system_instruction: String,
    /// Function declarations offered to the model.
    pub tools: ToolSchema,
}

impl GenerationConfig {
    /// Config with the default system instruction.
    #[must_use]
    pub fn new(tools: ToolSchema) -> Self {
        Self {
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            tools,
        }
    }
}

/// First candidate of a model response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelReply {
    /// Content of the first candidate, `None` when the response had no usable parts.
    pub content: Option<Content>,
    /// Why generation stopped, as reported by the service.
    pub finish_reason: Option<String>,
    /// Set when the prompt itself was blocked.
    pub block_reason: Option<String>,
}

/// A model that can continue a conversation.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate the next model turn for `contents`.
    async fn generate(
        &self,
        config: &GenerationConfig,
        contents: &[Content],
    ) -> Result<ModelReply, LlmError>;
}
