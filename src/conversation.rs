//! Conversation history exchanged with the model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person using the assistant. Function responses are sent in user turns.
    User,
    /// The language model.
    Model,
}

/// Function invocation requested by the model.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionCall {
    /// Declared tool name.
    pub name: String,
    /// Arguments as a JSON object.
    pub args: Value,
    /// Opaque signature attached by thinking models, echoed back unchanged.
    pub thought_signature: Option<String>,
}

impl FunctionCall {
    /// Create a call without a signature.
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
            thought_signature: None,
        }
    }
}

/// Result of a function call, returned to the model.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionResponse {
    /// Name of the tool that produced the response.
    pub name: String,
    /// Structured result object.
    pub response: Value,
}

/// One piece of a conversation turn.
#[derive(Clone, Debug, PartialEq)]
pub enum Part {
    /// Plain text.
    Text(String),
    /// Tool invocation requested by the model.
    FunctionCall(FunctionCall),
    /// Tool result.
    FunctionResponse(FunctionResponse),
}

/// A single turn of the conversation.
#[derive(Clone, Debug, PartialEq)]
pub struct Content {
    /// Author of the turn.
    pub role: Role,
    /// Ordered parts.
    pub parts: Vec<Part>,
}

impl Content {
    /// User turn holding a text prompt.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Model turn holding text.
    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// User turn carrying the responses to every call of the previous model turn.
    #[must_use]
    pub fn function_responses(responses: Vec<FunctionResponse>) -> Self {
        Self {
            role: Role::User,
            parts: responses.into_iter().map(Part::FunctionResponse).collect(),
        }
    }

    /// Concatenated text parts, if any.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join(""))
        }
    }

    /// Function calls in part order.
    #[must_use]
    pub fn function_calls(&self) -> Vec<&FunctionCall> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::FunctionCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }
}

/// Append-only history of the conversation, sent in full with every request.
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    contents: Vec<Content>,
}

impl Conversation {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn.
    pub fn push(&mut self, content: Content) {
        self.contents.push(content);
    }

    /// All turns in order.
    #[must_use]
    pub fn contents(&self) -> &[Content] {
        &self.contents
    }

    /// Number of turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    /// Whether no turn has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Most recent turn.
    #[must_use]
    pub fn last(&self) -> Option<&Content> {
        self.contents.last()
    }
}
