//! Google Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use super::{GenerationConfig, LlmClient, ModelReply};
use crate::conversation::{Content, FunctionCall, FunctionResponse, Part, Role};
use crate::errors::LlmError;

/// Public REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Connection settings for [`GeminiClient`].
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API key sent in the `x-goog-api-key` header.
    pub api_key: String,
    /// Model name, e.g. `gemini-2.5-flash`.
    pub model: String,
    /// Base URL up to and including the API version.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Settings for the default model and endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Gemini API client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: WireContent,
    contents: Vec<WireContent>,
    tools: [WireTools<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTools<'a> {
    function_declarations: &'a [Value],
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<WirePart>,
}

/// A part as sent or received. Unknown kinds (inline data, code execution, ...)
/// decode with every field empty and are skipped.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
    #[serde(skip_serializing)]
    thought: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GenerateResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Candidate {
    content: Option<WireContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}

fn text_content(text: &str) -> WireContent {
    WireContent {
        role: None,
        parts: vec![WirePart {
            text: Some(text.to_string()),
            ..WirePart::default()
        }],
    }
}

impl From<&Content> for WireContent {
    fn from(content: &Content) -> Self {
        let role = match content.role {
            Role::User => "user",
            Role::Model => "model",
        };
        let parts = content
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => WirePart {
                    text: Some(text.clone()),
                    ..WirePart::default()
                },
                Part::FunctionCall(call) => WirePart {
                    function_call: Some(WireFunctionCall {
                        name: call.name.clone(),
                        args: match &call.args {
                            Value::Null => Value::Object(Map::new()),
                            args => args.clone(),
                        },
                    }),
                    thought_signature: call.thought_signature.clone(),
                    ..WirePart::default()
                },
                Part::FunctionResponse(response) => WirePart {
                    function_response: Some(WireFunctionResponse {
                        name: response.name.clone(),
                        response: response.response.clone(),
                    }),
                    ..WirePart::default()
                },
            })
            .collect();
        Self {
            role: Some(role.to_string()),
            parts,
        }
    }
}

impl WireContent {
    /// Convert a received content, dropping thought summaries and unknown parts.
    fn into_content(self) -> Option<Content> {
        let role = match self.role.as_deref() {
            Some("user") => Role::User,
            _ => Role::Model,
        };
        let parts: Vec<Part> = self
            .parts
            .into_iter()
            .filter(|part| !part.thought)
            .filter_map(|part| {
                if let Some(call) = part.function_call {
                    Some(Part::FunctionCall(FunctionCall {
                        name: call.name,
                        args: call.args,
                        thought_signature: part.thought_signature,
                    }))
                } else if let Some(response) = part.function_response {
                    Some(Part::FunctionResponse(FunctionResponse {
                        name: response.name,
                        response: response.response,
                    }))
                } else {
                    part.text.map(Part::Text)
                }
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(Content { role, parts })
        }
    }
}

fn request_body<'a>(config: &'a GenerationConfig, contents: &[Content]) -> GenerateRequest<'a> {
    GenerateRequest {
        system_instruction: text_content(&config.system_instruction),
        contents: contents.iter().map(WireContent::from).collect(),
        tools: [WireTools {
            function_declarations: config.tools.declarations(),
        }],
    }
}

fn parse_reply(body: &str) -> Result<ModelReply, LlmError> {
    let response: GenerateResponse = serde_json::from_str(body).map_err(|e| {
        error!("Failed to parse Gemini response: {}", e);
        LlmError::Decode(e)
    })?;

    if let Some(usage) = &response.usage_metadata {
        info!(
            "Gemini API usage - Prompt: {:?} tokens, Response: {:?} tokens, Total: {:?} tokens",
            usage.prompt_token_count, usage.candidates_token_count, usage.total_token_count
        );
    }

    let block_reason = response.prompt_feedback.and_then(|feedback| feedback.block_reason);
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Ok(ModelReply {
            content: None,
            finish_reason: None,
            block_reason,
        });
    };
    Ok(ModelReply {
        content: candidate.content.and_then(WireContent::into_content),
        finish_reason: candidate.finish_reason,
        block_reason,
    })
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`] for an empty key and [`LlmError::Http`]
    /// when the HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let client = Client::builder().timeout(config.timeout).build()?;
        let url = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            client,
            api_key: config.api_key,
            url,
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(
        &self,
        config: &GenerationConfig,
        contents: &[Content],
    ) -> Result<ModelReply, LlmError> {
        let body = request_body(config, contents);
        debug!(url = %self.url, turns = contents.len(), "Sending request to Gemini API");

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        debug!("Gemini API response status: {}", status);

        if !status.is_success() {
            error!("Gemini API error: {} - {}", status, response_text);
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: response_text,
            });
        }

        parse_reply(&response_text)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::tools::schema::ToolSchema;

    #[test]
    fn request_uses_camel_case_wire_names() {
        let tools = ToolSchema::from_json(r#"[{"name": "plot_stress"}]"#).expect("schema");
        let config = GenerationConfig::new(tools);
        let mut call = FunctionCall::new("plot_stress", Value::Null);
        call.thought_signature = Some("sig".into());
        let contents = vec![
            Content::user_text("plot it"),
            Content {
                role: Role::Model,
                parts: vec![Part::FunctionCall(call)],
            },
            Content::function_responses(vec![FunctionResponse {
                name: "plot_stress".into(),
                response: json!({"status": "success"}),
            }]),
        ];

        let body = serde_json::to_value(request_body(&config, &contents)).expect("serialises");
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            json!(config.system_instruction)
        );
        assert_eq!(body["tools"][0]["functionDeclarations"][0]["name"], "plot_stress");
        assert_eq!(body["contents"][0], json!({"role": "user", "parts": [{"text": "plot it"}]}));
        assert_eq!(
            body["contents"][1]["parts"][0],
            json!({"functionCall": {"name": "plot_stress", "args": {}}, "thoughtSignature": "sig"})
        );
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"]["response"]["status"],
            "success"
        );
    }

    #[test]
    fn reply_keeps_calls_in_order_and_drops_thoughts() {
        let body = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "planning", "thought": true},
                        {"text": "Creating the section."},
                        {"functionCall": {"name": "i_section", "args": {"d": 300}}, "thoughtSignature": "abc"},
                        {"functionCall": {"name": "calculate_geometric_properties"}},
                        {"inlineData": {"mimeType": "image/png", "data": ""}}
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10, "totalTokenCount": 20}
        });
        let reply = parse_reply(&body.to_string()).expect("decodes");
        let content = reply.content.expect("content");
        assert_eq!(content.role, Role::Model);
        assert_eq!(content.text().as_deref(), Some("Creating the section."));
        let calls = content.function_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "i_section");
        assert_eq!(calls[0].thought_signature.as_deref(), Some("abc"));
        assert_eq!(calls[1].args, Value::Null);
        assert_eq!(reply.finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn blocked_prompt_has_no_content() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let reply = parse_reply(body).expect("decodes");
        assert_eq!(reply.content, None);
        assert_eq!(reply.block_reason.as_deref(), Some("SAFETY"));
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            GeminiClient::new(GeminiConfig::new("  ")),
            Err(LlmError::MissingApiKey)
        ));
    }
}
