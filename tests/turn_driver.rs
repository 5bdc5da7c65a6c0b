#![warn(clippy::pedantic)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use sectionx::{
    Content, Dispatcher, FunctionCall, GenerationConfig, LlmClient, LlmError, ModelReply, Part,
    Role, SessionState, ToolSchema, TurnDriver, TurnEnd,
};
use serde_json::json;

/// Replays canned replies and records how many turns each request carried.
struct ScriptedClient {
    replies: Mutex<VecDeque<Result<ModelReply, LlmError>>>,
    requests: Mutex<Vec<usize>>,
}

impl ScriptedClient {
    fn new(replies: Vec<Result<ModelReply, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn request_sizes(&self) -> Vec<usize> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn generate(
        &self,
        _config: &GenerationConfig,
        contents: &[Content],
    ) -> Result<ModelReply, LlmError> {
        self.requests.lock().expect("lock").push(contents.len());
        self.replies
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Ok(text_reply("out of script")))
    }
}

fn text_reply(text: &str) -> ModelReply {
    ModelReply {
        content: Some(Content::model_text(text)),
        finish_reason: Some("STOP".into()),
        block_reason: None,
    }
}

fn calls_reply(calls: Vec<FunctionCall>) -> ModelReply {
    ModelReply {
        content: Some(Content {
            role: Role::Model,
            parts: calls.into_iter().map(Part::FunctionCall).collect(),
        }),
        finish_reason: Some("STOP".into()),
        block_reason: None,
    }
}

fn driver() -> TurnDriver {
    let tools = ToolSchema::builtin().expect("bundled schema");
    TurnDriver::new(GenerationConfig::new(tools), Dispatcher::new(50.0))
}

fn channel() -> FunctionCall {
    FunctionCall::new(
        "channel_section",
        json!({"d": 150, "b": 75, "t_f": 9.5, "t_w": 6, "r": 10, "n_r": 4}),
    )
}

#[tokio::test]
async fn calls_in_one_reply_get_one_response_turn() {
    let client = ScriptedClient::new(vec![
        Ok(calls_reply(vec![
            channel(),
            FunctionCall::new("calculate_geometric_properties", json!({})),
            FunctionCall::new("fly", json!({})),
        ])),
        Ok(text_reply("The channel has been analysed.")),
    ]);
    let mut session = SessionState::new();
    let outcome = driver()
        .run_turn(&client, &mut session, "Analyse a PFC 150")
        .await;

    assert_eq!(outcome.end, TurnEnd::Answered);
    assert_eq!(outcome.reply, "The channel has been analysed.");
    assert_eq!(outcome.tool_calls.len(), 3);
    assert_eq!(outcome.figures.len(), 1);

    // user, model calls, user responses, model text
    let contents = session.conversation().contents();
    assert_eq!(contents.len(), 4);
    assert_eq!(client.request_sizes(), vec![1, 3]);
    let responses = &contents[2];
    assert_eq!(responses.role, Role::User);
    let names: Vec<&str> = responses
        .parts
        .iter()
        .map(|part| match part {
            Part::FunctionResponse(response) => response.name.as_str(),
            other => panic!("unexpected part {other:?}"),
        })
        .collect();
    assert_eq!(names, ["channel_section", "calculate_geometric_properties", "fly"]);
    let Part::FunctionResponse(unknown) = &responses.parts[2] else {
        panic!("expected a function response");
    };
    assert_eq!(unknown.response["status"], "error");
}

#[tokio::test]
async fn transport_error_ends_the_turn_with_text() {
    let client = ScriptedClient::new(vec![Err(LlmError::Api {
        status: 503,
        body: "overloaded".into(),
    })]);
    let mut session = SessionState::new();
    let outcome = driver().run_turn(&client, &mut session, "hello").await;

    assert_eq!(outcome.end, TurnEnd::TransportError);
    assert_eq!(
        outcome.reply,
        "An error occurred: model service returned HTTP 503: overloaded"
    );
    let last = session.conversation().last().expect("turn");
    assert_eq!(last.role, Role::Model);
    assert_eq!(last.text().as_deref(), Some(outcome.reply.as_str()));
    assert_eq!(client.request_sizes(), vec![1]);
}

#[tokio::test]
async fn empty_reply_ends_the_turn() {
    let client = ScriptedClient::new(vec![Ok(ModelReply {
        content: None,
        finish_reason: None,
        block_reason: Some("SAFETY".into()),
    })]);
    let mut session = SessionState::new();
    let outcome = driver().run_turn(&client, &mut session, "hello").await;

    assert_eq!(outcome.end, TurnEnd::Empty);
    assert!(outcome.reply.contains("SAFETY"));
    assert_eq!(session.conversation().len(), 2);
}

#[tokio::test]
async fn round_cap_stops_a_looping_model() {
    let replies = (0..5)
        .map(|_| Ok(calls_reply(vec![FunctionCall::new("calculate_geometric_properties", json!({}))])))
        .collect();
    let client = ScriptedClient::new(replies);
    let mut session = SessionState::new();
    let outcome = driver()
        .with_max_tool_rounds(2)
        .run_turn(&client, &mut session, "loop")
        .await;

    assert_eq!(outcome.end, TurnEnd::RoundLimit);
    assert_eq!(outcome.tool_calls.len(), 2);
    assert_eq!(client.request_sizes().len(), 3);
    // Every call turn is answered and the turn closes with model text.
    let contents = session.conversation().contents();
    assert_eq!(contents[contents.len() - 2].role, Role::User);
    assert_eq!(contents[contents.len() - 1].role, Role::Model);
    assert!(contents[contents.len() - 1].function_calls().is_empty());
}

#[tokio::test]
async fn history_persists_across_turns() {
    let client = ScriptedClient::new(vec![
        Ok(text_reply("Which section?")),
        Ok(calls_reply(vec![channel()])),
        Ok(text_reply("Done.")),
    ]);
    let driver = driver();
    let mut session = SessionState::new();
    driver.run_turn(&client, &mut session, "Analyse a channel").await;
    let outcome = driver.run_turn(&client, &mut session, "PFC 150").await;

    assert_eq!(outcome.reply, "Done.");
    assert_eq!(client.request_sizes(), vec![1, 3, 5]);
    assert!(session.section().is_some());
}
