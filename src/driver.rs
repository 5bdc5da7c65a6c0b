//! One user turn: model round trips and tool dispatch until the model answers in text.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::conversation::{Content, FunctionCall, FunctionResponse, Role};
use crate::llm::{GenerationConfig, LlmClient, ModelReply};
use crate::plot::Figure;
use crate::session::SessionState;
use crate::tools::dispatch::Dispatcher;
use crate::tools::ToolResult;

/// Default cap on tool dispatch rounds within one user turn.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

/// How a turn ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnEnd {
    /// The model answered in plain text.
    Answered,
    /// The model returned nothing usable.
    Empty,
    /// The round cap was reached.
    RoundLimit,
    /// The model service could not be reached or rejected the request.
    TransportError,
}

/// What a user turn produced.
#[derive(Clone, Debug, Serialize)]
pub struct TurnOutcome {
    /// Final text shown to the user.
    pub reply: String,
    /// Text the model sent alongside function calls, in order.
    pub interim: Vec<String>,
    /// Figures generated during the turn.
    pub figures: Vec<Figure>,
    /// Log lines of the tool calls executed during the turn.
    pub tool_calls: Vec<String>,
    /// How the turn ended.
    pub end: TurnEnd,
}

enum TurnState {
    AwaitingModel,
    DispatchingTools(Vec<FunctionCall>),
}

/// Runs user turns against a model and a dispatcher.
#[derive(Clone, Debug)]
pub struct TurnDriver {
    config: GenerationConfig,
    dispatcher: Dispatcher,
    max_tool_rounds: usize,
}

impl TurnDriver {
    /// Driver with the default round cap.
    #[must_use]
    pub fn new(config: GenerationConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Set the maximum number of dispatch rounds per user turn.
    #[must_use]
    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.max_tool_rounds = max_tool_rounds;
        self
    }

    /// Request configuration sent with every model call.
    #[must_use]
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Dispatcher used for function calls.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Append `prompt` to the session and drive the conversation until the model
    /// answers with text, returns nothing, fails, or the round cap is hit.
    ///
    /// Every path leaves the history ending in a model text turn.
    pub async fn run_turn(
        &self,
        client: &dyn LlmClient,
        session: &mut SessionState,
        prompt: &str,
    ) -> TurnOutcome {
        session.conversation_mut().push(Content::user_text(prompt));
        let mut outcome = TurnOutcome {
            reply: String::new(),
            interim: Vec::new(),
            figures: Vec::new(),
            tool_calls: Vec::new(),
            end: TurnEnd::Answered,
        };
        let mut rounds = 0;
        let mut state = TurnState::AwaitingModel;

        loop {
            state = match state {
                TurnState::AwaitingModel => {
                    let reply = client
                        .generate(&self.config, session.conversation().contents())
                        .await;
                    match reply {
                        Err(e) => {
                            error!(error = %e, "model request failed");
                            return finish(
                                session,
                                outcome,
                                format!("An error occurred: {e}"),
                                TurnEnd::TransportError,
                            );
                        }
                        Ok(ModelReply {
                            content: None,
                            finish_reason,
                            block_reason,
                        }) => {
                            warn!(?finish_reason, ?block_reason, "model returned no content");
                            let notice = match block_reason {
                                Some(reason) => format!("The model returned no response (blocked: {reason})."),
                                None => "The model returned no response.".to_string(),
                            };
                            return finish(session, outcome, notice, TurnEnd::Empty);
                        }
                        Ok(ModelReply {
                            content: Some(mut content),
                            ..
                        }) => {
                            content.role = Role::Model;
                            let calls: Vec<FunctionCall> =
                                content.function_calls().into_iter().cloned().collect();
                            let text = content.text();
                            info!(calls = calls.len(), round = rounds, "model replied");
                            session.conversation_mut().push(content);
                            if calls.is_empty() {
                                outcome.reply = text.unwrap_or_default();
                                return outcome;
                            }
                            outcome.interim.extend(text);
                            TurnState::DispatchingTools(calls)
                        }
                    }
                }
                TurnState::DispatchingTools(calls) => {
                    if rounds >= self.max_tool_rounds {
                        warn!(rounds, "tool round limit reached");
                        refuse(session, &calls, self.max_tool_rounds);
                        return finish(
                            session,
                            outcome,
                            format!(
                                "Stopped after {} rounds of tool calls. Please continue with a new message.",
                                self.max_tool_rounds
                            ),
                            TurnEnd::RoundLimit,
                        );
                    }
                    rounds += 1;
                    let mut responses = Vec::with_capacity(calls.len());
                    for call in calls {
                        let output = self.dispatcher.dispatch(session, &call.name, &call.args);
                        outcome
                            .tool_calls
                            .push(format!("{} with args: {}", call.name, call.args));
                        outcome.figures.extend(output.figure);
                        responses.push(FunctionResponse {
                            name: call.name,
                            response: output.result.to_value(),
                        });
                    }
                    session
                        .conversation_mut()
                        .push(Content::function_responses(responses));
                    TurnState::AwaitingModel
                }
            };
        }
    }
}

/// Answer pending calls with errors so the history stays well formed.
fn refuse(session: &mut SessionState, calls: &[FunctionCall], limit: usize) {
    let responses = calls
        .iter()
        .map(|call| FunctionResponse {
            name: call.name.clone(),
            response: ToolResult::error(format!(
                "Tool call limit of {limit} rounds per message reached."
            ))
            .to_value(),
        })
        .collect();
    session
        .conversation_mut()
        .push(Content::function_responses(responses));
}

fn finish(session: &mut SessionState, mut outcome: TurnOutcome, text: String, end: TurnEnd) -> TurnOutcome {
    session
        .conversation_mut()
        .push(Content::model_text(text.clone()));
    outcome.reply = text;
    outcome.end = end;
    outcome
}
