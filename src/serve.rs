use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use sectionx::llm::GREETING;
use sectionx::{
    GeminiClient, GeminiConfig, LlmClient, LlmError, SessionState, TurnDriver, TurnOutcome,
};

/// One line of the transcript shown in the browser.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum HistoryEntry {
    User { text: String },
    Model { text: String },
    Tool { call: String },
    Figure { title: String, svg: String },
}

/// A conversation held by the server plus the transcript rendered so far.
#[derive(Default)]
struct StoredSession {
    state: SessionState,
    history: Vec<HistoryEntry>,
}

impl StoredSession {
    /// Append a finished turn in the order the page renders it.
    fn record(&mut self, message: &str, outcome: &TurnOutcome) {
        self.history.push(HistoryEntry::User {
            text: message.to_string(),
        });
        self.history.extend(
            outcome
                .interim
                .iter()
                .map(|text| HistoryEntry::Model { text: text.clone() }),
        );
        self.history.extend(
            outcome
                .tool_calls
                .iter()
                .map(|call| HistoryEntry::Tool { call: call.clone() }),
        );
        self.history
            .extend(outcome.figures.iter().map(|figure| HistoryEntry::Figure {
                title: figure.title.clone(),
                svg: figure.svg.clone(),
            }));
        self.history.push(HistoryEntry::Model {
            text: outcome.reply.clone(),
        });
    }
}

struct SessionSlot {
    session: Arc<Mutex<StoredSession>>,
    last_used: Instant,
}

impl SessionSlot {
    fn new(now: Instant) -> Self {
        Self {
            session: Arc::default(),
            last_used: now,
        }
    }
}

type SessionStore = Arc<RwLock<HashMap<Uuid, SessionSlot>>>;

/// Look up `id`, creating it when absent, and mark it used.
async fn checkout(sessions: &SessionStore, id: Uuid) -> Arc<Mutex<StoredSession>> {
    let now = Instant::now();
    let mut sessions = sessions.write().await;
    let slot = sessions.entry(id).or_insert_with(|| SessionSlot::new(now));
    slot.last_used = now;
    Arc::clone(&slot.session)
}

/// Drop every session idle for at least `ttl`, returning how many went.
fn evict_idle(sessions: &mut HashMap<Uuid, SessionSlot>, now: Instant, ttl: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, slot| now.saturating_duration_since(slot.last_used) < ttl);
    before - sessions.len()
}

/// Run one turn on a blocking thread so meshing and solving stay off the
/// async workers. Returns the outcome and the whole session tool log.
async fn run_turn_blocking(
    driver: Arc<TurnDriver>,
    client: Arc<dyn LlmClient>,
    session: Arc<Mutex<StoredSession>>,
    message: String,
) -> Result<(TurnOutcome, Vec<String>), ApiError> {
    let handle = Handle::current();
    tokio::task::spawn_blocking(move || {
        let mut stored = session.blocking_lock();
        let outcome = handle.block_on(driver.run_turn(client.as_ref(), &mut stored.state, &message));
        stored.record(&message, &outcome);
        let tool_log = stored.state.tool_log().to_vec();
        (outcome, tool_log)
    })
    .await
    .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, format!("turn aborted: {e}")))
}

#[derive(Clone)]
struct AppState {
    driver: Arc<TurnDriver>,
    gemini: GeminiConfig,
    /// Client for the server-wide key, if one is configured.
    client: Option<Arc<GeminiClient>>,
    sessions: SessionStore,
}

#[derive(Deserialize)]
struct ChatRequest {
    session_id: Option<Uuid>,
    message: String,
    /// Overrides the server key for this request.
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    session_id: Uuid,
    #[serde(flatten)]
    outcome: TurnOutcome,
    /// Every tool call of the session so far.
    tool_log: Vec<String>,
}

#[derive(Debug, PartialEq, Serialize)]
struct SessionView {
    session_id: Uuid,
    history: Vec<HistoryEntry>,
    tool_log: Vec<String>,
}

/// Transcript and tool log of `id`, if the session is still held.
async fn session_view(sessions: &SessionStore, id: Uuid) -> Option<SessionView> {
    let session = {
        let mut sessions = sessions.write().await;
        let slot = sessions.get_mut(&id)?;
        slot.last_used = Instant::now();
        Arc::clone(&slot.session)
    };
    let stored = session.lock().await;
    Some(SessionView {
        session_id: id,
        history: stored.history.clone(),
        tool_log: stored.state.tool_log().to_vec(),
    })
}

#[derive(Deserialize)]
struct ResetRequest {
    session_id: Uuid,
}

struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

impl From<LlmError> for ApiError {
    fn from(error: LlmError) -> Self {
        let status = match error {
            LlmError::MissingApiKey => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(status, error.to_string())
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/chat", post(chat))
        .route("/api/reset", post(reset))
        .route("/api/session/:id", get(session))
        .with_state(state)
}

/// Serve the chat page and API until the process is stopped.
///
/// Sessions idle for `session_ttl` are dropped.
pub async fn run(
    driver: TurnDriver,
    gemini: GeminiConfig,
    addr: SocketAddr,
    session_ttl: Duration,
) -> anyhow::Result<()> {
    let client = if gemini.api_key.trim().is_empty() {
        warn!("no server API key configured; every request must supply its own");
        None
    } else {
        Some(Arc::new(GeminiClient::new(gemini.clone())?))
    };
    let state = AppState {
        driver: Arc::new(driver),
        gemini,
        client,
        sessions: SessionStore::default(),
    };

    let sessions = Arc::clone(&state.sessions);
    tokio::spawn(async move {
        let mut sweep = tokio::time::interval(session_ttl.clamp(Duration::from_secs(1), Duration::from_secs(60)));
        loop {
            sweep.tick().await;
            let evicted = evict_idle(&mut *sessions.write().await, Instant::now(), session_ttl);
            if evicted > 0 {
                info!(evicted, "idle sessions dropped");
            }
        }
    });

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    info!("sectionx listening on http://{addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// GET / - chat page
async fn index() -> Html<String> {
    Html(INDEX_HTML.replace("{{GREETING}}", GREETING))
}

/// POST /api/chat - run one user turn
async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let client: Arc<dyn LlmClient> = match req.api_key.filter(|key| !key.trim().is_empty()) {
        Some(api_key) => Arc::new(GeminiClient::new(GeminiConfig {
            api_key,
            ..state.gemini.clone()
        })?),
        None => state.client.clone().ok_or(LlmError::MissingApiKey)?,
    };

    let session_id = req.session_id.unwrap_or_else(Uuid::new_v4);
    let session = checkout(&state.sessions, session_id).await;
    info!(%session_id, "chat request");
    let (outcome, tool_log) =
        run_turn_blocking(Arc::clone(&state.driver), client, session, req.message).await?;

    Ok(Json(ChatResponse {
        session_id,
        outcome,
        tool_log,
    }))
}

/// GET /api/session/{id} - transcript of a held session
async fn session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    session_view(&state.sessions, id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError(StatusCode::NOT_FOUND, format!("unknown session {id}")))
}

/// POST /api/reset - forget a session
async fn reset(State(state): State<AppState>, Json(req): Json<ResetRequest>) -> StatusCode {
    let mut sessions = state.sessions.write().await;
    if sessions.remove(&req.session_id).is_some() {
        info!(session_id = %req.session_id, "session reset");
    }
    StatusCode::NO_CONTENT
}

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Sectionproperties Assistant</title>
<style>
  body { font-family: sans-serif; max-width: 820px; margin: 2em auto; padding: 0 1em; }
  #log { display: flex; flex-direction: column; gap: 0.6em; }
  .msg { padding: 0.6em 0.8em; border-radius: 6px; white-space: pre-wrap; }
  .user { background: #e8eefc; align-self: flex-end; }
  .model { background: #f3f3f3; }
  .tool { color: #888; font-size: 0.85em; font-family: monospace; }
  .figure { border: 1px solid #ddd; border-radius: 6px; padding: 0.4em; }
  form { display: flex; gap: 0.5em; margin-top: 1em; }
  #message { flex: 1; padding: 0.5em; }
  details { margin-bottom: 1em; }
</style>
</head>
<body>
<h1>Sectionproperties Assistant</h1>
<details>
  <summary>Settings</summary>
  <label>Gemini API key <input id="key" type="password" size="40"></label>
  <button id="reset" type="button">Clear chat</button>
</details>
<details>
  <summary>Tool log</summary>
  <pre id="tool-log"></pre>
</details>
<div id="log"><div class="msg model">{{GREETING}}</div></div>
<form id="form">
  <input id="message" autocomplete="off" placeholder="Describe a section or ask for an analysis">
  <button type="submit">Send</button>
</form>
<script>
const log = document.getElementById("log");
const toolLog = document.getElementById("tool-log");
let sessionId = sessionStorage.getItem("sessionId");
function add(cls, text) {
  const div = document.createElement("div");
  div.className = "msg " + cls;
  div.textContent = text;
  log.appendChild(div);
  return div;
}
function addFigure(figure) {
  const div = add("figure", "");
  div.innerHTML = figure.svg;
}
function showToolLog(lines) {
  toolLog.textContent = lines.join("\n");
}
function remember(id) {
  sessionId = id;
  if (id) sessionStorage.setItem("sessionId", id);
  else sessionStorage.removeItem("sessionId");
}
async function restore() {
  if (!sessionId) return;
  const response = await fetch("/api/session/" + sessionId);
  if (!response.ok) { remember(null); return; }
  const body = await response.json();
  for (const entry of body.history) {
    if (entry.kind === "user") add("user", entry.text);
    else if (entry.kind === "model") add("model", entry.text);
    else if (entry.kind === "tool") add("tool", "Function call: " + entry.call);
    else if (entry.kind === "figure") addFigure(entry);
  }
  showToolLog(body.tool_log);
}
document.getElementById("form").addEventListener("submit", async (event) => {
  event.preventDefault();
  const input = document.getElementById("message");
  const message = input.value.trim();
  if (!message) return;
  input.value = "";
  add("user", message);
  const pending = add("tool", "...");
  const key = document.getElementById("key").value.trim();
  const response = await fetch("/api/chat", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({ session_id: sessionId, message, api_key: key || null }),
  });
  pending.remove();
  const body = await response.json();
  if (!response.ok) { add("model", "Error: " + body.error); return; }
  remember(body.session_id);
  for (const text of body.interim) add("model", text);
  for (const call of body.tool_calls) add("tool", "Function call: " + call);
  for (const figure of body.figures) addFigure(figure);
  add("model", body.reply);
  showToolLog(body.tool_log);
});
document.getElementById("reset").addEventListener("click", async () => {
  if (sessionId) {
    await fetch("/api/reset", {
      method: "POST",
      headers: { "Content-Type": "application/json" },
      body: JSON.stringify({ session_id: sessionId }),
    });
  }
  remember(null);
  log.innerHTML = "";
  showToolLog([]);
  add("model", "{{GREETING}}");
});
restore();
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use sectionx::{Content, Dispatcher, GenerationConfig, ModelReply, ToolSchema};

    use super::*;

    struct EchoClient;

    #[async_trait]
    impl LlmClient for EchoClient {
        async fn generate(
            &self,
            _config: &GenerationConfig,
            contents: &[Content],
        ) -> Result<ModelReply, LlmError> {
            Ok(ModelReply {
                content: Some(Content::model_text(format!("{} turns seen", contents.len()))),
                finish_reason: Some("STOP".into()),
                block_reason: None,
            })
        }
    }

    fn driver() -> Arc<TurnDriver> {
        let tools = ToolSchema::builtin().expect("bundled schema");
        Arc::new(TurnDriver::new(GenerationConfig::new(tools), Dispatcher::new(50.0)))
    }

    #[test]
    fn page_carries_greeting() {
        let page = INDEX_HTML.replace("{{GREETING}}", GREETING);
        assert!(page.contains(GREETING));
        assert!(!page.contains("{{GREETING}}"));
        assert!(page.contains("sessionStorage"));
    }

    #[test]
    fn missing_key_maps_to_unauthorized() {
        let ApiError(status, _) = ApiError::from(LlmError::MissingApiKey);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn idle_sessions_are_evicted() {
        let start = Instant::now();
        let ttl = Duration::from_secs(600);
        let mut sessions = HashMap::new();
        let (stale, fresh) = (Uuid::new_v4(), Uuid::new_v4());
        sessions.insert(stale, SessionSlot::new(start));
        sessions.insert(fresh, SessionSlot::new(start + Duration::from_secs(300)));

        assert_eq!(evict_idle(&mut sessions, start + Duration::from_secs(599), ttl), 0);
        assert_eq!(evict_idle(&mut sessions, start + ttl, ttl), 1);
        assert!(sessions.contains_key(&fresh));
        assert!(!sessions.contains_key(&stale));
    }

    #[test]
    fn turns_are_recorded_in_page_order() {
        let mut stored = StoredSession::default();
        let outcome = TurnOutcome {
            reply: "Done.".into(),
            interim: vec!["Building it.".into()],
            figures: vec![sectionx::Figure {
                title: "Mesh".into(),
                svg: "<svg/>".into(),
            }],
            tool_calls: vec!["i_section with args: {}".into()],
            end: sectionx::TurnEnd::Answered,
        };
        stored.record("HEB 300", &outcome);
        let kinds: Vec<&str> = stored
            .history
            .iter()
            .map(|entry| match entry {
                HistoryEntry::User { .. } => "user",
                HistoryEntry::Model { .. } => "model",
                HistoryEntry::Tool { .. } => "tool",
                HistoryEntry::Figure { .. } => "figure",
            })
            .collect();
        assert_eq!(kinds, ["user", "model", "tool", "figure", "model"]);
        let json = serde_json::to_value(&stored.history[2]).expect("serialises");
        assert_eq!(json, serde_json::json!({"kind": "tool", "call": "i_section with args: {}"}));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn blocking_turns_keep_session_history() {
        let sessions = SessionStore::default();
        let id = Uuid::new_v4();
        let client: Arc<dyn LlmClient> = Arc::new(EchoClient);
        for message in ["hello", "again"] {
            let session = checkout(&sessions, id).await;
            let (outcome, tool_log) =
                run_turn_blocking(driver(), Arc::clone(&client), session, message.into())
                    .await
                    .map_err(|ApiError(_, message)| message)
                    .expect("turn runs");
            assert!(tool_log.is_empty());
            assert!(outcome.reply.ends_with("turns seen"));
        }

        let view = session_view(&sessions, id).await.expect("session held");
        assert_eq!(view.session_id, id);
        assert_eq!(view.history.len(), 4);
        assert_eq!(
            view.history[3],
            HistoryEntry::Model {
                text: "3 turns seen".into()
            }
        );
        assert!(session_view(&sessions, Uuid::new_v4()).await.is_none());
    }
}
