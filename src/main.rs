mod chat;
mod manual;
mod report;
mod serve;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sectionx::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use sectionx::tools::dispatch::DEFAULT_MESH_SIZE;
use sectionx::{
    Dispatcher, GeminiClient, GeminiConfig, GenerationConfig, LlmError, ToolSchema, TurnDriver,
    DEFAULT_MAX_TOOL_ROUNDS,
};

#[derive(Parser)]
#[command(name = "sectionx", version)]
#[command(about = "Analyse steel cross-sections by chatting with a function-calling model")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Model name
    #[arg(long, env = "SECTIONX_MODEL", default_value = DEFAULT_MODEL, global = true)]
    model: String,

    /// Base URL of the generateContent API
    #[arg(long, default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    /// JSON file with the function declarations; the bundled copy is used if it is missing
    #[arg(long, default_value = "tool_declaration.json", global = true)]
    tools: PathBuf,

    /// Maximum triangle area of new meshes in mm²
    #[arg(long, default_value_t = DEFAULT_MESH_SIZE, global = true)]
    mesh_size: f64,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 120, global = true)]
    timeout_secs: u64,

    /// Maximum rounds of tool calls per user message
    #[arg(long, default_value_t = DEFAULT_MAX_TOOL_ROUNDS, global = true)]
    max_tool_rounds: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Chat in the terminal
    Chat {
        /// Directory the figures are written to
        #[arg(long, default_value = "figures")]
        figure_dir: PathBuf,
    },
    /// Serve the browser chat
    Serve {
        /// Listen address
        #[arg(long, default_value = "127.0.0.1:8501")]
        addr: SocketAddr,
        /// Seconds a session may stay idle before it is dropped
        #[arg(long, default_value_t = 3600, value_parser = clap::value_parser!(u64).range(1..))]
        session_ttl_secs: u64,
    },
    /// Analyse a HEB 300 without a model
    Manual {
        /// Directory the mesh and stress plots are written to
        #[arg(long)]
        figure_dir: Option<PathBuf>,
    },
}

impl Cli {
    fn gemini_config(&self, api_key: String) -> GeminiConfig {
        GeminiConfig {
            api_key,
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    fn driver(&self) -> anyhow::Result<TurnDriver> {
        let tools = load_tools(&self.tools)?;
        Ok(
            TurnDriver::new(GenerationConfig::new(tools), Dispatcher::new(self.mesh_size))
                .with_max_tool_rounds(self.max_tool_rounds),
        )
    }
}

fn load_tools(path: &Path) -> anyhow::Result<ToolSchema> {
    if path.exists() {
        ToolSchema::load(path).with_context(|| format!("loading {}", path.display()))
    } else {
        warn!(path = %path.display(), "tool declarations not found, using the bundled copy");
        Ok(ToolSchema::builtin()?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "sectionx=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if !(cli.mesh_size > 0.0 && cli.mesh_size.is_finite()) {
        anyhow::bail!("--mesh-size must be a positive area in mm²");
    }

    match &cli.command {
        Command::Manual { figure_dir } => manual::run(cli.mesh_size, figure_dir.as_deref()),
        Command::Chat { figure_dir } => {
            let api_key = cli.api_key.clone().ok_or(LlmError::MissingApiKey)?;
            let client = GeminiClient::new(cli.gemini_config(api_key))?;
            let driver = cli.driver()?;
            info!(model = %cli.model, "starting terminal chat");
            chat::run(&driver, &client, figure_dir).await
        }
        Command::Serve {
            addr,
            session_ttl_secs,
        } => {
            let driver = cli.driver()?;
            let default_config = cli.gemini_config(cli.api_key.clone().unwrap_or_default());
            let ttl = Duration::from_secs(*session_ttl_secs);
            serve::run(driver, default_config, *addr, ttl).await
        }
    }
}
