mod ask_cmd;
mod config;
mod status_cmd;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use manasik_agent::{ModelConfig, RelayHandler, SYSTEM_PROMPT};
use manasik_gateway::GatewayState;
use manasik_memory::{SessionStore, SessionStoreConfig};
use manasik_providers::OpenAiCompatClient;

use config::Config;

#[derive(Parser)]
#[command(name = "manasik")]
#[command(about = "Manasik - Hajj and Umrah question relay")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay HTTP server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind the HTTP server to
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Ask a running server a question
    Ask {
        /// Session to continue
        #[arg(short, long, default_value = "cli")]
        session_id: String,
        /// Start the session over before asking
        #[arg(short, long)]
        reset: bool,
        /// Server base URL (defaults to the local server)
        #[arg(long)]
        server: Option<String>,
        /// The question
        question: String,
    },
    /// Show health of a running server
    Status {
        /// Server base URL (defaults to the local server)
        #[arg(long)]
        server: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    manasik_logging::init_logger(&config.log_level, config.log_dir.as_deref());

    let cli = Cli::parse();
    let local = format!("http://127.0.0.1:{}", config.port);

    match cli.command {
        Commands::Serve { port, bind } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                bind_address: bind.unwrap_or(config.bind_address),
                ..config
            };
            run_server(config).await?;
        }
        Commands::Ask {
            session_id,
            reset,
            server,
            question,
        } => {
            ask_cmd::run(&server.unwrap_or(local), &session_id, reset, &question).await?;
        }
        Commands::Status { server } => {
            status_cmd::run(&server.unwrap_or(local)).await?;
        }
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    let (api_key, endpoint) = config.upstream()?;

    info!(
        port = config.port,
        bind = %config.bind_address,
        model = %config.model,
        endpoint = %endpoint,
        "Starting Manasik relay"
    );

    let client = OpenAiCompatClient::new(api_key, endpoint, config.request_timeout)?;
    let store = SessionStore::new(
        SYSTEM_PROMPT,
        SessionStoreConfig {
            idle_ttl: config.session_ttl,
            max_sessions: config.max_sessions,
        },
    );
    let relay = RelayHandler::new(store, Arc::new(client))
        .with_model(ModelConfig::default().with_model(config.model.clone()));

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_address, config.port))?;

    manasik_gateway::start_server(addr, GatewayState::new(relay)).await
}
