use anyhow::{Context, Result};
use atelier_core::AtelierConfig;
use atelier_gateway::GatewayServer;
use atelier_reasoning::PersonaRouter;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "atelier", author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "atelier.toml", env = "ATELIER_CONFIG")]
    config: String,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(long)]
    port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Print the intent label for an utterance
    Classify {
        /// The utterance; multiple words are joined with spaces
        #[arg(required = true)]
        text: Vec<String>,
    },
}

/// Logs go to stderr so `classify` output stays pipeable.
fn init_tracing(json: bool, default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let command = args.command.unwrap_or(Command::Serve);

    let default_level = match command {
        Command::Serve => "info",
        Command::Classify { .. } => "warn",
    };
    init_tracing(args.log_json, default_level);

    let mut config = AtelierConfig::load_or_default(&args.config);
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    match command {
        Command::Serve => serve(config).await,
        Command::Classify { text } => classify(config, &text.join(" ")).await,
    }
}

async fn serve(config: AtelierConfig) -> Result<()> {
    info!("Initializing Atelier...");
    info!(
        project = config.llm.project.as_deref().unwrap_or("(unset)"),
        location = config.llm.location.as_deref().unwrap_or("(unset)"),
        provider = %config.llm.provider,
        model = %config.llm.model,
        "Model backend"
    );

    let router = Arc::new(PersonaRouter::from_config(&config).context("Failed to build persona router")?);
    let handle = GatewayServer::new(router, &config.server).start().await?;

    tokio::select! {
        result = handle => {
            if let Err(e) = result {
                error!("Gateway task failed: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C, shutting down");
        }
    }
    Ok(())
}

async fn classify(config: AtelierConfig, utterance: &str) -> Result<()> {
    let router = PersonaRouter::from_config(&config).context("Failed to build persona router")?;
    let intent = router.classify(utterance).await;
    println!("{}", intent);
    Ok(())
}
