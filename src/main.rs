mod cli;
mod config;
mod error;
mod handlers;
mod models;
mod presentation;
mod relay; // POST /api/vqa relay
mod services;

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;

use cli::{Cli, Commands};
use config::Config;
use handlers::Orchestrator;
use presentation::AnalysisReport;
use services::image::validate_upload;
use services::RelayVqaClient;

fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(relay_url) = cli.relay_url {
        config.relay_url = relay_url;
    }
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy;
    }

    let runtime = build_runtime(&cli.command)?;
    runtime.block_on(run(cli.command, config))
}

/// The relay serves many requests at once; the client drives a single session.
fn build_runtime(command: &Commands) -> std::io::Result<tokio::runtime::Runtime> {
    let mut builder = if command.is_server() {
        tokio::runtime::Builder::new_multi_thread()
    } else {
        tokio::runtime::Builder::new_current_thread()
    };
    builder.enable_all().build()
}

async fn run(command: Commands, config: Config) -> Result<()> {
    match command {
        #[cfg(feature = "relay-server")]
        Commands::Serve { addr } => serve(config, addr).await,
        Commands::Analyze { files, json } => analyze(config, files, json).await,
        Commands::Session => {
            let mut orchestrator = build_orchestrator(&config);
            presentation::run_session(&mut orchestrator, config.max_upload_bytes).await
        }
    }
}

fn build_orchestrator(config: &Config) -> Orchestrator {
    let client = Arc::new(RelayVqaClient::new(&config.relay_url, config.timeout()));
    log::info!(
        "✅ VQA client initialized: {} (timeout {} ms, {} calls)",
        client.endpoint(),
        config.timeout_ms,
        config.strategy
    );

    let orchestrator = Orchestrator::new(client, config.strategy);
    log::debug!("Orchestrator strategy: {}", orchestrator.strategy());
    orchestrator
}

async fn analyze(config: Config, files: Vec<std::path::PathBuf>, json: bool) -> Result<()> {
    let mut orchestrator = build_orchestrator(&config);
    let mut reports = Vec::new();

    for file in files {
        if json {
            // Validate here so rejections land in the report instead of stdout.
            if let Err(e) = validate_upload(&file, config.max_upload_bytes) {
                log::warn!("⚠️ Upload rejected: {}", e);
                reports.push(AnalysisReport::rejected(file, e.to_string()));
                continue;
            }
        }

        let Some(status) =
            presentation::upload(&mut orchestrator, file.clone(), config.max_upload_bytes).await
        else {
            continue;
        };

        let view = orchestrator.view();
        if json {
            reports.push(AnalysisReport::from_view(file, status, &view));
        } else {
            // History is per-session; the one-shot output shows only the current result.
            let frame = presentation::render(&models::ViewState {
                history: Vec::new(),
                ..view
            });
            println!("{}", frame);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    Ok(())
}

#[cfg(feature = "relay-server")]
async fn serve(config: Config, addr: Option<String>) -> Result<()> {
    use relay::server::create_relay_router;
    use services::HuggingFaceVqa;

    log::info!("🚀 Starting Dish VQA relay...");

    let token = config.require_hf_token()?.to_string();
    let model = Arc::new(HuggingFaceVqa::new(
        token,
        config.model_url.clone(),
        config.upstream_timeout(),
    ));
    log::info!(
        "✅ Upstream model: {} (timeout {} ms)",
        config.model_url,
        config.upstream_timeout_ms
    );

    let app = create_relay_router(model, config.max_upload_bytes);
    let addr = addr.unwrap_or(config.relay_addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("🌐 Relay listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("🛑 Shutting down...");
        })
        .await?;

    Ok(())
}
