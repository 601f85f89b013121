mod chat;
mod cli;
mod printer;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use quill_assistant::ConversationSession;
use quill_common::QuillError;
use quill_config::{config_to_json, load_config_from, validation, QuillConfig};

fn apply_overrides(config: &mut QuillConfig, args: &cli::Args) -> Result<(), QuillError> {
    if let Some(transport) = args.transport {
        config.assistant.transport = transport;
    }
    if let Some(base_url) = &args.base_url {
        config.assistant.base_url = base_url.clone();
    }
    validation::validate(config)?;
    Ok(())
}

async fn run(config: QuillConfig, args: cli::Args) -> Result<(), QuillError> {
    let session =
        ConversationSession::connect(&config).map_err(|e| QuillError::Assistant(e.to_string()))?;

    let result = match args.ask.as_deref() {
        Some(question) => chat::ask_once(&session, question).await,
        None => chat::run(&session).await,
    };
    session.close();
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let loaded = load_config_from(args.config.as_deref());
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => QuillConfig::default(),
    };

    let directive = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.directive());
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive)),
        )
        .init();

    tracing::info!("Quill v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = loaded {
        if args.config.is_some() {
            tracing::error!("Config load failed: {e}");
            return ExitCode::FAILURE;
        }
        tracing::warn!("Config load failed, using defaults: {e}");
    }

    if let Err(e) = apply_overrides(&mut config, &args) {
        tracing::error!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }
    tracing::info!(
        transport = %config.assistant.transport,
        base_url = %config.assistant.base_url,
        "Config loaded"
    );

    if args.print_config {
        println!("{}", config_to_json(&config));
        return ExitCode::SUCCESS;
    }

    match run(config, args).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
