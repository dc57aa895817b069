//! Console front-end for persona-desk.
//!
//! Reads one message per line from stdin for a single session and prints
//! replies to stdout. Logs go to stderr.

mod config;
mod console;
mod error;

use crate::config::AppConfig;
use crate::console::{ConsoleCommand, ConsoleSink, parse_line, show_menu, show_outcome};
use crate::error::AppError;
use persona_desk_ai::OpenAiGateway;
use persona_desk_conversation::{
    DeliveryError, InMemoryHistoryStore, Markup, MessageSink, NavigationMap, PersonaRegistry,
    SessionOrchestrator, TurnInput,
};
use persona_desk_core::SessionId;
use rootcause::Report;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> persona_desk_core::Result<(), AppError> {
    let config = AppConfig::from_env().map_err(|e| AppError::Config {
        details: e.to_string(),
    })?;
    let conversation = config.conversation();
    conversation.validate().map_err(|e| AppError::Config {
        details: e.to_string(),
    })?;
    info!(
        chat_model = %config.chat_model,
        max_history_pairs = conversation.max_history_pairs,
        "loaded configuration"
    );

    let mut registry = PersonaRegistry::builtin();
    registry.apply_overrides(&conversation.personas);

    let gateway = OpenAiGateway::new(config.openai()).map_err(|e| AppError::Gateway {
        details: e.to_string(),
    })?;

    let orchestrator = SessionOrchestrator::new(
        registry,
        NavigationMap::builtin(),
        gateway,
        InMemoryHistoryStore::new(conversation.max_history_pairs),
    );
    let sink = ConsoleSink::new(tokio::io::stdout());
    let session = SessionId::new("console");
    let io_error = |e: std::io::Error| AppError::Io {
        details: e.to_string(),
    };
    let delivery_error = |e: Report<DeliveryError>| AppError::Io {
        details: e.to_string(),
    };

    show_menu(&sink, orchestrator.navigation())
        .await
        .map_err(delivery_error)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.map_err(io_error)?,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        let input = match parse_line(&line) {
            None => continue,
            Some(ConsoleCommand::Quit) => break,
            Some(ConsoleCommand::Turn(input)) => input,
            Some(ConsoleCommand::Voice(path)) => match tokio::fs::read(&path).await {
                Ok(audio) => TurnInput::Audio(audio),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot read voice file");
                    sink.send(&format!("cannot read {}: {e}", path.display()), Markup::None)
                        .await
                        .map_err(|e| AppError::Io {
                            details: e.to_string(),
                        })?;
                    continue;
                }
            },
        };

        match orchestrator.handle_turn(&session, input).await {
            Ok(outcome) => show_outcome(&sink, &outcome, orchestrator.navigation())
                .await
                .map_err(delivery_error)?,
            Err(err) => {
                warn!(error = %err, "turn rejected");
                sink.send(&err.to_string(), Markup::None)
                    .await
                    .map_err(|e| AppError::Io {
                        details: e.to_string(),
                    })?;
            }
        }
    }

    info!("bye");
    Ok(())
}
