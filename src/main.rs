//! ELIZA terminal client
//!
//! An interactive terminal front end for the ELIZA conversational service:
//! ask for a name, show the streamed introduction, then relay one line at a
//! time over a long-lived conversation.

mod config;
mod eliza;
mod runtime;
mod state_machine;
mod terminal;
mod view;
mod widgets;

use config::ClientConfig;
use eliza::{ConnectClient, LoggingService, RpcError};
use runtime::{RuntimeError, RuntimeOptions, SessionRuntime};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use terminal::TerminalSession;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Failures that end the program with a non-zero status
#[derive(Debug, Error)]
enum AppError {
    #[error("failed to create client: {0}")]
    Client(#[from] RpcError),
    #[error("failed to set up terminal: {0}")]
    Terminal(#[from] io::Error),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

#[tokio::main]
async fn main() -> ExitCode {
    // The terminal belongs to the UI, so logs go to a file
    if let Some(path) = config::log_path_from_env() {
        init_logging(&path);
    }

    match run(ClientConfig::from_env()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Client exited with an error");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ClientConfig) -> Result<(), AppError> {
    tracing::info!(
        base_url = %config.base_url,
        mode = ?config.converse_mode,
        reply_delay_ms = %config.reply_delay.as_millis(),
        h2c = config.http2_prior_knowledge,
        "Starting ELIZA client"
    );

    let client = ConnectClient::new(
        &config.base_url,
        config.converse_mode,
        config.http2_prior_knowledge,
    )?;
    let options = RuntimeOptions {
        reply_delay: config.reply_delay,
        ..RuntimeOptions::default()
    };

    // Dropping the runtime restores the terminal before any error is printed
    let runtime = SessionRuntime::new(
        LoggingService::new(client),
        TerminalSession::init()?,
        options,
    );
    let session = runtime.run(terminal::input_events()).await?;

    if let Some(error) = &session.last_error {
        tracing::info!(error = %error, "Session ended after a failed call");
    }
    Ok(())
}

/// Logging is best effort: if the file cannot be opened the client runs without it
fn init_logging(path: &Path) {
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eliza=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
}
