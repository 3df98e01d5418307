mod cli;
mod commands;
mod player;
mod render;

use crate::cli::{Cli, Command, OffsetAction};
use crate::commands::{Context, PlayArgs};
use crate::player::PlayOutcome;
use clap::Parser;
use lyricflow_core::{LoggingConfig, LyricFlowConfig};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let Cli {
        config: config_file,
        command,
    } = Cli::parse();

    // Load config or create template on first run
    let config = match LyricFlowConfig::load_or_create(config_file.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&LoggingConfig::default(), config_file.as_deref());
            error!("{e}");
            std::process::exit(1);
        }
    };
    init_tracing(&config.logging, config_file.as_deref());
    let context = Context::new(config, config_file);

    let result = match command {
        Command::Parse {
            file,
            mode,
            interval,
            json,
        } => commands::parse(&context.config, &file, mode, interval, json),
        Command::Offset {
            file,
            adjust,
            set,
            later,
            earlier,
            reset,
        } => commands::offset(
            &context,
            &file,
            OffsetAction::from_flags(adjust, set, later, earlier, reset),
        ),
        Command::Play {
            file,
            start,
            duration,
            offset,
            mode,
        } => {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    error!("Failed to create tokio runtime: {e}");
                    std::process::exit(1);
                }
            };

            // Create shared cancellation token for graceful shutdown
            let cancel_token = CancellationToken::new();

            let ctrlc_token = cancel_token.clone();
            if let Err(e) = ctrlc::set_handler(move || {
                info!("Received Ctrl+C, shutting down gracefully...");
                ctrlc_token.cancel();
            }) {
                error!("Failed to set Ctrl+C handler: {}", e);
            }

            let args = PlayArgs {
                file,
                start,
                duration,
                offset,
                mode,
            };
            let result = runtime.block_on(async {
                let (tx, rx) = mpsc::channel(16);
                tokio::spawn(player::read_commands(
                    BufReader::new(tokio::io::stdin()),
                    tx,
                ));
                commands::play(&context, &args, rx, &cancel_token).await
            });

            // The stdin reader may still be blocked on a read
            runtime.shutdown_background();

            result.map(|outcome| {
                if outcome == PlayOutcome::Stopped {
                    info!("Playback stopped before the end of the track");
                }
            })
        }
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

/// Initialize tracing with stderr output and optional file logging.
/// The log file sits next to `config_file` when one is given.
fn init_tracing(logging: &LoggingConfig, config_file: Option<&Path>) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    // Keep stdout for lyrics and `parse --json` output
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if logging.file {
        let log_path = lyricflow_core::paths::log_file_path(config_file);

        // Create the log directory if needed
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
