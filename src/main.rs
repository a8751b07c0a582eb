//! LightPilot - page capture, streaming chat and agent automation.

mod cli;
mod cmd_build;
mod cmd_capture;
mod cmd_chat;
mod cmd_state;
mod container;

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use lightpilot_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use lightpilot_page_agent::HttpPageLoader;

use cli::{Cli, Commands};
use container::ContextContainer;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Console logging, plus a daily rolling file when `[logging].file` is set.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let file_layer = match &logging.file {
        Some(file) => {
            let path = PathBuf::from(ConfigLoader::expand_path(file));
            let dir = path.parent().unwrap_or(Path::new("."));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let prefix = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("lightpilot.log");

            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(prefix)
                .max_log_files(14)
                .build(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = LOG_GUARD.set(guard);
            Some(fmt::layer().with_writer(writer).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    let path = PathBuf::from(ConfigLoader::expand_path(path));
    let config = ConfigLoader::load_or_default(&path)
        .with_context(|| format!("loading {}", path.display()))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_tracing(&config.logging)?;

    let warnings = ConfigValidator::validate(&config)?.into_result()?;
    for warning in warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }

    info!("LightPilot v{}", env!("CARGO_PKG_VERSION"));
    let container = ContextContainer::start(config, Arc::new(HttpPageLoader::new())).await?;

    let result = match cli.command {
        Commands::Chat {
            text,
            page,
            system,
            no_stream,
            model,
        } => cmd_chat::chat(&container, &text, page.as_deref(), system, !no_stream, model).await,
        Commands::Keywords { page } => cmd_chat::keywords(&container, &page).await,
        Commands::Search { query, max_results } => {
            cmd_chat::search(&container, &query, max_results).await
        }
        Commands::Capture { url } => cmd_capture::run(&container, &url).await,
        Commands::Build { prompt } => cmd_build::build(&container, &prompt).await,
        Commands::State { action } => cmd_state::handle(&container, action).await,
    };

    container.shutdown().await;
    result
}
