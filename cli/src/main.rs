//! CLI entrypoint for persona-chat
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use persona_application::{ChatOrchestrator, HistoryRecorder, NoHistoryRecorder};
use persona_domain::DEFAULT_ROLE_ID;
use persona_infrastructure::{
    ConfigLoader, FileConfig, JsonPromptStore, JsonlHistoryRecorder, OpenAiCompletionClient,
    OpenAiSettings,
};
use persona_presentation::{ChatRepl, Cli, ConsoleFormatter, OutputFormat, print_stream};
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Held until exit so buffered log lines are flushed
    let _log_guard = init_logging(&cli)?;

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    info!("Starting persona-chat");

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {e}"))?
    };

    let orchestrator = Arc::new(build_orchestrator(&config)?);

    // Chat mode
    if cli.chat {
        let repl = ChatRepl::new(orchestrator, cli.user.clone()).with_streaming(!cli.no_stream);
        repl.run().await?;
        return Ok(());
    }

    // Single message mode - message is required
    let Some(message) = cli.message.as_deref() else {
        bail!("Message is required. Use --chat for interactive mode.");
    };

    if cli.buffered() {
        let response = orchestrator
            .chat(&cli.user, message, cli.role.as_deref())
            .await?;
        let output = match cli.output {
            OutputFormat::Text => ConsoleFormatter::format_response(&response),
            OutputFormat::Json => ConsoleFormatter::format_json(&response),
        };
        println!("{}", output);
        return Ok(());
    }

    let stream = orchestrator
        .chat_stream(&cli.user, message, cli.role.as_deref())
        .await;
    if !print_stream(stream).await? {
        bail!("Reply did not complete");
    }

    Ok(())
}

/// Initialize logging based on verbosity level, to stderr or `--log-file`.
fn init_logging(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match &cli.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Could not open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            builder.with_writer(writer).with_ansi(false).init();
            Ok(Some(guard))
        }
        None => {
            builder.with_writer(std::io::stderr).init();
            Ok(None)
        }
    }
}

/// Wire config, adapters and the orchestrator together.
fn build_orchestrator(config: &FileConfig) -> Result<ChatOrchestrator> {
    for issue in config.validate() {
        if issue.is_error() {
            error!("Config: {}", issue.message);
        } else {
            warn!("Config: {}", issue.message);
        }
    }
    let mut params = config.to_chat_params();

    let store = JsonPromptStore::new(&config.storage.prompts_path);
    let registry = Arc::new(store.load_registry()?);
    info!(roles = registry.len(), path = %store.path().display(), "Role prompts loaded");

    if !registry.contains(&params.default_role) {
        warn!(
            "Default role '{}' is not defined in {}, using '{}'",
            params.default_role,
            store.path().display(),
            DEFAULT_ROLE_ID
        );
        params.default_role = DEFAULT_ROLE_ID.to_string();
    }

    let client = OpenAiCompletionClient::new(OpenAiSettings::from_config(&config.provider))?;
    info!(
        base_url = %client.settings().base_url,
        model = %client.settings().model,
        "Completion endpoint configured"
    );

    let recorder: Arc<dyn HistoryRecorder> =
        match JsonlHistoryRecorder::open(&config.storage.history_path) {
            Ok(recorder) => Arc::new(recorder),
            Err(e) => {
                warn!(
                    "History disabled, could not open {}: {}",
                    config.storage.history_path.display(),
                    e
                );
                Arc::new(NoHistoryRecorder)
            }
        };

    let orchestrator = ChatOrchestrator::new(Arc::new(client), registry, params)
        .context("Could not start the chat service")?
        .with_history_recorder(recorder);
    Ok(orchestrator)
}
