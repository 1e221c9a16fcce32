use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use parley_ai::{OpenAIClient, RetryConfig};
use parley_core::channel::{Channel, TelegramChannel, TelegramConfig};
use parley_core::runtime::{start_message_handler, ChatDispatcher, ChatDispatcherConfig};
use parley_core::{AdmissionGate, PromptAssembler, SessionStore, Settings, StyleAccumulator};

#[derive(Parser)]
#[command(name = "parley", about = "Telegram relay bot with a learned persona")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default)
    Run,
    /// Validate configuration and backend connectivity, then exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let settings =
        Settings::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(settings).await,
        Commands::Check => check(settings).await,
    }
}

async fn run(settings: Settings) -> Result<()> {
    let channel: Arc<dyn Channel> = Arc::new(build_channel(&settings));
    let dispatcher = Arc::new(build_dispatcher(&settings, channel.clone())?);

    start_message_handler(channel, dispatcher);
    info!("Parley started (model: {})", settings.generation.model);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutting down");
    Ok(())
}

async fn check(settings: Settings) -> Result<()> {
    let channel = build_channel(&settings);
    let me = channel
        .test_connection()
        .await
        .context("Telegram connection check failed")?;
    println!(
        "Telegram OK: @{}",
        me.username.as_deref().unwrap_or("<no username>")
    );
    println!("Model: {}", settings.generation.model);
    println!(
        "Privileged senders: {}",
        if settings.chat.privileged_senders.is_empty() {
            "none".to_string()
        } else {
            settings.chat.privileged_senders.join(", ")
        }
    );
    Ok(())
}

fn build_channel(settings: &Settings) -> TelegramChannel {
    TelegramChannel::new(
        TelegramConfig::new(settings.telegram.bot_token.clone())
            .with_poll_timeout(settings.telegram.poll_timeout_secs),
    )
}

fn build_dispatcher(settings: &Settings, channel: Arc<dyn Channel>) -> Result<ChatDispatcher> {
    let generation = &settings.generation;
    let chat = &settings.chat;

    let mut llm = OpenAIClient::new(generation.api_key.clone())
        .with_model(generation.model.clone())
        .with_retry_config(RetryConfig {
            max_retries: generation.max_retries,
            ..Default::default()
        })
        .with_request_timeout(Duration::from_secs(generation.request_timeout_secs));
    if let Some(base_url) = &generation.base_url {
        llm = llm.with_base_url(base_url.clone());
    }

    let style = StyleAccumulator::new(
        chat.privileged_senders.clone(),
        chat.style_capacity,
        chat.style_corpus_path.clone(),
    )?;
    let seeded = style.reload_from_file();
    if seeded > 0 {
        info!("Seeded style corpus with {} samples", seeded);
    }

    Ok(ChatDispatcher::new(
        Arc::new(AdmissionGate::new(Duration::from_secs(chat.cooldown_secs))),
        Arc::new(SessionStore::new(chat.history_capacity)?),
        Arc::new(style),
        PromptAssembler::new(chat.persona_max_chars),
        Arc::new(llm),
        channel,
        ChatDispatcherConfig {
            temperature: generation.temperature,
            response_timeout_secs: chat.response_timeout_secs,
            send_typing_indicator: chat.send_typing_indicator,
        },
    ))
}
