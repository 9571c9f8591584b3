//! Entry point for the `mint-ai` binary.
//!
//! `chat` runs one turn against the configured backend, `replay` runs one
//! turn over a recorded event-stream transcript, and `config` inspects the
//! settings file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mint_ai::models::session::{SessionNotice, TurnOutcome};
use mint_ai::services::plan_mode::{segment_content, ContentBlock};
use mint_ai::{AppConfig, ConfigService, SessionOrchestrator};
use mint_ai_core::SessionMode;
use mint_ai_llm::{GenerationBackend, HttpGenerationBackend, ReplayBackend};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Streaming code-generation session runner")]
struct Cli {
    /// Use this config file instead of ~/.mint-ai/config.json.
    #[arg(long = "config-file", global = true, value_name = "FILE")]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one message to the configured backend.
    Chat {
        message: String,
        /// `plan` or `build`; defaults to the configured mode.
        #[arg(long)]
        mode: Option<SessionMode>,
        /// Print the final plan and workspace as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run a turn over a recorded event-stream transcript and print the
    /// resulting plan and workspace as JSON.
    Replay {
        transcript: PathBuf,
        #[arg(long, default_value = "replayed turn")]
        message: String,
        #[arg(long)]
        mode: Option<SessionMode>,
        /// Bytes per simulated network chunk.
        #[arg(long, default_value_t = 64)]
        chunk_size: usize,
    },
    /// Inspect the settings file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Print the config file location.
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match cli.config_file.as_ref() {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new(),
    }
    .context("failed to load config")?;

    init_tracing(config.get_config().debug_mode);

    match cli.command {
        Command::Chat {
            message,
            mode,
            json,
        } => {
            let settings = config.get_config();
            let backend = HttpGenerationBackend::new(
                &settings.backend_url,
                &settings.generate_path,
                settings.connect_timeout(),
            )?;
            run_turn(Arc::new(backend), settings, &message, mode, json).await
        }
        Command::Replay {
            transcript,
            message,
            mode,
            chunk_size,
        } => {
            let text = std::fs::read_to_string(&transcript)
                .with_context(|| format!("failed to read {}", transcript.display()))?;
            let backend = ReplayBackend::from_transcript(&text, chunk_size);
            run_turn(Arc::new(backend), config.get_config(), &message, mode, true).await
        }
        Command::Config { action } => {
            match action {
                ConfigAction::Show => {
                    println!("{}", serde_json::to_string_pretty(config.get_config())?)
                }
                ConfigAction::Path => println!("{}", config.path().display()),
            }
            Ok(())
        }
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_turn(
    backend: Arc<dyn GenerationBackend>,
    settings: &AppConfig,
    message: &str,
    mode: Option<SessionMode>,
    json: bool,
) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = SessionOrchestrator::from_config(backend, settings).with_notices(tx);
    if let Some(mode) = mode {
        session.set_mode(mode);
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let outcome = session.send_message(message, &cancel).await?;

    while let Ok(notice) = rx.try_recv() {
        if let SessionNotice::PlanUpdated(plan) = notice {
            tracing::debug!(status = %plan.status, steps = plan.steps.len(), "plan update");
        }
    }

    let summary = match outcome {
        TurnOutcome::Cancelled => {
            eprintln!("turn cancelled");
            return Ok(());
        }
        TurnOutcome::Completed(summary) => summary,
    };

    let workspace = session.workspace();
    if json {
        let report = serde_json::json!({
            "message": summary.message.content,
            "plan": summary.plan,
            "workspace": workspace.as_ref(),
            "usage": summary.usage,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for block in segment_content(&summary.message.content) {
        match block {
            ContentBlock::SectionHeader { level, title } => {
                println!("{} {title}", "#".repeat(level as usize))
            }
            ContentBlock::QuestionList { questions } => {
                for q in questions {
                    println!("  ? {}", q.question);
                }
            }
            ContentBlock::Plan { title, steps } => {
                println!("Plan: {title}");
                for step in steps {
                    println!("  {}. {}", step.order, step.title);
                }
            }
            ContentBlock::Summary { text } | ContentBlock::Text { text } => println!("{text}"),
        }
    }

    if let Some(plan) = summary.plan.as_ref() {
        println!("\nplan {} [{}]", plan.title, plan.status);
    }
    for entry in session.diff_summary() {
        println!(
            "{:>8} {} (+{} -{})",
            format!("{:?}", entry.change_type).to_lowercase(),
            entry.path,
            entry.additions,
            entry.deletions
        );
    }
    if !summary.usage.is_empty() {
        println!(
            "\ncost {} tokens {}",
            summary.usage.cost.as_deref().unwrap_or("-"),
            summary.usage.tokens.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
