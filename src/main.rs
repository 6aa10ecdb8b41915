use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use voxline::{AppContext, Config, FileInput, LogNotifier};

#[derive(Parser)]
#[command(name = "voxline", about = "Recording and transcription pipeline")]
struct Cli {
    /// Config file (defaults apply when omitted)
    #[arg(long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe the transcription server (health + models)
    Status,
    /// Queue audio files and drain them through the server
    Transcribe { files: Vec<PathBuf> },
    /// Connect the event channel and log inbound events
    Listen,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    info!("{} starting", config.service.name);
    let ctx = AppContext::new(config, Arc::new(LogNotifier));

    match cli.command {
        Command::Status => {
            let health = ctx.transcriber.health().await?;
            info!("Server: {} (device: {})", health.status, health.device);
            for model in ctx.transcriber.models().await? {
                info!("Model {}: ready={}", model.id, model.ready);
            }
        }
        Command::Transcribe { files } => {
            if files.is_empty() {
                anyhow::bail!("No files given");
            }
            let mut inputs = Vec::new();
            for path in &files {
                let audio = std::fs::read(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                inputs.push(FileInput::new(name, audio));
            }

            let added = ctx.queue.add_files(inputs);
            info!("Queued {} file(s)", added.len());
            ctx.queue.process_next().await;

            for file in ctx.queue.files() {
                match (file.result, file.error) {
                    (Some(text), _) => info!("{}: {}", file.name, text),
                    (_, Some(error)) => warn!("{}: {}", file.name, error),
                    _ => warn!("{}: not processed", file.name),
                }
            }
            let stats = ctx.queue.stats();
            info!(
                "Done: {} completed, {} failed, {} bytes total",
                stats.completed, stats.failed, stats.total_bytes
            );
        }
        Command::Listen => {
            let subscription = ctx.channel.subscribe(|message| {
                info!("event {:?}: {}", message.kind, message.data);
            });
            ctx.channel.connect();
            info!("Listening on {} (ctrl-c to stop)", ctx.config.events.url);
            tokio::signal::ctrl_c().await?;
            subscription.unsubscribe();
            ctx.channel.disconnect();
        }
    }

    Ok(())
}
