//! Parley - replays a text through the streaming engine to the terminal.

mod render;
mod transport;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use parley_stream::{EngineConfig, StreamDriver, StreamEngine, StreamStatus};

use crate::render::TerminalRenderer;
use crate::transport::SimulatedTransport;

/// Parley stream replay
#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Replay text as a paced, streamed model response")]
#[command(version)]
struct Args {
    /// Text file to replay (reads stdin when omitted)
    file: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Characters revealed per tick (overrides config)
    #[arg(short, long)]
    speed: Option<usize>,

    /// Characters per simulated transport chunk
    #[arg(long, default_value_t = 12)]
    chunk_size: usize,

    /// Delay between simulated chunks, in milliseconds
    #[arg(long, default_value_t = 40)]
    chunk_delay_ms: u64,

    /// Fail the simulated transport after this many chunks
    #[arg(long)]
    fail_after: Option<usize>,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    json_logs: bool,
}

fn setup_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    Ok(match args.speed {
        Some(speed) => config.with_typing_speed(speed),
        None => config,
    })
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

async fn run(args: Args) -> Result<StreamEngine> {
    let config = load_config(&args)?;
    let text = read_input(args.file.as_ref())?;

    let engine = StreamEngine::new(&config);
    let _renderer = engine.subscribe(TerminalRenderer::new(std::io::stdout()).into_listener());

    let (driver, handle) = StreamDriver::new(engine, &config);
    let shutdown = CancellationToken::new();
    let driver_task = tokio::spawn(driver.run(shutdown.clone()));

    let transport = SimulatedTransport::new(
        &text,
        args.chunk_size,
        Duration::from_millis(args.chunk_delay_ms),
    )
    .with_failure_after(args.fail_after);
    info!(
        chunks = transport.chunks().len(),
        speed = config.typing_speed,
        "Starting replay"
    );

    let replay = transport.run(handle.clone());
    tokio::pin!(replay);

    tokio::select! {
        result = &mut replay => result?,
        _ = signal::ctrl_c() => {
            warn!("Received Ctrl+C, aborting stream");
            handle.abort();
            replay.await?;
        }
    }

    drop(handle);
    driver_task.await.context("Driver task failed")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    setup_logging(&args.log_level, args.json_logs);

    let engine = match run(args).await {
        Ok(engine) => engine,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("parley: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let state = engine.state();
    let ttfc = engine
        .time_to_first_chunk()
        .map(|d| format!("{}ms", d.as_millis()))
        .unwrap_or_else(|| "-".to_string());
    eprintln!(
        "[{}] {} chunks, {} chars, first chunk {}",
        state.status,
        state.chunks_received,
        state.content.chars().count(),
        ttfc
    );

    match state.status {
        StreamStatus::Error => {
            if let Some(message) = state.error_message() {
                eprintln!("error: {}", message);
            }
            ExitCode::FAILURE
        }
        _ => ExitCode::SUCCESS,
    }
}
