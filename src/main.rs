use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use iptv_aggregator::{
    config::Config,
    observability::TracingEventSink,
    pipeline::AggregationPipeline,
    utils::{http_client::ReqwestTransport, human_format::format_elapsed},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "iptv-aggregator")]
#[command(version)]
#[command(about = "Aggregates IPTV M3U sources into one probed, deduplicated playlist")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path (created with defaults when missing)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Output playlist path (overrides config file)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Log record format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Also append logs to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Maximum simultaneous liveness probes
    #[arg(long, value_name = "N")]
    max_concurrent: Option<usize>,

    /// Channels probed per batch
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// Wall-clock budget for fetching and probing (e.g. "20m")
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    overall_budget: Option<Duration>,
}

fn init_logging(cli: &Cli) -> Result<()> {
    let log_filter = format!("iptv_aggregator={}", cli.log_level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| log_filter.into());

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    layers.push(match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
    });

    if let Some(path) = &cli.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        let writer = Mutex::new(file);
        layers.push(match cli.log_format {
            LogFormat::Text => tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .boxed(),
        });
    }

    tracing_subscriber::registry().with(layers).with(filter).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    info!("Starting IPTV Aggregator v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config.display());

    // Override config with CLI arguments
    if let Some(output) = cli.output {
        config.output.path = output;
    }
    if let Some(max_concurrent) = cli.max_concurrent {
        config.probe.max_concurrent = max_concurrent;
    }
    if let Some(batch_size) = cli.batch_size {
        config.probe.batch_size = batch_size;
    }
    if let Some(overall_budget) = cli.overall_budget {
        config.run.overall_budget = overall_budget;
    }

    info!(
        "Run settings: sources={} max_concurrent={} batch_size={} budget={} sort={}",
        config.source_refs().len(),
        config.probe.max_concurrent,
        config.probe.batch_size,
        format_elapsed(config.run.overall_budget),
        config.filter.sort_order
    );

    let transport = Arc::new(ReqwestTransport::new(&config.http)?);
    let sink = Arc::new(TracingEventSink::new(config.probe.progress_log_every_batches));
    let pipeline = AggregationPipeline::new(config, transport, sink)?;

    let summary = pipeline.run().await?;
    match &summary.output {
        Some(path) => info!(
            "Done: {} channels written to {} in {}",
            summary.channels,
            path.display(),
            format_elapsed(summary.elapsed)
        ),
        None => info!(
            "Done: no playlist written after {}",
            format_elapsed(summary.elapsed)
        ),
    }
    Ok(())
}
