mod disc_file;
mod metrics;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use discoder_core::{
    load_config, validate_config, Config, ConversionRunner, RunSummary, StopHandle, Toolkit,
};

use disc_file::load_disc;
use progress::{summary_lines, Reporter};

#[derive(Parser)]
#[command(
    name = "discoder",
    version,
    about = "Convert disc images into tagged per-track audio files"
)]
struct Cli {
    /// Configuration file; `DISCODER_CONFIG` when not given, defaults otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disc description files (TOML)
    #[arg(required = true)]
    discs: Vec<PathBuf>,

    /// Print every event as a JSON line
    #[arg(long)]
    json: bool,

    /// Write Prometheus metrics to this file when done
    #[arg(long)]
    metrics_out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Cli::parse()).await {
        Ok(summary) if summary.success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(2),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<RunSummary> {
    let config = resolve_config(cli.config.clone())?;
    info!(
        splits = config.runner.max_parallel_splits,
        encodes = config.runner.max_parallel_encodes,
        work_dir = ?config.runner.work_dir,
        format = ?config.profile.format,
        "Configuration loaded"
    );

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let toolkit = Toolkit::ffmpeg(&config.ffmpeg);
    let mut runner = ConversionRunner::new(config.runner.clone(), toolkit, events_tx);
    let mut reporter = Reporter::new(cli.json);

    for path in &cli.discs {
        let loaded = load_disc(path)?;
        let profile = loaded.profile.unwrap_or_else(|| config.profile.clone());
        let album = loaded.disc.album_title();
        let id = runner
            .add_disc(profile, Arc::new(loaded.disc), loaded.tracks)
            .with_context(|| format!("Failed to prepare disc {:?}", path))?;
        reporter.add_album(id, album);
    }

    tokio::spawn(stop_on_signal(runner.stop_handle()));

    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if let Some(line) = reporter.line(&event) {
                println!("{}", line);
            }
        }
    });

    let summary = runner.run().await;
    if let Err(e) = printer.await {
        warn!("Progress printer failed: {}", e);
    }

    if !cli.json {
        for line in summary_lines(&summary) {
            println!("{}", line);
        }
    }

    if let Some(path) = &cli.metrics_out {
        let text = metrics::encode_metrics()?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write metrics to {:?}", path))?;
        info!("Metrics written to {:?}", path);
    }

    Ok(summary)
}

fn resolve_config(path: Option<PathBuf>) -> Result<Config> {
    let path = path.or_else(|| std::env::var("DISCODER_CONFIG").ok().map(PathBuf::from));

    let config = match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(&path)
                .with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => {
            info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

/// Stops the runner on Ctrl+C or SIGTERM.
async fn stop_on_signal(stop: StopHandle) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Stop requested");
    stop.stop();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "discoder",
            "--config",
            "discoder.toml",
            "--json",
            "--metrics-out",
            "metrics.txt",
            "a.toml",
            "b.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("discoder.toml")));
        assert!(cli.json);
        assert_eq!(cli.discs.len(), 2);
        assert_eq!(cli.metrics_out, Some(PathBuf::from("metrics.txt")));
    }

    #[test]
    fn test_cli_requires_a_disc() {
        assert!(Cli::try_parse_from(["discoder"]).is_err());
    }

    #[test]
    fn test_resolve_config_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("discoder.toml");
        std::fs::write(&path, "[runner]\nmax_parallel_encodes = 3\n").unwrap();

        let config = resolve_config(Some(path)).unwrap();
        assert_eq!(config.runner.max_parallel_encodes, 3);
    }

    #[test]
    fn test_resolve_config_rejects_invalid() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("discoder.toml");
        std::fs::write(&path, "[runner]\nmax_parallel_splits = 0\n").unwrap();

        assert!(resolve_config(Some(path)).is_err());
    }
}
