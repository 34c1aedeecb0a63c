//! Binary entrypoint for the random slideshow.
//!
//! Runs a headless session: scans the folder, then logs every frame the clock
//! hands to the display until Ctrl-C or stdin closes.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

use random_slideshow::config::Configuration;
use random_slideshow::decode::FileDecoder;
use random_slideshow::display::{FitMode, LogSurface, MonitorPlacement, Rect, StaticMonitors};
use random_slideshow::filter::OrientationFilter;
use random_slideshow::platform::keep_awake::CommandKeepAwake;
use random_slideshow::session::Session;

const FALLBACK_SCREEN: Rect = Rect {
    x: 0,
    y: 0,
    width: 1920,
    height: 1080,
};

#[derive(Debug, Parser)]
#[command(
    name = "random-slideshow",
    version,
    about = "Show random images from a folder tree"
)]
struct Args {
    /// Path to YAML config
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Folder to scan (overrides photo-library-path)
    #[arg(short, long, value_name = "DIR")]
    folder: Option<PathBuf>,
    /// Time per image, e.g. "3s" or "1m 30s"
    #[arg(short, long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    interval: Option<Duration>,
    #[arg(long, value_name = "PX")]
    min_width: Option<u32>,
    #[arg(long, value_name = "PX")]
    min_height: Option<u32>,
    #[arg(long, value_enum)]
    orientation: Option<OrientationFilter>,
    #[arg(long, value_enum)]
    fit: Option<FitMode>,
    /// Index of the monitor to show images on
    #[arg(long, value_name = "INDEX")]
    monitor: Option<usize>,
    /// Deterministic RNG seed for candidate selection
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        n => {
            let level = if n == 1 { Level::DEBUG } else { Level::TRACE };
            EnvFilter::from_default_env()
                .add_directive(format!("random_slideshow={level}").parse()?)
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

fn load_config(args: &Args) -> Result<Configuration> {
    let mut cfg = match &args.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };
    if let Some(folder) = &args.folder {
        cfg.photo_library_path = Some(folder.clone());
    }
    if let Some(interval) = args.interval {
        cfg.interval = interval;
    }
    if let Some(w) = args.min_width {
        cfg.filter.min_width = w;
    }
    if let Some(h) = args.min_height {
        cfg.filter.min_height = h;
    }
    if let Some(o) = args.orientation {
        cfg.filter.orientation = o;
    }
    if let Some(fit) = args.fit {
        cfg.fit_mode = fit;
    }
    if let Some(monitor) = args.monitor {
        cfg.monitor = monitor;
    }
    if args.seed.is_some() {
        cfg.selection_seed = args.seed;
    }
    cfg.validated().context("invalid configuration values")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;
    let cfg = load_config(&args)?;
    tracing::debug!("configuration: {cfg:#?}");

    let Some(folder) = cfg.photo_library_path.clone() else {
        bail!("no folder selected; pass --folder or set photo-library-path");
    };

    let monitors = StaticMonitors(cfg.monitors.clone());
    let target = monitors.target_rect(cfg.monitor).unwrap_or(FALLBACK_SCREEN);
    info!(monitor = cfg.monitor, ?target, "display target");

    let mut session = Session::new(Arc::new(FileDecoder), Arc::new(LogSurface::new(target)));
    if let Some(seed) = cfg.selection_seed {
        session = session.with_seed(seed);
    }
    if let Some(plan) = cfg.keep_awake.clone() {
        session = session.with_keep_awake(Box::new(CommandKeepAwake::new(plan)?));
    }
    session.set_filter(
        cfg.filter.min_width,
        cfg.filter.min_height,
        cfg.filter.orientation,
    );
    session.set_interval(cfg.interval)?;
    session.set_fit_mode(cfg.fit_mode);

    let count = session
        .select_folder(&folder, |percent| info!(percent, "enumerating"))
        .await
        .with_context(|| format!("failed to scan {}", folder.display()))?;
    info!(count, "enumeration complete");

    let cancel = CancellationToken::new();
    spawn_shutdown_watchers(&cancel);

    let mut current = session.current_path();
    let mut failures = session.take_failures();
    session.start().context("failed to start slideshow")?;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = current.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(path) = current.borrow_and_update().as_ref() {
                    println!("{}", path.display());
                }
            }
            Some(err) = async { failures.as_mut()?.recv().await } => {
                warn!("background fill failed: {err}");
            }
        }
    }

    session.stop().await;
    Ok(())
}

fn spawn_shutdown_watchers(cancel: &CancellationToken) {
    // Ctrl-D/Ctrl-C stop the slideshow
    if io::stdin().is_terminal() {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let mut sink = Vec::new();
            match io::stdin().read_to_end(&mut sink) {
                Ok(_) => info!("stdin closed; initiating shutdown"),
                Err(err) => warn!("stdin watcher failed: {err}"),
            }
            cancel.cancel();
        });
    }

    let cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("ctrl-c handler failed: {err}");
            return;
        }
        info!("ctrl-c received; initiating shutdown");
        cancel.cancel();
    });
}
