use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dmscan::{
    capturer::{camera::NokhwaBackend, list_cameras},
    codes::TerminalBell,
    config::{ScannerArgs, ScannerConfig},
    decoder::zxing::ZxingDecoder,
    display::window::WindowDisplay,
    error::ScanError,
    scanner::Scanner,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S%.3f";

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = ScannerArgs::parse();
    let list_only = args.list;
    let config = ScannerConfig::try_from(args).context("invalid arguments")?;

    let backend = Arc::new(NokhwaBackend);
    let cameras = list_cameras(backend.as_ref(), config.max_devices);
    if list_only {
        for index in &cameras {
            println!("{index}");
        }
        return Ok(());
    }

    let device = match (config.device, cameras.first()) {
        (Some(device), _) => device,
        (None, Some(first)) => *first,
        (None, None) => return Err(ScanError::NoDevices).context("cannot start scanning"),
    };

    let scanner = Scanner::new(config);
    let control = scanner.control();
    if let Err(e) = ctrlc::set_handler(move || control.stop()) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }

    let mut display = WindowDisplay::new("dmscan");
    let status = scanner
        .start(
            backend,
            device,
            ZxingDecoder,
            &mut display,
            Box::new(TerminalBell),
        )
        .with_context(|| format!("scanning on camera #{device} failed"))?;

    info!("Scanned {} unique codes", status.unique);
    if let Some(last) = &status.last {
        info!(
            "Last: {}. {} at {}",
            last.ordinal,
            last.text,
            last.seen_at.format(TIMESTAMP_FORMAT)
        );
    }
    if let Some(milestone) = status.milestone {
        info!(
            "Reached {} codes in {:.2}s",
            scanner.config().milestone,
            milestone.as_secs_f64()
        );
    }
    Ok(())
}
