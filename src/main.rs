//! xrinteract - A deterministic XR interaction engine
//!
//! Headless driver: replays scripted input against a demo scene and logs
//! every interaction event.

mod config;
mod headless;
mod scripted_input;

use anyhow::Result;
use clap::Parser;
use config::{AppConfig, DEFAULT_CONFIG_PATH};
use headless::HeadlessConfig;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless XR interaction driver", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// JSON scripted-input file; the built-in demo runs when omitted
    #[arg(long)]
    script: Option<PathBuf>,

    /// Write every event as JSON lines to this file
    #[arg(long)]
    event_log: Option<PathBuf>,

    /// Write a JSON run summary to this file
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Override the frame limit
    #[arg(long)]
    max_frames: Option<u64>,

    /// Override the render tick rate (Hz)
    #[arg(long)]
    render_hz: Option<f32>,

    /// Override the physics tick rate (Hz)
    #[arg(long)]
    physics_hz: Option<f32>,

    /// Keep running after the script's last step until the frame limit
    #[arg(long)]
    hold_last_step: bool,

    /// Write the effective configuration to --config and exit
    #[arg(long)]
    write_config: bool,
}

fn main() -> Result<()> {
    // Initialize tracing with WARN level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting xrinteract v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let mut app = AppConfig::load_from_path(&cli.config);
    if let Some(value) = cli.max_frames {
        app.run.max_frames = value;
    }
    if let Some(value) = cli.render_hz {
        app.run.render_hz = value.clamp(1.0, 1_000.0);
    }
    if let Some(value) = cli.physics_hz {
        app.run.physics_hz = value.clamp(1.0, 1_000.0);
    }

    if cli.write_config {
        app.save_to_path(&cli.config)?;
        println!("Wrote {}", cli.config.display());
        return Ok(());
    }

    let summary = headless::run(HeadlessConfig {
        app,
        scripted_input: cli.script,
        event_log: cli.event_log,
        summary: cli.summary,
        exit_when_script_finished: !cli.hold_last_step,
    })?;

    println!(
        "{}: {} frames, {} physics steps, {} platform requests, final modality {:?}",
        summary.name, summary.frames, summary.physics_steps, summary.requests, summary.final_modality
    );
    for (label, count) in &summary.counts {
        println!("  {label:<20} {count}");
    }
    Ok(())
}
