use anyhow::{Context, Result};
use clap::Parser;
use screencam::capture::DeviceCatalog;
use screencam::{
    run_session, Config, DirectorySink, LogUi, SessionConfig, SessionEvent, StartRequest,
    SyntheticPlatform,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Record the screen with a picture-in-picture camera overlay
#[derive(Debug, Parser)]
#[command(name = "screencam", version)]
struct Args {
    /// Config file (without extension is fine)
    #[arg(short, long)]
    config: Option<String>,

    /// Seconds to record before stopping
    #[arg(short, long, default_value_t = 5)]
    duration: u64,

    /// Directory the recording is written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Camera device id
    #[arg(long)]
    camera: Option<String>,

    /// Microphone device id
    #[arg(long)]
    microphone: Option<String>,

    /// Record the screen only
    #[arg(long)]
    no_camera: bool,

    /// Print capture devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("screencam=info")),
        )
        .init();

    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    if let Some(dir) = &args.output_dir {
        cfg.recording.output_dir = dir.clone();
    }
    if args.camera.is_some() {
        cfg.devices.camera = args.camera.clone();
    }
    if args.no_camera {
        cfg.capture.camera_enabled = false;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let platform = Arc::new(SyntheticPlatform::new());

    if args.list_devices {
        let devices = DeviceCatalog::new(platform).list_devices().await?;
        for device in devices.video_inputs.iter().chain(devices.audio_inputs.iter()) {
            println!("{:?}\t{}\t{}", device.kind, device.id, device.display_name());
        }
        return Ok(());
    }

    let session_config = SessionConfig::from_config(&cfg);
    info!("Recording to {}", cfg.recording.output_dir.display());

    let (events_tx, events_rx) = mpsc::channel(8);
    let driver = tokio::spawn(run_session(
        platform,
        Arc::new(LogUi),
        Arc::new(DirectorySink::new(cfg.recording.output_dir.clone())),
        session_config,
        events_rx,
    ));

    // Sends fail only once the session tore itself down (e.g. initialization failed)
    let _ = events_tx.send(SessionEvent::Init).await;
    let _ = events_tx
        .send(SessionEvent::Start(StartRequest {
            display: None,
            microphone_device_id: args.microphone.clone(),
        }))
        .await;

    tokio::time::sleep(Duration::from_secs(args.duration)).await;

    let _ = events_tx.send(SessionEvent::Stop).await;
    drop(events_tx);

    let stats = driver.await.context("Session task failed")?;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
