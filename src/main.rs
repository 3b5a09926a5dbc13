//! grctl - Wi-Fi remote control for RICOH GR cameras.
//!
//! Provides both human-friendly and robot (JSON) interfaces.
#![forbid(unsafe_code)]

use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use gr::Snapshot;
use gr::cli::{Cli, Commands, WatchArgs};
use gr::config::{CameraConfig, load_config};
use gr::output::{Output, OutputMode, VersionInfo};
use gr::{CameraError, Controller, DeviceFamily, EventKind, logging};

/// Build information embedded at compile time.
mod build_info {
    use gr::output::VersionInfo;

    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn info() -> VersionInfo {
        VersionInfo {
            version: VERSION,
            git_sha: option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
            git_dirty: option_env!("VERGEN_GIT_DIRTY").unwrap_or("false"),
            build_timestamp: option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown"),
            rustc: option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown"),
            target: option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown"),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.json, cli.verbose, cli.quiet);

    let output = OutputMode::from_flag(cli.json).into_output();
    if let Err(e) = run(&cli, output.as_ref()).await {
        report(output.as_ref(), &e);
        std::process::exit(1);
    }
}

fn report(output: &dyn Output, error: &anyhow::Error) {
    match error.downcast_ref::<CameraError>() {
        Some(camera_error) => output.error(camera_error),
        None => output.error(&CameraError::Other(format!("{error:#}"))),
    }
}

async fn run(cli: &Cli, output: &dyn Output) -> Result<()> {
    if matches!(cli.command, Commands::Version) {
        let info: VersionInfo = build_info::info();
        output.version_info(&info);
        return Ok(());
    }

    let config = settings(cli)?;
    let controller = Controller::from_config(&config)?;
    let family = connect(&controller, &config).await?;
    debug!(%family, "Running command");

    let result = dispatch(cli, output, &controller, family).await;
    controller.shutdown();
    result
}

/// Config file, then environment, then flags.
fn settings(cli: &Cli) -> Result<CameraConfig> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(host) = &cli.host {
        config.host.clone_from(host);
    }
    Ok(config)
}

/// Detect the camera and wait for the adapter's first successful poll.
async fn connect(controller: &Controller, config: &CameraConfig) -> Result<DeviceFamily> {
    let (tx, rx) = oneshot::channel();
    let tx = Mutex::new(Some(tx));
    controller.events().once(EventKind::Connected, move |_| {
        if let Some(tx) = tx.lock().ok().and_then(|mut slot| slot.take()) {
            let _ = tx.send(());
        }
    });

    let family = controller.detect().await?;
    let wait = config.poll_interval() + config.request_timeout() * 2;
    match tokio::time::timeout(wait, rx).await {
        Ok(Ok(())) => {
            info!(%family, host = %config.host, "Connected");
            Ok(family)
        }
        _ => Err(CameraError::NotConnected.into()),
    }
}

async fn dispatch(
    cli: &Cli,
    output: &dyn Output,
    controller: &Controller,
    family: DeviceFamily,
) -> Result<()> {
    match &cli.command {
        Commands::Version => {}
        Commands::Info => {
            let snapshot = controller.device_info()?.ok_or(CameraError::NotConnected)?;
            output.document(family.display_name(), &serde_json::Value::Object((*snapshot).clone()));
        }
        Commands::Status => {
            let status = controller.get_status().await?;
            output.document("Status", &status);
        }
        Commands::Watch(args) => watch(output, controller, args).await?,
        Commands::Shoot(args) => {
            controller.take_photo(args.at.map(|p| (p.x, p.y))).await?;
            output.success("Shutter released");
        }
        Commands::Focus(args) => {
            controller.lock_focus(args.x, args.y).await?;
            output.success("Focus locked");
        }
        Commands::Set(args) => {
            let settings: Snapshot = args
                .settings
                .iter()
                .map(|s| (s.key.clone(), serde_json::Value::String(s.value.clone())))
                .collect();
            controller.set_capture_settings(&settings).await?;
            output.success(&format!("Updated {} setting(s)", settings.len()));
        }
        Commands::Dial(args) => match &args.mode {
            Some(mode) => {
                controller.set_dial_mode(mode).await?;
                output.success(&format!("Dial set to {mode}"));
            }
            None => {
                let modes: Vec<String> = controller
                    .list_dial_modes()?
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                output.list("Dial modes", &modes);
            }
        },
        Commands::ShootMode(args) => {
            controller.set_shoot_mode(args.drive, args.timer).await?;
            output.success(&format!("Shoot mode set to {} / {}", args.drive, args.timer));
        }
        Commands::Cmd(args) => {
            let response = controller.send_command(&args.command).await?;
            output.document("Response", &response);
        }
        Commands::Photos => {
            let dirs = controller.list_photos().await?;
            output.photos(&dirs);
        }
        Commands::PhotoUrl(args) => {
            let url = controller.photo_url(&args.dir, &args.file, args.size.into())?;
            output.url(&url);
        }
        Commands::LiveviewUrl => output.url(&controller.live_view_url()?),
        Commands::PowerOff => {
            controller.power_off().await?;
            output.success("Camera powering off");
        }
    }
    Ok(())
}

/// Stream events until Ctrl-C or the requested count.
async fn watch(output: &dyn Output, controller: &Controller, args: &WatchArgs) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    for kind in EventKind::ALL {
        let tx = tx.clone();
        controller.events().subscribe(kind, move |event| {
            let _ = tx.send(event.clone());
        });
    }
    drop(tx);

    if let Some(ms) = args.fast {
        controller.set_poll_interval_temporarily(Duration::from_millis(ms), args.cycles)?;
    }
    info!("Watching camera events; press Ctrl-C to stop");

    let mut seen = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = rx.recv() => {
                let Some(event) = event else { break };
                output.event(&event);
                seen += 1;
                if args.count.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
        }
    }
    debug!(events = seen, "Watch finished");
    Ok(())
}
