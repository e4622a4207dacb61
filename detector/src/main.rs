mod listener;
mod pipeline;
mod scheduler;
mod session;
#[cfg(test)]
mod testing;

use listener::LogListener;
use proximity_camera::{MjpegCamera, ReplayCamera};
use proximity_common::config::{CameraSource, Config};
use proximity_common::source::{CameraConstraints, FrameSource};
use session::DetectionSession;
use std::path::PathBuf;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        source = %config.camera.source,
        threshold = config.detection.brightness_threshold,
        window_size = config.detection.window_size,
        check_interval_ms = config.detection.check_interval_ms,
        zone_ratio = config.detection.zone_ratio,
        "starting proximity detector"
    );

    let constraints = CameraConstraints {
        facing_mode: config.camera.facing_mode,
        manual_focus: config.camera.manual_focus,
    };

    // Config::load has already checked that the chosen source has its location.
    let ok = match config.camera.source {
        CameraSource::Mjpeg => {
            let url = config.camera.url.clone().unwrap_or_default();
            run(MjpegCamera::new(url), &config, constraints).await
        }
        CameraSource::Replay => {
            let dir = config.camera.path.clone().unwrap_or_default();
            run(ReplayCamera::new(dir), &config, constraints).await
        }
    };

    if !ok {
        std::process::exit(1);
    }
}

/// Run one detection session until Ctrl-C or a fatal camera error.
/// Returns `false` if the session ended in an error.
async fn run<S>(source: S, config: &Config, constraints: CameraConstraints) -> bool
where
    S: FrameSource + Send + 'static,
    S::Handle: Send + 'static,
{
    let mut session =
        DetectionSession::new(source, &config.detection, constraints, LogListener::default())
            .with_acquire_timeout(config.camera.acquire_timeout());

    // The listener has already reported the failure.
    if session.start().await.is_err() {
        return false;
    }

    let handle = scheduler::spawn(session);
    let canceller = handle.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping detection");
            canceller.cancel();
        }
    });

    match handle.join().await {
        Ok(session) => {
            info!(ticks = session.ticks(), state = %session.state(), "session finished");
            session.last_error().is_none()
        }
        Err(e) => {
            error!(error = %e, "tick loop panicked");
            false
        }
    }
}
