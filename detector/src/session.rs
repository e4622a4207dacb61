use proximity_common::config::DetectionConfig;
use proximity_common::error::DetectorError;
use proximity_common::source::{CameraConstraints, FrameHandle, FrameSource};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::listener::{DetectionListener, Lifecycle, TickReport};
use crate::pipeline::classifier::DetectionState;
use crate::pipeline::BrightnessPipeline;

/// One detection run against one camera.
///
/// The session is RUNNING exactly while it holds a frame handle. `start`,
/// `tick` and `stop` are the only transitions; a failed `start` or a failed
/// tick leaves it STOPPED, and only another `start` brings it back.
pub struct DetectionSession<S: FrameSource, L> {
    source: S,
    constraints: CameraConstraints,
    acquire_timeout: Option<Duration>,
    check_interval: Duration,
    pipeline: BrightnessPipeline,
    handle: Option<S::Handle>,
    state: DetectionState,
    listener: L,
    ticks: u64,
    last_error: Option<DetectorError>,
}

impl<S: FrameSource, L: DetectionListener> DetectionSession<S, L> {
    pub fn new(
        source: S,
        config: &DetectionConfig,
        constraints: CameraConstraints,
        listener: L,
    ) -> Self {
        Self {
            source,
            constraints,
            acquire_timeout: None,
            check_interval: config.check_interval(),
            pipeline: BrightnessPipeline::new(config),
            handle: None,
            state: DetectionState::Stopped,
            listener,
            ticks: 0,
            last_error: None,
        }
    }

    /// Fail `start` with `AcquireTimeout` if the camera takes longer than this to open.
    pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Ticks completed since the last successful `start`.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The error that ended the most recent run, if it ended in one.
    pub fn last_error(&self) -> Option<&DetectorError> {
        self.last_error.as_ref()
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// Open the camera and begin a fresh run. No-op while already running.
    pub async fn start(&mut self) -> Result<(), DetectorError> {
        if self.is_running() {
            debug!("start requested while running, ignoring");
            return Ok(());
        }

        info!(
            facing_mode = %self.constraints.facing_mode,
            manual_focus = self.constraints.manual_focus,
            "acquiring camera"
        );

        let acquired = match self.acquire_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.source.acquire(&self.constraints)).await {
                    Ok(result) => result,
                    Err(_) => Err(DetectorError::AcquireTimeout(limit)),
                }
            }
            None => self.source.acquire(&self.constraints).await,
        };

        match acquired {
            Ok(handle) => {
                self.handle = Some(handle);
                self.pipeline.reset();
                self.state = DetectionState::WarmingUp;
                self.ticks = 0;
                self.last_error = None;
                info!(window_size = self.pipeline.window().capacity(), "detection started");
                self.listener.on_lifecycle(Lifecycle::Running, None);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to acquire camera");
                self.state = DetectionState::Stopped;
                self.last_error = Some(e.clone());
                self.listener.on_lifecycle(Lifecycle::Stopped, Some(&e));
                Err(e)
            }
        }
    }

    /// Run the pipeline once on the current frame.
    ///
    /// Returns `Ok(None)` when stopped. A pipeline error stops the session
    /// before it is returned.
    pub fn tick(&mut self) -> Result<Option<TickReport>, DetectorError> {
        let Some(handle) = self.handle.as_mut() else {
            return Ok(None);
        };

        let result = handle.current_frame().and_then(|frame| {
            self.pipeline
                .process(&frame)
                .map(|reading| (frame.seq, reading))
        });

        let (seq, reading) = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, tick = self.ticks, "tick failed, stopping detection");
                self.shutdown(Some(e.clone()));
                return Err(e);
            }
        };

        self.ticks += 1;
        self.state = reading.state;
        debug!(
            seq,
            roi = ?reading.roi,
            pixels = reading.roi.pixel_count(),
            window = self.pipeline.window().len(),
            brightness = reading.raw,
            smoothed = reading.smoothed,
            state = %reading.state,
            "tick"
        );

        let report = TickReport {
            seq,
            raw: reading.raw,
            smoothed: reading.smoothed,
            state: reading.state,
        };
        self.listener.on_tick(&report);
        Ok(Some(report))
    }

    /// Release the camera and clear the window. No-op when already stopped.
    pub fn stop(&mut self) {
        self.shutdown(None);
    }

    fn shutdown(&mut self, error: Option<DetectorError>) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };
        handle.release();
        self.pipeline.reset();
        self.state = DetectionState::Stopped;
        info!(ticks = self.ticks, "detection stopped");
        self.listener.on_lifecycle(Lifecycle::Stopped, error.as_ref());
        self.last_error = error;
    }
}
