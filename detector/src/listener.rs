use proximity_common::error::DetectorError;
use std::fmt;
use tracing::{debug, error, info, warn};

use crate::pipeline::classifier::DetectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Stopped,
    Running,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Stopped => f.write_str("stopped"),
            Lifecycle::Running => f.write_str("running"),
        }
    }
}

/// What one tick measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Sequence number of the frame that was sampled.
    pub seq: u64,
    pub raw: f64,
    pub smoothed: f64,
    pub state: DetectionState,
}

/// Presentation side of a detection session.
///
/// The session calls these from its own execution context; implementations
/// should return quickly.
pub trait DetectionListener {
    fn on_tick(&mut self, report: &TickReport);

    /// `error` is set only when the session stopped because of a failure.
    fn on_lifecycle(&mut self, lifecycle: Lifecycle, error: Option<&DetectorError>);
}

/// Human-readable status for a tick, e.g. `object approaching (center brightness: 33.33)`.
pub fn status_line(report: &TickReport) -> String {
    match report.state {
        DetectionState::Approaching => format!(
            "object approaching (center brightness: {:.2})",
            report.smoothed
        ),
        DetectionState::Stopped => "stopped".to_string(),
        DetectionState::Normal | DetectionState::WarmingUp => format!(
            "environment normal (center brightness: {:.2})",
            report.smoothed
        ),
    }
}

/// What the operator should do about a camera error, if anything obvious.
pub fn remediation(error: &DetectorError) -> Option<&'static str> {
    match error {
        DetectorError::PermissionDenied => {
            Some("allow camera access for this device and in the system settings")
        }
        DetectorError::DeviceNotFound => Some("no usable camera device was found"),
        DetectorError::AcquireTimeout(_) => {
            Some("the camera did not respond; check it is connected and not in use")
        }
        _ => None,
    }
}

/// Renders detection status as log lines. Ticks go to `debug`; a line at
/// `info`/`warn` is written only when the state changes.
#[derive(Debug, Default)]
pub struct LogListener {
    last_state: Option<DetectionState>,
}

impl DetectionListener for LogListener {
    fn on_tick(&mut self, report: &TickReport) {
        debug!(
            seq = report.seq,
            brightness = format!("{:.2}", report.raw),
            smoothed = format!("{:.2}", report.smoothed),
            state = %report.state,
            "tick"
        );

        if self.last_state == Some(report.state) {
            return;
        }
        self.last_state = Some(report.state);

        match report.state {
            DetectionState::Approaching => warn!("{}", status_line(report)),
            DetectionState::WarmingUp => info!("warming up, collecting brightness samples"),
            _ => info!("{}", status_line(report)),
        }
    }

    fn on_lifecycle(&mut self, lifecycle: Lifecycle, error: Option<&DetectorError>) {
        self.last_state = None;
        match (lifecycle, error) {
            (Lifecycle::Running, _) => info!("detecting..."),
            (Lifecycle::Stopped, None) => info!("detection stopped"),
            (Lifecycle::Stopped, Some(e)) if !e.is_acquisition() => {
                error!(error = %e, "detection failed")
            }
            (Lifecycle::Stopped, Some(e)) => match remediation(e) {
                Some(hint) => error!(error = %e, hint, "cannot access camera"),
                None => error!(error = %e, "cannot access camera"),
            },
        }
    }
}
