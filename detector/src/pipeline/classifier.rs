use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionState {
    /// No session is running.
    Stopped,
    /// Running, but the smoothing window is not full yet.
    WarmingUp,
    Normal,
    /// Smoothed brightness is below the threshold: something is covering the camera.
    Approaching,
}

impl DetectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionState::Stopped => "stopped",
            DetectionState::WarmingUp => "warming_up",
            DetectionState::Normal => "normal",
            DetectionState::Approaching => "approaching",
        }
    }
}

impl fmt::Display for DetectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare a smoothed brightness against the threshold.
///
/// Strictly below the threshold is `Approaching`; equal is `Normal`. There is
/// no hysteresis, so a value hovering at the threshold can flip every tick.
pub fn classify(smoothed: f64, threshold: f64, window_full: bool) -> DetectionState {
    if !window_full {
        DetectionState::WarmingUp
    } else if smoothed < threshold {
        DetectionState::Approaching
    } else {
        DetectionState::Normal
    }
}
