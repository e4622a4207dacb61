use std::time::Duration;

/// Everything that can end a detection session.
///
/// Acquisition errors (`PermissionDenied`, `DeviceNotFound`,
/// `DeviceUnavailable`, `AcquireTimeout`) are reported once and leave the
/// session stopped. `InvalidFrame` and `EmptyRegion` come from the per-tick
/// pipeline and are fatal to the running session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DetectorError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera device found")]
    DeviceNotFound,
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("camera acquisition timed out after {0:?}")]
    AcquireTimeout(Duration),
    #[error("invalid frame: {width}x{height} has zero area")]
    InvalidFrame { width: u32, height: u32 },
    #[error("region of interest contains no pixels")]
    EmptyRegion,
}

impl DetectorError {
    /// True for errors raised while opening the camera, as opposed to while sampling it.
    pub fn is_acquisition(&self) -> bool {
        matches!(
            self,
            DetectorError::PermissionDenied
                | DetectorError::DeviceNotFound
                | DetectorError::DeviceUnavailable(_)
                | DetectorError::AcquireTimeout(_)
        )
    }
}
