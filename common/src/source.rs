use serde::Deserialize;
use std::fmt;
use std::future::Future;

use crate::error::DetectorError;
use crate::frame::Frame;

/// Which camera to prefer on devices that have more than one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera, facing the user.
    #[default]
    User,
    /// Rear camera, facing away from the user.
    Environment,
}

impl FacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::User => "user",
            FacingMode::Environment => "environment",
        }
    }
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preferences passed to a source when opening the camera.
///
/// Both fields are hints: a source that cannot honour them opens the camera
/// anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConstraints {
    pub facing_mode: FacingMode,
    pub manual_focus: bool,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::User,
            manual_focus: true,
        }
    }
}

/// A camera that can be opened.
///
/// `acquire` resolves once the device is delivering frames, so the first
/// `current_frame` call on the returned handle has something to return.
pub trait FrameSource {
    type Handle: FrameHandle;

    fn acquire(
        &self,
        constraints: &CameraConstraints,
    ) -> impl Future<Output = Result<Self::Handle, DetectorError>>;
}

/// An open camera.
pub trait FrameHandle {
    /// Snapshot of the latest frame. Dimensions may differ between calls.
    fn current_frame(&mut self) -> Result<Frame, DetectorError>;

    /// Stop all capture. Calling it more than once is harmless.
    fn release(&mut self);
}
