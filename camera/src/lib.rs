//! Frame sources for the proximity detector.
//!
//! - [`mjpeg::MjpegCamera`]: an HTTP multipart MJPEG stream (robot or IP camera).
//! - [`replay::ReplayCamera`]: a directory of still images, served in a loop.

pub mod mjpeg;
pub mod replay;

pub use mjpeg::MjpegCamera;
pub use replay::ReplayCamera;
