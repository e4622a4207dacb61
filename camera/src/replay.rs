use chrono::Utc;
use proximity_common::error::DetectorError;
use proximity_common::frame::Frame;
use proximity_common::source::{CameraConstraints, FrameHandle, FrameSource};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Plays back a directory of still images as if it were a camera.
///
/// Files are served in name order, one per `current_frame` call, looping
/// forever. Useful for calibrating a threshold against recorded footage.
pub struct ReplayCamera {
    dir: PathBuf,
}

impl ReplayCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl FrameSource for ReplayCamera {
    type Handle = ReplayHandle;

    async fn acquire(&self, constraints: &CameraConstraints) -> Result<ReplayHandle, DetectorError> {
        debug!(
            facing_mode = %constraints.facing_mode,
            manual_focus = constraints.manual_focus,
            "replay source ignores camera constraints"
        );

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_error)?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            if is_image(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(DetectorError::DeviceNotFound);
        }

        info!(dir = %self.dir.display(), frames = paths.len(), "replay camera opened");
        Ok(ReplayHandle {
            paths,
            next: 0,
            seq: 0,
            released: false,
        })
    }
}

pub struct ReplayHandle {
    paths: Vec<PathBuf>,
    next: usize,
    seq: u64,
    released: bool,
}

impl FrameHandle for ReplayHandle {
    fn current_frame(&mut self) -> Result<Frame, DetectorError> {
        if self.released {
            return Err(DetectorError::DeviceUnavailable("camera released".into()));
        }

        let path = &self.paths[self.next % self.paths.len()];
        let data = std::fs::read(path).map_err(io_error)?;
        let frame = Frame::decode(&data, Utc::now().timestamp_millis(), self.seq)
            .map_err(|e| DetectorError::DeviceUnavailable(format!("{}: {e}", path.display())))?;

        self.next = (self.next + 1) % self.paths.len();
        self.seq += 1;
        Ok(frame)
    }

    fn release(&mut self) {
        self.released = true;
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn io_error(e: io::Error) -> DetectorError {
    match e.kind() {
        io::ErrorKind::NotFound => DetectorError::DeviceNotFound,
        io::ErrorKind::PermissionDenied => DetectorError::PermissionDenied,
        _ => DetectorError::DeviceUnavailable(e.to_string()),
    }
}
