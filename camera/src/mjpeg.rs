use bytes::BytesMut;
use chrono::Utc;
use futures_util::StreamExt;
use proximity_common::error::DetectorError;
use proximity_common::frame::Frame;
use proximity_common::source::{CameraConstraints, FrameHandle, FrameSource};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const DEFAULT_BOUNDARY: &str = "frame";
const HEADER_END: &[u8] = b"\r\n\r\n";

/// Parse state for the MJPEG multipart stream.
enum ParseState {
    /// Looking for the boundary marker `--{boundary}\r\n`.
    SeekingBoundary,
    /// Found boundary, now looking for end of headers `\r\n\r\n`.
    SeekingHeaderEnd,
    /// Collecting JPEG bytes until the next boundary.
    CollectingJpeg,
}

/// Incremental splitter for `multipart/x-mixed-replace` bodies.
///
/// Feed it network chunks in order; it returns every complete JPEG part the
/// chunk finished. Parts may span any number of chunks.
pub struct MultipartParser {
    boundary: Vec<u8>,
    buffer: BytesMut,
    state: ParseState,
    jpeg_start: usize,
}

impl MultipartParser {
    pub fn new(boundary: &str) -> Self {
        Self {
            boundary: format!("--{boundary}\r\n").into_bytes(),
            buffer: BytesMut::with_capacity(256 * 1024),
            state: ParseState::SeekingBoundary,
            jpeg_start: 0,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);
        let boundary_len = self.boundary.len();
        let mut parts = Vec::new();

        loop {
            match self.state {
                ParseState::SeekingBoundary => {
                    if let Some(pos) = find_subsequence(&self.buffer, &self.boundary) {
                        let _ = self.buffer.split_to(pos + boundary_len);
                        self.state = ParseState::SeekingHeaderEnd;
                    } else {
                        // Keep the tail in case the boundary spans chunks
                        if self.buffer.len() > boundary_len {
                            let _ = self.buffer.split_to(self.buffer.len() - boundary_len);
                        }
                        break;
                    }
                }
                ParseState::SeekingHeaderEnd => {
                    if let Some(pos) = find_subsequence(&self.buffer, HEADER_END) {
                        let _ = self.buffer.split_to(pos + HEADER_END.len());
                        self.jpeg_start = 0;
                        self.state = ParseState::CollectingJpeg;
                    } else {
                        break;
                    }
                }
                ParseState::CollectingJpeg => {
                    let Some(pos) =
                        find_subsequence(&self.buffer[self.jpeg_start..], &self.boundary)
                    else {
                        // Don't re-scan bytes that cannot start a boundary
                        self.jpeg_start = self.buffer.len().saturating_sub(boundary_len);
                        break;
                    };

                    let jpeg_end = self.jpeg_start + pos;
                    // Strip trailing \r\n before boundary
                    let end = if jpeg_end >= 2
                        && self.buffer[jpeg_end - 2] == b'\r'
                        && self.buffer[jpeg_end - 1] == b'\n'
                    {
                        jpeg_end - 2
                    } else {
                        jpeg_end
                    };

                    let jpeg = self.buffer[..end].to_vec();
                    let _ = self.buffer.split_to(jpeg_end + boundary_len);
                    if !jpeg.is_empty() {
                        parts.push(jpeg);
                    }
                    self.state = ParseState::SeekingHeaderEnd;
                }
            }
        }

        parts
    }
}

/// Extract the boundary parameter from a multipart content type,
/// e.g. `multipart/x-mixed-replace; boundary=frame`.
pub fn boundary_from_content_type(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix("boundary="))
        .map(|b| b.trim_matches('"'))
        .map(|b| b.strip_prefix("--").unwrap_or(b))
        .filter(|b| !b.is_empty())
}

/// Map an HTTP failure status to the camera error taxonomy.
pub fn status_error(status: u16) -> DetectorError {
    match status {
        401 | 403 => DetectorError::PermissionDenied,
        404 => DetectorError::DeviceNotFound,
        other => DetectorError::DeviceUnavailable(format!("HTTP status {other}")),
    }
}

/// Camera exposed as an HTTP MJPEG stream.
///
/// Constraints are forwarded as query hints (`facing`, `focus`); servers that
/// don't understand them ignore them.
pub struct MjpegCamera {
    url: String,
}

impl MjpegCamera {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn stream_url(&self, constraints: &CameraConstraints) -> String {
        let sep = if self.url.contains('?') { '&' } else { '?' };
        let mut url = format!("{}{sep}facing={}", self.url, constraints.facing_mode);
        if constraints.manual_focus {
            url.push_str("&focus=manual");
        }
        url
    }
}

impl FrameSource for MjpegCamera {
    type Handle = MjpegHandle;

    async fn acquire(&self, constraints: &CameraConstraints) -> Result<MjpegHandle, DetectorError> {
        let url = self.stream_url(constraints);
        info!(url, "connecting to MJPEG camera");

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DetectorError::DeviceUnavailable(e.to_string()))?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| DetectorError::DeviceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(status_error(response.status().as_u16()));
        }

        let boundary = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(boundary_from_content_type)
            .unwrap_or(DEFAULT_BOUNDARY)
            .to_string();

        info!(status = %response.status(), boundary, "connected to MJPEG stream");

        let (tx, mut rx) = watch::channel(None);
        // Aborts the pump if this future is dropped before the first frame.
        let task = PumpTask(tokio::spawn(pump_frames(response, boundary, tx)));

        let ready = rx.wait_for(|frame| frame.is_some()).await.is_ok();
        if !ready {
            return Err(DetectorError::DeviceUnavailable(
                "stream ended before the first frame".into(),
            ));
        }

        Ok(MjpegHandle {
            frames: rx,
            task,
            released: false,
        })
    }
}

/// Background stream reader, aborted when dropped.
struct PumpTask(JoinHandle<()>);

impl Drop for PumpTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Open MJPEG stream. A background task keeps the latest decoded frame.
pub struct MjpegHandle {
    frames: watch::Receiver<Option<Frame>>,
    task: PumpTask,
    released: bool,
}

impl FrameHandle for MjpegHandle {
    fn current_frame(&mut self) -> Result<Frame, DetectorError> {
        if self.released {
            return Err(DetectorError::DeviceUnavailable("camera released".into()));
        }
        if self.task.0.is_finished() {
            return Err(DetectorError::DeviceUnavailable("camera stream ended".into()));
        }
        self.frames
            .borrow()
            .clone()
            .ok_or_else(|| DetectorError::DeviceUnavailable("no frame received yet".into()))
    }

    fn release(&mut self) {
        if !self.released {
            self.task.0.abort();
            self.released = true;
            info!("MJPEG camera released");
        }
    }
}

async fn pump_frames(
    response: reqwest::Response,
    boundary: String,
    tx: watch::Sender<Option<Frame>>,
) {
    let mut parser = MultipartParser::new(&boundary);
    let mut byte_stream = response.bytes_stream();
    let mut seq: u64 = 0;

    loop {
        let next = tokio::select! {
            next = byte_stream.next() => next,
            _ = tx.closed() => {
                debug!("no frame readers left, closing MJPEG stream");
                break;
            }
        };
        let chunk = match next {
            Some(Ok(c)) => c,
            Some(Err(e)) => {
                warn!(error = %e, "MJPEG stream error");
                break;
            }
            None => break,
        };

        // Only the newest complete part matters; older ones are already stale.
        let Some(jpeg) = parser.push(&chunk).pop() else {
            continue;
        };

        match Frame::decode(&jpeg, Utc::now().timestamp_millis(), seq) {
            Ok(frame) => {
                debug!(seq, width = frame.width(), height = frame.height(), "decoded frame");
                seq += 1;
                tx.send_replace(Some(frame));
            }
            Err(e) => {
                warn!(error = %e, bytes = jpeg.len(), "failed to decode JPEG part, skipping");
            }
        }
    }

    info!(frames = seq, "MJPEG stream ended");
}

/// Find the position of `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
