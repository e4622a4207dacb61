//! In-memory camera and listener for exercising sessions without hardware.

use image::{Rgba, RgbaImage};
use proximity_common::error::DetectorError;
use proximity_common::frame::Frame;
use proximity_common::source::{CameraConstraints, FrameHandle, FrameSource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::listener::{DetectionListener, Lifecycle, TickReport};

/// Gray frame whose luminance is `value`.
pub fn uniform_frame(width: u32, height: u32, value: u8) -> Frame {
    Frame::now(
        RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255])),
        0,
    )
}

#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Plays a fixed list of frames, then keeps repeating the last one.
pub struct ScriptedCamera {
    frames: Vec<Frame>,
    error: Option<DetectorError>,
    hang: bool,
    acquisitions: Counter,
    releases: Counter,
}

impl ScriptedCamera {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            error: None,
            hang: false,
            acquisitions: Counter::default(),
            releases: Counter::default(),
        }
    }

    pub fn failing(error: DetectorError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(Vec::new())
        }
    }

    /// A camera whose permission prompt never resolves.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn acquisitions(&self) -> Counter {
        self.acquisitions.clone()
    }

    pub fn releases(&self) -> Counter {
        self.releases.clone()
    }
}

impl FrameSource for ScriptedCamera {
    type Handle = ScriptedHandle;

    async fn acquire(&self, _constraints: &CameraConstraints) -> Result<ScriptedHandle, DetectorError> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        self.acquisitions.bump();
        Ok(ScriptedHandle {
            frames: self.frames.clone(),
            next: 0,
            released: false,
            releases: self.releases.clone(),
        })
    }
}

pub struct ScriptedHandle {
    frames: Vec<Frame>,
    next: usize,
    released: bool,
    releases: Counter,
}

impl FrameHandle for ScriptedHandle {
    fn current_frame(&mut self) -> Result<Frame, DetectorError> {
        if self.released {
            return Err(DetectorError::DeviceUnavailable("camera released".into()));
        }
        let last = self
            .frames
            .len()
            .checked_sub(1)
            .ok_or_else(|| DetectorError::DeviceUnavailable("empty script".into()))?;
        let mut frame = self.frames[self.next.min(last)].clone();
        frame.seq = self.next as u64;
        self.next += 1;
        Ok(frame)
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.releases.bump();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Tick(TickReport),
    Lifecycle(Lifecycle, Option<DetectorError>),
}

/// Records every callback. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn ticks(&self) -> Vec<TickReport> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Tick(report) => Some(report),
                Event::Lifecycle(..) => None,
            })
            .collect()
    }
}

impl DetectionListener for RecordingListener {
    fn on_tick(&mut self, report: &TickReport) {
        self.events.lock().unwrap().push(Event::Tick(*report));
    }

    fn on_lifecycle(&mut self, lifecycle: Lifecycle, error: Option<&DetectorError>) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Lifecycle(lifecycle, error.cloned()));
    }
}
