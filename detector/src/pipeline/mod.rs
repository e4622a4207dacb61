//! Per-tick brightness pipeline: region → luminance → smoothing → classification.

pub mod classifier;
pub mod luminance;
pub mod region;
pub mod smoothing;

use image::GenericImageView;
use proximity_common::config::DetectionConfig;
use proximity_common::error::DetectorError;
use proximity_common::frame::Frame;

use classifier::{classify, DetectionState};
use luminance::mean_luminance;
use region::{sample_region, Roi};
use smoothing::SmoothingWindow;

/// Result of running one frame through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub roi: Roi,
    pub raw: f64,
    pub smoothed: f64,
    pub state: DetectionState,
}

pub struct BrightnessPipeline {
    zone_ratio: f64,
    threshold: f64,
    window: SmoothingWindow,
}

impl BrightnessPipeline {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            zone_ratio: config.zone_ratio,
            threshold: config.brightness_threshold,
            window: SmoothingWindow::new(config.window_size),
        }
    }

    pub fn process(&mut self, frame: &Frame) -> Result<Reading, DetectorError> {
        let (roi, region) = sample_region(frame, self.zone_ratio)?;
        let raw = mean_luminance(region.pixels().map(|(_, _, px)| px))?;
        let (smoothed, state) = self.observe(raw);
        Ok(Reading {
            roi,
            raw,
            smoothed,
            state,
        })
    }

    /// Feed one brightness sample and classify the new moving average.
    pub fn observe(&mut self, raw: f64) -> (f64, DetectionState) {
        self.window.push(raw);
        let smoothed = self.window.average().unwrap_or(raw);
        let state = classify(smoothed, self.threshold, self.window.is_full());
        (smoothed, state)
    }

    pub fn reset(&mut self) {
        self.window.reset();
    }

    pub fn window(&self) -> &SmoothingWindow {
        &self.window
    }
}
