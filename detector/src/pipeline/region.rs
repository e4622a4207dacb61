use image::imageops::crop_imm;
use image::{RgbaImage, SubImage};
use proximity_common::error::DetectorError;
use proximity_common::frame::Frame;

/// Rectangle in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    /// Centered window covering `ratio` of each dimension.
    ///
    /// Sizes are floored and the offsets use integer division, so odd leftovers
    /// go to the right/bottom margin. `ratio = 1.0` yields the full frame.
    pub fn centered(frame_width: u32, frame_height: u32, ratio: f64) -> Self {
        let ratio = ratio.clamp(0.0, 1.0);
        let width = (frame_width as f64 * ratio).floor() as u32;
        let height = (frame_height as f64 * ratio).floor() as u32;
        Self {
            x: (frame_width - width) / 2,
            y: (frame_height - height) / 2,
            width,
            height,
        }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// View of the centered region of `frame`. Nothing is copied.
///
/// Recomputed per call because a camera may change resolution mid-session.
pub fn sample_region(
    frame: &Frame,
    ratio: f64,
) -> Result<(Roi, SubImage<&RgbaImage>), DetectorError> {
    if frame.is_empty() {
        return Err(DetectorError::InvalidFrame {
            width: frame.width(),
            height: frame.height(),
        });
    }

    let roi = Roi::centered(frame.width(), frame.height(), ratio);
    let region = crop_imm(frame.image(), roi.x, roi.y, roi.width, roi.height);
    Ok((roi, region))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba};

    #[test]
    fn full_frame_ratio() {
        assert_eq!(
            Roi::centered(640, 480, 1.0),
            Roi { x: 0, y: 0, width: 640, height: 480 }
        );
    }

    #[test]
    fn half_ratio_on_square_frame() {
        assert_eq!(
            Roi::centered(100, 100, 0.5),
            Roi { x: 25, y: 25, width: 50, height: 50 }
        );
    }

    #[test]
    fn odd_dimensions_floor() {
        // 101 * 0.5 = 50.5 -> 50 wide, (101 - 50) / 2 = 25
        assert_eq!(
            Roi::centered(101, 75, 0.5),
            Roi { x: 25, y: 19, width: 50, height: 37 }
        );
    }

    #[test]
    fn tiny_ratio_can_be_empty() {
        let roi = Roi::centered(10, 10, 0.01);
        assert_eq!(roi.pixel_count(), 0);
    }

    #[test]
    fn sample_views_center_pixels() {
        // Bright 2x2 center on a dark 4x4 frame
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        for (x, y) in [(1, 1), (2, 1), (1, 2), (2, 2)] {
            img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
        }
        let frame = Frame::now(img, 0);

        let (roi, region) = sample_region(&frame, 0.5).unwrap();
        assert_eq!(roi, Roi { x: 1, y: 1, width: 2, height: 2 });
        assert_eq!(region.dimensions(), (2, 2));
        assert!(region.pixels().all(|(_, _, p)| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn zero_area_frame_is_invalid() {
        let frame = Frame::now(RgbaImage::new(0, 480), 0);
        assert_eq!(
            sample_region(&frame, 1.0).err().unwrap(),
            DetectorError::InvalidFrame { width: 0, height: 480 }
        );
    }
}
