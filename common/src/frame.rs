use image::RgbaImage;
use std::sync::Arc;

/// A decoded camera frame with capture metadata.
///
/// Pixels are RGBA8. The image is shared, so cloning a frame is cheap and a
/// source can hand the same snapshot to several readers.
#[derive(Debug, Clone)]
pub struct Frame {
    image: Arc<RgbaImage>,
    pub captured_at_ms: i64,
    pub seq: u64,
}

impl Frame {
    pub fn new(image: RgbaImage, captured_at_ms: i64, seq: u64) -> Self {
        Self {
            image: Arc::new(image),
            captured_at_ms,
            seq,
        }
    }

    /// Wrap an image captured "now".
    pub fn now(image: RgbaImage, seq: u64) -> Self {
        Self::new(image, chrono::Utc::now().timestamp_millis(), seq)
    }

    /// Decode an encoded still (JPEG, PNG, ...) into an RGBA frame.
    pub fn decode(data: &[u8], captured_at_ms: i64, seq: u64) -> Result<Self, image::ImageError> {
        let image = image::load_from_memory(data)?.to_rgba8();
        Ok(Self::new(image, captured_at_ms, seq))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    #[test]
    fn decode_png_to_rgba() {
        let src = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]));
        let mut png = Vec::new();
        src.write_to(&mut Cursor::new(&mut png), ImageFormat::Png).unwrap();

        let frame = Frame::decode(&png, 1708300000000, 7).unwrap();
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 3);
        assert_eq!(frame.seq, 7);
        assert_eq!(frame.captured_at_ms, 1708300000000);
        assert_eq!(frame.image().get_pixel(2, 1), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn decode_garbage_fails() {
        assert!(Frame::decode(&[0x00, 0x01, 0x02], 0, 0).is_err());
    }

    #[test]
    fn zero_area_frame_is_empty() {
        let frame = Frame::now(RgbaImage::new(0, 10), 0);
        assert!(frame.is_empty());
        assert!(!Frame::now(RgbaImage::new(1, 1), 0).is_empty());
    }
}
