//! Frame type shared by the video source, the photo store and the analyzer.

use image::DynamicImage;
use std::time::Instant;

/// A grayscale image: either a sampled video frame or a decoded reference photo.
#[derive(Clone)]
pub struct Frame {
    /// Grayscale pixel data (width * height bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: Instant,
    /// Capture sequence number; zero for still images.
    pub sequence: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            data,
            width,
            height,
            captured_at: Instant::now(),
            sequence,
        }
    }

    /// Convert a decoded image to a grayscale frame.
    pub fn from_image(image: &DynamicImage) -> Self {
        let luma = image.to_luma8();
        let (width, height) = luma.dimensions();
        Self::new(luma.into_raw(), width, height, 0)
    }

    /// True when both dimensions are positive and the buffer covers them.
    pub fn has_valid_dimensions(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() >= self.width as usize * self.height as usize
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbImage};

    #[test]
    fn test_valid_dimensions() {
        assert!(Frame::new(vec![0; 6], 3, 2, 1).has_valid_dimensions());
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        assert!(!Frame::new(Vec::new(), 0, 0, 1).has_valid_dimensions());
        assert!(!Frame::new(vec![0; 4], 4, 0, 1).has_valid_dimensions());
    }

    #[test]
    fn test_short_buffer_invalid() {
        assert!(!Frame::new(vec![0; 5], 3, 2, 1).has_valid_dimensions());
    }

    #[test]
    fn test_from_gray_image() {
        let img = GrayImage::from_pixel(4, 2, Luma([200]));
        let frame = Frame::from_image(&DynamicImage::ImageLuma8(img));
        assert_eq!((frame.width, frame.height), (4, 2));
        assert_eq!(frame.data, vec![200; 8]);
        assert_eq!(frame.sequence, 0);
    }

    #[test]
    fn test_from_rgb_image_converts_to_luma() {
        let img = RgbImage::new(3, 3);
        let frame = Frame::from_image(&DynamicImage::ImageRgb8(img));
        assert_eq!(frame.data.len(), 9);
        assert!(frame.has_valid_dimensions());
    }
}
