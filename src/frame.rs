// Raw video frame type shared by the source, ring buffer, and detector path.

use image::imageops::FilterType;
use image::RgbImage;

/// One decoded video frame, tightly packed RGB24, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), (width * height * 3) as usize);
        Self { width, height, data }
    }

    /// Solid-color frame, used by tests and diagnostics.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..(width * height) {
            data.extend_from_slice(&rgb);
        }
        Self { width, height, data }
    }

    pub fn longest_side(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Scale down so the longest side is at most `max_side`, preserving
    /// aspect ratio. Frames already within bounds are returned as a plain
    /// copy -- this never enlarges, and never mutates `self`.
    pub fn resize_to_fit(&self, max_side: u32) -> Frame {
        let longest = self.longest_side();
        if longest <= max_side || longest == 0 {
            return self.clone();
        }

        let scale = max_side as f64 / longest as f64;
        let new_w = ((self.width as f64 * scale) as u32).max(1);
        let new_h = ((self.height as f64 * scale) as u32).max(1);

        let img = RgbImage::from_raw(self.width, self.height, self.data.clone())
            .expect("frame buffer length matches dimensions");
        let resized = image::imageops::resize(&img, new_w, new_h, FilterType::Triangle);

        Frame {
            width: new_w,
            height: new_h,
            data: resized.into_raw(),
        }
    }

    /// Mean absolute per-channel difference against another frame of the
    /// same dimensions, normalized to [0, 1]. Used by the motion detector.
    pub fn mean_abs_diff(&self, other: &Frame) -> Option<f32> {
        if self.width != other.width || self.height != other.height {
            return None;
        }
        if self.data.is_empty() {
            return Some(0.0);
        }

        let total: u64 = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a.abs_diff(*b) as u64)
            .sum();

        Some(total as f32 / (self.data.len() as f32 * 255.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_shrinks_preserving_aspect() {
        let frame = Frame::filled(1280, 720, [10, 20, 30]);
        let small = frame.resize_to_fit(640);

        assert_eq!(small.width, 640);
        assert_eq!(small.height, 360);
        assert_eq!(small.data.len(), 640 * 360 * 3);
        // Original untouched
        assert_eq!(frame.width, 1280);
        assert_eq!(frame.data.len(), 1280 * 720 * 3);
    }

    #[test]
    fn test_resize_never_enlarges() {
        let frame = Frame::filled(320, 240, [0, 0, 0]);
        let same = frame.resize_to_fit(640);
        assert_eq!(same.width, 320);
        assert_eq!(same.height, 240);
    }

    #[test]
    fn test_resize_portrait_clamps_height() {
        let frame = Frame::filled(720, 1280, [1, 2, 3]);
        let small = frame.resize_to_fit(640);
        assert_eq!(small.height, 640);
        assert_eq!(small.width, 360);
    }

    #[test]
    fn test_mean_abs_diff() {
        let a = Frame::filled(4, 4, [0, 0, 0]);
        let b = Frame::filled(4, 4, [255, 255, 255]);
        assert_eq!(a.mean_abs_diff(&b), Some(1.0));
        assert_eq!(a.mean_abs_diff(&a), Some(0.0));

        let c = Frame::filled(2, 2, [0, 0, 0]);
        assert_eq!(a.mean_abs_diff(&c), None);
    }
}
