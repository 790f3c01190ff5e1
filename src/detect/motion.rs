// Frame-differencing fallback detector
//
// Stands in for a model service so the pipeline runs end-to-end with no
// external inference dependency. Scores the mean absolute pixel difference
// between consecutive frames; sustained high motion reads as candidate
// activity of the target class. Real models implement `Detector` directly.

use crate::constants::{MOTION_CONFIDENCE_CEILING, MOTION_DIFF_THRESHOLD};
use crate::detect::{BoundingBox, Detection, Detector};
use crate::error::Result;
use crate::frame::Frame;

pub struct FrameDiffDetector {
    class_id: u32,
    diff_threshold: f32,
    previous: Option<Frame>,
}

impl FrameDiffDetector {
    pub fn new(class_id: u32) -> Self {
        Self {
            class_id,
            diff_threshold: MOTION_DIFF_THRESHOLD,
            previous: None,
        }
    }

    /// Map a diff ratio to a detection confidence. Below the static
    /// threshold there is no detection at all; above it, confidence grows
    /// with motion and saturates at the ceiling.
    fn confidence_for(&self, diff: f32) -> Option<f32> {
        if diff < self.diff_threshold {
            return None;
        }
        let normalized = ((diff - self.diff_threshold) / (0.25 - self.diff_threshold)).min(1.0);
        Some((0.3 + 0.7 * normalized).min(MOTION_CONFIDENCE_CEILING))
    }
}

impl Detector for FrameDiffDetector {
    fn detect(&mut self, frames: &[Frame]) -> Result<Vec<Vec<Detection>>> {
        let mut out = Vec::with_capacity(frames.len());

        for frame in frames {
            let diff = self
                .previous
                .as_ref()
                .and_then(|prev| prev.mean_abs_diff(frame));
            self.previous = Some(frame.clone());

            let detections = match diff.and_then(|d| self.confidence_for(d)) {
                Some(confidence) => vec![Detection {
                    confidence,
                    bbox: BoundingBox {
                        x1: 0,
                        y1: 0,
                        x2: frame.width as i32,
                        y2: frame.height as i32,
                    },
                    class_id: self.class_id,
                }],
                None => Vec::new(),
            };
            out.push(detections);
        }

        Ok(out)
    }
}
