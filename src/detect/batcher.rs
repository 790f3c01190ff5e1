// Frame batching and inference scheduling
//
// Frames accumulate until a full batch is ready, then go to the detector in
// one call. Results come back out one frame at a time, FIFO, so detections
// lag submission by up to batch_size - 1 frames. That latency is the price
// of batched inference throughput.

use std::collections::VecDeque;

use crate::detect::{Detection, Detector};
use crate::error::Result;
use crate::frame::Frame;

pub struct DetectionBatcher<D: Detector> {
    detector: D,
    batch_size: usize,
    target_class: u32,
    infer_size: u32,
    pending: Vec<Frame>,
    results: VecDeque<Vec<Detection>>,
}

impl<D: Detector> DetectionBatcher<D> {
    pub fn new(detector: D, batch_size: usize, target_class: u32, infer_size: u32) -> Self {
        assert!(batch_size >= 1, "batch_size must be at least 1");
        Self {
            detector,
            batch_size,
            target_class,
            infer_size,
            pending: Vec::with_capacity(batch_size),
            results: VecDeque::new(),
        }
    }

    /// Submit one frame; returns the oldest available per-frame detection
    /// list, or an empty list while the results queue underruns. Only
    /// detections of the target class pass through.
    pub fn submit(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        self.pending.push(frame.resize_to_fit(self.infer_size));

        if self.pending.len() == self.batch_size {
            let per_frame = self.detector.detect(&self.pending)?;
            self.pending.clear();

            for detections in per_frame {
                self.results.push_back(
                    detections
                        .into_iter()
                        .filter(|d| d.class_id == self.target_class)
                        .collect(),
                );
            }
        }

        Ok(self.results.pop_front().unwrap_or_default())
    }

    /// Frames queued but not yet sent to the detector.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    /// Tags each frame with a sequential id encoded as confidence so tests
    /// can verify ordering; every frame yields one target-class detection
    /// and one off-class detection.
    struct SequenceDetector {
        next_id: u32,
    }

    impl SequenceDetector {
        fn new() -> Self {
            Self { next_id: 0 }
        }
    }

    impl Detector for SequenceDetector {
        fn detect(&mut self, frames: &[Frame]) -> Result<Vec<Vec<Detection>>> {
            let out = frames
                .iter()
                .map(|_| {
                    let id = self.next_id;
                    self.next_id += 1;
                    vec![
                        Detection {
                            confidence: id as f32 / 1000.0,
                            bbox: BoundingBox { x1: 0, y1: 0, x2: 1, y2: 1 },
                            class_id: 1,
                        },
                        Detection {
                            confidence: 0.99,
                            bbox: BoundingBox { x1: 0, y1: 0, x2: 1, y2: 1 },
                            class_id: 7,
                        },
                    ]
                })
                .collect();
            Ok(out)
        }
    }

    fn frame() -> Frame {
        Frame::filled(8, 8, [0, 0, 0])
    }

    #[test]
    fn test_under_batch_returns_empty_and_skips_inference() {
        let mut b = DetectionBatcher::new(SequenceDetector::new(), 4, 1, 640);
        for _ in 0..3 {
            assert!(b.submit(&frame()).unwrap().is_empty());
        }
        assert_eq!(b.pending_len(), 3);
    }

    #[test]
    fn test_full_batch_emits_oldest_first() {
        let mut b = DetectionBatcher::new(SequenceDetector::new(), 4, 1, 640);

        for _ in 0..3 {
            assert!(b.submit(&frame()).unwrap().is_empty());
        }

        // Fourth submit fills the batch; frame 0's result comes back first
        let dets = b.submit(&frame()).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].confidence, 0.0);
        assert_eq!(b.pending_len(), 0);

        // Subsequent submits drain the queue in submission order
        let dets = b.submit(&frame()).unwrap();
        assert!((dets[0].confidence - 0.001).abs() < 1e-6);
    }

    #[test]
    fn test_off_class_detections_filtered() {
        let mut b = DetectionBatcher::new(SequenceDetector::new(), 1, 1, 640);
        let dets = b.submit(&frame()).unwrap();
        assert_eq!(dets.len(), 1);
        assert!(dets.iter().all(|d| d.class_id == 1));
    }

    #[test]
    fn test_batch_size_one_has_no_lag() {
        let mut b = DetectionBatcher::new(SequenceDetector::new(), 1, 1, 640);
        for i in 0..5u32 {
            let dets = b.submit(&frame()).unwrap();
            assert_eq!(dets.len(), 1);
            assert!((dets[0].confidence - i as f32 / 1000.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_frames_resized_for_inference() {
        struct SizeAssertDetector;
        impl Detector for SizeAssertDetector {
            fn detect(&mut self, frames: &[Frame]) -> Result<Vec<Vec<Detection>>> {
                for f in frames {
                    assert!(f.longest_side() <= 64);
                }
                Ok(frames.iter().map(|_| Vec::new()).collect())
            }
        }

        let mut b = DetectionBatcher::new(SizeAssertDetector, 1, 1, 64);
        let big = Frame::filled(256, 128, [5, 5, 5]);
        b.submit(&big).unwrap();
        // Caller's frame is untouched
        assert_eq!(big.width, 256);
    }
}
