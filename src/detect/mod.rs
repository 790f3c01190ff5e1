// Detection layer: detector contract plus the frame batching scheduler.

pub mod batcher;
pub mod motion;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::frame::Frame;

/// Axis-aligned pixel box, (x1, y1) top-left inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// One detection from the model, confidence in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub class_id: u32,
}

/// The object-detection collaborator. Implementations receive a batch of
/// frames (already resized for inference) and must return one detection list
/// per input frame, in input order; empty lists are fine.
pub trait Detector: Send {
    fn detect(&mut self, frames: &[Frame]) -> Result<Vec<Vec<Detection>>>;
}
