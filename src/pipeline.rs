// The ingestion loop: one synchronous pass per frame through batching,
// severity tracking, and alert dispatch. Never blocks on notification
// delivery; clip and network I/O live on the dispatch worker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::alert::AlertDispatcher;
use crate::buffer::FrameRingBuffer;
use crate::constants::{
    BUFFER_SECONDS, BUFFER_WINDOW_FACTOR, DEFAULT_BATCH_SIZE, DEFAULT_FPS, DEFAULT_TARGET_CLASS,
    DEFAULT_WINDOW_SECS, INFER_SIZE,
};
use crate::detect::batcher::DetectionBatcher;
use crate::detect::Detector;
use crate::error::Result;
use crate::severity::{SeverityLevel, SeverityThresholds, SeverityTracker};
use crate::source::FrameSource;
use crate::state::WatchState;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub target_class: u32,
    pub infer_size: u32,
    pub window_secs: u64,
    pub thresholds: SeverityThresholds,
    pub fps: u32,
    pub buffer_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            target_class: DEFAULT_TARGET_CLASS,
            infer_size: INFER_SIZE,
            window_secs: DEFAULT_WINDOW_SECS,
            thresholds: SeverityThresholds::default(),
            fps: DEFAULT_FPS,
            buffer_secs: BUFFER_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WatchSummary {
    pub frames_processed: u64,
    pub alerts_dispatched: u64,
}

/// Run the watch loop until the source is exhausted or fails.
///
/// Per frame: ring-buffer push, batched inference, severity evaluation,
/// status update, dispatch decision. After a HIGH dispatch the evidence
/// window is cleared so the same incident is not immediately re-reported.
pub fn run_watch_loop<D: Detector>(
    source: &mut dyn FrameSource,
    detector: D,
    config: &PipelineConfig,
    state: Arc<WatchState>,
    dispatcher: &AlertDispatcher,
) -> Result<WatchSummary> {
    let mut batcher = DetectionBatcher::new(
        detector,
        config.batch_size,
        config.target_class,
        config.infer_size,
    );
    let mut tracker = SeverityTracker::new(
        Duration::from_secs(config.window_secs),
        config.thresholds,
    );
    let mut ring =
        FrameRingBuffer::for_duration(config.fps, config.buffer_secs * BUFFER_WINDOW_FACTOR);

    let mut summary = WatchSummary::default();

    loop {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                log::info!(
                    "Frame source exhausted after {} frames",
                    summary.frames_processed
                );
                break;
            }
            Err(e) => {
                log::error!("Frame read failed: {}", e);
                return Err(e);
            }
        };

        summary.frames_processed += 1;
        ring.push(frame.clone());

        let now = Instant::now();
        let detections = batcher.submit(&frame)?;
        for det in &detections {
            tracker.add(det.confidence, now);
        }

        let verdict = tracker.severity(now);
        state.update_status(verdict.level, verdict.max_confidence, verdict.count);

        let outcome = dispatcher.maybe_dispatch(&verdict, &ring, config.fps, &[], now);
        if outcome.dispatched() {
            summary.alerts_dispatched += 1;
            if verdict.level == SeverityLevel::High {
                tracker.clear();
            }
        }
    }

    Ok(summary)
}
