// Severity escalation state machine
//
// Detections accumulate into a trailing evidence window. A verdict is NONE
// until the window holds enough samples, then MILD or HIGH depending on the
// peak confidence. Sustained MILD verdicts escalate to HIGH after a
// configurable streak, so a persistent weak signal still alerts without a
// single high-confidence frame.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DETECTION_COUNT_THRESHOLD, MILD_CONSECUTIVE_THRESHOLD, MILD_THRESHOLD,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeverityLevel {
    None,
    Mild,
    High,
}

impl SeverityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::None => "NONE",
            SeverityLevel::Mild => "MILD",
            SeverityLevel::High => "HIGH",
        }
    }
}

impl std::fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict derived from the current evidence window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityVerdict {
    pub level: SeverityLevel,
    pub count: usize,
    pub max_confidence: f32,
}

impl SeverityVerdict {
    pub fn none() -> Self {
        Self {
            level: SeverityLevel::None,
            count: 0,
            max_confidence: 0.0,
        }
    }
}

/// Escalation thresholds. Defaults mirror the tuned production values.
#[derive(Debug, Clone, Copy)]
pub struct SeverityThresholds {
    /// Peak confidence at or above this makes a full window HIGH outright.
    pub mild_threshold: f32,
    /// Minimum samples in the window before any non-NONE verdict.
    pub detection_count: usize,
    /// Consecutive MILD verdicts that force escalation to HIGH.
    pub mild_consecutive: u32,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            mild_threshold: MILD_THRESHOLD,
            detection_count: DETECTION_COUNT_THRESHOLD,
            mild_consecutive: MILD_CONSECUTIVE_THRESHOLD,
        }
    }
}

pub struct SeverityTracker {
    window: Duration,
    thresholds: SeverityThresholds,
    samples: VecDeque<(Instant, f32)>,
    mild_streak: u32,
}

impl SeverityTracker {
    pub fn new(window: Duration, thresholds: SeverityThresholds) -> Self {
        Self {
            window,
            thresholds,
            samples: VecDeque::new(),
            mild_streak: 0,
        }
    }

    /// Record one accepted detection, then drop samples older than the window.
    pub fn add(&mut self, confidence: f32, now: Instant) {
        self.samples.push_back((now, confidence));
        self.evict(now);
    }

    fn evict(&mut self, now: Instant) {
        while let Some(&(t, _)) = self.samples.front() {
            if now.duration_since(t) > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Evaluate the escalation state machine over the surviving window.
    ///
    /// MILD verdicts advance the streak counter; the verdict that crosses
    /// `mild_consecutive` comes back as HIGH with the streak reset. NONE and
    /// HIGH both reset the streak.
    pub fn severity(&mut self, now: Instant) -> SeverityVerdict {
        self.evict(now);

        let count = self.samples.len();
        let max_confidence = self
            .samples
            .iter()
            .map(|&(_, c)| c)
            .fold(0.0f32, f32::max);

        if count < self.thresholds.detection_count {
            self.mild_streak = 0;
            return SeverityVerdict {
                level: SeverityLevel::None,
                count,
                max_confidence,
            };
        }

        if max_confidence >= self.thresholds.mild_threshold {
            self.mild_streak = 0;
            return SeverityVerdict {
                level: SeverityLevel::High,
                count,
                max_confidence,
            };
        }

        self.mild_streak += 1;
        let level = if self.mild_streak >= self.thresholds.mild_consecutive {
            self.mild_streak = 0;
            SeverityLevel::High
        } else {
            SeverityLevel::Mild
        };

        SeverityVerdict {
            level,
            count,
            max_confidence,
        }
    }

    /// Drop all evidence. Called by the pipeline after a HIGH dispatch so the
    /// same incident is not immediately re-reported.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.mild_streak = 0;
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}
