// Alert dispatch: cooldown-gated translation of severity verdicts into
// outbound notifications.
//
// The decision and the cooldown stamp update happen under one lock; delivery
// and clip I/O are handed to the background worker so the ingestion loop
// never blocks on the network.

pub mod message;
pub mod telegram;
pub mod voice;
pub mod worker;

use std::sync::Arc;
use std::time::Instant;

use crate::alert::message::{compose, AlertMetadata, AncillarySection};
use crate::alert::telegram::MessagingChannel;
use crate::alert::voice::VoiceChannel;
use crate::alert::worker::{DispatchJob, DispatchWorker};
use crate::buffer::FrameRingBuffer;
use crate::constants::{CLIP_FILE_PREFIX, DISPATCH_QUEUE_CAPACITY, LOG_TIME_FORMAT};
use crate::severity::{SeverityLevel, SeverityVerdict};
use crate::state::{Incident, WatchState};

/// Which channels fired for one verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub messaging: bool,
    pub voice: bool,
}

impl DispatchOutcome {
    pub fn dispatched(&self) -> bool {
        self.messaging || self.voice
    }
}

pub struct AlertDispatcher {
    state: Arc<WatchState>,
    worker: DispatchWorker,
}

impl AlertDispatcher {
    pub fn new(
        state: Arc<WatchState>,
        messaging: Arc<dyn MessagingChannel>,
        voice: Arc<dyn VoiceChannel>,
    ) -> Self {
        let worker = DispatchWorker::spawn(DISPATCH_QUEUE_CAPACITY, messaging, voice);
        Self { state, worker }
    }

    /// Evaluate the per-channel cooldowns for this verdict and, when a
    /// channel is due, record the incident and enqueue delivery.
    ///
    /// Messaging fires for MILD and HIGH; the voice call only for HIGH.
    /// Cooldown stamps are taken at decision time -- a failed delivery still
    /// counts against the throttle window.
    pub fn maybe_dispatch(
        &self,
        verdict: &SeverityVerdict,
        ring: &FrameRingBuffer,
        fps: u32,
        ancillary: &[AncillarySection],
        now: Instant,
    ) -> DispatchOutcome {
        if verdict.level == SeverityLevel::None {
            self.state.set_alert_text("");
            return DispatchOutcome::default();
        }

        // Decision + stamp update, one atomic read-modify-write
        let (outcome, clip_dir) = {
            let mut control = self.state.control();

            let messaging_due = control
                .last_messaging_fire
                .map(|t| now.duration_since(t) >= control.settings.messaging_cooldown())
                .unwrap_or(true);

            let voice_due = verdict.level == SeverityLevel::High
                && control
                    .last_voice_fire
                    .map(|t| now.duration_since(t) >= control.settings.voice_cooldown())
                    .unwrap_or(true);

            if !messaging_due && !voice_due {
                drop(control);
                self.state.set_alert_text("");
                return DispatchOutcome::default();
            }

            if messaging_due {
                control.last_messaging_fire = Some(now);
            }
            if voice_due {
                control.last_voice_fire = Some(now);
            }

            (
                DispatchOutcome {
                    messaging: messaging_due,
                    voice: voice_due,
                },
                control.settings.clip_dir.clone(),
            )
        };

        let when = chrono::Local::now();
        let msg = compose(
            verdict.level,
            verdict.max_confidence,
            verdict.count,
            when,
            ancillary,
        );

        let metadata = AlertMetadata {
            date_of_incident: Some(msg.date.clone()),
            time_of_incident: Some(msg.time.clone()),
            severity_level: Some(verdict.level.as_str().to_string()),
            detections: Some(verdict.count as u32),
            confidence: Some(verdict.max_confidence),
            additional_info: None,
        };

        let alert_text = if verdict.level == SeverityLevel::High {
            match (outcome.messaging, outcome.voice) {
                (true, true) => "High alert triggered: messaging alert sent, emergency call initiated.",
                (true, false) => "High alert triggered: messaging alert sent.",
                (false, _) => "High alert triggered: emergency call initiated.",
            }
        } else {
            "Mild alert triggered: messaging review alert sent."
        }
        .to_string();

        self.state.append_incident(Incident {
            date: msg.date.clone(),
            time: when.format(LOG_TIME_FORMAT).to_string(),
            severity: verdict.level,
            confidence: (verdict.max_confidence * 100.0).round() / 100.0,
            detections: verdict.count,
            message: msg.text.clone(),
        });
        self.state.push_log(msg.log_line);
        self.state.set_alert_text(&alert_text);

        log::info!(
            "{} alert decided (confidence {:.2}, {} detections, messaging={}, voice={})",
            verdict.level,
            verdict.max_confidence,
            verdict.count,
            outcome.messaging,
            outcome.voice
        );

        let clip_path = clip_dir.join(format!("{}{}.mp4", CLIP_FILE_PREFIX, when.timestamp()));
        self.worker.enqueue(DispatchJob {
            frames: ring.snapshot(),
            fps,
            clip_path,
            message: msg.text,
            metadata,
            send_message: outcome.messaging,
            make_call: outcome.voice,
        });

        outcome
    }

    /// Wait for in-flight deliveries, for orderly shutdown.
    pub fn shutdown(self) {
        self.worker.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::telegram::ConsoleMessagingChannel;
    use crate::alert::voice::ConsoleVoiceChannel;
    use crate::state::AlertSettings;
    use std::time::Duration;
    use tempfile::TempDir;

    fn verdict(level: SeverityLevel) -> SeverityVerdict {
        SeverityVerdict {
            level,
            count: 22,
            max_confidence: 0.9,
        }
    }

    fn dispatcher(temp: &TempDir) -> (Arc<WatchState>, AlertDispatcher) {
        let state = Arc::new(
            WatchState::new(AlertSettings {
                clip_dir: temp.path().join("clips"),
                messaging_cooldown_secs: 10,
                voice_cooldown_secs: 30,
            })
            .unwrap(),
        );
        let d = AlertDispatcher::new(
            state.clone(),
            Arc::new(ConsoleMessagingChannel),
            Arc::new(ConsoleVoiceChannel),
        );
        (state, d)
    }

    #[test]
    fn test_none_verdict_never_dispatches() {
        let temp = TempDir::new().unwrap();
        let (state, d) = dispatcher(&temp);
        let ring = FrameRingBuffer::new(4);

        let out = d.maybe_dispatch(&verdict(SeverityLevel::None), &ring, 30, &[], Instant::now());
        assert!(!out.dispatched());
        assert_eq!(state.incident_count(), 0);
        assert_eq!(state.status().alert, "");
    }

    #[test]
    fn test_messaging_throttle_two_highs_three_seconds_apart() {
        let temp = TempDir::new().unwrap();
        let (state, d) = dispatcher(&temp);
        let ring = FrameRingBuffer::new(4);
        let t0 = Instant::now();

        let first = d.maybe_dispatch(&verdict(SeverityLevel::High), &ring, 30, &[], t0);
        assert!(first.messaging);
        assert!(first.voice);

        let second = d.maybe_dispatch(
            &verdict(SeverityLevel::High),
            &ring,
            30,
            &[],
            t0 + Duration::from_secs(3),
        );
        assert!(!second.messaging);
        assert!(!second.voice);
        assert_eq!(state.incident_count(), 1);
    }

    #[test]
    fn test_voice_throttle_three_highs_five_seconds_apart() {
        let temp = TempDir::new().unwrap();
        let (_state, d) = dispatcher(&temp);
        let ring = FrameRingBuffer::new(4);
        let t0 = Instant::now();

        let mut messaging_count = 0;
        let mut voice_count = 0;
        for i in 0..3u64 {
            let out = d.maybe_dispatch(
                &verdict(SeverityLevel::High),
                &ring,
                30,
                &[],
                t0 + Duration::from_secs(5 * i),
            );
            messaging_count += out.messaging as u32;
            voice_count += out.voice as u32;
        }

        // Messaging recovers at t0+10s, voice (30s) does not
        assert_eq!(messaging_count, 2);
        assert_eq!(voice_count, 1);
    }

    #[test]
    fn test_mild_fires_messaging_but_never_voice() {
        let temp = TempDir::new().unwrap();
        let (state, d) = dispatcher(&temp);
        let ring = FrameRingBuffer::new(4);

        let out = d.maybe_dispatch(&verdict(SeverityLevel::Mild), &ring, 30, &[], Instant::now());
        assert!(out.messaging);
        assert!(!out.voice);
        assert!(state.status().alert.starts_with("Mild alert triggered"));
        assert_eq!(state.incidents()[0].severity, SeverityLevel::Mild);
    }

    #[test]
    fn test_voice_fires_alone_when_messaging_throttled() {
        let temp = TempDir::new().unwrap();
        let (state, d) = dispatcher(&temp);
        let ring = FrameRingBuffer::new(4);
        let t0 = Instant::now();

        // MILD takes the messaging cooldown without touching voice
        let first = d.maybe_dispatch(&verdict(SeverityLevel::Mild), &ring, 30, &[], t0);
        assert!(first.messaging && !first.voice);

        // HIGH 3s later: messaging throttled, voice still due
        let second = d.maybe_dispatch(
            &verdict(SeverityLevel::High),
            &ring,
            30,
            &[],
            t0 + Duration::from_secs(3),
        );
        assert!(!second.messaging);
        assert!(second.voice);
        assert_eq!(state.incident_count(), 2);
    }

    #[test]
    fn test_throttled_cycle_clears_alert_text() {
        let temp = TempDir::new().unwrap();
        let (state, d) = dispatcher(&temp);
        let ring = FrameRingBuffer::new(4);
        let t0 = Instant::now();

        d.maybe_dispatch(&verdict(SeverityLevel::High), &ring, 30, &[], t0);
        assert!(!state.status().alert.is_empty());

        d.maybe_dispatch(
            &verdict(SeverityLevel::High),
            &ring,
            30,
            &[],
            t0 + Duration::from_secs(1),
        );
        assert_eq!(state.status().alert, "");
    }

    #[test]
    fn test_settings_change_applies_to_next_decision() {
        let temp = TempDir::new().unwrap();
        let (state, d) = dispatcher(&temp);
        let ring = FrameRingBuffer::new(4);
        let t0 = Instant::now();

        d.maybe_dispatch(&verdict(SeverityLevel::Mild), &ring, 30, &[], t0);

        // Shorten the messaging cooldown to 2s at runtime
        state
            .update_settings(AlertSettings {
                clip_dir: temp.path().join("clips"),
                messaging_cooldown_secs: 2,
                voice_cooldown_secs: 30,
            })
            .unwrap();

        let out = d.maybe_dispatch(
            &verdict(SeverityLevel::Mild),
            &ring,
            30,
            &[],
            t0 + Duration::from_secs(3),
        );
        assert!(out.messaging);
    }
}
