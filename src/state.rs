// Shared watch state: status snapshot, incident history, dispatch control.
//
// Three independent lock groups, each held only for the read-modify-write:
// the status snapshot (with its bounded log ring), the append-only incident
// history, and the dispatch control block (runtime settings + per-channel
// cooldown stamps). Cross-group atomicity is never required.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CLIP_DIR, DEFAULT_MESSAGING_COOLDOWN_SECS, DEFAULT_VOICE_COOLDOWN_SECS,
    LOG_TIME_FORMAT, MAX_LOG_ENTRIES,
};
use crate::error::{Result, VigilError};
use crate::severity::SeverityLevel;

/// The latest pipeline status exposed for external polling.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub level: SeverityLevel,
    pub max_confidence: f32,
    pub detections: usize,
    pub last_update: String,
    pub alert: String,
    pub logs: VecDeque<String>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            level: SeverityLevel::None,
            max_confidence: 0.0,
            detections: 0,
            last_update: String::new(),
            alert: String::new(),
            logs: VecDeque::with_capacity(MAX_LOG_ENTRIES),
        }
    }
}

/// One dispatched alert, append-only.
#[derive(Debug, Clone, Serialize)]
pub struct Incident {
    pub date: String,
    pub time: String,
    pub severity: SeverityLevel,
    pub confidence: f32,
    pub detections: usize,
    pub message: String,
}

/// Runtime-adjustable alert settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSettings {
    pub clip_dir: PathBuf,
    pub messaging_cooldown_secs: u64,
    pub voice_cooldown_secs: u64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            clip_dir: PathBuf::from(DEFAULT_CLIP_DIR),
            messaging_cooldown_secs: DEFAULT_MESSAGING_COOLDOWN_SECS,
            voice_cooldown_secs: DEFAULT_VOICE_COOLDOWN_SECS,
        }
    }
}

impl AlertSettings {
    pub fn messaging_cooldown(&self) -> Duration {
        Duration::from_secs(self.messaging_cooldown_secs)
    }

    pub fn voice_cooldown(&self) -> Duration {
        Duration::from_secs(self.voice_cooldown_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.messaging_cooldown_secs < 1 || self.voice_cooldown_secs < 1 {
            return Err(VigilError::InvalidSettings(
                "cooldown intervals must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings plus cooldown stamps, guarded together so the fire decision and
/// its stamp update are one atomic read-modify-write.
#[derive(Debug)]
pub struct DispatchControl {
    pub settings: AlertSettings,
    pub last_messaging_fire: Option<Instant>,
    pub last_voice_fire: Option<Instant>,
}

pub struct WatchState {
    status: Mutex<StatusSnapshot>,
    incidents: Mutex<Vec<Incident>>,
    control: Mutex<DispatchControl>,
}

impl WatchState {
    pub fn new(settings: AlertSettings) -> Result<Self> {
        settings.validate()?;
        std::fs::create_dir_all(&settings.clip_dir)?;

        Ok(Self {
            status: Mutex::new(StatusSnapshot::default()),
            incidents: Mutex::new(Vec::new()),
            control: Mutex::new(DispatchControl {
                settings,
                last_messaging_fire: None,
                last_voice_fire: None,
            }),
        })
    }

    // --- Status group ---

    pub fn status(&self) -> StatusSnapshot {
        self.status.lock().unwrap().clone()
    }

    pub fn update_status(&self, level: SeverityLevel, max_confidence: f32, detections: usize) {
        let mut status = self.status.lock().unwrap();
        status.level = level;
        status.max_confidence = (max_confidence * 100.0).round() / 100.0;
        status.detections = detections;
        status.last_update = chrono::Local::now().format(LOG_TIME_FORMAT).to_string();
    }

    pub fn set_alert_text(&self, text: &str) {
        self.status.lock().unwrap().alert = text.to_string();
    }

    /// Append a human-readable line to the bounded recent-log ring.
    pub fn push_log(&self, line: String) {
        let mut status = self.status.lock().unwrap();
        if status.logs.len() == MAX_LOG_ENTRIES {
            status.logs.pop_front();
        }
        status.logs.push_back(line);
    }

    // --- Incident group ---

    pub fn append_incident(&self, incident: Incident) {
        self.incidents.lock().unwrap().push(incident);
    }

    pub fn incidents(&self) -> Vec<Incident> {
        self.incidents.lock().unwrap().clone()
    }

    pub fn incident_count(&self) -> usize {
        self.incidents.lock().unwrap().len()
    }

    // --- Dispatch control group ---

    pub fn control(&self) -> MutexGuard<'_, DispatchControl> {
        self.control.lock().unwrap()
    }

    pub fn settings(&self) -> AlertSettings {
        self.control.lock().unwrap().settings.clone()
    }

    /// Replace the alert settings. Invalid values are rejected and the prior
    /// settings remain in effect; in-flight cooldown stamps are untouched.
    pub fn update_settings(&self, settings: AlertSettings) -> Result<()> {
        settings.validate()?;
        std::fs::create_dir_all(&settings.clip_dir)?;
        self.control.lock().unwrap().settings = settings;
        Ok(())
    }
}
