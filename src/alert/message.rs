// Alert message composition and metadata extraction
//
// The outbound message is line-oriented with fixed prefixes (Date:, Time:,
// Severity:, Confidence:, Detections:). The messaging channel parses these
// back out of the text for the voice path, so the prefixes are a wire
// contract -- the dispatcher also carries the structured values and merges
// them over whatever the parse misses.

use std::sync::LazyLock;

use chrono::{DateTime, Local};
use regex::Regex;
use serde::Serialize;

use crate::constants::{ALERT_HEADLINE, CLOCK_TIME_FORMAT, DATE_FORMAT, LOG_TIME_FORMAT};
use crate::detect::Detection;
use crate::severity::SeverityLevel;

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Date: ([\d-]+)").unwrap());
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Time: ([\d:]+ [APMapm]+)").unwrap());
static SEVERITY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Severity: (\w+)").unwrap());
static DETECTIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Detections: (\d+)").unwrap());
static CONFIDENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Confidence: ([\d.]+)").unwrap());

/// Detections from a secondary detector, appended to the message body under
/// a section title.
#[derive(Debug, Clone)]
pub struct AncillarySection {
    pub title: String,
    pub detections: Vec<Detection>,
}

/// Composed alert text plus the matching status-log line.
#[derive(Debug, Clone)]
pub struct AlertMessage {
    pub text: String,
    pub log_line: String,
    pub date: String,
    pub time: String,
}

/// Build the alert report for one dispatch decision.
pub fn compose(
    level: SeverityLevel,
    confidence: f32,
    detections: usize,
    when: DateTime<Local>,
    ancillary: &[AncillarySection],
) -> AlertMessage {
    let date = when.format(DATE_FORMAT).to_string();
    let time = when.format(CLOCK_TIME_FORMAT).to_string();

    let mut text = format!(
        "{}\nDate: {}\nTime: {}\nSeverity: {}\nConfidence: {:.2}\nDetections: {}",
        ALERT_HEADLINE, date, time, level, confidence, detections
    );

    for section in ancillary {
        if section.detections.is_empty() {
            continue;
        }
        text.push_str(&format!("\n{}:", section.title));
        for det in &section.detections {
            text.push_str(&format!(
                "\n - conf={:.2}, cls={}, box=({}, {}, {}, {})",
                det.confidence,
                det.class_id,
                det.bbox.x1,
                det.bbox.y1,
                det.bbox.x2,
                det.bbox.y2
            ));
        }
    }

    let log_line = format!(
        "{} - {} alert (Confidence: {:.2}, Detections: {})",
        when.format(LOG_TIME_FORMAT),
        level,
        confidence,
        detections
    );

    AlertMessage {
        text,
        log_line,
        date,
        time,
    }
}

/// Structured incident context handed to the voice-call collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertMetadata {
    pub date_of_incident: Option<String>,
    pub time_of_incident: Option<String>,
    pub severity_level: Option<String>,
    pub detections: Option<u32>,
    pub confidence: Option<f32>,
    pub additional_info: Option<String>,
}

impl AlertMetadata {
    /// Extract metadata from an alert message via the line-prefix format.
    /// Lines that fail to match leave the field absent.
    pub fn from_message(message: &str) -> Self {
        let capture = |re: &Regex| {
            re.captures(message)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        };

        Self {
            date_of_incident: capture(&DATE_RE),
            time_of_incident: capture(&TIME_RE),
            severity_level: capture(&SEVERITY_RE).map(|s| s.to_uppercase()),
            detections: capture(&DETECTIONS_RE).and_then(|s| s.parse().ok()),
            confidence: capture(&CONFIDENCE_RE).and_then(|s| s.parse().ok()),
            additional_info: None,
        }
    }

    /// Fill any absent field from `fallback`. Parsed values win; the
    /// structured copy backstops a drifting text format.
    pub fn merged_over(mut self, fallback: &AlertMetadata) -> Self {
        self.date_of_incident = self
            .date_of_incident
            .or_else(|| fallback.date_of_incident.clone());
        self.time_of_incident = self
            .time_of_incident
            .or_else(|| fallback.time_of_incident.clone());
        self.severity_level = self
            .severity_level
            .or_else(|| fallback.severity_level.clone());
        self.detections = self.detections.or(fallback.detections);
        self.confidence = self.confidence.or(fallback.confidence);
        self.additional_info = self
            .additional_info
            .or_else(|| fallback.additional_info.clone());
        self
    }
}
