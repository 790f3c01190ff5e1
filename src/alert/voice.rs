// Outbound voice-call channel for the most severe alerts
//
// Posts the structured incident metadata to a call-automation API which
// dials out and reads the incident to the operator. Best-effort and fully
// independent of messaging delivery.

use std::time::Duration;

use crate::alert::message::AlertMetadata;
use crate::error::Result;

const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// The voice-call collaborator.
pub trait VoiceChannel: Send + Sync {
    fn call(&self, metadata: &AlertMetadata) -> Result<()>;
}

/// Configuration for the outbound-call API.
#[derive(Debug, Clone)]
pub struct VoiceCallConfig {
    pub api_url: String,
    pub api_key: String,
    pub agent_id: String,
    pub from_phone: String,
    pub to_phone: String,
    pub location: Option<String>,
}

pub struct VoiceCallChannel {
    config: VoiceCallConfig,
    client: reqwest::blocking::Client,
}

impl VoiceCallChannel {
    pub fn new(config: VoiceCallConfig) -> Self {
        Self {
            config,
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl VoiceChannel for VoiceCallChannel {
    fn call(&self, metadata: &AlertMetadata) -> Result<()> {
        let call_metadata = serde_json::json!({
            "emergency": "violence_detected",
            "date_of_incident": metadata.date_of_incident.as_deref().unwrap_or("Unknown"),
            "time_of_incident": metadata.time_of_incident.as_deref().unwrap_or("Unknown"),
            "severity_level": metadata.severity_level.as_deref().unwrap_or("unknown"),
            "detections": metadata.detections.unwrap_or(0),
            "confidence": metadata.confidence.unwrap_or(0.0),
            "additional_info": metadata.additional_info.as_deref().unwrap_or(""),
            "location": self.config.location.as_deref().unwrap_or(""),
        });

        let payload = serde_json::json!({
            "from_phone": self.config.from_phone,
            "to_phone": self.config.to_phone,
            "agent_id": self.config.agent_id,
            "metadata": call_metadata,
            "include_metadata_in_prompt": true,
        });

        self.client
            .post(&self.config.api_url)
            .header("Authorization", &self.config.api_key)
            .json(&payload)
            .timeout(CALL_TIMEOUT)
            .send()?
            .error_for_status()?;

        log::info!("Emergency call initiated");
        Ok(())
    }
}

/// Log-only fallback used when no call credentials are configured.
pub struct ConsoleVoiceChannel;

impl VoiceChannel for ConsoleVoiceChannel {
    fn call(&self, metadata: &AlertMetadata) -> Result<()> {
        log::info!(
            "[console call] severity={} detections={} confidence={:.2}",
            metadata.severity_level.as_deref().unwrap_or("unknown"),
            metadata.detections.unwrap_or(0),
            metadata.confidence.unwrap_or(0.0)
        );
        Ok(())
    }
}
