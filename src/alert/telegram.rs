// Telegram-backed messaging channel
//
// Sends the alert text first, then the evidentiary clip as a video upload
// when one exists. Returns the metadata parsed back out of the message text
// per the line-prefix contract.

use std::path::Path;
use std::time::Duration;

use crate::alert::message::AlertMetadata;
use crate::error::{Result, VigilError};

const TEXT_TIMEOUT: Duration = Duration::from_secs(5);
const VIDEO_TIMEOUT: Duration = Duration::from_secs(30);

/// The messaging collaborator. Delivery is best-effort, at-most-once.
pub trait MessagingChannel: Send + Sync {
    fn send(&self, clip: Option<&Path>, message: &str) -> Result<AlertMetadata>;
}

pub struct TelegramChannel {
    bot_token: String,
    chat_id: String,
    api_base: String,
    client: reqwest::blocking::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self::with_api_base(bot_token, chat_id, "https://api.telegram.org")
    }

    pub fn with_api_base(
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            api_base: api_base.into(),
            client: reqwest::blocking::Client::new(),
        }
    }

    fn send_text(&self, message: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        self.client
            .post(&url)
            .form(&[("chat_id", self.chat_id.as_str()), ("text", message)])
            .timeout(TEXT_TIMEOUT)
            .send()?
            .error_for_status()?;
        Ok(())
    }

    fn send_video(&self, clip: &Path) -> Result<()> {
        let url = format!("{}/bot{}/sendVideo", self.api_base, self.bot_token);
        let form = reqwest::blocking::multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .file("video", clip)
            .map_err(|e| VigilError::Delivery(format!("Failed to attach clip: {}", e)))?;

        self.client
            .post(&url)
            .multipart(form)
            .timeout(VIDEO_TIMEOUT)
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

impl MessagingChannel for TelegramChannel {
    fn send(&self, clip: Option<&Path>, message: &str) -> Result<AlertMetadata> {
        let metadata = AlertMetadata::from_message(message);

        self.send_text(message)?;
        log::info!("Messaging alert text sent");

        // Only attach a clip that actually materialized
        match clip {
            Some(path) if clip_is_valid(path) => {
                self.send_video(path)?;
                log::info!("Messaging video alert sent: {}", path.display());
            }
            Some(path) => {
                log::error!("Clip file invalid or empty, text-only alert: {}", path.display());
            }
            None => {}
        }

        Ok(metadata)
    }
}

fn clip_is_valid(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// Log-only fallback used when no messaging credentials are configured.
pub struct ConsoleMessagingChannel;

impl MessagingChannel for ConsoleMessagingChannel {
    fn send(&self, clip: Option<&Path>, message: &str) -> Result<AlertMetadata> {
        match clip {
            Some(path) => log::info!("[console alert] {} (clip: {})", message, path.display()),
            None => log::info!("[console alert] {}", message),
        }
        Ok(AlertMetadata::from_message(message))
    }
}
