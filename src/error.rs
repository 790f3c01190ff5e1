// Vigil Cam Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VigilError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("FFprobe error: {0}")]
    FFprobe(String),

    #[error("FFmpeg error: {0}")]
    FFmpeg(String),

    #[error("Frame source error: {0}")]
    FrameSource(String),

    #[error("Detector error: {0}")]
    Detector(String),

    #[error("Empty frame buffer, no clip to write")]
    EmptyClip,

    #[error("Clip write failed: {0}")]
    ClipWrite(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for VigilError {
    fn from(err: anyhow::Error) -> Self {
        VigilError::Other(err.to_string())
    }
}

impl From<reqwest::Error> for VigilError {
    fn from(err: reqwest::Error) -> Self {
        VigilError::Delivery(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VigilError>;
