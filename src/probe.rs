// FFprobe wrapper for source frame-rate detection

use std::path::Path;
use std::process::Command;
use serde::Deserialize;

use crate::constants::DEFAULT_FPS;
use crate::error::{Result, VigilError};

#[derive(Debug, Deserialize)]
struct FFprobeOutput {
    streams: Option<Vec<FFprobeStream>>,
}

#[derive(Debug, Deserialize)]
struct FFprobeStream {
    codec_type: Option<String>,
    r_frame_rate: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Probed properties of the first video stream.
#[derive(Debug, Clone, Copy)]
pub struct SourceInfo {
    pub fps: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Run ffprobe on a source and extract video stream properties.
pub fn probe_source(source: &str) -> Result<SourceInfo> {
    let output = Command::new(crate::tools::ffprobe_path())
        .args([
            "-v", "quiet",
            "-print_format", "json",
            "-show_streams",
        ])
        .arg(source)
        .output()
        .map_err(|e| VigilError::FFprobe(format!("Failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VigilError::FFprobe(format!("ffprobe failed: {}", stderr)));
    }

    let probe_output: FFprobeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| VigilError::FFprobe(format!("Failed to parse ffprobe output: {}", e)))?;

    let video = probe_output
        .streams
        .unwrap_or_default()
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    let video = match video {
        Some(v) => v,
        None => return Err(VigilError::FFprobe("No video stream found".to_string())),
    };

    Ok(SourceInfo {
        fps: parse_frame_rate(video.r_frame_rate.as_deref()).unwrap_or(DEFAULT_FPS as f64),
        width: video.width,
        height: video.height,
    })
}

/// Probe the source fps, rounded to whole frames; falls back to the default
/// when probing fails or reports nonsense.
pub fn probe_fps(source: &str) -> u32 {
    match probe_source(source) {
        Ok(info) if info.fps >= 1.0 => info.fps.round() as u32,
        Ok(_) => DEFAULT_FPS,
        Err(e) => {
            log::warn!("fps probe failed ({}), assuming {} fps", e, DEFAULT_FPS);
            DEFAULT_FPS
        }
    }
}

/// Parse frame rate string like "30000/1001" to f64
fn parse_frame_rate(rate_str: Option<&str>) -> Option<f64> {
    let rate_str = rate_str?;
    if let Some((num, den)) = rate_str.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate_str.parse().ok()
}
