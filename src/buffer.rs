// Bounded ring of recent raw frames plus evidentiary clip materialization.
//
// The ring spans a fixed wall-clock duration at the source frame rate,
// independent of (and larger than) the severity window, so a clip carries
// the lead-up to an incident. Clip writing is blocking file I/O and runs on
// the dispatch worker, never on the ingestion loop.

use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::constants::{CLIP_CODEC, CLIP_CRF, CLIP_PRESET};
use crate::error::{Result, VigilError};
use crate::frame::Frame;
use crate::tools;

pub struct FrameRingBuffer {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl FrameRingBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "ring capacity must be at least 1");
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Capacity for `seconds` of footage at `fps`.
    pub fn for_duration(fps: u32, seconds: u64) -> Self {
        Self::new((fps as usize * seconds as usize).max(1))
    }

    /// Append a frame, evicting the oldest once full.
    pub fn push(&mut self, frame: Frame) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clone out the buffered frames in arrival order, for handing to the
    /// dispatch worker while the ring keeps filling.
    pub fn snapshot(&self) -> Vec<Frame> {
        self.frames.iter().cloned().collect()
    }
}

/// Write frames in order to an H.264 MP4 at the given frame rate.
///
/// Frames are piped to ffmpeg as rawvideo on stdin. Fails on an empty input,
/// an ffmpeg error, or a missing/zero-byte output file.
pub fn write_clip(frames: &[Frame], fps: u32, out_path: &Path) -> Result<PathBuf> {
    let first = frames.first().ok_or(VigilError::EmptyClip)?;
    let (width, height) = (first.width, first.height);

    let path_str = out_path
        .to_str()
        .ok_or_else(|| VigilError::InvalidPath("Path contains non-UTF8 characters".to_string()))?;

    let mut child = Command::new(tools::ffmpeg_path())
        .args([
            "-y",
            // Keep stderr quiet; we stream frames on stdin and a chatty
            // stderr pipe can fill and stall ffmpeg
            "-v", "error",
            "-nostats",
            "-f", "rawvideo",
            "-pix_fmt", "rgb24",
            "-s", &format!("{}x{}", width, height),
            "-r", &fps.to_string(),
            "-i", "-",
            "-c:v", CLIP_CODEC,
            "-preset", CLIP_PRESET,
            "-crf", &CLIP_CRF.to_string(),
            "-pix_fmt", "yuv420p",
            path_str,
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| VigilError::FFmpeg(format!("Failed to run ffmpeg: {}", e)))?;

    {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| VigilError::FFmpeg("ffmpeg stdin unavailable".to_string()))?;
        let mut writer = std::io::BufWriter::new(stdin);
        for frame in frames {
            if frame.width != width || frame.height != height {
                log::warn!(
                    "Skipping {}x{} frame in {}x{} clip",
                    frame.width, frame.height, width, height
                );
                continue;
            }
            writer.write_all(&frame.data)?;
        }
        writer.flush()?;
        // Writer drops here, closing stdin so ffmpeg finalizes the file
    }

    let output = child
        .wait_with_output()
        .map_err(|e| VigilError::FFmpeg(format!("ffmpeg did not exit: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VigilError::ClipWrite(format!(
            "ffmpeg exited with {}: {}",
            output.status,
            stderr.lines().last().unwrap_or("")
        )));
    }

    let size = std::fs::metadata(out_path).map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        return Err(VigilError::ClipWrite(format!(
            "output missing or empty: {}",
            out_path.display()
        )));
    }

    Ok(out_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_push_evicts_oldest_beyond_capacity() {
        let mut ring = FrameRingBuffer::new(3);
        for i in 0..5u8 {
            ring.push(Frame::filled(2, 2, [i, i, i]));
        }

        assert_eq!(ring.len(), 3);
        let frames = ring.snapshot();
        // Frames 0 and 1 were evicted; 2, 3, 4 remain in arrival order
        assert_eq!(frames[0].data[0], 2);
        assert_eq!(frames[1].data[0], 3);
        assert_eq!(frames[2].data[0], 4);
    }

    #[test]
    fn test_for_duration_capacity() {
        let ring = FrameRingBuffer::for_duration(30, 10);
        assert_eq!(ring.capacity(), 300);
    }

    #[test]
    fn test_write_clip_empty_fails() {
        let temp = TempDir::new().unwrap();
        let result = write_clip(&[], 30, &temp.path().join("empty.mp4"));
        assert!(matches!(result, Err(VigilError::EmptyClip)));
    }

    #[test]
    fn test_write_clip_produces_playable_file() {
        if !tools::is_tool_available("ffmpeg") {
            eprintln!("Skipping test - ffmpeg not available");
            return;
        }

        let temp = TempDir::new().unwrap();
        let out = temp.path().join("clip.mp4");

        let frames: Vec<Frame> = (0..30u8)
            .map(|i| Frame::filled(64, 48, [i * 8, 64, 255 - i * 8]))
            .collect();

        let path = write_clip(&frames, 30, &out).unwrap();
        let size = std::fs::metadata(&path).unwrap().len();
        assert!(size > 0);
    }

    #[test]
    fn test_write_clip_skips_mismatched_frames() {
        if !tools::is_tool_available("ffmpeg") {
            eprintln!("Skipping test - ffmpeg not available");
            return;
        }

        let temp = TempDir::new().unwrap();
        let out = temp.path().join("clip.mp4");

        let mut frames: Vec<Frame> = (0..10u8).map(|_| Frame::filled(64, 48, [0, 0, 0])).collect();
        frames.push(Frame::filled(32, 32, [1, 1, 1]));

        assert!(write_clip(&frames, 30, &out).is_ok());
    }
}
