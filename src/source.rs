// Video frame sources
//
// The pipeline pulls frames through the `FrameSource` trait; the production
// implementation decodes any ffmpeg-readable file, stream, or device URL
// into raw RGB24 frames via ffmpeg-sidecar.

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use ffmpeg_sidecar::iter::FfmpegIterator;

use crate::error::{Result, VigilError};
use crate::frame::Frame;
use crate::tools;

/// A pull-based stream of frames. `Ok(None)` means the source is exhausted
/// (end of stream); an `Err` is a mid-stream read failure and terminates the
/// ingestion loop.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

pub struct FfmpegFrameSource {
    // Held for process lifetime; events stream through the iterator.
    _child: FfmpegChild,
    events: FfmpegIterator,
    finished: bool,
}

impl FfmpegFrameSource {
    /// Open a file path, network stream, or anything else ffmpeg accepts
    /// as an input URL.
    pub fn open(source: &str) -> Result<Self> {
        let mut child = FfmpegCommand::new_with_path(tools::ffmpeg_path())
            .input(source)
            .rawvideo()
            .spawn()
            .map_err(|e| VigilError::FrameSource(format!("Failed to spawn ffmpeg: {}", e)))?;

        let events = child
            .iter()
            .map_err(|e| VigilError::FrameSource(format!("Failed to read ffmpeg output: {}", e)))?;

        Ok(Self {
            _child: child,
            events,
            finished: false,
        })
    }
}

impl FrameSource for FfmpegFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        for event in self.events.by_ref() {
            match event {
                FfmpegEvent::OutputFrame(frame) => {
                    if frame.pix_fmt != "rgb24" {
                        self.finished = true;
                        return Err(VigilError::FrameSource(format!(
                            "unexpected pixel format: {}",
                            frame.pix_fmt
                        )));
                    }
                    return Ok(Some(Frame::new(frame.width, frame.height, frame.data)));
                }
                FfmpegEvent::Error(e) => {
                    self.finished = true;
                    return Err(VigilError::FrameSource(e));
                }
                FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, msg) => {
                    log::warn!("ffmpeg: {}", msg);
                }
                _ => {}
            }
        }

        self.finished = true;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools;
    use std::process::Command;
    use tempfile::TempDir;

    /// Generate a tiny deterministic test video with an ffmpeg lavfi source.
    fn generate_fixture(dir: &std::path::Path) -> anyhow::Result<std::path::PathBuf> {
        let out = dir.join("fixture.mp4");
        let status = Command::new(tools::ffmpeg_path())
            .args([
                "-f", "lavfi",
                "-i", "testsrc2=s=64x48:d=1:r=10",
                "-c:v", "libx264",
                "-preset", "ultrafast",
                "-pix_fmt", "yuv420p",
                "-y",
            ])
            .arg(&out)
            .status()?;
        if !status.success() {
            anyhow::bail!("ffmpeg fixture generation failed");
        }
        Ok(out)
    }

    #[test]
    fn test_decodes_all_frames_then_exhausts() {
        if !tools::is_tool_available("ffmpeg") {
            eprintln!("Skipping test - ffmpeg not available");
            return;
        }

        let temp = TempDir::new().unwrap();
        let fixture = match generate_fixture(temp.path()) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Skipping test - cannot generate fixture: {}", e);
                return;
            }
        };

        let mut source = FfmpegFrameSource::open(fixture.to_str().unwrap()).unwrap();

        let mut count = 0;
        while let Some(frame) = source.next_frame().unwrap() {
            assert_eq!(frame.width, 64);
            assert_eq!(frame.height, 48);
            assert_eq!(frame.data.len(), 64 * 48 * 3);
            count += 1;
        }
        assert_eq!(count, 10);

        // Exhausted source keeps reporting end-of-stream
        assert!(source.next_frame().unwrap().is_none());
    }
}
