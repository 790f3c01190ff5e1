// Vigil Cam Constants
// Pipeline defaults. CLI flags and runtime settings override where noted.

// Inference
pub const INFER_SIZE: u32 = 640; // longest frame side handed to the detector
pub const DEFAULT_BATCH_SIZE: usize = 1;
pub const DEFAULT_TARGET_CLASS: u32 = 1;

// Severity escalation
pub const DEFAULT_WINDOW_SECS: u64 = 5;
pub const MILD_THRESHOLD: f32 = 0.80;
pub const DETECTION_COUNT_THRESHOLD: usize = 20;
pub const MILD_CONSECUTIVE_THRESHOLD: u32 = 5;

// Frame ring buffer
// Ring spans twice the buffer window so the clip carries pre-incident context.
pub const BUFFER_SECONDS: u64 = 5;
pub const BUFFER_WINDOW_FACTOR: u64 = 2;
pub const DEFAULT_FPS: u32 = 30;

// Alert dispatch (runtime-adjustable via settings)
pub const DEFAULT_MESSAGING_COOLDOWN_SECS: u64 = 10;
pub const DEFAULT_VOICE_COOLDOWN_SECS: u64 = 30;
pub const DEFAULT_CLIP_DIR: &str = "output";
pub const CLIP_FILE_PREFIX: &str = "violent_clip_";
pub const DISPATCH_QUEUE_CAPACITY: usize = 8;

// Status view
pub const MAX_LOG_ENTRIES: usize = 10;

// Clip encoding
pub const CLIP_CODEC: &str = "libx264";
pub const CLIP_PRESET: &str = "veryfast";
pub const CLIP_CRF: u32 = 23;

// Alert message formats (the line prefixes are a wire contract -- the
// messaging channel parses metadata back out of the text)
pub const ALERT_HEADLINE: &str = "\u{1f6a8} Violent Activity Detected!";
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const CLOCK_TIME_FORMAT: &str = "%I:%M %p";
pub const LOG_TIME_FORMAT: &str = "%H:%M:%S";

// Motion fallback detector
pub const MOTION_DIFF_THRESHOLD: f32 = 0.02; // mean abs diff ratio below this is static
pub const MOTION_CONFIDENCE_CEILING: f32 = 0.95;
