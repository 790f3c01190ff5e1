// Vigil Cam CLI binary

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use vigil_cam::alert::telegram::{ConsoleMessagingChannel, MessagingChannel, TelegramChannel};
use vigil_cam::alert::voice::{ConsoleVoiceChannel, VoiceCallChannel, VoiceCallConfig, VoiceChannel};
use vigil_cam::alert::AlertDispatcher;
use vigil_cam::detect::motion::FrameDiffDetector;
use vigil_cam::pipeline::{run_watch_loop, PipelineConfig};
use vigil_cam::severity::SeverityThresholds;
use vigil_cam::source::FfmpegFrameSource;
use vigil_cam::state::{AlertSettings, WatchState};
use vigil_cam::{constants, probe, tools};

#[derive(Parser)]
#[command(name = "vigilcam")]
#[command(about = "Vigil Cam - real-time violence detection and alerting", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a video source and dispatch alerts
    Watch {
        /// Video source: file path, stream URL, or device
        source: String,

        /// Directory for evidentiary clips
        #[arg(long, default_value = constants::DEFAULT_CLIP_DIR)]
        clip_dir: PathBuf,

        /// Minimum seconds between messaging alerts
        #[arg(long, default_value_t = constants::DEFAULT_MESSAGING_COOLDOWN_SECS)]
        messaging_cooldown: u64,

        /// Minimum seconds between emergency calls
        #[arg(long, default_value_t = constants::DEFAULT_VOICE_COOLDOWN_SECS)]
        voice_cooldown: u64,

        /// Frames per inference batch
        #[arg(long, default_value_t = constants::DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Evidence window in seconds
        #[arg(long, default_value_t = constants::DEFAULT_WINDOW_SECS)]
        window: u64,

        /// Detection class id treated as violent activity
        #[arg(long, default_value_t = constants::DEFAULT_TARGET_CLASS)]
        target_class: u32,

        /// Peak confidence that makes a full window HIGH outright
        #[arg(long, default_value_t = constants::MILD_THRESHOLD)]
        mild_threshold: f32,

        /// Detections required in the window before any alert
        #[arg(long, default_value_t = constants::DETECTION_COUNT_THRESHOLD)]
        detection_count: usize,

        /// Consecutive MILD verdicts that escalate to HIGH
        #[arg(long, default_value_t = constants::MILD_CONSECUTIVE_THRESHOLD)]
        mild_streak: u32,

        /// Override the probed source frame rate
        #[arg(long)]
        fps: Option<u32>,
    },

    /// Show resolved external tool paths and availability
    Tools,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            source,
            clip_dir,
            messaging_cooldown,
            voice_cooldown,
            batch_size,
            window,
            target_class,
            mild_threshold,
            detection_count,
            mild_streak,
            fps,
        } => {
            let settings = AlertSettings {
                clip_dir,
                messaging_cooldown_secs: messaging_cooldown,
                voice_cooldown_secs: voice_cooldown,
            };
            let config = PipelineConfig {
                batch_size,
                target_class,
                infer_size: constants::INFER_SIZE,
                window_secs: window,
                thresholds: SeverityThresholds {
                    mild_threshold,
                    detection_count,
                    mild_consecutive: mild_streak,
                },
                fps: fps.unwrap_or_else(|| probe::probe_fps(&source)),
                buffer_secs: constants::BUFFER_SECONDS,
            };
            cmd_watch(source, settings, config)
        }
        Commands::Tools => cmd_tools(),
    }
}

fn cmd_watch(source: String, settings: AlertSettings, config: PipelineConfig) -> Result<()> {
    let state = Arc::new(WatchState::new(settings)?);
    let target_class = config.target_class;

    log::info!("Watching {} at {} fps", source, config.fps);

    let dispatcher = AlertDispatcher::new(state.clone(), messaging_channel(), voice_channel());

    let mut frame_source = FfmpegFrameSource::open(&source)?;
    let detector = FrameDiffDetector::new(target_class);

    let summary = run_watch_loop(&mut frame_source, detector, &config, state.clone(), &dispatcher);

    // Let in-flight deliveries finish before reporting
    dispatcher.shutdown();
    let summary = summary?;

    let incidents = state.incidents();

    println!();
    println!("Watch complete:");
    println!("  Frames processed:  {}", summary.frames_processed);
    println!("  Alerts dispatched: {}", summary.alerts_dispatched);

    if !incidents.is_empty() {
        println!();
        println!("{:>12}  {:>10}  {:>8}  {:>10}  {:>10}", "Date", "Time", "Severity", "Confidence", "Detections");
        println!("{}", "-".repeat(60));
        for incident in &incidents {
            println!(
                "{:>12}  {:>10}  {:>8}  {:>10.2}  {:>10}",
                incident.date,
                incident.time,
                incident.severity,
                incident.confidence,
                incident.detections
            );
        }
    }

    Ok(())
}

fn cmd_tools() -> Result<()> {
    for tool in ["ffmpeg", "ffprobe"] {
        let path = match tool {
            "ffmpeg" => tools::ffmpeg_path(),
            _ => tools::ffprobe_path(),
        };
        let available = if tools::is_tool_available(tool) { "ok" } else { "MISSING" };
        println!("{:>8}  {:>8}  {}", tool, available, path.display());
    }
    Ok(())
}

/// Build the messaging channel from environment credentials, falling back to
/// console logging when unconfigured.
fn messaging_channel() -> Arc<dyn MessagingChannel> {
    let token = std::env::var("VIGILCAM_TELEGRAM_BOT_TOKEN").ok();
    let chat_id = std::env::var("VIGILCAM_TELEGRAM_CHAT_ID").ok();

    match (token, chat_id) {
        (Some(token), Some(chat_id)) => {
            Arc::new(TelegramChannel::new(token, chat_id)) as Arc<dyn MessagingChannel>
        }
        _ => {
            log::warn!(
                "VIGILCAM_TELEGRAM_BOT_TOKEN/VIGILCAM_TELEGRAM_CHAT_ID not set, \
                 alerts will be logged to console only"
            );
            Arc::new(ConsoleMessagingChannel)
        }
    }
}

/// Build the voice-call channel from environment credentials, falling back to
/// console logging when unconfigured.
fn voice_channel() -> Arc<dyn VoiceChannel> {
    let env = |key: &str| std::env::var(key).ok();

    match (
        env("VIGILCAM_CALL_API_URL"),
        env("VIGILCAM_CALL_API_KEY"),
        env("VIGILCAM_CALL_AGENT_ID"),
        env("VIGILCAM_CALL_FROM_PHONE"),
        env("VIGILCAM_CALL_TO_PHONE"),
    ) {
        (Some(api_url), Some(api_key), Some(agent_id), Some(from_phone), Some(to_phone)) => {
            Arc::new(VoiceCallChannel::new(VoiceCallConfig {
                api_url,
                api_key,
                agent_id,
                from_phone,
                to_phone,
                location: env("VIGILCAM_CALL_LOCATION"),
            })) as Arc<dyn VoiceChannel>
        }
        _ => {
            log::warn!(
                "VIGILCAM_CALL_* not fully set, emergency calls will be logged to console only"
            );
            Arc::new(ConsoleVoiceChannel)
        }
    }
}
