// Background dispatch worker -- delivers alerts off the ingestion path.
//
// One long-lived thread drains a bounded queue of dispatch jobs. Each job
// writes the evidentiary clip, sends the messaging alert, and places the
// voice call when asked. Failures are logged and isolated per channel;
// panics are caught so the thread never dies.

use std::path::PathBuf;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::alert::message::AlertMetadata;
use crate::alert::telegram::MessagingChannel;
use crate::alert::voice::VoiceChannel;
use crate::buffer;
use crate::error::VigilError;
use crate::frame::Frame;

/// Everything one delivery needs, captured at decision time.
pub struct DispatchJob {
    pub frames: Vec<Frame>,
    pub fps: u32,
    pub clip_path: PathBuf,
    pub message: String,
    pub metadata: AlertMetadata,
    pub send_message: bool,
    pub make_call: bool,
}

pub struct DispatchWorker {
    tx: Option<SyncSender<DispatchJob>>,
    handle: Option<JoinHandle<()>>,
}

impl DispatchWorker {
    /// Spawn the worker thread with a bounded job queue.
    pub fn spawn(
        queue_capacity: usize,
        messaging: Arc<dyn MessagingChannel>,
        voice: Arc<dyn VoiceChannel>,
    ) -> Self {
        let (tx, rx) = sync_channel(queue_capacity);

        let handle = std::thread::Builder::new()
            .name("alert-dispatch".into())
            .spawn(move || {
                worker_loop(rx, messaging, voice);
            })
            .expect("Failed to spawn alert dispatch thread");

        Self {
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    /// Enqueue a job without blocking. A full queue drops the delivery with
    /// a warning -- the ingestion loop must never stall on notifications.
    pub fn enqueue(&self, job: DispatchJob) -> bool {
        let tx = match &self.tx {
            Some(tx) => tx,
            None => return false,
        };

        match tx.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("Dispatch queue full, dropping alert delivery");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                log::error!("Dispatch worker gone, dropping alert delivery");
                false
            }
        }
    }

    /// Close the queue and wait for in-flight deliveries to finish. The
    /// ingestion loop is free to exit without this; it exists for orderly
    /// CLI shutdown and tests.
    pub fn shutdown(mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DispatchWorker {
    fn drop(&mut self) {
        // Detach: sender drops, the worker drains what is queued and exits.
        self.tx.take();
    }
}

fn worker_loop(
    rx: Receiver<DispatchJob>,
    messaging: Arc<dyn MessagingChannel>,
    voice: Arc<dyn VoiceChannel>,
) {
    while let Ok(job) = rx.recv() {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            run_job(job, &messaging, &voice);
        }));
        if result.is_err() {
            log::error!("Dispatch job panicked (recovered)");
        }
    }
}

fn run_job(job: DispatchJob, messaging: &Arc<dyn MessagingChannel>, voice: &Arc<dyn VoiceChannel>) {
    // Materialize the clip first; a failure degrades to a text-only alert.
    let clip = match buffer::write_clip(&job.frames, job.fps, &job.clip_path) {
        Ok(path) => {
            log::info!("Evidentiary clip saved: {}", path.display());
            Some(path)
        }
        Err(VigilError::EmptyClip) => {
            log::warn!("Frame buffer was empty, dispatching without clip");
            None
        }
        Err(e) => {
            log::error!("Clip write failed ({}), dispatching without clip", e);
            None
        }
    };

    // Messaging channel; the parsed-back metadata feeds the voice path,
    // backstopped by the structured copy carried on the job.
    let metadata = if job.send_message {
        match messaging.send(clip.as_deref(), &job.message) {
            Ok(parsed) => parsed.merged_over(&job.metadata),
            Err(e) => {
                log::error!("Messaging delivery failed: {}", e);
                job.metadata.clone()
            }
        }
    } else {
        job.metadata.clone()
    };

    // Voice channel, independent of messaging success.
    if job.make_call {
        if let Err(e) = voice.call(&metadata) {
            log::error!("Voice call failed: {}", e);
        }
    }
}
