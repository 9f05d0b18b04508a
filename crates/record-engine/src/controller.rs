//! Serialized command queue around a recording session.
//!
//! Frame delivery and crop-target updates may originate on different
//! threads; the controller funnels both through one bounded channel into
//! a worker task that owns the session, so every mutation of session
//! state happens on a single logical queue.
//!
//! Delivery calls never block the producer: a full queue drops the
//! buffer, in line with the sink's own readiness-gated drop policy.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use zoomcast_common::error::ZoomcastResult;
use zoomcast_frame_model::{AudioChunk, CropRect, VideoFrame};

use crate::session::{RecordingSession, SessionStats};

/// Depth of the command queue. Deep enough to ride out transform jitter,
/// shallow enough that backpressure shows up as drops, not latency.
const COMMAND_QUEUE_DEPTH: usize = 32;

enum SessionCommand {
    SetTarget(Option<CropRect>),
    Video(VideoFrame),
    Audio(AudioChunk),
    Finish(oneshot::Sender<ZoomcastResult<()>>),
    Stats(oneshot::Sender<SessionStats>),
}

/// Handle to a running session worker.
///
/// Cheap to clone into producer callbacks. Dropping every handle without
/// calling [`finish`](Self::finish) still finalizes the session when the
/// worker drains.
#[derive(Clone)]
pub struct SessionController {
    tx: mpsc::Sender<SessionCommand>,
    queue_dropped: Arc<AtomicU64>,
}

impl SessionController {
    /// Spawn the worker task owning `session`. The session must already
    /// be started.
    pub fn spawn(session: RecordingSession) -> Self {
        let (tx, mut rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);

        tokio::spawn(async move {
            let mut session = session;
            while let Some(command) = rx.recv().await {
                match command {
                    SessionCommand::SetTarget(target) => session.set_target(target),
                    SessionCommand::Video(frame) => session.push_video(frame),
                    SessionCommand::Audio(chunk) => session.push_audio(chunk),
                    SessionCommand::Finish(reply) => {
                        let _ = reply.send(session.finish());
                    }
                    SessionCommand::Stats(reply) => {
                        let _ = reply.send(session.stats());
                    }
                }
            }
            // All handles gone without an explicit finish.
            if let Err(e) = session.finish() {
                tracing::warn!(error = %e, "Implicit finalize on shutdown failed");
            }
        });

        Self {
            tx,
            queue_dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Redirect the region of interest. Non-blocking; may be called from
    /// any thread, more often than the frame rate.
    pub fn set_target(&self, target: Option<CropRect>) {
        if self.tx.try_send(SessionCommand::SetTarget(target)).is_err() {
            // The next pointer move will re-send a fresher target anyway.
            tracing::debug!("Crop target update dropped; queue full");
        }
    }

    /// Deliver one video frame. Returns `false` when the queue was full
    /// and the frame was dropped.
    pub fn push_video(&self, frame: VideoFrame) -> bool {
        match self.tx.try_send(SessionCommand::Video(frame)) {
            Ok(()) => true,
            Err(_) => {
                self.queue_dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Deliver one audio chunk. Returns `false` when the queue was full
    /// and the chunk was dropped.
    pub fn push_audio(&self, chunk: AudioChunk) -> bool {
        match self.tx.try_send(SessionCommand::Audio(chunk)) {
            Ok(()) => true,
            Err(_) => {
                self.queue_dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Finalize the session and surface any finalize-time error.
    /// Idempotent; safe to call while frames are still arriving.
    pub async fn finish(&self) -> ZoomcastResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .tx
            .send(SessionCommand::Finish(reply_tx))
            .await
            .is_err()
        {
            // Worker already gone; the session was finalized on drain.
            return Ok(());
        }
        reply_rx.await.unwrap_or(Ok(()))
    }

    /// Snapshot of the session counters. `None` once the worker exited.
    pub async fn stats(&self) -> Option<SessionStats> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .tx
            .send(SessionCommand::Stats(reply_tx))
            .await
            .is_err()
        {
            return None;
        }
        reply_rx.await.ok()
    }

    /// Buffers dropped because the command queue itself was full.
    pub fn queue_dropped(&self) -> u64 {
        self.queue_dropped.load(Ordering::Relaxed)
    }
}
