//! Recording session state machine.

use std::path::PathBuf;

use zoomcast_common::error::{ZoomcastError, ZoomcastResult};
use zoomcast_frame_model::{AudioChunk, CodecParams, CropRect, FrameSize, VideoFrame};
use zoomcast_media_sink::{MediaSink, SinkStats};
use zoomcast_processing_core::{CropTransition, DEFAULT_TRANSITION_STEPS};
use zoomcast_render_engine::FrameTransform;

/// Configuration for one recording session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Output file path. Overwritten if it exists.
    pub destination: PathBuf,

    /// Fixed output geometry, immutable for the session's lifetime.
    pub output: FrameSize,

    /// Encoder/muxer parameters.
    pub codec: CodecParams,

    /// Number of frames a crop transition takes.
    pub transition_steps: u32,
}

impl SessionConfig {
    pub fn new(destination: impl Into<PathBuf>, output: FrameSize) -> Self {
        Self {
            destination: destination.into(),
            output,
            codec: CodecParams::default(),
            transition_steps: DEFAULT_TRANSITION_STEPS,
        }
    }
}

/// State of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session created but not started.
    Idle,
    /// Frames are being written.
    Writing,
    /// Session finalized; all further calls are no-ops.
    Finished,
}

/// Read-only session counters for observability.
#[derive(Debug, Clone, Copy)]
pub struct SessionStats {
    pub state: SessionState,

    /// Frames that made it through the transform stage to the sink.
    pub frames_processed: u64,

    /// Frames skipped by per-frame failures (bad buffer, pool empty,
    /// mismatched geometry).
    pub frames_skipped: u64,

    /// The sink's own counters (accepted/dropped per channel).
    pub sink: SinkStats,
}

/// One start-to-finish recording producing exactly one output artifact.
///
/// The session is the sole owner of the transition engine, the transform
/// stage, and the sink; all entry points must be called from one
/// execution context ([`crate::SessionController`] provides that queue).
pub struct RecordingSession {
    config: SessionConfig,
    state: SessionState,
    transition: CropTransition,
    transform: Box<dyn FrameTransform>,
    sink: Box<dyn MediaSink>,
    source_size: Option<FrameSize>,
    frames_processed: u64,
    frames_skipped: u64,
}

impl RecordingSession {
    pub fn new(
        config: SessionConfig,
        transform: Box<dyn FrameTransform>,
        sink: Box<dyn MediaSink>,
    ) -> Self {
        let transition = CropTransition::new(config.transition_steps);
        Self {
            config,
            state: SessionState::Idle,
            transition,
            transform,
            sink,
            source_size: None,
            frames_processed: 0,
            frames_skipped: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Open the destination and begin accepting frames.
    ///
    /// Fails with `WriterCreation` when the destination cannot be opened;
    /// the session never enters `Writing` in that case. Starting twice is
    /// a caller error.
    pub fn start(&mut self) -> ZoomcastResult<()> {
        if self.state != SessionState::Idle {
            return Err(ZoomcastError::session("Session already started"));
        }

        self.sink
            .start(&self.config.destination, self.config.output, &self.config.codec)?;
        self.state = SessionState::Writing;

        tracing::info!(
            destination = %self.config.destination.display(),
            width = self.config.output.width,
            height = self.config.output.height,
            "Recording session started"
        );
        Ok(())
    }

    /// Redirect the region of interest (`None` = return to full frame).
    pub fn set_target(&mut self, target: Option<CropRect>) {
        self.transition.set_target(target);
    }

    /// Deliver one video frame.
    ///
    /// No-op outside `Writing`. Per-frame failures skip the frame and
    /// keep the session alive; a fatal sink failure finalizes the
    /// session. Nothing propagates back to the producer.
    pub fn push_video(&mut self, frame: VideoFrame) {
        if self.state != SessionState::Writing {
            return;
        }

        // First frame decides the source geometry for the whole session.
        let source = *self.source_size.get_or_insert_with(|| {
            tracing::info!(
                width = frame.width,
                height = frame.height,
                "Source frame size latched"
            );
            frame.size()
        });
        if frame.size() != source {
            tracing::warn!(
                width = frame.width,
                height = frame.height,
                expected_width = source.width,
                expected_height = source.height,
                "Frame geometry changed mid-session; frame skipped"
            );
            self.frames_skipped += 1;
            return;
        }

        let crop = self.transition.advance(source);

        let output = match self.transform.transform(&frame, crop, self.config.output) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(error = %e, pts_ns = frame.pts_ns, "Frame skipped");
                self.frames_skipped += 1;
                return;
            }
        };

        match self.sink.append_video(output.data(), frame.pts_ns) {
            Ok(()) => self.frames_processed += 1,
            Err(e) => {
                tracing::error!(error = %e, "Fatal sink failure; finalizing session");
                if let Err(finish_err) = self.finish() {
                    tracing::error!(error = %finish_err, "Finalize after sink failure failed");
                }
            }
        }
    }

    /// Deliver one audio chunk. Audio passes to the sink untransformed.
    pub fn push_audio(&mut self, chunk: AudioChunk) {
        if self.state != SessionState::Writing {
            return;
        }

        if let Err(e) = self.sink.append_audio(&chunk) {
            tracing::error!(error = %e, "Fatal sink failure on audio; finalizing session");
            if let Err(finish_err) = self.finish() {
                tracing::error!(error = %finish_err, "Finalize after sink failure failed");
            }
        }
    }

    /// Finalize the output artifact.
    ///
    /// Idempotent: calling before `start`, or again after finishing, is
    /// a no-op. A finalize-time failure is surfaced but the session is
    /// `Finished` either way.
    pub fn finish(&mut self) -> ZoomcastResult<()> {
        if self.state != SessionState::Writing {
            return Ok(());
        }
        self.state = SessionState::Finished;

        let result = self.sink.finish();
        match &result {
            Ok(()) => tracing::info!(
                frames = self.frames_processed,
                skipped = self.frames_skipped,
                "Recording session finished"
            ),
            Err(e) => tracing::error!(error = %e, "Recording session finished with error"),
        }
        result
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            state: self.state,
            frames_processed: self.frames_processed,
            frames_skipped: self.frames_skipped,
            sink: self.sink.stats(),
        }
    }
}
