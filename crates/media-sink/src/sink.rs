//! The media sink interface and its observable state.

use std::path::Path;

use zoomcast_common::error::ZoomcastResult;
use zoomcast_frame_model::{AudioChunk, CodecParams, FrameSize};

/// Lifecycle state of a sink.
///
/// `start` moves `Idle → Writing`; `finish` moves `Writing → Finished`.
/// There is no way back: a sink writes exactly one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// Created but not started.
    Idle,
    /// Accepting media buffers.
    Writing,
    /// Finalized (successfully or not); all inputs are no-ops.
    Finished,
}

/// Read-only sink counters for observability. Not part of the
/// correctness contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinkStats {
    /// Video frames accepted and stamped onto the output timeline.
    pub video_appended: u64,

    /// Video frames dropped because the video channel was not ready.
    pub video_dropped: u64,

    /// Audio chunks accepted.
    pub audio_appended: u64,

    /// Audio chunks dropped (channel not ready, or no anchor yet).
    pub audio_dropped: u64,
}

impl SinkStats {
    /// Video drop rate as a percentage.
    pub fn video_drop_rate(&self) -> f64 {
        let total = self.video_appended + self.video_dropped;
        if total == 0 {
            return 0.0;
        }
        self.video_dropped as f64 / total as f64 * 100.0
    }
}

/// A writer for exactly one recording artifact.
///
/// Implementations wrap a platform encoder/muxer. The contract mirrors
/// the session lifecycle:
/// - `start` opens the destination (overwriting any existing file) and
///   fails with `WriterCreation` if it cannot; starting while `Writing`
///   is a caller error, never a silent restart.
/// - `append_video`/`append_audio` are only meaningful while `Writing`;
///   in any other state, and whenever the channel is not ready for more
///   data, they are silent no-ops (the drop counters advance).
/// - Output timestamps are relative to the first accepted video frame,
///   so the artifact's timeline starts at zero.
/// - `finish` finalizes the container, surfaces any finalize-time error,
///   and is idempotent: calling it when not writing is a no-op.
pub trait MediaSink: Send {
    fn start(
        &mut self,
        destination: &Path,
        output: FrameSize,
        codec: &CodecParams,
    ) -> ZoomcastResult<()>;

    /// Append one processed RGBA frame of the output geometry.
    ///
    /// Returns `Err` only on a fatal sink failure; a not-ready channel
    /// drops the frame silently.
    fn append_video(&mut self, pixels: &[u8], source_pts_ns: u64) -> ZoomcastResult<()>;

    /// Append one raw audio chunk. Same drop policy as video, on an
    /// independent readiness channel.
    fn append_audio(&mut self, chunk: &AudioChunk) -> ZoomcastResult<()>;

    fn finish(&mut self) -> ZoomcastResult<()>;

    fn state(&self) -> SinkState;

    fn stats(&self) -> SinkStats;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_rate() {
        let stats = SinkStats {
            video_appended: 90,
            video_dropped: 10,
            ..Default::default()
        };
        assert!((stats.video_drop_rate() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_drop_rate_with_no_frames() {
        assert_eq!(SinkStats::default().video_drop_rate(), 0.0);
    }
}
