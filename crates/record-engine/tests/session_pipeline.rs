//! End-to-end session tests against a recording fake sink.

use std::path::Path;
use std::sync::{Arc, Mutex};

use zoomcast_common::clock::PtsAnchor;
use zoomcast_common::error::{ZoomcastError, ZoomcastResult};
use zoomcast_frame_model::{AudioChunk, CodecParams, CropRect, FrameSize, VideoFrame};
use zoomcast_media_sink::{MediaSink, SinkState, SinkStats};
use zoomcast_record_engine::{RecordingSession, SessionConfig, SessionController, SessionState};
use zoomcast_render_engine::SoftwareTransform;

const SOURCE: FrameSize = FrameSize {
    width: 64,
    height: 36,
};
const OUTPUT: FrameSize = FrameSize {
    width: 32,
    height: 18,
};

#[derive(Debug)]
struct FakeSinkInner {
    state: SinkState,
    ready_video: bool,
    ready_audio: bool,
    fail_start: bool,
    video_pts: Vec<u64>,
    audio_pts: Vec<u64>,
    last_video: Option<Vec<u8>>,
    stats: SinkStats,
    anchor: PtsAnchor,
    start_calls: u32,
    finalize_calls: u32,
}

/// In-memory sink that records every call, for driving the session
/// without an encoder.
#[derive(Clone)]
struct FakeSink {
    inner: Arc<Mutex<FakeSinkInner>>,
}

impl FakeSink {
    fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeSinkInner {
                state: SinkState::Idle,
                ready_video: true,
                ready_audio: true,
                fail_start: false,
                video_pts: vec![],
                audio_pts: vec![],
                last_video: None,
                stats: SinkStats::default(),
                anchor: PtsAnchor::new(),
                start_calls: 0,
                finalize_calls: 0,
            })),
        }
    }

    fn failing_start() -> Self {
        let sink = Self::new();
        sink.inner.lock().unwrap().fail_start = true;
        sink
    }

    fn set_ready_video(&self, ready: bool) {
        self.inner.lock().unwrap().ready_video = ready;
    }

    fn inspect<R>(&self, f: impl FnOnce(&FakeSinkInner) -> R) -> R {
        f(&self.inner.lock().unwrap())
    }
}

impl MediaSink for FakeSink {
    fn start(
        &mut self,
        _destination: &Path,
        _output: FrameSize,
        _codec: &CodecParams,
    ) -> ZoomcastResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.start_calls += 1;
        if inner.fail_start {
            return Err(ZoomcastError::writer_creation("Destination not writable"));
        }
        if inner.state != SinkState::Idle {
            return Err(ZoomcastError::session("Sink is already writing"));
        }
        inner.state = SinkState::Writing;
        Ok(())
    }

    fn append_video(&mut self, pixels: &[u8], source_pts_ns: u64) -> ZoomcastResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != SinkState::Writing {
            return Ok(());
        }
        if !inner.ready_video {
            inner.stats.video_dropped += 1;
            return Ok(());
        }
        let relative = inner.anchor.relative_ns(source_pts_ns);
        inner.video_pts.push(relative);
        inner.last_video = Some(pixels.to_vec());
        inner.stats.video_appended += 1;
        Ok(())
    }

    fn append_audio(&mut self, chunk: &AudioChunk) -> ZoomcastResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != SinkState::Writing {
            return Ok(());
        }
        let Some(relative) = inner.anchor.peek_relative_ns(chunk.pts_ns) else {
            inner.stats.audio_dropped += 1;
            return Ok(());
        };
        if !inner.ready_audio {
            inner.stats.audio_dropped += 1;
            return Ok(());
        }
        inner.audio_pts.push(relative);
        inner.stats.audio_appended += 1;
        Ok(())
    }

    fn finish(&mut self) -> ZoomcastResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != SinkState::Writing {
            return Ok(());
        }
        inner.state = SinkState::Finished;
        inner.finalize_calls += 1;
        Ok(())
    }

    fn state(&self) -> SinkState {
        self.inner.lock().unwrap().state
    }

    fn stats(&self) -> SinkStats {
        self.inner.lock().unwrap().stats
    }
}

fn make_session(sink: FakeSink) -> RecordingSession {
    let config = SessionConfig::new("/tmp/zoomcast-test.mp4", OUTPUT);
    let transform = SoftwareTransform::with_pool_capacity(4, OUTPUT);
    RecordingSession::new(config, Box::new(transform), Box::new(sink))
}

fn source_frame(pts_ns: u64) -> VideoFrame {
    VideoFrame::new(
        SOURCE.width,
        SOURCE.height,
        vec![0u8; SOURCE.rgba_len()],
        pts_ns,
    )
}

/// Frame pts as a live capture would deliver them: a non-zero wall
/// origin plus an uneven frame interval.
fn pts_at(index: u64) -> u64 {
    5_000_000_000 + index * 16_666_667
}

#[test]
fn first_accepted_frame_starts_timeline_at_zero() {
    let sink = FakeSink::new();
    let mut session = make_session(sink.clone());
    session.start().expect("session starts");

    for i in 0..10 {
        session.push_video(source_frame(pts_at(i)));
    }

    sink.inspect(|inner| {
        assert_eq!(inner.video_pts.len(), 10);
        assert_eq!(inner.video_pts[0], 0);
        assert!(inner.video_pts.windows(2).all(|w| w[0] <= w[1]));
    });
    assert_eq!(session.stats().frames_processed, 10);
}

#[test]
fn not_ready_sink_drops_frames_without_error() {
    let sink = FakeSink::new();
    let mut session = make_session(sink.clone());
    session.start().expect("session starts");

    sink.set_ready_video(false);
    for i in 0..3 {
        session.push_video(source_frame(pts_at(i)));
    }
    sink.inspect(|inner| {
        assert!(inner.video_pts.is_empty());
        assert_eq!(inner.stats.video_appended, 0);
        assert_eq!(inner.stats.video_dropped, 3);
    });

    // The anchor latches on the first *accepted* frame, so the timeline
    // still starts at zero once the sink recovers.
    sink.set_ready_video(true);
    session.push_video(source_frame(pts_at(3)));
    sink.inspect(|inner| assert_eq!(inner.video_pts, vec![0]));

    // Dropped frames are permanent; the session stays in Writing.
    assert_eq!(session.state(), SessionState::Writing);
}

#[test]
fn finish_is_idempotent_and_safe_before_start() {
    let sink = FakeSink::new();
    let mut session = make_session(sink.clone());

    assert!(session.finish().is_ok());
    assert_eq!(session.state(), SessionState::Idle);

    session.start().expect("session starts");
    assert!(session.finish().is_ok());
    assert!(session.finish().is_ok());
    assert_eq!(session.state(), SessionState::Finished);
    sink.inspect(|inner| assert_eq!(inner.finalize_calls, 1));
}

#[test]
fn double_start_is_rejected() {
    let sink = FakeSink::new();
    let mut session = make_session(sink.clone());
    session.start().expect("first start succeeds");

    let err = session.start().unwrap_err();
    assert!(matches!(err, ZoomcastError::Session { .. }));
    assert_eq!(session.state(), SessionState::Writing);
    // The session rejects before the sink ever sees a second start.
    sink.inspect(|inner| assert_eq!(inner.start_calls, 1));
}

#[test]
fn writer_creation_failure_keeps_session_idle() {
    let sink = FakeSink::failing_start();
    let mut session = make_session(sink.clone());

    let err = session.start().unwrap_err();
    assert!(matches!(err, ZoomcastError::WriterCreation { .. }));
    assert_eq!(session.state(), SessionState::Idle);

    // Frames delivered anyway are no-ops, not errors.
    session.push_video(source_frame(pts_at(0)));
    sink.inspect(|inner| assert!(inner.video_pts.is_empty()));
}

#[test]
fn frames_after_finish_are_no_ops() {
    let sink = FakeSink::new();
    let mut session = make_session(sink.clone());
    session.start().expect("session starts");
    session.push_video(source_frame(pts_at(0)));
    session.finish().expect("finish succeeds");

    session.push_video(source_frame(pts_at(1)));
    session.push_audio(AudioChunk::new(vec![0u8; 64], pts_at(1)));
    session.set_target(Some(CropRect::new(0.0, 0.0, 10.0, 10.0)));

    sink.inspect(|inner| {
        assert_eq!(inner.video_pts.len(), 1);
        assert!(inner.audio_pts.is_empty());
    });
}

#[test]
fn audio_before_first_video_frame_is_dropped() {
    let sink = FakeSink::new();
    let mut session = make_session(sink.clone());
    session.start().expect("session starts");

    session.push_audio(AudioChunk::new(vec![0u8; 64], pts_at(0)));
    sink.inspect(|inner| {
        assert!(inner.audio_pts.is_empty());
        assert_eq!(inner.stats.audio_dropped, 1);
    });

    session.push_video(source_frame(pts_at(1)));
    session.push_audio(AudioChunk::new(vec![0u8; 64], pts_at(2)));
    sink.inspect(|inner| {
        assert_eq!(inner.audio_pts, vec![16_666_667]);
    });
}

#[test]
fn exhausted_pool_skips_frames_but_session_continues() {
    let sink = FakeSink::new();
    let config = SessionConfig::new("/tmp/zoomcast-test.mp4", OUTPUT);
    let transform = SoftwareTransform::with_pool_capacity(0, OUTPUT);
    let mut session = RecordingSession::new(config, Box::new(transform), Box::new(sink.clone()));
    session.start().expect("session starts");

    for i in 0..5 {
        session.push_video(source_frame(pts_at(i)));
    }

    assert_eq!(session.state(), SessionState::Writing);
    assert_eq!(session.stats().frames_skipped, 5);
    sink.inspect(|inner| assert!(inner.video_pts.is_empty()));
    assert!(session.finish().is_ok());
}

#[test]
fn geometry_change_mid_session_skips_the_frame() {
    let sink = FakeSink::new();
    let mut session = make_session(sink.clone());
    session.start().expect("session starts");

    session.push_video(source_frame(pts_at(0)));
    session.push_video(VideoFrame::new(32, 32, vec![0u8; 32 * 32 * 4], pts_at(1)));
    session.push_video(source_frame(pts_at(2)));

    assert_eq!(session.stats().frames_skipped, 1);
    sink.inspect(|inner| assert_eq!(inner.video_pts.len(), 2));
}

#[test]
fn target_set_before_first_frame_crops_immediately() {
    // 4x4 source where each pixel's R/G channels encode row/column.
    let mut data = vec![0u8; 4 * 4 * 4];
    for row in 0..4usize {
        for col in 0..4usize {
            let i = (row * 4 + col) * 4;
            data[i] = row as u8;
            data[i + 1] = col as u8;
            data[i + 3] = 255;
        }
    }

    let output = FrameSize::new(2, 2);
    let sink = FakeSink::new();
    let config = SessionConfig::new("/tmp/zoomcast-test.mp4", output);
    let transform = SoftwareTransform::with_pool_capacity(2, output);
    let mut session = RecordingSession::new(config, Box::new(transform), Box::new(sink.clone()));
    session.start().expect("session starts");

    session.set_target(Some(CropRect::new(0.0, 0.0, 2.0, 2.0)));
    session.push_video(VideoFrame::new(4, 4, data, pts_at(0)));

    sink.inspect(|inner| {
        let pixels = inner.last_video.as_ref().expect("frame appended");
        // Top-left quadrant: rows 0-1, cols 0-1.
        assert_eq!((pixels[0], pixels[1]), (0, 0));
        assert_eq!((pixels[4], pixels[5]), (0, 1));
        assert_eq!((pixels[8], pixels[9]), (1, 0));
        assert_eq!((pixels[12], pixels[13]), (1, 1));
    });
}

#[tokio::test]
async fn controller_serializes_delivery_and_finishes() {
    let sink = FakeSink::new();
    let mut session = make_session(sink.clone());
    session.start().expect("session starts");

    let controller = SessionController::spawn(session);

    let target_setter = controller.clone();
    let setter = tokio::spawn(async move {
        target_setter.set_target(Some(CropRect::new(10.0, 10.0, 20.0, 20.0)));
    });

    for i in 0..10 {
        assert!(controller.push_video(source_frame(pts_at(i))));
        controller.push_audio(AudioChunk::new(vec![0u8; 64], pts_at(i)));
    }
    setter.await.expect("setter task completes");

    controller.finish().await.expect("finish succeeds");

    let stats = controller.stats().await.expect("worker still reachable");
    assert_eq!(stats.state, SessionState::Finished);
    assert_eq!(stats.frames_processed, 10);
    sink.inspect(|inner| {
        assert_eq!(inner.finalize_calls, 1);
        assert_eq!(inner.video_pts[0], 0);
    });
    assert_eq!(controller.queue_dropped(), 0);
}

#[tokio::test]
async fn controller_finish_is_idempotent() {
    let sink = FakeSink::new();
    let mut session = make_session(sink.clone());
    session.start().expect("session starts");

    let controller = SessionController::spawn(session);
    controller.finish().await.expect("first finish succeeds");
    controller.finish().await.expect("second finish is a no-op");
    sink.inspect(|inner| assert_eq!(inner.finalize_calls, 1));
}
