//! Record a synthetic live source through the full pipeline.
//!
//! Stands in for a real capture collaborator: produces paced video
//! frames with a moving marker, a sine-wave audio track, and a crop
//! controller that follows the marker with a fixed-size window for the
//! middle half of the recording.

use std::f64::consts::TAU;
use std::path::PathBuf;
use std::time::Duration;

use zoomcast_common::clock::RecordingClock;
use zoomcast_frame_model::{AudioChunk, CropRect, FrameSize, VideoFrame};
use zoomcast_media_sink::GstMediaSink;
use zoomcast_record_engine::{RecordingSession, SessionConfig, SessionController};
use zoomcast_render_engine::SoftwareTransform;

/// Synthetic capture geometry, larger than the output so the crop
/// window has room to pan.
const SOURCE: FrameSize = FrameSize {
    width: 1920,
    height: 1080,
};

/// Follow window size, centered on the marker.
const FOLLOW_WINDOW: f64 = 300.0;

const MARKER_SIZE: usize = 48;
const POOL_CAPACITY: usize = 8;
const AUDIO_TONE_HZ: f64 = 440.0;

pub async fn run(
    output: PathBuf,
    width: u32,
    height: u32,
    fps: u32,
    duration: f64,
    bitrate: u32,
    follow: bool,
) -> anyhow::Result<()> {
    println!("Recording synthetic source to: {}", output.display());
    println!("  Output: {width}x{height} @ {fps} fps, {bitrate} kbit/s");
    println!("  Duration: {duration:.1}s, follow: {follow}");
    println!();

    let output_size = FrameSize::new(width, height);
    let mut config = SessionConfig::new(output, output_size);
    config.codec.fps = fps;
    config.codec.video_bitrate_kbps = bitrate;
    let codec = config.codec.clone();

    let transform = SoftwareTransform::with_pool_capacity(POOL_CAPACITY, output_size);
    let mut session =
        RecordingSession::new(config, Box::new(transform), Box::new(GstMediaSink::new()));
    session.start()?;
    let controller = SessionController::spawn(session);

    let clock = RecordingClock::start();
    let total_frames = (duration * fps as f64).ceil() as u64;
    let samples_per_frame = (codec.audio_sample_rate / fps.max(1)) as usize;
    let mut ticker = tokio::time::interval(Duration::from_nanos(1_000_000_000 / fps.max(1) as u64));
    let mut audio_phase = 0.0f64;
    let mut pushed = 0u64;

    for index in 0..total_frames {
        ticker.tick().await;
        let pts_ns = clock.elapsed_ns();
        let progress = index as f64 / total_frames.max(1) as f64;

        let (marker_x, marker_y) = marker_center(progress);
        if controller.push_video(synth_frame(index, marker_x, marker_y, pts_ns)) {
            pushed += 1;
        }
        controller.push_audio(synth_audio(
            samples_per_frame,
            codec.audio_sample_rate,
            codec.audio_channels as usize,
            &mut audio_phase,
            pts_ns,
        ));

        if follow {
            // Zoom onto the marker for the middle half of the recording,
            // then release back to the full frame.
            if (0.25..0.75).contains(&progress) {
                controller.set_target(Some(CropRect::new(
                    marker_x - FOLLOW_WINDOW / 2.0,
                    marker_y - FOLLOW_WINDOW / 2.0,
                    FOLLOW_WINDOW,
                    FOLLOW_WINDOW,
                )));
            } else {
                controller.set_target(None);
            }
        }
    }

    controller.finish().await?;

    println!();
    if let Some(stats) = controller.stats().await {
        println!(
            "Done: {} frames appended, {} dropped at the sink ({:.1}%), {} skipped",
            stats.sink.video_appended,
            stats.sink.video_dropped,
            stats.sink.video_drop_rate(),
            stats.frames_skipped,
        );
        println!(
            "      {} audio chunks appended, {} dropped",
            stats.sink.audio_appended, stats.sink.audio_dropped,
        );
    }
    println!(
        "      {} of {} frames queued ({} lost to a full queue)",
        pushed,
        total_frames,
        controller.queue_dropped(),
    );

    Ok(())
}

/// Marker path: one orbit around the frame center over the recording.
fn marker_center(progress: f64) -> (f64, f64) {
    let cx = SOURCE.width as f64 / 2.0;
    let cy = SOURCE.height as f64 / 2.0;
    let angle = progress * TAU;
    (
        cx + cx * 0.55 * angle.cos(),
        cy + cy * 0.55 * angle.sin(),
    )
}

/// A gradient test pattern with a bright marker square.
fn synth_frame(index: u64, marker_x: f64, marker_y: f64, pts_ns: u64) -> VideoFrame {
    let w = SOURCE.width as usize;
    let h = SOURCE.height as usize;
    let mut data = vec![0u8; SOURCE.rgba_len()];

    let shift = (index % 256) as u8;
    for row in 0..h {
        let g = (row * 255 / h) as u8;
        for col in 0..w {
            let i = (row * w + col) * 4;
            data[i] = (col * 255 / w) as u8;
            data[i + 1] = g;
            data[i + 2] = shift;
            data[i + 3] = 255;
        }
    }

    let mx = (marker_x as usize).min(w - 1);
    let my = (marker_y as usize).min(h - 1);
    let x0 = mx.saturating_sub(MARKER_SIZE / 2);
    let y0 = my.saturating_sub(MARKER_SIZE / 2);
    for row in y0..(y0 + MARKER_SIZE).min(h) {
        for col in x0..(x0 + MARKER_SIZE).min(w) {
            let i = (row * w + col) * 4;
            data[i] = 255;
            data[i + 1] = 255;
            data[i + 2] = 255;
        }
    }

    VideoFrame::new(SOURCE.width, SOURCE.height, data, pts_ns)
}

/// One frame's worth of interleaved S16LE sine tone.
fn synth_audio(
    samples: usize,
    sample_rate: u32,
    channels: usize,
    phase: &mut f64,
    pts_ns: u64,
) -> AudioChunk {
    let step = TAU * AUDIO_TONE_HZ / sample_rate as f64;
    let mut data = Vec::with_capacity(samples * channels * 2);
    for _ in 0..samples {
        let sample = (phase.sin() * 6000.0) as i16;
        *phase = (*phase + step) % TAU;
        for _ in 0..channels {
            data.extend_from_slice(&sample.to_le_bytes());
        }
    }
    AudioChunk::new(data, pts_ns)
}
