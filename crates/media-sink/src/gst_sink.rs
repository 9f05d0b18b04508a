//! GStreamer-backed media sink.
//!
//! Pipeline shape, built from a launch string with two named `appsrc`
//! inputs:
//!
//! ```text
//! appsrc(videosrc) ! videoconvert ! x264enc ! h264parse ! queue ─┐
//!                                                               mp4mux ! filesink
//! appsrc(audiosrc) ! audioconvert ! avenc_aac ! aacparse ! queue ┘
//! ```
//!
//! Readiness is the fill level of each appsrc queue: a full queue means
//! the encoder is behind, and the buffer is dropped rather than queued
//! further or blocked on.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;

use zoomcast_common::clock::PtsAnchor;
use zoomcast_common::error::{ZoomcastError, ZoomcastResult};
use zoomcast_frame_model::{AudioChunk, CodecParams, FrameSize};

use crate::sink::{MediaSink, SinkState, SinkStats};

/// Depth of each appsrc queue. Past this many un-encoded buffers the
/// channel reports "not ready" and pushes are dropped.
const READY_QUEUE_BUFFERS: u64 = 8;

/// How long `finish` waits for the pipeline to drain after EOS.
const FINALIZE_TIMEOUT: Duration = Duration::from_secs(10);

/// Media sink writing H.264 + AAC into an MP4 container via GStreamer.
pub struct GstMediaSink {
    state: SinkState,
    writer: Option<GstWriter>,
    stats: SinkStats,
    anchor: PtsAnchor,
}

struct GstWriter {
    pipeline: gst::Pipeline,
    video_src: gst_app::AppSrc,
    audio_src: gst_app::AppSrc,
}

impl GstMediaSink {
    pub fn new() -> Self {
        Self {
            state: SinkState::Idle,
            writer: None,
            stats: SinkStats::default(),
            anchor: PtsAnchor::new(),
        }
    }
}

impl Default for GstMediaSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaSink for GstMediaSink {
    fn start(
        &mut self,
        destination: &Path,
        output: FrameSize,
        codec: &CodecParams,
    ) -> ZoomcastResult<()> {
        match self.state {
            SinkState::Idle => {}
            SinkState::Writing => {
                return Err(ZoomcastError::session("Sink is already writing"));
            }
            SinkState::Finished => {
                return Err(ZoomcastError::session(
                    "Sink is finished; a sink writes exactly one artifact",
                ));
            }
        }

        if output.is_empty() {
            return Err(ZoomcastError::writer_creation(format!(
                "Unsupported output geometry {}x{}",
                output.width, output.height
            )));
        }

        // The destination is overwritten, never appended to.
        match std::fs::remove_file(destination) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ZoomcastError::writer_creation(format!(
                    "Cannot replace existing file {}: {e}",
                    destination.display()
                )));
            }
        }
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ZoomcastError::writer_creation(format!(
                        "Cannot create output directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        init_gstreamer()?;

        let launch = build_launch(&escape_path(destination), codec);
        let element = gst::parse::launch(&launch).map_err(|e| {
            ZoomcastError::writer_creation(format!("Failed to build writer pipeline: {e}"))
        })?;
        let pipeline = element.dynamic_cast::<gst::Pipeline>().map_err(|_| {
            ZoomcastError::writer_creation("Launch string did not produce a pipeline")
        })?;

        let video_src = appsrc_by_name(&pipeline, "videosrc")?;
        let audio_src = appsrc_by_name(&pipeline, "audiosrc")?;

        let video_caps = gst::Caps::builder("video/x-raw")
            .field("format", "RGBA")
            .field("width", output.width as i32)
            .field("height", output.height as i32)
            .field("framerate", gst::Fraction::new(0, 1))
            .build();
        video_src.set_caps(Some(&video_caps));

        let audio_caps = gst::Caps::builder("audio/x-raw")
            .field("format", "S16LE")
            .field("layout", "interleaved")
            .field("rate", codec.audio_sample_rate as i32)
            .field("channels", codec.audio_channels as i32)
            .build();
        audio_src.set_caps(Some(&audio_caps));

        // Live appsrc inputs don't preroll; the pipeline reaches Playing
        // once the first buffers arrive, so there is nothing to wait for.
        pipeline.set_state(gst::State::Playing).map_err(|e| {
            ZoomcastError::writer_creation(format!("Failed to start writer pipeline: {e:?}"))
        })?;

        tracing::info!(
            destination = %destination.display(),
            width = output.width,
            height = output.height,
            "Media sink started"
        );

        self.writer = Some(GstWriter {
            pipeline,
            video_src,
            audio_src,
        });
        self.anchor = PtsAnchor::new();
        self.stats = SinkStats::default();
        self.state = SinkState::Writing;
        Ok(())
    }

    fn append_video(&mut self, pixels: &[u8], source_pts_ns: u64) -> ZoomcastResult<()> {
        if self.state != SinkState::Writing {
            return Ok(());
        }
        let Some(writer) = self.writer.as_ref() else {
            return Ok(());
        };

        if let Some(message) = poll_pipeline_error(&writer.pipeline) {
            return Err(ZoomcastError::sink(message));
        }

        if !has_queue_room(&writer.video_src) {
            self.stats.video_dropped += 1;
            tracing::trace!(source_pts_ns, "Video channel not ready; frame dropped");
            return Ok(());
        }

        let relative_ns = self.anchor.relative_ns(source_pts_ns);
        let buffer = timestamped_buffer(pixels.to_vec(), relative_ns)?;

        writer
            .video_src
            .push_buffer(buffer)
            .map_err(|e| ZoomcastError::sink(format!("Video push failed: {e:?}")))?;
        self.stats.video_appended += 1;
        Ok(())
    }

    fn append_audio(&mut self, chunk: &AudioChunk) -> ZoomcastResult<()> {
        if self.state != SinkState::Writing {
            return Ok(());
        }
        let Some(writer) = self.writer.as_ref() else {
            return Ok(());
        };

        if let Some(message) = poll_pipeline_error(&writer.pipeline) {
            return Err(ZoomcastError::sink(message));
        }

        // The timeline anchors on the first accepted video frame; audio
        // arriving before it has no place on the output timeline.
        let Some(relative_ns) = self.anchor.peek_relative_ns(chunk.pts_ns) else {
            self.stats.audio_dropped += 1;
            return Ok(());
        };

        if !has_queue_room(&writer.audio_src) {
            self.stats.audio_dropped += 1;
            tracing::trace!(pts_ns = chunk.pts_ns, "Audio channel not ready; chunk dropped");
            return Ok(());
        }

        let buffer = timestamped_buffer(chunk.data.clone(), relative_ns)?;

        writer
            .audio_src
            .push_buffer(buffer)
            .map_err(|e| ZoomcastError::sink(format!("Audio push failed: {e:?}")))?;
        self.stats.audio_appended += 1;
        Ok(())
    }

    fn finish(&mut self) -> ZoomcastResult<()> {
        if self.state != SinkState::Writing {
            return Ok(());
        }
        // The sink is Finished from here on no matter how finalization
        // goes; a failed finalize does not permit a retry.
        self.state = SinkState::Finished;

        let Some(writer) = self.writer.take() else {
            return Ok(());
        };

        // Mark both inputs finished so encoders and the muxer can flush.
        // Without EOS the tail of the recording would be truncated.
        if writer.video_src.end_of_stream().is_err() {
            tracing::warn!("Failed to send video EOS; output may be truncated");
        }
        if writer.audio_src.end_of_stream().is_err() {
            tracing::warn!("Failed to send audio EOS; output may be truncated");
        }

        let mut finalize_error: Option<String> = None;
        match writer.pipeline.bus() {
            Some(bus) => {
                let timeout = gst::ClockTime::from_nseconds(FINALIZE_TIMEOUT.as_nanos() as u64);
                let mut drained = false;
                for msg in bus.iter_timed(timeout) {
                    match msg.view() {
                        gst::MessageView::Eos(_) => {
                            tracing::debug!("EOS received; writer pipeline drained");
                            drained = true;
                            break;
                        }
                        gst::MessageView::Error(e) => {
                            finalize_error =
                                Some(format!("{} ({:?})", e.error(), e.debug()));
                            break;
                        }
                        _ => {}
                    }
                }
                if !drained && finalize_error.is_none() {
                    finalize_error = Some(format!(
                        "Writer did not drain within {}s",
                        FINALIZE_TIMEOUT.as_secs()
                    ));
                }
            }
            None => {
                finalize_error = Some("Writer pipeline has no bus".to_string());
            }
        }

        if writer.pipeline.set_state(gst::State::Null).is_err() {
            tracing::warn!("Failed to tear down writer pipeline");
        }

        match finalize_error {
            Some(message) => Err(ZoomcastError::finalize(message)),
            None => {
                tracing::info!(
                    frames = self.stats.video_appended,
                    dropped = self.stats.video_dropped,
                    "Media sink finalized"
                );
                Ok(())
            }
        }
    }

    fn state(&self) -> SinkState {
        self.state
    }

    fn stats(&self) -> SinkStats {
        self.stats
    }
}

impl Drop for GstMediaSink {
    fn drop(&mut self) {
        // Covers error paths where finish() was never called.
        if let Some(writer) = self.writer.take() {
            let _ = writer.pipeline.set_state(gst::State::Null);
        }
    }
}

fn build_launch(escaped_path: &str, codec: &CodecParams) -> String {
    // `key-int-max` = fps * 2 seconds: one keyframe every 2 seconds allows
    // reasonable seeking while keeping file size low.
    let keyint = codec.fps.saturating_mul(2).max(2);
    let bitrate = codec.video_bitrate_kbps;
    let audio_bitrate = codec.audio_bitrate_bps;
    format!(
        "appsrc name=videosrc is-live=true format=time block=false max-buffers={READY_QUEUE_BUFFERS} ! videoconvert ! x264enc tune=zerolatency speed-preset=veryfast bitrate={bitrate} key-int-max={keyint} ! h264parse ! queue max-size-buffers=8 ! mp4mux name=mux faststart=true ! filesink location=\"{escaped_path}\" appsrc name=audiosrc is-live=true format=time block=false max-buffers={READY_QUEUE_BUFFERS} ! audioconvert ! avenc_aac bitrate={audio_bitrate} ! aacparse ! queue max-size-buffers=8 ! mux."
    )
}

fn appsrc_by_name(pipeline: &gst::Pipeline, name: &str) -> ZoomcastResult<gst_app::AppSrc> {
    pipeline
        .by_name(name)
        .ok_or_else(|| {
            ZoomcastError::writer_creation(format!("Pipeline has no element named {name}"))
        })?
        .dynamic_cast::<gst_app::AppSrc>()
        .map_err(|_| ZoomcastError::writer_creation(format!("Element {name} is not an appsrc")))
}

/// Readiness check for one input channel: room left in the appsrc queue.
fn has_queue_room(src: &gst_app::AppSrc) -> bool {
    let max = src.max_buffers();
    max == 0 || src.current_level_buffers() < max
}

fn timestamped_buffer(data: Vec<u8>, pts_ns: u64) -> ZoomcastResult<gst::Buffer> {
    let mut buffer = gst::Buffer::from_mut_slice(data);
    {
        let buffer = buffer
            .get_mut()
            .ok_or_else(|| ZoomcastError::sink("Freshly created buffer is not writable"))?;
        buffer.set_pts(gst::ClockTime::from_nseconds(pts_ns));
    }
    Ok(buffer)
}

/// Drain pending error messages off the pipeline bus, non-blocking.
fn poll_pipeline_error(pipeline: &gst::Pipeline) -> Option<String> {
    let bus = pipeline.bus()?;
    bus.pop_filtered(&[gst::MessageType::Error])
        .and_then(|msg| match msg.view() {
            gst::MessageView::Error(e) => Some(format!("{} ({:?})", e.error(), e.debug())),
            _ => None,
        })
}

fn init_gstreamer() -> ZoomcastResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string()));
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(ZoomcastError::writer_creation(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

fn escape_path(path: &Path) -> String {
    path.to_string_lossy().replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_string_wires_both_channels_into_one_muxer() {
        let launch = build_launch("/tmp/out.mp4", &CodecParams::default());
        assert!(launch.contains("appsrc name=videosrc"));
        assert!(launch.contains("appsrc name=audiosrc"));
        assert!(launch.contains("x264enc tune=zerolatency"));
        assert!(launch.contains("avenc_aac"));
        assert!(launch.contains("mp4mux name=mux"));
        assert!(launch.contains("location=\"/tmp/out.mp4\""));
        assert!(launch.ends_with("mux."));
    }

    #[test]
    fn test_launch_string_keyframe_interval_tracks_fps() {
        let codec = CodecParams {
            fps: 30,
            ..Default::default()
        };
        let launch = build_launch("/tmp/out.mp4", &codec);
        assert!(launch.contains("key-int-max=60"));
    }

    #[test]
    fn test_appends_before_start_are_no_ops() {
        let mut sink = GstMediaSink::new();
        assert!(sink.append_video(&[0u8; 16], 0).is_ok());
        assert!(sink
            .append_audio(&AudioChunk::new(vec![0u8; 4], 0))
            .is_ok());
        assert_eq!(sink.stats().video_appended, 0);
        assert_eq!(sink.state(), SinkState::Idle);
    }

    #[test]
    fn test_finish_before_start_is_no_op() {
        let mut sink = GstMediaSink::new();
        assert!(sink.finish().is_ok());
        assert!(sink.finish().is_ok());
        assert_eq!(sink.state(), SinkState::Idle);
    }
}
