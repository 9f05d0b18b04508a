//! Zoomcast Media Sink
//!
//! Wraps the encoder/muxer behind a narrow [`MediaSink`] interface so the
//! core pipeline (transition engine, transform stage, session control) is
//! fully testable without a real encoder.
//!
//! The bundled [`GstMediaSink`] feeds processed video and raw audio into
//! a GStreamer pipeline (`appsrc` pair → `x264enc`/`avenc_aac` → `mp4mux`
//! → `filesink`) under readiness-gated backpressure: when an input queue
//! is full the buffer is dropped, never blocked on. Dropping frames
//! preserves pacing over completeness.

pub mod gst_sink;
pub mod sink;

pub use gst_sink::GstMediaSink;
pub use sink::{MediaSink, SinkState, SinkStats};
