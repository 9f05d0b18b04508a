//! Transient media buffers and codec parameters.

use serde::{Deserialize, Serialize};

use crate::region::FrameSize;

/// A raw video frame delivered by the capture source.
///
/// Owned by the producer until handed to the pipeline, consumed (copied
/// or transformed) by the transform stage, never retained beyond one
/// call. Pixel data is tightly packed RGBA8888, row 0 at the top.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Presentation timestamp on the producer's clock, nanoseconds.
    pub pts_ns: u64,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>, pts_ns: u64) -> Self {
        Self {
            width,
            height,
            data,
            pts_ns,
        }
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    /// Whether the buffer length matches the stated geometry.
    pub fn is_well_formed(&self) -> bool {
        !self.size().is_empty() && self.data.len() == self.size().rgba_len()
    }
}

/// An audio sample chunk delivered by the capture source.
///
/// Opaque to the pipeline: the payload passes through to the sink
/// untouched. The sample layout is described by [`CodecParams`]
/// (interleaved S16LE at the configured rate and channel count).
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub data: Vec<u8>,
    /// Presentation timestamp on the producer's clock, nanoseconds.
    pub pts_ns: u64,
}

impl AudioChunk {
    pub fn new(data: Vec<u8>, pts_ns: u64) -> Self {
        Self { data, pts_ns }
    }
}

/// Encoder and muxer parameters, fixed for a session's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecParams {
    /// H.264 target bitrate in kbit/s.
    pub video_bitrate_kbps: u32,

    /// Nominal capture rate, used for the encoder keyframe interval.
    pub fps: u32,

    /// Audio sample rate.
    pub audio_sample_rate: u32,

    /// Audio channel count.
    pub audio_channels: u32,

    /// AAC bitrate in bit/s.
    pub audio_bitrate_bps: u32,
}

impl Default for CodecParams {
    fn default() -> Self {
        Self {
            video_bitrate_kbps: 10_000,
            fps: 60,
            audio_sample_rate: 44_100,
            audio_channels: 2,
            audio_bitrate_bps: 128_000,
        }
    }
}
