//! Zoomcast Frame Model
//!
//! Defines the core data contracts for the recording pipeline:
//! - **Regions:** Crop rectangles in source-pixel space and frame geometry
//! - **Frames:** Transient video/audio buffers handed through the pipeline
//! - **Codec parameters:** Encoder/muxer settings fixed at session start
//!
//! Crop rectangles live in source-pixel coordinates with a top-left
//! origin; the render surface underneath the transform stage uses a
//! bottom-left origin, so `CropRect` also carries the vertical-flip
//! conversion between the two.

pub mod frame;
pub mod region;

pub use frame::*;
pub use region::*;
