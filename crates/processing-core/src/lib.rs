//! Zoomcast Processing Core — The Crop Transition Engine
//!
//! Turns a stream of irregular region-of-interest updates into a smooth,
//! per-frame animated crop rectangle:
//! - **Targets** arrive at arbitrary moments (pointer tracker, gestures)
//! - **Advance** is called exactly once per captured video frame and
//!   yields the rectangle to apply to that frame
//!
//! This crate is pure computation — no I/O, no platform dependencies.
//! All inputs are data; all outputs are data.

pub mod transition;

pub use transition::{ease_in_out_quad, CropTransition, DEFAULT_TRANSITION_STEPS};
