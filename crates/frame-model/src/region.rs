//! Crop regions and frame geometry.
//!
//! All crop coordinates are in source-pixel space with a top-left origin.

use serde::{Deserialize, Serialize};

/// Bytes per pixel of the RGBA8888 frames the pipeline works in.
pub const BYTES_PER_PIXEL: usize = 4;

/// Pixel dimensions of a frame.
///
/// Used both for the source frame size (latched from the first captured
/// frame) and for the fixed output geometry decided at session creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Byte length of an RGBA8888 buffer of this size.
    pub fn rgba_len(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A rectangular crop region within the source frame.
///
/// Coordinates are source pixels, `(0.0, 0.0)` top-left. A crop region is
/// an immutable value: it is replaced wholesale on update, never mutated
/// in place. "No crop" is expressed as `Option::<CropRect>::None`, not as
/// a sentinel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge (source pixels).
    pub x: f64,
    /// Top edge (source pixels).
    pub y: f64,
    /// Width (source pixels).
    pub width: f64,
    /// Height (source pixels).
    pub height: f64,
}

impl CropRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle covering the entire source frame.
    pub fn full_frame(source: FrameSize) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: source.width as f64,
            height: source.height as f64,
        }
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Linearly interpolate between two rectangles.
    ///
    /// Each of the four scalar fields is interpolated independently; `t`
    /// is clamped to `[0, 1]`, so the result always lies component-wise
    /// within the hull of `a` and `b`.
    pub fn lerp(a: &CropRect, b: &CropRect, t: f64) -> CropRect {
        let t = t.clamp(0.0, 1.0);
        CropRect {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
            width: a.width + (b.width - a.width) * t,
            height: a.height + (b.height - a.height) * t,
        }
    }

    /// Clamp this rectangle into `[0, width) x [0, height)` source bounds.
    ///
    /// The origin is clamped down into the frame, then the extent is
    /// clamped so `origin + extent <= dimension`. Extents never drop
    /// below one pixel. Idempotent: an in-bounds rectangle is returned
    /// unchanged.
    pub fn clamped_to(&self, source: FrameSize) -> CropRect {
        let max_x = (source.width.saturating_sub(1)) as f64;
        let max_y = (source.height.saturating_sub(1)) as f64;

        let x = self.x.clamp(0.0, max_x);
        let y = self.y.clamp(0.0, max_y);
        let width = self.width.min(source.width as f64 - x).max(1.0);
        let height = self.height.min(source.height as f64 - y).max(1.0);

        CropRect {
            x,
            y,
            width,
            height,
        }
    }

    /// Convert between top-left-origin image space and bottom-left-origin
    /// render-surface space.
    ///
    /// `flipped_y = source_height - y - height`. Applying the flip twice
    /// returns the original rectangle.
    pub fn flipped_vertically(&self, source_height: u32) -> CropRect {
        CropRect {
            x: self.x,
            y: source_height as f64 - self.y - self.height,
            width: self.width,
            height: self.height,
        }
    }

    /// Whether every component is within `eps` of the other rectangle's.
    pub fn approx_eq(&self, other: &CropRect, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps
            && (self.y - other.y).abs() <= eps
            && (self.width - other.width).abs() <= eps
            && (self.height - other.height).abs() <= eps
    }
}
