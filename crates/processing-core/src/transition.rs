//! Eased crop transitions between regions of interest.
//!
//! The engine owns the transition state: the rectangle the animation
//! started from, the desired target, and a step counter over a fixed
//! budget of frames. The budget is frame-count-based, not wall-clock
//! based; at a steady capture rate the two coincide, and the fixed
//! budget keeps the per-frame value a closed-form function of the step.
//!
//! Because `set_target` latches the rectangle reached so far as the new
//! animation start, rapid re-targeting never snaps back to the original
//! start: the camera path stays continuous no matter how often the
//! controller changes its mind.

use zoomcast_frame_model::{CropRect, FrameSize};

/// Default number of frames a transition takes.
pub const DEFAULT_TRANSITION_STEPS: u32 = 10;

/// Quadratic ease-in-out curve over `[0, 1]`.
///
/// Starts and ends slowly, moves fastest in the middle:
/// `2t^2` below the midpoint, `-1 + (4 - 2t)t` above it.
pub fn ease_in_out_quad(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}

/// Per-frame interpolator between the current crop and a moving target.
///
/// `set_target` may be called at any rate; `advance` must be called
/// exactly once per video frame and returns the rectangle to apply to
/// that frame (`None` = full frame, no crop). Both calls must be
/// serialized by the owner; the session runs them on one queue.
#[derive(Debug)]
pub struct CropTransition {
    /// Rectangle the running transition started from. `None` means the
    /// output is currently the full frame.
    current: Option<CropRect>,
    /// Desired destination. `None` means "return to full frame".
    target: Option<CropRect>,
    /// Frames advanced since the last target change, `0..=total_steps`.
    step: u32,
    total_steps: u32,
    /// Source frame size, latched from the first advanced frame.
    source: Option<FrameSize>,
}

impl CropTransition {
    /// Create an engine that completes a transition in `total_steps` frames.
    pub fn new(total_steps: u32) -> Self {
        Self {
            current: None,
            target: None,
            step: 0,
            total_steps: total_steps.max(1),
            source: None,
        }
    }

    /// Create an engine with the default step budget.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_TRANSITION_STEPS)
    }

    /// Record a new desired crop (`None` = return to full frame).
    ///
    /// A no-op when the target is unchanged, so a controller repeating
    /// itself faster than the frame rate cannot stall the animation.
    /// On a real change the rectangle reached so far becomes the new
    /// animation start and the step counter resets.
    pub fn set_target(&mut self, target: Option<CropRect>) {
        if target == self.target {
            return;
        }
        if let Some(reached) = self.reached() {
            self.current = Some(reached);
        }
        self.target = target;
        self.step = 0;
    }

    /// Produce the rectangle to apply to the next frame.
    ///
    /// `source` is latched on the first call and used as the full-frame
    /// destination from then on.
    pub fn advance(&mut self, source: FrameSize) -> Option<CropRect> {
        let seeded = self.source.is_some();
        let src = *self.source.get_or_insert(source);

        let current = match (self.current, self.target) {
            (None, None) => return None,
            (None, Some(target)) => {
                if !seeded {
                    // Nothing has been rendered yet, so there is nothing
                    // to animate from: snap straight to the target.
                    self.current = Some(target);
                    self.step = self.total_steps;
                    return Some(target);
                }
                // Frames are already flowing un-cropped: zoom in from
                // the full frame.
                let full = CropRect::full_frame(src);
                self.current = Some(full);
                full
            }
            (Some(current), Some(target)) if current == target => return Some(target),
            (Some(current), _) => current,
        };

        let dest = match self.target {
            Some(target) => target,
            None => CropRect::full_frame(src),
        };

        self.step = (self.step + 1).min(self.total_steps);
        if self.step == self.total_steps {
            // Land on the destination exactly, eliminating residual
            // floating error from the eased path.
            self.current = self.target;
            return self.target;
        }

        let t = ease_in_out_quad(self.step as f64 / self.total_steps as f64);
        Some(CropRect::lerp(&current, &dest, t))
    }

    /// The destination currently being animated toward.
    pub fn target(&self) -> Option<CropRect> {
        self.target
    }

    /// Frames advanced since the last target change.
    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    /// The rectangle the animation has reached so far, on the eased
    /// path from `current` toward the destination.
    fn reached(&self) -> Option<CropRect> {
        let current = self.current?;
        let dest = match self.target {
            Some(target) => target,
            None => CropRect::full_frame(self.source?),
        };
        let t = ease_in_out_quad(self.step as f64 / self.total_steps as f64);
        Some(CropRect::lerp(&current, &dest, t))
    }
}

impl Default for CropTransition {
    fn default() -> Self {
        Self::with_defaults()
    }
}
