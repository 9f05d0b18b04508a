//! Crop, flip, and scale transforms into pooled output buffers.

use zoomcast_common::error::{ZoomcastError, ZoomcastResult};
use zoomcast_frame_model::{CropRect, FrameSize, VideoFrame};

use crate::pool::{FramePool, PooledFrame};

/// Capability interface of the frame transform stage.
///
/// Implementations turn a raw source frame plus the effective crop
/// rectangle into a fixed-size output image. Keeping this a trait lets
/// the session core run against any rendering backend: the bundled
/// software sampler, a GPU compute path, or a hardware scaler.
pub trait FrameTransform: Send {
    /// Transform `frame` into an output image of `output` geometry.
    ///
    /// `crop` of `None` scales the full source frame; `Some` crops the
    /// (clamped) rectangle first. Fails with `ImageBuffer` when the
    /// source buffer is unusable and `BufferPool` when no output buffer
    /// is available. Both are per-frame failures: the caller skips the
    /// frame and continues.
    fn transform(
        &self,
        frame: &VideoFrame,
        crop: Option<CropRect>,
        output: FrameSize,
    ) -> ZoomcastResult<PooledFrame>;
}

/// CPU nearest-neighbor crop/flip/scale backend.
///
/// The render surface underneath the sampler uses a bottom-left origin,
/// so incoming top-left-origin crop rectangles are flipped vertically
/// before cropping. Pixel-center sampling keeps the identity transform
/// (full-frame rectangle, output == source) bit-exact.
pub struct SoftwareTransform {
    pool: FramePool,
}

impl SoftwareTransform {
    pub fn new(pool: FramePool) -> Self {
        Self { pool }
    }

    /// Convenience constructor allocating a pool of `capacity` buffers.
    pub fn with_pool_capacity(capacity: usize, output: FrameSize) -> Self {
        Self::new(FramePool::new(capacity, output))
    }

    pub fn pool(&self) -> &FramePool {
        &self.pool
    }
}

impl FrameTransform for SoftwareTransform {
    fn transform(
        &self,
        frame: &VideoFrame,
        crop: Option<CropRect>,
        output: FrameSize,
    ) -> ZoomcastResult<PooledFrame> {
        if !frame.is_well_formed() {
            return Err(ZoomcastError::image_buffer(format!(
                "Frame buffer of {} bytes does not match geometry {}x{}",
                frame.data.len(),
                frame.width,
                frame.height
            )));
        }
        if output != self.pool.frame_size() {
            return Err(ZoomcastError::image_buffer(format!(
                "Requested output {}x{} but pool is sized for {}x{}",
                output.width,
                output.height,
                self.pool.frame_size().width,
                self.pool.frame_size().height
            )));
        }

        let mut out = self.pool.acquire().ok_or_else(|| {
            ZoomcastError::buffer_pool(format!(
                "All {} output buffers are in flight",
                self.pool.capacity()
            ))
        })?;

        let source = frame.size();
        // The full-frame rectangle is its own vertical flip, so both
        // paths sample through the same surface-space region.
        let region = match crop {
            Some(rect) => rect.clamped_to(source).flipped_vertically(source.height),
            None => CropRect::full_frame(source),
        };

        sample_region(&frame.data, source, &region, out.data_mut(), output);
        Ok(out)
    }
}

/// Nearest-neighbor resample of a surface-space region into `dst`.
///
/// `region` is in bottom-left-origin surface coordinates and must lie
/// within the source bounds. Source and destination buffers are tightly
/// packed RGBA, row 0 at the top; the bottom-left surface rows are
/// mapped back to top-down buffer rows on both sides, so an upright
/// input produces an upright output.
fn sample_region(
    src: &[u8],
    source: FrameSize,
    region: &CropRect,
    dst: &mut [u8],
    output: FrameSize,
) {
    let src_w = source.width as usize;
    let src_h = source.height as usize;
    let out_w = output.width as usize;
    let out_h = output.height as usize;

    // Independent X/Y factors: anisotropic scaling is accepted.
    let scale_x = region.width / output.width as f64;
    let scale_y = region.height / output.height as f64;

    let col_map: Vec<usize> = (0..out_w)
        .map(|col| {
            let sx = region.x + (col as f64 + 0.5) * scale_x;
            (sx.floor().max(0.0) as usize).min(src_w - 1)
        })
        .collect();

    for out_row in 0..out_h {
        // Buffer rows run top-down, surface rows bottom-up.
        let surface_y = (out_h - 1 - out_row) as f64;
        let sy = region.y + (surface_y + 0.5) * scale_y;
        let surface_row = (sy.floor().max(0.0) as usize).min(src_h - 1);
        let src_row = src_h - 1 - surface_row;

        let src_base = src_row * src_w * 4;
        let dst_base = out_row * out_w * 4;
        for (out_col, &src_col) in col_map.iter().enumerate() {
            let si = src_base + src_col * 4;
            let di = dst_base + out_col * 4;
            dst[di..di + 4].copy_from_slice(&src[si..si + 4]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x4 test image where each pixel's R channel encodes its row and
    /// G channel its column.
    fn coordinate_frame() -> VideoFrame {
        let mut data = vec![0u8; 4 * 4 * 4];
        for row in 0..4usize {
            for col in 0..4usize {
                let i = (row * 4 + col) * 4;
                data[i] = row as u8;
                data[i + 1] = col as u8;
                data[i + 3] = 255;
            }
        }
        VideoFrame::new(4, 4, data, 0)
    }

    fn pixel(frame: &PooledFrame, width: usize, row: usize, col: usize) -> (u8, u8) {
        let i = (row * width + col) * 4;
        (frame.data()[i], frame.data()[i + 1])
    }

    #[test]
    fn test_full_frame_same_size_is_identity() {
        let transform = SoftwareTransform::with_pool_capacity(2, FrameSize::new(4, 4));
        let frame = coordinate_frame();

        let no_crop = transform
            .transform(&frame, None, FrameSize::new(4, 4))
            .expect("transform succeeds");
        assert_eq!(no_crop.data(), frame.data.as_slice());

        let full_rect = CropRect::full_frame(frame.size());
        let full_crop = transform
            .transform(&frame, Some(full_rect), FrameSize::new(4, 4))
            .expect("transform succeeds");
        assert_eq!(full_crop.data(), frame.data.as_slice());
    }

    #[test]
    fn test_top_left_quadrant_crop() {
        let transform = SoftwareTransform::with_pool_capacity(1, FrameSize::new(2, 2));
        let frame = coordinate_frame();

        let out = transform
            .transform(
                &frame,
                Some(CropRect::new(0.0, 0.0, 2.0, 2.0)),
                FrameSize::new(2, 2),
            )
            .expect("transform succeeds");

        assert_eq!(pixel(&out, 2, 0, 0), (0, 0));
        assert_eq!(pixel(&out, 2, 0, 1), (0, 1));
        assert_eq!(pixel(&out, 2, 1, 0), (1, 0));
        assert_eq!(pixel(&out, 2, 1, 1), (1, 1));
    }

    #[test]
    fn test_bottom_right_quadrant_crop() {
        let transform = SoftwareTransform::with_pool_capacity(1, FrameSize::new(2, 2));
        let frame = coordinate_frame();

        let out = transform
            .transform(
                &frame,
                Some(CropRect::new(2.0, 2.0, 2.0, 2.0)),
                FrameSize::new(2, 2),
            )
            .expect("transform succeeds");

        assert_eq!(pixel(&out, 2, 0, 0), (2, 2));
        assert_eq!(pixel(&out, 2, 1, 1), (3, 3));
    }

    #[test]
    fn test_upscale_is_anisotropic() {
        let transform = SoftwareTransform::with_pool_capacity(1, FrameSize::new(4, 2));
        let frame = coordinate_frame();

        // 2x2 crop stretched to 4x2: columns double up, rows map 1:1.
        let out = transform
            .transform(
                &frame,
                Some(CropRect::new(0.0, 0.0, 2.0, 2.0)),
                FrameSize::new(4, 2),
            )
            .expect("transform succeeds");

        assert_eq!(pixel(&out, 4, 0, 0), (0, 0));
        assert_eq!(pixel(&out, 4, 0, 1), (0, 0));
        assert_eq!(pixel(&out, 4, 0, 2), (0, 1));
        assert_eq!(pixel(&out, 4, 0, 3), (0, 1));
        assert_eq!(pixel(&out, 4, 1, 0), (1, 0));
    }

    #[test]
    fn test_out_of_bounds_crop_is_clamped_not_fatal() {
        let transform = SoftwareTransform::with_pool_capacity(1, FrameSize::new(2, 2));
        let frame = coordinate_frame();

        let out = transform
            .transform(
                &frame,
                Some(CropRect::new(3.0, -1.0, 5.0, 5.0)),
                FrameSize::new(2, 2),
            )
            .expect("clamped transform succeeds");
        // Clamped to the 1-wide rightmost column starting at row 0.
        assert_eq!(pixel(&out, 2, 0, 0).1, 3);
    }

    #[test]
    fn test_malformed_frame_is_image_buffer_error() {
        let transform = SoftwareTransform::with_pool_capacity(1, FrameSize::new(2, 2));
        let frame = VideoFrame::new(4, 4, vec![0u8; 7], 0);

        let err = transform
            .transform(&frame, None, FrameSize::new(2, 2))
            .unwrap_err();
        assert!(matches!(err, ZoomcastError::ImageBuffer { .. }));
    }

    #[test]
    fn test_pool_exhaustion_is_buffer_pool_error() {
        let transform = SoftwareTransform::with_pool_capacity(1, FrameSize::new(2, 2));
        let frame = coordinate_frame();

        let held = transform
            .transform(&frame, None, FrameSize::new(2, 2))
            .expect("first transform succeeds");

        let err = transform
            .transform(&frame, None, FrameSize::new(2, 2))
            .unwrap_err();
        assert!(matches!(err, ZoomcastError::BufferPool { .. }));

        // Returning the buffer makes the pool usable again.
        drop(held);
        assert!(transform
            .transform(&frame, None, FrameSize::new(2, 2))
            .is_ok());
    }
}
