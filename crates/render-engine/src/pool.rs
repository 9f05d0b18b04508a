//! Reusable output frame buffer pool.
//!
//! The transform stage draws every output image from a fixed set of
//! pre-allocated buffers sized to the output geometry. Exhaustion is a
//! distinguishable per-frame failure, never a block or an allocation
//! stall on the capture path.

use std::sync::{Arc, Mutex};

use zoomcast_frame_model::FrameSize;

/// Fixed-capacity pool of RGBA output buffers.
#[derive(Debug, Clone)]
pub struct FramePool {
    free: Arc<Mutex<Vec<Vec<u8>>>>,
    frame_size: FrameSize,
    capacity: usize,
}

impl FramePool {
    /// Create a pool holding `capacity` buffers sized for `frame_size`.
    pub fn new(capacity: usize, frame_size: FrameSize) -> Self {
        let len = frame_size.rgba_len();
        let buffers = (0..capacity).map(|_| vec![0u8; len]).collect();
        Self {
            free: Arc::new(Mutex::new(buffers)),
            frame_size,
            capacity,
        }
    }

    /// Take a buffer from the pool. `None` when the pool is exhausted;
    /// the buffer returns on drop of the [`PooledFrame`].
    pub fn acquire(&self) -> Option<PooledFrame> {
        let buffer = self
            .free
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop()?;
        Some(PooledFrame {
            data: Some(buffer),
            free: Arc::clone(&self.free),
            size: self.frame_size,
        })
    }

    /// Geometry every pooled buffer is sized for.
    pub fn frame_size(&self) -> FrameSize {
        self.frame_size
    }

    /// Total number of buffers the pool was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Buffers currently available for acquisition.
    pub fn available(&self) -> usize {
        self.free.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// A pooled output image. The underlying buffer is handed back to the
/// pool when the frame is dropped.
#[derive(Debug)]
pub struct PooledFrame {
    data: Option<Vec<u8>>,
    free: Arc<Mutex<Vec<Vec<u8>>>>,
    size: FrameSize,
}

impl PooledFrame {
    pub fn size(&self) -> FrameSize {
        self.size
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data.as_deref_mut().unwrap_or(&mut [])
    }
}

impl Drop for PooledFrame {
    fn drop(&mut self) {
        if let Some(buffer) = self.data.take() {
            self.free
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_return_on_drop() {
        let pool = FramePool::new(2, FrameSize::new(4, 4));
        assert_eq!(pool.available(), 2);

        let frame = pool.acquire().expect("pool has buffers");
        assert_eq!(frame.data().len(), 64);
        assert_eq!(pool.available(), 1);

        drop(frame);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_exhaustion_returns_none() {
        let pool = FramePool::new(1, FrameSize::new(2, 2));
        let _held = pool.acquire().expect("pool has buffers");
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn test_buffers_are_output_sized() {
        let pool = FramePool::new(1, FrameSize::new(1280, 720));
        let frame = pool.acquire().expect("pool has buffers");
        assert_eq!(frame.size(), FrameSize::new(1280, 720));
        assert_eq!(frame.data().len(), 1280 * 720 * 4);
    }
}
