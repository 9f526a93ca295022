mod loopback;

pub use loopback::LoopbackSink;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;

use crate::frame::FrameBuffer;

/// Trait for downstream transports consuming composited frames.
pub trait OutputSink {
    /// Write a frame to the output.
    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<()>;

    /// Expected output resolution.
    fn resolution(&self) -> (u32, u32);
}

struct Surface {
    frame: Mutex<FrameBuffer>,
    presented: AtomicU64,
}

/// The compositor's destination surface.
///
/// Allocated once per pipeline and reused for every tick; presenting copies
/// into the existing buffer rather than reallocating.
pub struct OutputSurface {
    shared: Arc<Surface>,
    width: u32,
    height: u32,
    frame_rate: u32,
}

impl OutputSurface {
    pub fn new(width: u32, height: u32, frame_rate: u32) -> Self {
        Self {
            shared: Arc::new(Surface {
                frame: Mutex::new(FrameBuffer::black(width, height)),
                presented: AtomicU64::new(0),
            }),
            width,
            height,
            frame_rate,
        }
    }

    /// Copy a composited frame onto the surface.
    ///
    /// Panics if the frame's dimensions differ from the surface's.
    pub fn present(&self, frame: &FrameBuffer) {
        let mut current = self
            .shared
            .frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        current.copy_from(frame);
        self.shared.presented.fetch_add(1, Ordering::Release);
    }

    /// Zero every channel of the surface: the warm-up fallback. Never a
    /// pass-through of the camera frame.
    pub fn present_blank(&self) {
        self.shared
            .frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fill_black();
        self.shared.presented.fetch_add(1, Ordering::Release);
    }

    /// A live handle for downstream consumption.
    pub fn stream(&self) -> OutputStream {
        OutputStream {
            shared: Arc::clone(&self.shared),
            width: self.width,
            height: self.height,
            frame_rate: self.frame_rate,
        }
    }
}

/// Cloneable live handle onto the output surface, carrying the negotiated
/// geometry and the input stream's frame rate.
#[derive(Clone)]
pub struct OutputStream {
    shared: Arc<Surface>,
    width: u32,
    height: u32,
    frame_rate: u32,
}

impl OutputStream {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// Copy of the most recently presented frame.
    pub fn snapshot(&self) -> FrameBuffer {
        self.shared
            .frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Monotonic count of frames presented to the surface.
    pub fn frames_presented(&self) -> u64 {
        self.shared.presented.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_starts_black() {
        let surface = OutputSurface::new(4, 4, 30);
        let stream = surface.stream();
        assert!(stream.snapshot().is_all_black());
        assert_eq!(stream.frames_presented(), 0);
    }

    #[test]
    fn present_updates_all_handles() {
        let surface = OutputSurface::new(2, 2, 30);
        let stream = surface.stream();
        let other = stream.clone();

        surface.present(&FrameBuffer::solid(2, 2, [5, 6, 7, 8]));

        assert_eq!(stream.frames_presented(), 1);
        assert_eq!(&other.snapshot().data()[..4], &[5, 6, 7, 8]);
    }

    #[test]
    fn present_blank_zeroes_the_surface() {
        let surface = OutputSurface::new(2, 2, 30);
        surface.present(&FrameBuffer::solid(2, 2, [9, 9, 9, 9]));
        surface.present_blank();

        let stream = surface.stream();
        assert!(stream.snapshot().is_all_black());
        assert_eq!(stream.frames_presented(), 2);
    }

    #[test]
    #[should_panic(expected = "dimensions diverged")]
    fn present_rejects_mismatched_dimensions() {
        let surface = OutputSurface::new(2, 2, 30);
        surface.present(&FrameBuffer::black(3, 3));
    }

    #[test]
    fn stream_reports_geometry() {
        let surface = OutputSurface::new(640, 360, 24);
        let stream = surface.stream();
        assert_eq!(stream.dimensions(), (640, 360));
        assert_eq!(stream.frame_rate(), 24);
    }
}
