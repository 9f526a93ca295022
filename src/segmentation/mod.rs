mod adapter;
mod onnx;
mod profile;

pub use adapter::{Classify, Completion, SegmentationAdapter};
pub use onnx::OnnxSegmenter;
pub use profile::{Architecture, ModelProfile, Quality};

use anyhow::Result;

use crate::frame::{FrameBuffer, Mask};

/// Opaque person-segmentation capability.
///
/// The pipeline never trains or inspects a model; it only consumes
/// per-pixel classifications through this seam.
pub trait Segmenter: Send {
    /// Classify a frame into per-pixel person/not-person.
    ///
    /// The returned mask's dimensions equal the frame's.
    fn segment(&mut self, frame: &FrameBuffer) -> Result<Mask>;
}

/// Constructor for the segmenter, run on the adapter's worker thread so
/// model loading never blocks the caller.
pub type SegmenterFactory =
    Box<dyn FnOnce(&ModelProfile) -> Result<Box<dyn Segmenter>> + Send>;
