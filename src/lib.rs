//! Real-time virtual background replacement for live camera streams.
//!
//! A pipeline instance snapshots a live camera source on a fixed-period tick,
//! classifies each snapshot into person/background pixels through a pluggable
//! segmentation capability, replaces background pixels with a fixed image
//! (black until the model and background are ready), and exposes the result
//! as a live output stream for downstream transports such as a v4l2loopback
//! virtual camera.

pub mod background;
pub mod compositor;
pub mod effect;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod scheduler;
pub mod segmentation;
pub mod sink;
pub mod source;

pub use background::{BackgroundSource, BackgroundStore};
pub use effect::{is_enabled, BackgroundEffect, EffectOptions, PipelineState};
pub use error::EffectError;
pub use frame::{FrameBuffer, Mask};
pub use geometry::{Orientation, StreamGeometry};
pub use segmentation::{ModelProfile, Quality, Segmenter, SegmenterFactory};
pub use sink::{LoopbackSink, OutputSink, OutputStream};
pub use source::{FrameSource, TrackInfo, TrackKind, VideoSource, WebcamSource};
