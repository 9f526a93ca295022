mod webcam;

pub use webcam::WebcamSource;

use anyhow::Result;

use crate::frame::FrameBuffer;
use crate::geometry::StreamGeometry;

/// Kind of media a track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Where a video track's content originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSource {
    Camera,
    Screen,
}

/// Descriptor of an input track, used for the eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackInfo {
    pub kind: TrackKind,
    /// `None` for audio tracks.
    pub source: Option<VideoSource>,
    pub live: bool,
}

/// Trait for live input surfaces the effect can snapshot.
pub trait FrameSource: Send {
    /// Native geometry of the underlying stream.
    fn geometry(&self) -> StreamGeometry;

    /// Descriptor of the track backing this source.
    fn track(&self) -> TrackInfo;

    /// Snapshot the current frame, resampled to exactly the requested
    /// dimensions.
    ///
    /// The returned buffer's declared dimensions are the requested ones; the
    /// resample and the dimension bookkeeping are one step.
    fn capture(&mut self, width: u32, height: u32) -> Result<FrameBuffer>;
}
