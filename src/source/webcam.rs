use anyhow::{Context, Result};
use image::imageops;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

use super::{FrameSource, TrackInfo, TrackKind, VideoSource};
use crate::frame::FrameBuffer;
use crate::geometry::StreamGeometry;

/// Live webcam source.
pub struct WebcamSource {
    camera: Camera,
    geometry: StreamGeometry,
}

impl WebcamSource {
    pub fn new(device_index: u32) -> Result<Self> {
        tracing::info!("Initializing webcam {}", device_index);

        let index = CameraIndex::Index(device_index);
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let mut camera = Camera::new(index, requested).context("Failed to open camera")?;

        camera
            .open_stream()
            .context("Failed to open camera stream")?;

        let resolution = camera.resolution();
        let geometry = StreamGeometry::new(
            resolution.width(),
            resolution.height(),
            camera.frame_rate(),
        );

        tracing::info!(
            "Webcam initialized at {}x{} @ {} fps",
            geometry.width,
            geometry.height,
            geometry.frame_rate
        );

        Ok(Self { camera, geometry })
    }
}

impl FrameSource for WebcamSource {
    fn geometry(&self) -> StreamGeometry {
        self.geometry
    }

    fn track(&self) -> TrackInfo {
        TrackInfo {
            kind: TrackKind::Video,
            source: Some(VideoSource::Camera),
            live: self.camera.is_stream_open(),
        }
    }

    fn capture(&mut self, width: u32, height: u32) -> Result<FrameBuffer> {
        let frame = self.camera.frame().context("Failed to capture frame")?;

        let decoded = frame
            .decode_image::<RgbFormat>()
            .context("Failed to decode frame")?;

        let resized = imageops::resize(&decoded, width, height, imageops::FilterType::Triangle);

        Ok(FrameBuffer::from_rgb8(&resized))
    }
}
