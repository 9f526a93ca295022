use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

use super::OutputSink;
use crate::frame::FrameBuffer;

/// Writes composited frames to a v4l2loopback device so ordinary video
/// applications consume them as a camera.
pub struct LoopbackSink {
    file: File,
    width: u32,
    height: u32,
}

impl LoopbackSink {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{})",
            path.display(),
            width,
            height
        );

        let device = Device::with_path(path)
            .with_context(|| format!("Failed to open loopback device at {}", path.display()))?;
        let format = Format::new(width, height, FourCC::new(b"YUYV"));
        Output::set_format(&device, &format).context("Failed to set loopback output format")?;
        drop(device);

        // v4l2loopback accepts raw frames written to the device file.
        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open loopback device at {}", path.display()))?;

        tracing::info!("v4l2loopback device ready");

        Ok(Self {
            file,
            width,
            height,
        })
    }
}

/// Convert an RGBA frame to packed YUV422 (YUYV), the format v4l2loopback
/// consumers expect.
fn rgba_to_yuyv(frame: &FrameBuffer) -> Vec<u8> {
    let (width, height) = frame.dimensions();
    let data = frame.data();
    let mut yuyv = Vec::with_capacity((width * height * 2) as usize);

    let row_bytes = width as usize * 4;
    for y in 0..height as usize {
        let row = &data[y * row_bytes..][..row_bytes];
        for pair in row.chunks(8) {
            let p1 = &pair[..4];
            let p2 = if pair.len() == 8 { &pair[4..8] } else { p1 };

            let (y1, u1, v1) = rgb_to_yuv(p1[0], p1[1], p1[2]);
            let (y2, u2, v2) = rgb_to_yuv(p2[0], p2[1], p2[2]);

            // Average U and V for the pair of pixels.
            let u = ((u1 as u16 + u2 as u16) / 2) as u8;
            let v = ((v1 as u16 + v2 as u16) / 2) as u8;

            yuyv.extend_from_slice(&[y1, u, y2, v]);
        }
    }

    yuyv
}

/// Convert RGB to YUV color space.
fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let r = r as f32;
    let g = g as f32;
    let b = b as f32;

    let y = (0.299 * r + 0.587 * g + 0.114 * b).clamp(0.0, 255.0) as u8;
    let u = ((-0.147 * r - 0.289 * g + 0.436 * b) + 128.0).clamp(0.0, 255.0) as u8;
    let v = ((0.615 * r - 0.515 * g - 0.100 * b) + 128.0).clamp(0.0, 255.0) as u8;

    (y, u, v)
}

impl OutputSink for LoopbackSink {
    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<()> {
        // Transport adaptation only; the pipeline presents at the sink's
        // resolution already.
        let yuyv = if frame.dimensions() != (self.width, self.height) {
            let resized = image::imageops::resize(
                &frame.to_rgba8(),
                self.width,
                self.height,
                image::imageops::FilterType::Triangle,
            );
            rgba_to_yuyv(&FrameBuffer::from_rgba8(resized))
        } else {
            rgba_to_yuyv(frame)
        };

        self.file
            .write_all(&yuyv)
            .context("Failed to write frame to v4l2loopback device")?;

        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yuyv_packs_two_pixels_into_four_bytes() {
        let frame = FrameBuffer::solid(4, 2, [255, 255, 255, 255]);
        let yuyv = rgba_to_yuyv(&frame);
        assert_eq!(yuyv.len(), 4 * 2 * 2);
    }

    #[test]
    fn black_maps_to_zero_luma_neutral_chroma() {
        let (y, u, v) = rgb_to_yuv(0, 0, 0);
        assert_eq!(y, 0);
        assert_eq!(u, 128);
        assert_eq!(v, 128);
    }

    #[test]
    fn white_maps_to_full_luma() {
        let (y, _, _) = rgb_to_yuv(255, 255, 255);
        assert!(y >= 254);
    }

    #[test]
    fn odd_width_duplicates_the_last_pixel() {
        let frame = FrameBuffer::solid(3, 1, [10, 20, 30, 255]);
        let yuyv = rgba_to_yuyv(&frame);
        // Two pairs per row: (p0, p1) and (p2, p2).
        assert_eq!(yuyv.len(), 8);
    }
}
