use std::collections::VecDeque;
use std::path::Path;

use anyhow::{Context, Result};
use image::{imageops, GrayImage, Luma};
use ndarray::{Array4, IxDyn};
use ort::{GraphOptimizationLevel, Session};

use super::{ModelProfile, Segmenter};
use crate::frame::{FrameBuffer, Mask};

/// Person segmentation backed by an ONNX export of the profile's
/// architecture.
///
/// The frame is resampled to the profile's internal resolution, run through
/// the session as a normalized NCHW tensor, and the resulting score map is
/// thresholded into a binary mask and resampled back to frame dimensions.
pub struct OnnxSegmenter {
    session: Session,
    profile: ModelProfile,
}

impl OnnxSegmenter {
    /// Load the session for the profile from `model_dir`.
    pub fn load<P: AsRef<Path>>(model_dir: P, profile: ModelProfile) -> Result<Self> {
        let path = model_dir.as_ref().join(profile.model_file_name());

        tracing::info!("Loading segmentation model from {}", path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        tracing::info!(
            "Model loaded: {:?}, stride {}, internal resolution {:?}",
            profile.architecture,
            profile.output_stride,
            profile.internal_resolution
        );

        Ok(Self { session, profile })
    }

    /// Resample the frame to internal resolution and lay it out as a
    /// normalized `[1, 3, H, W]` tensor.
    fn preprocess(&self, frame: &FrameBuffer) -> Array4<f32> {
        let _span = tracing::debug_span!("preprocess").entered();

        let (width, height) = self
            .profile
            .internal_dimensions(frame.width(), frame.height());
        let resized = imageops::resize(
            &frame.to_rgba8(),
            width,
            height,
            imageops::FilterType::Triangle,
        );

        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
        for y in 0..height {
            for x in 0..width {
                let pixel = resized.get_pixel(x, y);
                tensor[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
                tensor[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
                tensor[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
            }
        }
        tensor
    }
}

impl Segmenter for OnnxSegmenter {
    fn segment(&mut self, frame: &FrameBuffer) -> Result<Mask> {
        let _span = tracing::debug_span!("segment").entered();

        let input = self.preprocess(frame);

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![input.view()]?)
            .context("Failed to run inference")?;
        drop(_infer_span);

        // Score map has shape [1, 1, H, W].
        let scores = outputs[0]
            .try_extract_tensor::<f32>()?
            .view()
            .to_owned()
            .into_dimensionality::<IxDyn>()?;
        let shape = scores.shape();
        anyhow::ensure!(
            shape.len() == 4 && shape[0] == 1 && shape[1] == 1,
            "unexpected segmentation output shape {shape:?}"
        );
        let (map_height, map_width) = (shape[2], shape[3]);
        let flat: Vec<f32> = scores.iter().copied().collect();

        // Below the score gate there is no confident person in the frame at
        // all; the whole mask is background.
        let peak = flat.iter().copied().fold(0.0f32, f32::max);
        if peak < self.profile.score_threshold {
            return Ok(Mask::all_background(frame.width(), frame.height()));
        }

        let mut person: Vec<bool> = flat
            .iter()
            .map(|&p| p >= self.profile.segmentation_threshold)
            .collect();
        retain_largest_regions(
            &mut person,
            map_width,
            map_height,
            self.profile.max_detections,
        );

        Ok(resize_mask(
            &person,
            map_width as u32,
            map_height as u32,
            frame.width(),
            frame.height(),
        ))
    }
}

/// Keep only the `keep` largest 4-connected foreground regions, dropping
/// speckle the thresholding let through.
fn retain_largest_regions(person: &mut [bool], width: usize, height: usize, keep: usize) {
    let mut labels = vec![0u32; person.len()];
    let mut sizes: Vec<usize> = vec![0];
    let mut next_label = 1u32;
    let mut queue = VecDeque::new();

    for start in 0..person.len() {
        if !person[start] || labels[start] != 0 {
            continue;
        }
        let label = next_label;
        next_label += 1;
        sizes.push(0);
        labels[start] = label;
        queue.push_back(start);

        while let Some(idx) = queue.pop_front() {
            sizes[label as usize] += 1;
            let x = idx % width;
            let y = idx / width;
            let mut visit = |n: usize| {
                if person[n] && labels[n] == 0 {
                    labels[n] = label;
                    queue.push_back(n);
                }
            };
            if x > 0 {
                visit(idx - 1);
            }
            if x + 1 < width {
                visit(idx + 1);
            }
            if y > 0 {
                visit(idx - width);
            }
            if y + 1 < height {
                visit(idx + width);
            }
        }
    }

    let regions = (next_label - 1) as usize;
    if regions <= keep {
        return;
    }

    let mut order: Vec<u32> = (1..next_label).collect();
    order.sort_by_key(|&label| std::cmp::Reverse(sizes[label as usize]));
    order.truncate(keep);

    for (flag, &label) in person.iter_mut().zip(labels.iter()) {
        if *flag && !order.contains(&label) {
            *flag = false;
        }
    }
}

/// Nearest-neighbour resample of a binary mask back to frame dimensions.
fn resize_mask(person: &[bool], from_w: u32, from_h: u32, to_w: u32, to_h: u32) -> Mask {
    if (from_w, from_h) == (to_w, to_h) {
        return Mask::new(to_w, to_h, person.to_vec());
    }

    let gray = GrayImage::from_fn(from_w, from_h, |x, y| {
        let idx = (y * from_w + x) as usize;
        Luma([if person[idx] { 255 } else { 0 }])
    });
    let resized = imageops::resize(&gray, to_w, to_h, imageops::FilterType::Nearest);

    Mask::new(to_w, to_h, resized.pixels().map(|p| p[0] >= 128).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retains_only_the_largest_region() {
        // Two regions: a 2x2 block and a lone pixel.
        let mut person = vec![false; 5 * 4];
        for idx in [0, 1, 5, 6] {
            person[idx] = true;
        }
        person[18] = true;

        retain_largest_regions(&mut person, 5, 4, 1);

        assert!(person[0] && person[1] && person[5] && person[6]);
        assert!(!person[18]);
    }

    #[test]
    fn keeps_everything_when_under_the_cap() {
        let mut person = vec![false; 4 * 4];
        person[0] = true;
        person[15] = true;
        let before = person.clone();

        retain_largest_regions(&mut person, 4, 4, 2);

        assert_eq!(person, before);
    }

    #[test]
    fn resize_preserves_halves() {
        // Left half person at 4x2, resampled up to 8x4.
        let person = vec![
            true, true, false, false, //
            true, true, false, false,
        ];
        let mask = resize_mask(&person, 4, 2, 8, 4);
        assert_eq!(mask.dimensions(), (8, 4));
        let data = mask.data();
        for y in 0..4 {
            for x in 0..8 {
                assert_eq!(data[y * 8 + x], x < 4, "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn resize_noop_at_equal_dimensions() {
        let person = vec![true, false, false, true];
        let mask = resize_mask(&person, 2, 2, 2, 2);
        assert_eq!(mask.data(), &[true, false, false, true]);
    }
}
