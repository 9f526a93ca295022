use crate::geometry::{Orientation, StreamGeometry};

/// Model architecture families with different accuracy/cost tradeoffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    MobileNetV1,
    ResNet50,
}

impl Architecture {
    fn file_stem(self) -> &'static str {
        match self {
            Architecture::MobileNetV1 => "mobilenet",
            Architecture::ResNet50 => "resnet50",
        }
    }
}

/// Internal-resolution presets trading inference latency for mask precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Low,
    Medium,
    Full,
}

impl Quality {
    /// Scale factor applied to the classified frame before inference.
    pub fn scale(self) -> f32 {
        match self {
            Quality::Low => 0.25,
            Quality::Medium => 0.5,
            Quality::Full => 1.0,
        }
    }
}

/// Configuration bundle for the segmentation capability.
///
/// Chosen once at effect start from the stream geometry and the declared
/// flags; immutable after selection. Thresholds are fixed per profile and
/// are not hot-swappable mid-stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelProfile {
    pub architecture: Architecture,
    pub output_stride: u32,
    pub multiplier: f32,
    pub quant_bytes: u32,
    pub internal_resolution: Quality,
    /// Probability above which a pixel counts as part of a person.
    pub segmentation_threshold: f32,
    /// Minimum peak confidence for the frame to contain a person at all.
    pub score_threshold: f32,
    /// Largest foreground regions retained in the mask.
    pub max_detections: usize,
}

impl ModelProfile {
    /// Select the profile for a stream.
    ///
    /// Pure: the same geometry, quality, and override always yield the same
    /// profile. Landscape streams get the heavier ResNet50 family with a
    /// stricter segmentation threshold; portrait streams get MobileNetV1
    /// with a finer output stride.
    pub fn select(
        geometry: StreamGeometry,
        quality: Quality,
        orientation_override: Option<Orientation>,
    ) -> Self {
        let orientation = orientation_override.unwrap_or_else(|| geometry.orientation());
        match orientation {
            Orientation::Landscape => Self {
                architecture: Architecture::ResNet50,
                output_stride: 16,
                multiplier: 1.0,
                quant_bytes: 4,
                internal_resolution: quality,
                segmentation_threshold: 0.8,
                score_threshold: 0.2,
                max_detections: 1,
            },
            Orientation::Portrait => Self {
                architecture: Architecture::MobileNetV1,
                output_stride: 8,
                multiplier: 1.0,
                quant_bytes: 4,
                internal_resolution: quality,
                segmentation_threshold: 0.5,
                score_threshold: 0.2,
                max_detections: 1,
            },
        }
    }

    /// File name of the ONNX export matching this profile.
    pub fn model_file_name(&self) -> String {
        format!(
            "{}-stride{}-m{:03}-q{}.onnx",
            self.architecture.file_stem(),
            self.output_stride,
            (self.multiplier * 100.0).round() as u32,
            self.quant_bytes
        )
    }

    /// Inference dimensions for a frame of the given size: the quality scale
    /// applied to the frame, aligned up to the architecture's output stride.
    pub fn internal_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let align = |v: u32| {
            let scaled = ((v as f32 * self.internal_resolution.scale()).round() as u32).max(1);
            scaled.div_ceil(self.output_stride) * self.output_stride
        };
        (align(width), align(height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landscape() -> StreamGeometry {
        StreamGeometry::new(1280, 720, 30)
    }

    fn portrait() -> StreamGeometry {
        StreamGeometry::new(720, 1280, 30)
    }

    #[test]
    fn landscape_selects_resnet() {
        let profile = ModelProfile::select(landscape(), Quality::Medium, None);
        assert_eq!(profile.architecture, Architecture::ResNet50);
        assert_eq!(profile.output_stride, 16);
        assert_eq!(profile.segmentation_threshold, 0.8);
        assert_eq!(profile.max_detections, 1);
    }

    #[test]
    fn portrait_selects_mobilenet() {
        let profile = ModelProfile::select(portrait(), Quality::Medium, None);
        assert_eq!(profile.architecture, Architecture::MobileNetV1);
        assert_eq!(profile.output_stride, 8);
        assert_eq!(profile.segmentation_threshold, 0.5);
    }

    #[test]
    fn explicit_orientation_overrides_geometry() {
        let profile =
            ModelProfile::select(landscape(), Quality::Medium, Some(Orientation::Portrait));
        assert_eq!(profile.architecture, Architecture::MobileNetV1);
    }

    #[test]
    fn selection_is_deterministic() {
        for quality in [Quality::Low, Quality::Medium, Quality::Full] {
            assert_eq!(
                ModelProfile::select(landscape(), quality, None),
                ModelProfile::select(landscape(), quality, None)
            );
        }
    }

    #[test]
    fn quality_sets_internal_resolution() {
        let low = ModelProfile::select(landscape(), Quality::Low, None);
        let full = ModelProfile::select(landscape(), Quality::Full, None);
        let (lw, lh) = low.internal_dimensions(640, 360);
        let (fw, fh) = full.internal_dimensions(640, 360);
        assert!(lw < fw && lh < fh);
        assert_eq!(lw % low.output_stride, 0);
        assert_eq!(lh % low.output_stride, 0);
        assert_eq!((fw, fh), (640, 368));
    }

    #[test]
    fn model_file_name_encodes_variant() {
        let profile = ModelProfile::select(landscape(), Quality::Medium, None);
        assert_eq!(profile.model_file_name(), "resnet50-stride16-m100-q4.onnx");
        let profile = ModelProfile::select(portrait(), Quality::Medium, None);
        assert_eq!(profile.model_file_name(), "mobilenet-stride8-m100-q4.onnx");
    }
}
