/// Output dimensions for landscape streams, matching the constrained capture
/// geometry the effect is deployed against.
const LANDSCAPE_OUTPUT_WIDTH: u32 = 640;
const LANDSCAPE_OUTPUT_HEIGHT: u32 = 360;

/// Geometry of the live input stream, captured once at effect start and
/// immutable for the pipeline's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamGeometry {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

/// Orientation class of a stream, derived from its native dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl StreamGeometry {
    pub fn new(width: u32, height: u32, frame_rate: u32) -> Self {
        Self {
            width,
            height,
            frame_rate,
        }
    }

    pub fn orientation(&self) -> Orientation {
        if self.width > self.height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    /// Negotiated output dimensions for this stream.
    ///
    /// Landscape streams render at 640x360. Portrait streams render at half
    /// their native size, rounded down to even so chroma-subsampled sinks
    /// can consume the frames. Capture, background rasterization, and the
    /// output surface all use these dimensions, so every composite sees
    /// equal-sized buffers.
    pub fn output_dimensions(&self) -> (u32, u32) {
        match self.orientation() {
            Orientation::Landscape => (LANDSCAPE_OUTPUT_WIDTH, LANDSCAPE_OUTPUT_HEIGHT),
            Orientation::Portrait => (
                ((self.width / 2) & !1).max(2),
                ((self.height / 2) & !1).max(2),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_streams_are_landscape() {
        assert_eq!(
            StreamGeometry::new(1280, 720, 30).orientation(),
            Orientation::Landscape
        );
    }

    #[test]
    fn tall_and_square_streams_are_portrait() {
        assert_eq!(
            StreamGeometry::new(720, 1280, 30).orientation(),
            Orientation::Portrait
        );
        assert_eq!(
            StreamGeometry::new(480, 480, 30).orientation(),
            Orientation::Portrait
        );
    }

    #[test]
    fn landscape_output_is_fixed() {
        assert_eq!(
            StreamGeometry::new(1280, 720, 30).output_dimensions(),
            (640, 360)
        );
        assert_eq!(
            StreamGeometry::new(1920, 1080, 60).output_dimensions(),
            (640, 360)
        );
    }

    #[test]
    fn portrait_output_halves_and_rounds_even() {
        assert_eq!(
            StreamGeometry::new(1080, 1920, 30).output_dimensions(),
            (540, 960)
        );
        assert_eq!(
            StreamGeometry::new(1081, 1919, 30).output_dimensions(),
            (540, 958)
        );
    }

    #[test]
    fn output_dimensions_are_deterministic() {
        for (w, h) in [(320, 240), (640, 360), (720, 1280), (17, 31), (2, 2)] {
            let a = StreamGeometry::new(w, h, 30).output_dimensions();
            let b = StreamGeometry::new(w, h, 30).output_dimensions();
            assert_eq!(a, b);
            assert!(a.0 >= 2 && a.1 >= 2);
        }
    }
}
