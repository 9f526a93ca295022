use image::{RgbImage, RgbaImage};

/// RGBA pixel rectangle with explicit dimensions.
///
/// Constructors derive the dimensions from the backing allocation, so the
/// declared width and height always match the actual pixel count; a buffer
/// drawn at one size cannot declare another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// An all-black, fully transparent buffer.
    pub fn black(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// A buffer filled with one RGBA value.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..width as usize * height as usize {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Takes ownership of a decoded RGBA image; dimensions come from the
    /// image itself.
    pub fn from_rgba8(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }

    /// Converts a decoded RGB image, filling alpha with 255.
    pub fn from_rgb8(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for pixel in image.pixels() {
            data.extend_from_slice(&[pixel[0], pixel[1], pixel[2], 255]);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero every channel of every pixel in place.
    pub fn fill_black(&mut self) {
        self.data.fill(0);
    }

    /// Copy another buffer's pixels into this one without reallocating.
    ///
    /// Panics if the dimensions differ; callers negotiate one resolution up
    /// front.
    pub fn copy_from(&mut self, other: &FrameBuffer) {
        assert_eq!(
            self.dimensions(),
            other.dimensions(),
            "frame buffer dimensions diverged"
        );
        self.data.copy_from_slice(&other.data);
    }

    /// View as an [`RgbaImage`] for resize and encode interop.
    pub fn to_rgba8(&self) -> RgbaImage {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .expect("buffer length matches dimensions")
    }

    pub fn is_all_black(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }
}

/// Per-pixel person/not-person classification, aligned 1:1 with the frame it
/// was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Mask {
    /// Wrap a row-major classification; `data.len()` must be
    /// `width * height`.
    pub fn new(width: u32, height: u32, data: Vec<bool>) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize,
            "mask length does not match dimensions"
        );
        Self {
            width,
            height,
            data,
        }
    }

    /// A mask classifying every pixel as background.
    pub fn all_background(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Row-major person flags, `true` where a person was detected.
    pub fn data(&self) -> &[bool] {
        &self.data
    }

    pub fn person_pixels(&self) -> usize {
        self.data.iter().filter(|&&p| p).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_couple_dimensions_to_pixel_count() {
        let black = FrameBuffer::black(7, 5);
        assert_eq!(black.dimensions(), (7, 5));
        assert_eq!(black.data().len(), 7 * 5 * 4);

        let rgb = RgbImage::from_pixel(4, 3, image::Rgb([10, 20, 30]));
        let frame = FrameBuffer::from_rgb8(&rgb);
        assert_eq!(frame.dimensions(), (4, 3));
        assert_eq!(frame.data().len(), 4 * 3 * 4);
        assert_eq!(&frame.data()[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn solid_fills_every_pixel() {
        let buffer = FrameBuffer::solid(3, 3, [1, 2, 3, 4]);
        for pixel in buffer.data().chunks_exact(4) {
            assert_eq!(pixel, &[1, 2, 3, 4]);
        }
    }

    #[test]
    fn fill_black_zeroes_all_channels() {
        let mut buffer = FrameBuffer::solid(2, 2, [9, 9, 9, 9]);
        buffer.fill_black();
        assert!(buffer.is_all_black());
    }

    #[test]
    #[should_panic(expected = "dimensions diverged")]
    fn copy_from_rejects_mismatched_dimensions() {
        let mut a = FrameBuffer::black(2, 2);
        let b = FrameBuffer::black(3, 2);
        a.copy_from(&b);
    }

    #[test]
    #[should_panic(expected = "mask length")]
    fn mask_rejects_wrong_length() {
        Mask::new(4, 4, vec![false; 3]);
    }

    #[test]
    fn mask_counts_person_pixels() {
        let mask = Mask::new(2, 2, vec![true, false, true, false]);
        assert_eq!(mask.person_pixels(), 2);
    }
}
