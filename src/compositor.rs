use crate::frame::{FrameBuffer, Mask};

/// Merge a captured frame with the replacement background according to a
/// person mask.
///
/// Where the mask reports not-person, all four channels come from
/// `background`; elsewhere they come from `frame`. Evaluated once per pixel
/// with a hard edge at mask boundaries.
///
/// All three inputs must describe the same pixel grid. A mismatch is a
/// programming error, not a runtime condition: the pipeline negotiates one
/// resolution before anything reaches this function, so the panic is
/// unreachable in a correct caller.
pub fn composite(frame: &FrameBuffer, mask: &Mask, background: &FrameBuffer) -> FrameBuffer {
    assert_eq!(
        frame.dimensions(),
        mask.dimensions(),
        "frame and mask dimensions diverged"
    );
    assert_eq!(
        frame.dimensions(),
        background.dimensions(),
        "frame and background dimensions diverged"
    );

    let mut out = frame.clone();
    let pixels = out.data_mut().chunks_exact_mut(4);
    let replacements = background.data().chunks_exact(4);
    for ((pixel, replacement), &person) in pixels.zip(replacements).zip(mask.data()) {
        if !person {
            pixel.copy_from_slice(replacement);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_routes_pixels_between_frame_and_background() {
        let frame = FrameBuffer::solid(2, 2, [255, 255, 255, 255]);
        let background = FrameBuffer::solid(2, 2, [0, 0, 255, 255]);
        let mask = Mask::new(2, 2, vec![true, false, false, true]);

        let out = composite(&frame, &mask, &background);

        let pixels: Vec<&[u8]> = out.data().chunks_exact(4).collect();
        assert_eq!(pixels[0], &[255, 255, 255, 255]);
        assert_eq!(pixels[1], &[0, 0, 255, 255]);
        assert_eq!(pixels[2], &[0, 0, 255, 255]);
        assert_eq!(pixels[3], &[255, 255, 255, 255]);
    }

    #[test]
    fn all_background_mask_replaces_everything() {
        let frame = FrameBuffer::solid(3, 2, [9, 9, 9, 9]);
        let background = FrameBuffer::solid(3, 2, [1, 2, 3, 4]);
        let mask = Mask::all_background(3, 2);

        let out = composite(&frame, &mask, &background);
        assert_eq!(out, background);
    }

    #[test]
    #[should_panic(expected = "frame and mask dimensions diverged")]
    fn mismatched_mask_is_a_defect() {
        let frame = FrameBuffer::black(2, 2);
        let background = FrameBuffer::black(2, 2);
        let mask = Mask::all_background(3, 3);
        composite(&frame, &mask, &background);
    }

    #[test]
    #[should_panic(expected = "frame and background dimensions diverged")]
    fn mismatched_background_is_a_defect() {
        let frame = FrameBuffer::black(2, 2);
        let background = FrameBuffer::black(4, 2);
        let mask = Mask::all_background(2, 2);
        composite(&frame, &mask, &background);
    }
}
