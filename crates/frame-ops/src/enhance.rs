//! Frame enhancement.

use bytes::Bytes;
use frame_types::Frame;

/// Contrast gain applied around the mid-point, in 1/256 units.
const CONTRAST_GAIN: i32 = 289; // ~1.13x

/// Enhance a frame with a mild fixed contrast lift.
///
/// Pixel values are stretched around 128 and saturated to the valid range.
/// Output dimensions always match the input, so rebuilding the frame from
/// the transformed bytes cannot fail.
pub fn enhance(frame: &Frame) -> Frame {
    let out: Vec<u8> = frame
        .data()
        .iter()
        .map(|&v| {
            let stretched = (v as i32 - 128) * CONTRAST_GAIN / 256 + 128;
            stretched.clamp(0, 255) as u8
        })
        .collect();

    Frame::from_raw(frame.quality(), Bytes::from(out))
        .expect("enhance preserves frame dimensions")
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame_types::Quality;

    fn frame_of(quality: Quality, value: u8) -> Frame {
        Frame::from_raw(quality, Bytes::from(vec![value; quality.frame_len()])).unwrap()
    }

    #[test]
    fn test_enhance_preserves_dimensions() {
        let frame = frame_of(Quality::new(6, 4), 90);
        let out = enhance(&frame);
        assert_eq!(out.quality(), frame.quality());
        assert_eq!(out.data().len(), frame.data().len());
    }

    #[test]
    fn test_enhance_stretches_around_midpoint() {
        let q = Quality::new(4, 4);

        // Mid-gray is a fixed point.
        assert_eq!(enhance(&frame_of(q, 128)).data()[0], 128);
        // Dark pixels get darker, bright pixels brighter.
        assert!(enhance(&frame_of(q, 64)).data()[0] < 64);
        assert!(enhance(&frame_of(q, 192)).data()[0] > 192);
    }

    #[test]
    fn test_enhance_saturates() {
        let q = Quality::new(4, 4);
        assert_eq!(enhance(&frame_of(q, 0)).data()[0], 0);
        assert_eq!(enhance(&frame_of(q, 255)).data()[0], 255);
    }
}
