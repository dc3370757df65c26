//! Raw frame payloads.

use bytes::Bytes;

use crate::{CHANNELS, FrameError, Quality};

/// One decoded video frame: a raw RGB24 pixel buffer plus the quality it
/// belongs to.
///
/// The payload is a [`Bytes`] handle, so cloning a frame to hand it to
/// multiple capability workers shares the underlying buffer instead of
/// copying pixels.
#[derive(Debug, Clone)]
pub struct Frame {
    quality: Quality,
    data: Bytes,
}

impl Frame {
    /// Build a frame from raw RGB24 bytes, validating the byte length
    /// against the quality's dimensions.
    pub fn from_raw(quality: Quality, data: Bytes) -> Result<Self, FrameError> {
        let expected = quality.frame_len();
        if data.len() != expected {
            return Err(FrameError::SizeMismatch {
                quality,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { quality, data })
    }

    #[inline]
    pub fn quality(&self) -> Quality {
        self.quality
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.quality.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.quality.height()
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Bytes {
        self.data
    }

    /// Per-channel mean over the whole frame, in RGB order.
    pub fn avg_color(&self) -> [f64; 3] {
        let mut sums = [0.0f64; 3];
        for px in self.data.chunks_exact(CHANNELS) {
            sums[0] += px[0] as f64;
            sums[1] += px[1] as f64;
            sums[2] += px[2] as f64;
        }
        let pixels = (self.data.len() / CHANNELS) as f64;
        sums.map(|s| s / pixels)
    }

    /// Mean luma over the whole frame (BT.601 weights).
    pub fn brightness(&self) -> f64 {
        let mut sum = 0.0f64;
        for px in self.data.chunks_exact(CHANNELS) {
            sum += 0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64;
        }
        sum / (self.data.len() / CHANNELS) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(quality: Quality, rgb: [u8; 3]) -> Frame {
        let data: Vec<u8> = rgb
            .iter()
            .copied()
            .cycle()
            .take(quality.frame_len())
            .collect();
        Frame::from_raw(quality, Bytes::from(data)).unwrap()
    }

    #[test]
    fn test_from_raw_validates_length() {
        let q = Quality::new(4, 4);
        let err = Frame::from_raw(q, Bytes::from(vec![0u8; 10])).unwrap_err();
        match err {
            FrameError::SizeMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, 48);
                assert_eq!(actual, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_avg_color_solid() {
        let frame = solid_frame(Quality::new(8, 8), [200, 100, 50]);
        assert_eq!(frame.avg_color(), [200.0, 100.0, 50.0]);
    }

    #[test]
    fn test_brightness_bt601() {
        let frame = solid_frame(Quality::new(8, 8), [255, 0, 0]);
        let expected = 0.299 * 255.0;
        assert!((frame.brightness() - expected).abs() < 1e-9);

        let white = solid_frame(Quality::new(8, 8), [255, 255, 255]);
        assert!((white.brightness() - 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_clone_shares_payload() {
        let frame = solid_frame(Quality::new(4, 4), [1, 2, 3]);
        let copy = frame.clone();
        assert_eq!(frame.data().as_ptr(), copy.data().as_ptr());
    }
}
