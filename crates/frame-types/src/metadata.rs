//! Per-frame metadata records.

use serde::{Deserialize, Serialize};

use crate::{Frame, Quality};

/// The metadata record computed once per frame at dispatch time and
/// persisted as the JSON sidecar of the processed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMetadata {
    /// Owning job id.
    pub job_id: String,
    /// 0-based position within the quality stream.
    pub frame_number: u64,
    /// Quality rendition this frame belongs to.
    pub quality: Quality,
    /// Presentation time in seconds (`frame_number / fps`).
    pub timestamp: f64,
    pub width: u32,
    pub height: u32,
    /// Per-channel mean, RGB order.
    pub avg_color: [f64; 3],
    /// Mean luma.
    pub brightness: f64,
}

impl FrameMetadata {
    /// Compute the record for one frame.
    ///
    /// A non-positive `fps` yields a zero timestamp rather than an error;
    /// the source metadata is caller-supplied and not validated upstream.
    pub fn compute(frame: &Frame, job_id: &str, frame_number: u64, fps: f64) -> Self {
        let timestamp = if fps > 0.0 {
            frame_number as f64 / fps
        } else {
            0.0
        };

        Self {
            job_id: job_id.to_string(),
            frame_number,
            quality: frame.quality(),
            timestamp,
            width: frame.width(),
            height: frame.height(),
            avg_color: frame.avg_color(),
            brightness: frame.brightness(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn frame(quality: Quality) -> Frame {
        Frame::from_raw(quality, Bytes::from(vec![128u8; quality.frame_len()])).unwrap()
    }

    #[test]
    fn test_compute_fields() {
        let q = Quality::new(16, 8);
        let meta = FrameMetadata::compute(&frame(q), "job-1", 12, 30.0);

        assert_eq!(meta.job_id, "job-1");
        assert_eq!(meta.frame_number, 12);
        assert_eq!(meta.quality, q);
        assert_eq!(meta.width, 16);
        assert_eq!(meta.height, 8);
        assert!((meta.timestamp - 0.4).abs() < 1e-9);
        assert_eq!(meta.avg_color, [128.0, 128.0, 128.0]);
        assert!((meta.brightness - 128.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_fps_yields_zero_timestamp() {
        let q = Quality::new(4, 4);
        assert_eq!(FrameMetadata::compute(&frame(q), "j", 5, 0.0).timestamp, 0.0);
        assert_eq!(
            FrameMetadata::compute(&frame(q), "j", 5, -1.0).timestamp,
            0.0
        );
    }

    #[test]
    fn test_sidecar_json_shape() {
        let q = Quality::new(4, 4);
        let meta = FrameMetadata::compute(&frame(q), "j1", 0, 30.0);
        let json = serde_json::to_value(&meta).unwrap();

        assert_eq!(json["job_id"], "j1");
        assert_eq!(json["quality"], "4x4");
        assert_eq!(json["frame_number"], 0);
        assert!(json.get("avg_color").is_some());
        assert!(json.get("brightness").is_some());
    }
}
