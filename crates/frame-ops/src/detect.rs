//! Face detection.

use frame_types::Frame;
use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One detected face: a label and where it was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub bounds: BoundingBox,
}

/// Detect faces in a frame.
///
/// The built-in detector is a stand-in for an external model and reports no
/// faces; it exists so the recognize_faces capability exercises the full
/// dispatch, timeout and persistence path with real frame data.
pub fn detect_faces(_frame: &Frame) -> Vec<Detection> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use frame_types::Quality;

    #[test]
    fn test_builtin_detector_reports_no_faces() {
        let q = Quality::new(8, 8);
        let frame = Frame::from_raw(q, Bytes::from(vec![10u8; q.frame_len()])).unwrap();
        assert!(detect_faces(&frame).is_empty());
    }

    #[test]
    fn test_detection_serialization() {
        let detection = Detection {
            label: "face_0".to_string(),
            bounds: BoundingBox {
                x: 4,
                y: 8,
                width: 32,
                height: 32,
            },
        };

        let json = serde_json::to_value(&detection).unwrap();
        assert_eq!(json["label"], "face_0");
        assert_eq!(json["bounds"]["width"], 32);
    }
}
