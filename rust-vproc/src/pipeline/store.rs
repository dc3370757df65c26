//! Processed-frame persistence.
//!
//! Every dispatched frame is written as a PNG artifact plus a JSON metadata
//! sidecar, addressed by job id, quality and frame number. Writes overwrite
//! by path, so re-running persistence for the same frame is idempotent.

use std::io::Cursor;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use frame_ops::Detection;
use frame_types::{Frame, FrameMetadata, Quality};

use super::distributor::FrameResults;
use crate::{Error, Result};

/// Sidecar record: the frame metadata plus the recognition result when that
/// capability produced one.
#[derive(Serialize)]
struct Sidecar<'a> {
    #[serde(flatten)]
    metadata: &'a FrameMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    faces: Option<&'a Vec<Detection>>,
}

/// Writes processed frames and their sidecars under the output root.
pub struct FrameStore {
    output_root: PathBuf,
}

impl FrameStore {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    /// Directory for one job/quality stream.
    pub fn frame_dir(&self, job_id: &str, quality: Quality) -> PathBuf {
        self.output_root
            .join(format!("job_{job_id}"))
            .join(format!("quality_{quality}"))
    }

    /// Paths of the image artifact and metadata sidecar for one frame.
    pub fn artifact_paths(&self, metadata: &FrameMetadata) -> (PathBuf, PathBuf) {
        let dir = self.frame_dir(&metadata.job_id, metadata.quality);
        let n = metadata.frame_number;
        (
            dir.join(format!("frame_{n:06}.png")),
            dir.join(format!("frame_{n:06}_metadata.json")),
        )
    }

    /// Persist one frame's artifacts.
    ///
    /// The enhanced pixels are written when the capability produced them,
    /// the source pixels otherwise — a frame is persisted no matter which
    /// capabilities succeeded.
    pub async fn save(
        &self,
        frame: &Frame,
        metadata: &FrameMetadata,
        results: &FrameResults,
    ) -> Result<()> {
        let (image_path, sidecar_path) = self.artifact_paths(metadata);
        let dir = self.frame_dir(&metadata.job_id, metadata.quality);
        tokio::fs::create_dir_all(&dir).await?;

        let to_encode = results.enhanced.as_ref().unwrap_or(frame).clone();
        let png = tokio::task::spawn_blocking(move || encode_png(&to_encode))
            .await
            .map_err(|e| Error::other(format!("PNG encode task failed: {e}")))??;
        tokio::fs::write(&image_path, png).await?;

        let sidecar = Sidecar {
            metadata,
            faces: results.faces.as_ref(),
        };
        tokio::fs::write(&sidecar_path, serde_json::to_vec(&sidecar)?).await?;

        debug!(
            job_id = %metadata.job_id,
            quality = %metadata.quality,
            frame_number = metadata.frame_number,
            "Persisted processed frame"
        );

        Ok(())
    }
}

fn encode_png(frame: &Frame) -> Result<Vec<u8>> {
    let image = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or_else(|| Error::other("frame buffer does not match its dimensions"))?;

    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, image::ImageFormat::Png)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn frame_and_metadata(value: u8) -> (Frame, FrameMetadata) {
        let quality = Quality::new(8, 4);
        let frame =
            Frame::from_raw(quality, Bytes::from(vec![value; quality.frame_len()])).unwrap();
        let metadata = FrameMetadata::compute(&frame, "j1", 0, 30.0);
        (frame, metadata)
    }

    #[tokio::test]
    async fn test_save_writes_artifact_pair() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FrameStore::new(tmp.path());
        let (frame, metadata) = frame_and_metadata(100);

        store
            .save(&frame, &metadata, &FrameResults::default())
            .await
            .unwrap();

        let (image_path, sidecar_path) = store.artifact_paths(&metadata);
        assert!(image_path.exists());
        assert!(sidecar_path.exists());

        let sidecar: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&sidecar_path).unwrap()).unwrap();
        assert_eq!(sidecar["job_id"], "j1");
        assert_eq!(sidecar["quality"], "8x4");
        assert_eq!(sidecar["frame_number"], 0);
        assert!(sidecar.get("faces").is_none());
    }

    #[tokio::test]
    async fn test_save_prefers_enhanced_pixels() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FrameStore::new(tmp.path());
        let (frame, metadata) = frame_and_metadata(90);

        let results = FrameResults {
            enhanced: Some(frame_ops::enhance(&frame)),
            faces: None,
        };
        store.save(&frame, &metadata, &results).await.unwrap();

        let (image_path, _) = store.artifact_paths(&metadata);
        let decoded = image::open(&image_path).unwrap().to_rgb8();
        assert_eq!(
            decoded.as_raw().as_slice(),
            results.enhanced.as_ref().unwrap().data()
        );
    }

    #[tokio::test]
    async fn test_save_includes_faces_when_present() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FrameStore::new(tmp.path());
        let (frame, metadata) = frame_and_metadata(50);

        let results = FrameResults {
            enhanced: None,
            faces: Some(vec![Detection {
                label: "face_0".to_string(),
                bounds: frame_ops::BoundingBox {
                    x: 1,
                    y: 2,
                    width: 3,
                    height: 4,
                },
            }]),
        };
        store.save(&frame, &metadata, &results).await.unwrap();

        let (_, sidecar_path) = store.artifact_paths(&metadata);
        let sidecar: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&sidecar_path).unwrap()).unwrap();
        assert_eq!(sidecar["faces"][0]["label"], "face_0");
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FrameStore::new(tmp.path());
        let (frame, metadata) = frame_and_metadata(10);

        store
            .save(&frame, &metadata, &FrameResults::default())
            .await
            .unwrap();
        store
            .save(&frame, &metadata, &FrameResults::default())
            .await
            .unwrap();

        let dir = store.frame_dir("j1", metadata.quality);
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 2);
    }
}
