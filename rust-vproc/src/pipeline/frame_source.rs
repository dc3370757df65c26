//! Decoded-frame sources.
//!
//! For job `J` and quality `Q` the decoder collaborator leaves raw RGB24
//! frame files under `<frames_root>/decoded_frames_J/quality_Q/`, named so
//! lexicographic order is frame order. A source validates the directory and
//! every file size up front, then streams frames through a bounded channel
//! so a slow consumer caps memory instead of growing a buffer.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use frame_types::{Frame, FrameError, Quality};

use crate::{Error, Result};

/// Extension of decoded frame files.
const FRAME_FILE_EXT: &str = "raw";

/// Directory holding one quality's decoded frames.
pub fn quality_dir(frames_root: &Path, job_id: &str, quality: Quality) -> PathBuf {
    frames_root
        .join(format!("decoded_frames_{job_id}"))
        .join(format!("quality_{quality}"))
}

/// One quality's worth of decoded frames, validated and ready to stream.
#[derive(Debug)]
pub struct FrameSource {
    quality: Quality,
    files: Vec<PathBuf>,
}

impl FrameSource {
    /// Open the source for one quality level.
    ///
    /// Fails fast — before any fan-out starts — when the directory is
    /// missing or any frame file does not match the quality's expected byte
    /// length (the size check needs only file metadata, not pixel data).
    pub async fn open(frames_root: &Path, job_id: &str, quality: Quality) -> Result<Self> {
        let dir = quality_dir(frames_root, job_id, quality);

        if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            return Err(Error::MissingFrameSource {
                job_id: job_id.to_string(),
                quality: quality.label(),
            });
        }

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FRAME_FILE_EXT) {
                continue;
            }

            let expected = quality.frame_len() as u64;
            let actual = entry.metadata().await?.len();
            if actual != expected {
                return Err(Error::Frame(FrameError::SizeMismatch {
                    quality,
                    expected: expected as usize,
                    actual: actual as usize,
                }));
            }

            files.push(path);
        }

        // Frame file names encode numeric order.
        files.sort();

        debug!(
            job_id,
            quality = %quality,
            frames = files.len(),
            "Opened frame source"
        );

        Ok(Self { quality, files })
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Stream the frames in order through a bounded channel.
    ///
    /// The reader runs on the blocking pool and parks whenever the channel
    /// is full, so at most `capacity` frames are in memory per quality. A
    /// read failure is sent down the channel and ends the stream.
    pub fn stream(self, capacity: usize) -> mpsc::Receiver<Result<Frame>> {
        let (tx, rx) = mpsc::channel(capacity.max(1));

        tokio::task::spawn_blocking(move || {
            for path in self.files {
                let frame = std::fs::read(&path)
                    .map_err(Error::from)
                    .and_then(|data| {
                        Frame::from_raw(self.quality, Bytes::from(data)).map_err(Error::from)
                    });

                let failed = frame.is_err();
                if tx.blocking_send(frame).is_err() || failed {
                    break;
                }
            }
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_frames(dir: &Path, quality: Quality, count: usize) {
        std::fs::create_dir_all(dir).unwrap();
        for n in 0..count {
            let data = vec![(n * 10) as u8; quality.frame_len()];
            std::fs::write(dir.join(format!("frame_{n:06}.raw")), data).unwrap();
        }
    }

    #[tokio::test]
    async fn test_missing_directory_fails_fast() {
        let tmp = tempfile::tempdir().unwrap();
        let err = FrameSource::open(tmp.path(), "j1", Quality::new(4, 4))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingFrameSource { .. }));
    }

    #[tokio::test]
    async fn test_size_mismatch_fails_before_streaming() {
        let tmp = tempfile::tempdir().unwrap();
        let quality = Quality::new(4, 4);
        let dir = quality_dir(tmp.path(), "j1", quality);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("frame_000000.raw"), vec![0u8; 10]).unwrap();

        let err = FrameSource::open(tmp.path(), "j1", quality)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Frame(FrameError::SizeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_streams_frames_in_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        let quality = Quality::new(4, 4);
        let dir = quality_dir(tmp.path(), "j1", quality);
        write_frames(&dir, quality, 5);
        // A stray non-frame file must be ignored.
        std::fs::write(dir.join("notes.txt"), b"x").unwrap();

        let source = FrameSource::open(tmp.path(), "j1", quality).await.unwrap();
        assert_eq!(source.len(), 5);

        let mut frames = source.stream(2);
        for n in 0..5 {
            let frame = frames.recv().await.unwrap().unwrap();
            assert_eq!(frame.data()[0], (n * 10) as u8);
        }
        assert!(frames.recv().await.is_none());
    }
}
