//! Camera driver backed by still images on disk.
//!
//! Each snapshot re-encodes the next image as JPEG, cycling through the list,
//! so a single photo can feed the training loop.

use std::{io::Cursor, path::PathBuf};

use async_trait::async_trait;
use client_core::{
    device::{StreamConstraints, JPEG_MIME},
    error::DeviceError,
    CameraDevice, CaptureFrame, VideoStream,
};
use image::{codecs::jpeg::JpegEncoder, RgbImage};
use tracing::debug;

pub struct FileCamera {
    photos: Vec<PathBuf>,
}

impl FileCamera {
    pub fn new(photos: Vec<PathBuf>) -> Self {
        Self { photos }
    }
}

#[async_trait]
impl CameraDevice for FileCamera {
    async fn open(
        &self,
        constraints: StreamConstraints,
    ) -> Result<Box<dyn VideoStream>, DeviceError> {
        if self.photos.is_empty() {
            return Err(DeviceError::Unavailable("no photo given".into()));
        }

        let mut frames = Vec::with_capacity(self.photos.len());
        for path in &self.photos {
            let bytes = tokio::fs::read(path).await.map_err(|err| {
                DeviceError::Unavailable(format!("{}: {err}", path.display()))
            })?;
            let decoded = image::load_from_memory(&bytes).map_err(|err| {
                DeviceError::Unavailable(format!("{}: {err}", path.display()))
            })?;
            frames.push(decoded.to_rgb8());
        }
        debug!(
            photos = frames.len(),
            ideal_width = constraints.ideal_width,
            ideal_height = constraints.ideal_height,
            "file camera opened"
        );

        Ok(Box::new(FileStream {
            frames,
            next: 0,
            stopped: false,
        }))
    }
}

struct FileStream {
    frames: Vec<RgbImage>,
    next: usize,
    stopped: bool,
}

#[async_trait]
impl VideoStream for FileStream {
    async fn wait_ready(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        if self.stopped {
            return None;
        }
        self.frames.get(self.next).map(RgbImage::dimensions)
    }

    fn snapshot(&mut self, quality: f32) -> Result<CaptureFrame, DeviceError> {
        let frame = self.frames.get(self.next).ok_or(DeviceError::NotReady)?;
        let mut bytes = Cursor::new(Vec::new());
        let percent = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
        JpegEncoder::new_with_quality(&mut bytes, percent)
            .encode_image(frame)
            .map_err(|err| DeviceError::Encode(err.to_string()))?;

        let (width, height) = frame.dimensions();
        self.next = (self.next + 1) % self.frames.len();
        Ok(CaptureFrame {
            bytes: bytes.into_inner(),
            mime_type: JPEG_MIME.into(),
            quality,
            width,
            height,
        })
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}
