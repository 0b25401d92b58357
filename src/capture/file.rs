use super::CaptureSource;
use crate::buffer::PixelBuffer;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Frame source that decodes a still image from disk
pub struct ImageFileCapture {
    path: PathBuf,
    width: u32,
    height: u32,
}

impl ImageFileCapture {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        tracing::info!("Opening capture image {}", path.display());

        let (width, height) = image::image_dimensions(&path)
            .with_context(|| format!("Failed to read image header from {}", path.display()))?;

        Ok(Self {
            path,
            width,
            height,
        })
    }
}

impl CaptureSource for ImageFileCapture {
    fn capture_frame(&mut self) -> Result<PixelBuffer> {
        let decoded = image::open(&self.path)
            .with_context(|| format!("Failed to decode {}", self.path.display()))?
            .to_rgba8();

        let frame = PixelBuffer::from_rgba_image(decoded).context("Decoded image is empty")?;
        tracing::debug!("Captured {}x{} frame", frame.width(), frame.height());
        Ok(frame)
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
