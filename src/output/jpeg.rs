use super::OutputSink;
use crate::buffer::PixelBuffer;
use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Encodes finished frames as JPEG files
pub struct JpegFileOutput {
    path: PathBuf,
    quality: u8,
}

impl JpegFileOutput {
    pub fn new<P: AsRef<Path>>(path: P, quality: u8) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            quality: quality.clamp(1, 100),
        }
    }

    /// JPEG has no alpha channel, so it is dropped
    fn to_rgb(frame: &PixelBuffer) -> RgbImage {
        frame.to_rgb_image()
    }
}

impl OutputSink for JpegFileOutput {
    fn write_frame(&mut self, frame: &PixelBuffer) -> Result<()> {
        let rgb = Self::to_rgb(frame);

        let file = File::create(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);

        JpegEncoder::new_with_quality(&mut writer, self.quality)
            .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
            .context("Failed to encode JPEG")?;
        writer.flush().context("Failed to flush JPEG output")?;

        tracing::info!(
            "Wrote {}x{} JPEG (quality {}) to {}",
            frame.width(),
            frame.height(),
            self.quality,
            self.path.display()
        );

        Ok(())
    }
}
