mod file;

pub use file::ImageFileCapture;

use crate::buffer::PixelBuffer;
use anyhow::Result;

/// Trait for sources of captured frames
pub trait CaptureSource {
    /// Capture a single frame
    fn capture_frame(&mut self) -> Result<PixelBuffer>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);
}
