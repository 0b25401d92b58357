mod jpeg;

pub use jpeg::JpegFileOutput;

use crate::buffer::PixelBuffer;
use anyhow::Result;

/// Trait for destinations of finished frames
pub trait OutputSink {
    /// Write a frame to the output
    fn write_frame(&mut self, frame: &PixelBuffer) -> Result<()>;
}
