mod heuristic;
mod neural;
mod onnx;
mod postprocess;
mod preprocess;

pub use heuristic::HeuristicBackend;
pub use neural::NeuralBackend;
pub use onnx::OnnxFaceModel;
pub use postprocess::decode_rows;
pub use preprocess::{ModelInput, Preprocessor};

use crate::buffer::PixelBuffer;
use crate::region::FaceRegion;
use anyhow::Result;
use async_trait::async_trait;
use image::RgbImage;

/// Which detector produced a set of candidates; selects the confidence threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Neural,
    Heuristic,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Neural => f.write_str("neural"),
            Self::Heuristic => f.write_str("heuristic"),
        }
    }
}

/// Source of candidate face regions for a frame
#[async_trait]
pub trait DetectionBackend: Send + Sync {
    /// Locate face-like regions in `buffer`
    ///
    /// # Returns
    /// * Candidate regions with the backend's own confidence scores
    async fn detect(&self, buffer: &PixelBuffer) -> Result<Vec<FaceRegion>>;

    /// Which backend this is
    fn kind(&self) -> BackendKind;
}

/// Trait for pretrained face detector models
/// Allows swapping between different networks (YuNet, SCRFD, etc.)
pub trait FaceModel: Send {
    /// Run the model over a frame
    ///
    /// # Returns
    /// * One region per detected face, in frame pixel coordinates, carrying
    ///   the model's native confidence score
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<FaceRegion>>;

    /// Get the model's input dimensions
    ///
    /// Returns (width, height)
    fn input_size(&self) -> (u32, u32);
}
