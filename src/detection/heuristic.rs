use super::{BackendKind, DetectionBackend};
use crate::buffer::PixelBuffer;
use crate::region::FaceRegion;
use anyhow::Result;
use async_trait::async_trait;

/// Backend used when no face model could be loaded.
///
/// Without a model there is no trustworthy signal for where a face is, so it
/// reports nothing instead of guessing a region.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicBackend;

impl HeuristicBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DetectionBackend for HeuristicBackend {
    async fn detect(&self, buffer: &PixelBuffer) -> Result<Vec<FaceRegion>> {
        tracing::debug!(
            "Heuristic backend has no face signal for {}x{} frame, reporting no regions",
            buffer.width(),
            buffer.height()
        );
        Ok(Vec::new())
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Heuristic
    }
}
