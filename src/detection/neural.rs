use super::{BackendKind, DetectionBackend, FaceModel};
use crate::buffer::PixelBuffer;
use crate::region::FaceRegion;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

/// Detection backed by a loaded face model.
///
/// Inference is compute-bound, so it runs on the blocking pool; each raw box
/// is grown by `padding` pixels on every edge before it is returned.
pub struct NeuralBackend {
    model: Arc<Mutex<Box<dyn FaceModel>>>,
    padding: i32,
}

impl NeuralBackend {
    pub fn new(model: Box<dyn FaceModel>, padding: i32) -> Self {
        let (input_width, input_height) = model.input_size();
        tracing::debug!(
            "Neural backend using {}x{} model input, {} px padding",
            input_width,
            input_height,
            padding
        );

        Self {
            model: Arc::new(Mutex::new(model)),
            padding,
        }
    }
}

#[async_trait]
impl DetectionBackend for NeuralBackend {
    async fn detect(&self, buffer: &PixelBuffer) -> Result<Vec<FaceRegion>> {
        let frame = buffer.to_rgb_image();
        let model = Arc::clone(&self.model);

        let raw = tokio::task::spawn_blocking(move || {
            // A panic during an earlier inference does not invalidate the weights
            let mut model = model.lock().unwrap_or_else(PoisonError::into_inner);
            model.detect(&frame)
        })
        .await
        .context("face model inference task failed")??;

        tracing::debug!("Neural backend detected {} face(s)", raw.len());

        Ok(raw
            .into_iter()
            .map(|region| region.padded(self.padding))
            .collect())
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Neural
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    struct FixedModel(Vec<FaceRegion>);

    impl FaceModel for FixedModel {
        fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<FaceRegion>> {
            Ok(self.0.clone())
        }

        fn input_size(&self) -> (u32, u32) {
            (640, 640)
        }
    }

    struct PanickingModel;

    impl FaceModel for PanickingModel {
        fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<FaceRegion>> {
            panic!("inference blew up");
        }

        fn input_size(&self) -> (u32, u32) {
            (640, 640)
        }
    }

    #[tokio::test]
    async fn pads_every_detection() {
        let backend = NeuralBackend::new(
            Box::new(FixedModel(vec![FaceRegion::new(300, 50, 100, 100, 0.9)])),
            40,
        );
        let buffer = PixelBuffer::filled(640, 480, [0, 0, 0, 255]).unwrap();

        let regions = backend.detect(&buffer).await.unwrap();
        assert_eq!(regions, vec![FaceRegion::new(260, 10, 180, 180, 0.9)]);
        assert_eq!(backend.kind(), BackendKind::Neural);
    }

    #[tokio::test]
    async fn inference_panic_becomes_an_error() {
        let backend = NeuralBackend::new(Box::new(PanickingModel), 40);
        let buffer = PixelBuffer::filled(16, 16, [0, 0, 0, 255]).unwrap();

        assert!(backend.detect(&buffer).await.is_err());
        // The lock is still usable afterwards
        assert!(backend.detect(&buffer).await.is_err());
    }
}
