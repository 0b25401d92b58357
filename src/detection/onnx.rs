use super::postprocess::decode_rows;
use super::preprocess::Preprocessor;
use super::FaceModel;
use crate::config::ModelConfig;
use crate::region::FaceRegion;
use anyhow::{Context, Result};
use image::RgbImage;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

/// YuNet-style face detector running through ONNX Runtime
///
/// Expects a single `[1, 3, H, W]` BGR input and a decoded detection output
/// with one row per face: box, optional landmarks, score last.
pub struct OnnxFaceModel {
    session: Session,
    preprocessor: Preprocessor,
    input_name: String,
    nms_threshold: f32,
}

impl OnnxFaceModel {
    /// Load a face detector from an ONNX file
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `config` - Input size and NMS settings
    pub fn new<P: AsRef<Path>>(model_path: P, config: &ModelConfig) -> Result<Self> {
        let path = model_path.as_ref();
        anyhow::ensure!(path.exists(), "model file not found: {}", path.display());

        tracing::info!("Loading face model from {}", path.display());

        let session = Session::builder()?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .context("face model declares no inputs")?;

        tracing::info!(
            "Face model loaded successfully (input '{}', {}x{})",
            input_name,
            config.input_width,
            config.input_height
        );

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(config.input_width, config.input_height),
            input_name,
            nms_threshold: config.nms_threshold,
        })
    }
}

impl FaceModel for OnnxFaceModel {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<FaceRegion>> {
        let _span = tracing::debug_span!("onnx_detect").entered();

        let input = self.preprocessor.preprocess(frame)?;
        let shape: Vec<i64> = input.tensor.shape().iter().map(|&d| d as i64).collect();
        let tensor = Tensor::from_array((shape, input.tensor.into_raw_vec()))
            .context("Failed to create face model input tensor")?;

        let _infer_span = tracing::debug_span!("inference").entered();
        let input_name = self.input_name.clone();
        let outputs = self
            .session
            .run(ort::inputs![input_name => tensor])
            .context("Failed to run inference")?;
        drop(_infer_span);

        let (output_name, output) = outputs
            .iter()
            .next()
            .context("face model produced no outputs")?;
        let (shape, rows) = output
            .try_extract_tensor::<f32>()
            .with_context(|| format!("face model output '{}' is not an f32 tensor", output_name))?;
        let dims: Vec<i64> = shape.iter().copied().collect();

        let regions = decode_rows(
            &dims,
            rows,
            input.scale_x,
            input.scale_y,
            self.nms_threshold,
        )?;
        tracing::debug!("Face model returned {} region(s)", regions.len());

        Ok(regions)
    }

    fn input_size(&self) -> (u32, u32) {
        self.preprocessor.target_size()
    }
}
