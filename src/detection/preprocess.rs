use anyhow::Result;
use image::{imageops, RgbImage};
use ndarray::Array4;

/// Tensor ready for the face model plus the factors mapping its
/// coordinates back onto the source frame.
#[derive(Debug, Clone)]
pub struct ModelInput {
    /// Shape [1, 3, height, width], BGR channel order, values 0-255
    pub tensor: Array4<f32>,
    pub scale_x: f32,
    pub scale_y: f32,
}

/// Preprocessor for converting RGB frames to face model input tensors
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
        }
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Preprocess an RGB frame into an NCHW tensor
    ///
    /// Steps:
    /// 1. Resize to target dimensions
    /// 2. Reorder channels to BGR, keeping the 0-255 range
    /// 3. Transpose from HWC to NCHW format
    pub fn preprocess(&self, image: &RgbImage) -> Result<ModelInput> {
        let _span = tracing::debug_span!("preprocess").entered();

        let (source_width, source_height) = image.dimensions();
        anyhow::ensure!(
            source_width > 0 && source_height > 0,
            "cannot preprocess an empty frame"
        );
        anyhow::ensure!(
            self.target_width > 0 && self.target_height > 0,
            "model input size must be non-zero"
        );

        let resized = if image.dimensions() != (self.target_width, self.target_height) {
            imageops::resize(
                image,
                self.target_width,
                self.target_height,
                imageops::FilterType::Triangle,
            )
        } else {
            image.clone()
        };

        let (width, height) = resized.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            tensor[[0, 0, y, x]] = pixel[2] as f32;
            tensor[[0, 1, y, x]] = pixel[1] as f32;
            tensor[[0, 2, y, x]] = pixel[0] as f32;
        }

        Ok(ModelInput {
            tensor,
            scale_x: source_width as f32 / width as f32,
            scale_y: source_height as f32 / height as f32,
        })
    }
}
