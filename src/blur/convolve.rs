use crate::buffer::{PixelBuffer, CHANNELS};

/// Normalized 1D Gaussian weights for a kernel of `2 * radius + 1` taps, sigma = radius / 3.
///
/// The 2D kernel is the outer product of this vector with itself, so two 1D
/// passes give the same result as the full square kernel.
pub fn gaussian_kernel(radius: u32) -> Vec<f32> {
    let sigma = radius as f32 / 3.0;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let r = radius as i64;

    let mut kernel: Vec<f32> = (-r..=r)
        .map(|offset| (-((offset * offset) as f32) / two_sigma_sq).exp())
        .collect();

    let sum: f32 = kernel.iter().sum();
    for weight in kernel.iter_mut() {
        *weight /= sum;
    }
    kernel
}

/// Separable Gaussian blur over the whole patch; samples clamp to the patch edges.
pub fn gaussian_blur(patch: &mut PixelBuffer, radius: u32) {
    let _span = tracing::debug_span!("gaussian_blur", radius).entered();
    let kernel = gaussian_kernel(radius);
    convolve_separable(patch, &kernel, CHANNELS);
}

/// Unweighted blur with a `(2 * radius + 1)` square window, colour channels only.
pub fn box_blur(patch: &mut PixelBuffer, radius: u32) {
    let _span = tracing::debug_span!("box_blur", radius).entered();
    let kernel = vec![1.0; 2 * radius as usize + 1];
    convolve_separable(patch, &kernel, 3);
}

/// Horizontal then vertical pass of a symmetric 1D kernel.
///
/// The horizontal result is kept in f32 so only the final write rounds back to u8.
/// The first `channels` channels are filtered; the rest are left as they were.
fn convolve_separable(patch: &mut PixelBuffer, kernel: &[f32], channels: usize) {
    let (width, height) = (patch.width() as usize, patch.height() as usize);
    let half = (kernel.len() / 2) as i64;
    let max_x = width as i64 - 1;
    let max_y = height as i64 - 1;

    let mut horizontal = vec![0f32; width * height * CHANNELS];
    {
        let data = patch.data();
        for y in 0..height {
            let row = y * width;
            for x in 0..width {
                let mut sums = [0f32; CHANNELS];
                let mut weight_sum = 0f32;
                for (k, &weight) in kernel.iter().enumerate() {
                    let sx = (x as i64 + k as i64 - half).clamp(0, max_x) as usize;
                    let idx = (row + sx) * CHANNELS;
                    for c in 0..channels {
                        sums[c] += data[idx + c] as f32 * weight;
                    }
                    weight_sum += weight;
                }
                let out = (row + x) * CHANNELS;
                for c in 0..channels {
                    horizontal[out + c] = sums[c] / weight_sum;
                }
            }
        }
    }

    let data = patch.data_mut();
    for y in 0..height {
        for x in 0..width {
            let mut sums = [0f32; CHANNELS];
            let mut weight_sum = 0f32;
            for (k, &weight) in kernel.iter().enumerate() {
                let sy = (y as i64 + k as i64 - half).clamp(0, max_y) as usize;
                let idx = (sy * width + x) * CHANNELS;
                for c in 0..channels {
                    sums[c] += horizontal[idx + c] * weight;
                }
                weight_sum += weight;
            }
            let out = (y * width + x) * CHANNELS;
            for c in 0..channels {
                data[out + c] = (sums[c] / weight_sum).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}
