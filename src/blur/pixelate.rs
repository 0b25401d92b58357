use crate::buffer::{PixelBuffer, CHANNELS};

/// Replace every `block` x `block` tile with its mean colour.
///
/// Tiles are aligned to the patch origin; the last row and column of tiles
/// may be narrower.
pub fn pixelate(patch: &mut PixelBuffer, block: u32) {
    let _span = tracing::debug_span!("pixelate", block).entered();
    let (width, height) = patch.dimensions();
    let stride = width as usize;
    let data = patch.data_mut();

    for by in (0..height).step_by(block as usize) {
        for bx in (0..width).step_by(block as usize) {
            let x_end = (bx + block).min(width);
            let y_end = (by + block).min(height);

            let mut sums = [0u64; CHANNELS];
            for y in by..y_end {
                for x in bx..x_end {
                    let idx = (y as usize * stride + x as usize) * CHANNELS;
                    for (c, sum) in sums.iter_mut().enumerate() {
                        *sum += data[idx + c] as u64;
                    }
                }
            }

            let count = ((x_end - bx) * (y_end - by)) as f64;
            let mean = sums.map(|sum| (sum as f64 / count).round() as u8);

            for y in by..y_end {
                for x in bx..x_end {
                    let idx = (y as usize * stride + x as usize) * CHANNELS;
                    data[idx..idx + CHANNELS].copy_from_slice(&mean);
                }
            }
        }
    }
}

/// Composite a flat colour over the patch with source-over blending.
///
/// The effective source alpha is `fill_alpha * global_alpha`, matching a
/// canvas fill of `rgba(r, g, b, fill_alpha)` drawn with `globalAlpha`.
pub fn dark_overlay(patch: &mut PixelBuffer, color: [u8; 3], fill_alpha: f32, global_alpha: f32) {
    let _span = tracing::debug_span!("dark_overlay", fill_alpha, global_alpha).entered();
    let src_alpha = fill_alpha * global_alpha;
    let src = color.map(|c| c as f32);

    for px in patch.data_mut().chunks_exact_mut(CHANNELS) {
        let dst_alpha = px[3] as f32 / 255.0;
        let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);
        if out_alpha <= 0.0 {
            continue;
        }

        for c in 0..3 {
            let blended =
                (src[c] * src_alpha + px[c] as f32 * dst_alpha * (1.0 - src_alpha)) / out_alpha;
            px[c] = blended.round().clamp(0.0, 255.0) as u8;
        }
        px[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_take_their_mean_colour() {
        let mut patch = PixelBuffer::filled(4, 2, [0, 0, 0, 255]).unwrap();
        patch.put_pixel(0, 0, [100, 0, 0, 255]);
        patch.put_pixel(1, 1, [0, 200, 0, 255]);
        patch.put_pixel(3, 0, [40, 40, 40, 255]);

        pixelate(&mut patch, 2);

        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            assert_eq!(patch.pixel(x, y), [25, 50, 0, 255]);
        }
        for (x, y) in [(2, 0), (3, 0), (2, 1), (3, 1)] {
            assert_eq!(patch.pixel(x, y), [10, 10, 10, 255]);
        }
    }

    #[test]
    fn partial_edge_blocks_average_only_their_pixels() {
        let mut patch = PixelBuffer::filled(5, 1, [0, 0, 0, 255]).unwrap();
        patch.put_pixel(4, 0, [90, 90, 90, 255]);

        pixelate(&mut patch, 4);

        assert_eq!(patch.pixel(3, 0), [0, 0, 0, 255]);
        assert_eq!(patch.pixel(4, 0), [90, 90, 90, 255]);
    }

    #[test]
    fn mean_is_rounded_not_truncated() {
        let mut patch = PixelBuffer::filled(2, 1, [0, 0, 0, 255]).unwrap();
        patch.put_pixel(0, 0, [1, 0, 0, 255]);
        pixelate(&mut patch, 2);
        // 0.5 rounds away from zero
        assert_eq!(patch.pixel(1, 0)[0], 1);
    }

    #[test]
    fn overlay_darkens_opaque_pixels_by_net_alpha() {
        let mut patch = PixelBuffer::filled(3, 3, [200, 100, 20, 255]).unwrap();
        dark_overlay(&mut patch, [0, 0, 0], 0.7, 0.5);

        // Net source alpha 0.35 leaves 65% of the original colour
        assert_eq!(patch.pixel(1, 1), [130, 65, 13, 255]);
    }

    #[test]
    fn overlay_raises_alpha_of_transparent_pixels() {
        let mut patch = PixelBuffer::filled(1, 1, [255, 255, 255, 0]).unwrap();
        dark_overlay(&mut patch, [0, 0, 0], 0.7, 0.5);

        let [r, g, b, a] = patch.pixel(0, 0);
        assert_eq!((r, g, b), (0, 0, 0));
        assert_eq!(a, 89);
    }
}
