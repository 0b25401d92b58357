use crate::buffer::PixelBuffer;

/// Axis-aligned candidate face rectangle plus the detector's confidence.
///
/// Coordinates may be negative or overhang the frame until the region has
/// been through [`RegionExpander::expand`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
}

impl FaceRegion {
    pub fn new(x: i32, y: i32, width: i32, height: i32, confidence: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    /// Grow the rectangle by `margin` pixels on every edge
    pub fn padded(&self, margin: i32) -> Self {
        Self {
            x: self.x.saturating_sub(margin),
            y: self.y.saturating_sub(margin),
            width: self.width.saturating_add(margin.saturating_mul(2)),
            height: self.height.saturating_add(margin.saturating_mul(2)),
            confidence: self.confidence,
        }
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }
}

/// Fits accepted regions to the frame they will be obfuscated in.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionExpander;

impl RegionExpander {
    pub fn new() -> Self {
        Self
    }

    /// Clamp `region` to the bounds of `buffer`.
    ///
    /// The result is the intersection of the region with the frame, so every
    /// visible pixel of the region is kept and nothing outside it is added.
    /// Returns `None` when nothing of the region is left to obfuscate.
    pub fn expand(&self, region: &FaceRegion, buffer: &PixelBuffer) -> Option<FaceRegion> {
        let (buffer_width, buffer_height) = buffer.dimensions();

        let x = (region.x as i64).max(0);
        let y = (region.y as i64).max(0);
        let right = (region.x as i64 + region.width as i64).min(buffer_width as i64);
        let bottom = (region.y as i64 + region.height as i64).min(buffer_height as i64);
        let width = right - x;
        let height = bottom - y;

        if width <= 0 || height <= 0 {
            tracing::debug!(
                "Discarding region {},{} {}x{}: empty after clamping to {}x{}",
                region.x,
                region.y,
                region.width,
                region.height,
                buffer_width,
                buffer_height
            );
            return None;
        }

        // Every value is bounded by the buffer dimensions at this point
        Some(FaceRegion {
            x: x as i32,
            y: y as i32,
            width: width as i32,
            height: height as i32,
            confidence: region.confidence,
        })
    }

    /// Clamp every region, dropping the ones that end up empty
    pub fn expand_all(&self, regions: &[FaceRegion], buffer: &PixelBuffer) -> Vec<FaceRegion> {
        regions
            .iter()
            .filter_map(|region| self.expand(region, buffer))
            .collect()
    }
}
