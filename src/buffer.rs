use crate::region::FaceRegion;
use image::{RgbImage, RgbaImage};
use thiserror::Error;

/// Bytes per pixel (R, G, B, A)
pub const CHANNELS: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("pixel buffer dimensions are zero ({width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("pixel data length {actual} does not match {width}x{height} RGBA (expected {expected})")]
    LengthMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("region {x},{y} {width}x{height} lies outside the {buffer_width}x{buffer_height} buffer")]
    RegionOutOfBounds {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        buffer_width: u32,
        buffer_height: u32,
    },
}

/// Mutable RGBA frame that the obfuscation pipeline reads and rewrites in place.
///
/// The fields are private so `data.len() == width * height * 4` holds for the
/// whole lifetime of the value.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, BufferError> {
        if width == 0 || height == 0 {
            return Err(BufferError::ZeroDimensions { width, height });
        }

        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(BufferError::LengthMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Buffer with every pixel set to `rgba`
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, BufferError> {
        let count = width as usize * height as usize;
        let data = rgba.iter().copied().cycle().take(count * CHANNELS).collect();
        Self::new(width, height, data)
    }

    pub fn from_rgba_image(image: RgbaImage) -> Result<Self, BufferError> {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }

    pub fn into_rgba_image(self) -> RgbaImage {
        // Dimensions and length were validated at construction
        RgbaImage::from_raw(self.width, self.height, self.data)
            .unwrap_or_else(|| RgbaImage::new(0, 0))
    }

    /// Copy of the frame without alpha, the layout face models consume
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let [r, g, b, _] = self.pixel(x, y);
            image::Rgb([r, g, b])
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Raw mutable access; the length cannot change through a slice.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    /// Pixel at (x, y). Panics when out of bounds, like `image::ImageBuffer::get_pixel`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let idx = self.offset(x, y);
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let idx = self.offset(x, y);
        self.data[idx..idx + CHANNELS].copy_from_slice(&rgba);
    }

    /// Whether `region` is non-empty and entirely inside the buffer
    pub fn contains(&self, region: &FaceRegion) -> bool {
        region.x >= 0
            && region.y >= 0
            && region.width > 0
            && region.height > 0
            && region.x as i64 + region.width as i64 <= self.width as i64
            && region.y as i64 + region.height as i64 <= self.height as i64
    }

    fn check_region(&self, region: &FaceRegion) -> Result<(), BufferError> {
        if self.contains(region) {
            Ok(())
        } else {
            Err(BufferError::RegionOutOfBounds {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                buffer_width: self.width,
                buffer_height: self.height,
            })
        }
    }

    /// Copy the pixels covered by `region` into a standalone buffer
    pub fn read_region(&self, region: &FaceRegion) -> Result<PixelBuffer, BufferError> {
        self.check_region(region)?;

        let (x0, y0) = (region.x as u32, region.y as u32);
        let (w, h) = (region.width as u32, region.height as u32);
        let row_bytes = w as usize * CHANNELS;

        let mut data = Vec::with_capacity(row_bytes * h as usize);
        for row in y0..y0 + h {
            let start = self.offset(x0, row);
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }

        PixelBuffer::new(w, h, data)
    }

    /// Paste `patch` back with its top-left corner at (x, y)
    pub fn write_region(&mut self, x: i32, y: i32, patch: &PixelBuffer) -> Result<(), BufferError> {
        let target = FaceRegion::new(x, y, patch.width as i32, patch.height as i32, 1.0);
        self.check_region(&target)?;

        let row_bytes = patch.width as usize * CHANNELS;
        for row in 0..patch.height {
            let src = patch.offset(0, row);
            let dst = self.offset(x as u32, y as u32 + row);
            self.data[dst..dst + row_bytes].copy_from_slice(&patch.data[src..src + row_bytes]);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, (x + y) as u8, 255]);
            }
        }
        PixelBuffer::new(width, height, data).unwrap()
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = PixelBuffer::new(2, 2, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            BufferError::LengthMismatch {
                width: 2,
                height: 2,
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn rejects_zero_dimensions() {
        assert!(matches!(
            PixelBuffer::new(0, 4, Vec::new()),
            Err(BufferError::ZeroDimensions { .. })
        ));
    }

    #[test]
    fn filled_sets_every_pixel() {
        let buffer = PixelBuffer::filled(3, 2, [10, 20, 30, 40]).unwrap();
        assert_eq!(buffer.data().len(), 24);
        assert_eq!(buffer.pixel(2, 1), [10, 20, 30, 40]);
    }

    #[test]
    fn region_read_write_preserves_layout() {
        let source = gradient(8, 6);
        let region = FaceRegion::new(2, 1, 3, 4, 1.0);
        let patch = source.read_region(&region).unwrap();

        assert_eq!(patch.dimensions(), (3, 4));
        assert_eq!(patch.pixel(0, 0), source.pixel(2, 1));
        assert_eq!(patch.pixel(2, 3), source.pixel(4, 4));

        let mut target = PixelBuffer::filled(8, 6, [0, 0, 0, 0]).unwrap();
        target.write_region(2, 1, &patch).unwrap();
        assert_eq!(target.pixel(4, 4), source.pixel(4, 4));
        assert_eq!(target.pixel(1, 1), [0, 0, 0, 0]);
        assert_eq!(target.pixel(5, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn region_outside_buffer_is_an_error() {
        let buffer = gradient(8, 6);
        let region = FaceRegion::new(6, 0, 4, 2, 1.0);
        assert!(matches!(
            buffer.read_region(&region),
            Err(BufferError::RegionOutOfBounds { .. })
        ));

        let negative = FaceRegion::new(-1, 0, 2, 2, 1.0);
        assert!(!buffer.contains(&negative));
    }

    #[test]
    fn rgba_image_round_trip_keeps_pixels() {
        let buffer = gradient(5, 3);
        let image = buffer.clone().into_rgba_image();
        assert_eq!(image.get_pixel(4, 2).0, buffer.pixel(4, 2));
        assert_eq!(PixelBuffer::from_rgba_image(image).unwrap(), buffer);
    }
}
