//! Color and depth targets
//!
//! `Framebuffer` and `DepthBuffer` own full-frame storage. Drawing goes
//! through `Band`, a view over a contiguous range of rows of both, so a
//! frame can be split into disjoint bands and rendered on several threads.

use std::ops::Range;
use std::path::Path;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use super::types::{Color, PixelFormat};

/// Color image, row-major, origin at the bottom-left while rendering
pub struct Framebuffer {
    pub pixels: Vec<Color>,
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize, format: PixelFormat) -> Self {
        Self {
            pixels: vec![Color::BLACK; width * height],
            width,
            height,
            format,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Color {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x]
        } else {
            Color::BLACK
        }
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    /// Swap rows top to bottom
    pub fn flip_vertically(&mut self) {
        let w = self.width;
        for y in 0..self.height / 2 {
            let (top, bottom) = self.pixels.split_at_mut((self.height - 1 - y) * w);
            top[y * w..(y + 1) * w].swap_with_slice(&mut bottom[..w]);
        }
    }

    /// Encode into an `image` buffer using this framebuffer's pixel format
    pub fn to_image(&self) -> DynamicImage {
        let raw: Vec<u8> = self
            .pixels
            .iter()
            .flat_map(|c| c.to_bytes(self.format))
            .collect();
        let (w, h) = (self.width as u32, self.height as u32);

        let image = match self.format {
            PixelFormat::Grayscale => GrayImage::from_raw(w, h, raw).map(DynamicImage::ImageLuma8),
            PixelFormat::Rgb => RgbImage::from_raw(w, h, raw).map(DynamicImage::ImageRgb8),
            PixelFormat::Rgba => RgbaImage::from_raw(w, h, raw).map(DynamicImage::ImageRgba8),
        };
        // Sizes match by construction, so from_raw cannot fail here
        image.unwrap_or_else(|| DynamicImage::new_rgb8(w, h))
    }

    /// Write to disk; the codec is picked from the file extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), image::ImageError> {
        self.to_image().save(path)
    }
}

/// Per-pixel depth, larger is closer. Starts at negative infinity.
pub struct DepthBuffer {
    values: Vec<f32>,
    width: usize,
    height: usize,
}

impl DepthBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            values: vec![f32::NEG_INFINITY; width * height],
            width,
            height,
        }
    }

    pub fn clear(&mut self) {
        self.values.fill(f32::NEG_INFINITY);
    }

    /// Stored depth, or None outside the buffer
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x < self.width && y < self.height {
            Some(self.values[x + y * self.width])
        } else {
            None
        }
    }

    /// Store `z` if it is strictly closer than what is there. Returns true on store.
    pub fn test_and_set(&mut self, x: usize, y: usize, z: f32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = x + y * self.width;
        if z > self.values[idx] {
            self.values[idx] = z;
            true
        } else {
            false
        }
    }
}

/// Exclusive view over rows `y_start..y_end` of a color and depth target.
/// Coordinates passed to its methods are full-frame coordinates.
pub struct Band<'a> {
    pixels: &'a mut [Color],
    depth: &'a mut [f32],
    width: usize,
    height: usize,
    y_start: usize,
    y_end: usize,
}

impl<'a> Band<'a> {
    /// The whole frame as a single band
    pub fn full(fb: &'a mut Framebuffer, depth: &'a mut DepthBuffer) -> Self {
        assert_eq!((fb.width, fb.height), (depth.width, depth.height), "target size mismatch");
        Self {
            pixels: &mut fb.pixels,
            depth: &mut depth.values,
            width: fb.width,
            height: fb.height,
            y_start: 0,
            y_end: fb.height,
        }
    }

    /// Split the frame into bands of `rows` rows (the last may be shorter)
    pub fn split(fb: &'a mut Framebuffer, depth: &'a mut DepthBuffer, rows: usize) -> Vec<Self> {
        assert_eq!((fb.width, fb.height), (depth.width, depth.height), "target size mismatch");
        let (width, height) = (fb.width, fb.height);
        let rows = rows.max(1);
        let chunk = (width * rows).max(1);

        fb.pixels
            .chunks_mut(chunk)
            .zip(depth.values.chunks_mut(chunk))
            .enumerate()
            .map(|(i, (pixels, depth))| {
                let y_start = i * rows;
                Band {
                    pixels,
                    depth,
                    width,
                    height,
                    y_start,
                    y_end: (y_start + rows).min(height),
                }
            })
            .collect()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the whole frame, not of the band
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn rows(&self) -> Range<usize> {
        self.y_start..self.y_end
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.width && self.rows().contains(&y) {
            Some(x + (y - self.y_start) * self.width)
        } else {
            None
        }
    }

    /// Depth test with the closer-wins rule; stores `z` on pass
    pub fn test_and_set_depth(&mut self, x: usize, y: usize, z: f32) -> bool {
        match self.index(x, y) {
            Some(idx) if z > self.depth[idx] => {
                self.depth[idx] = z;
                true
            }
            _ => false,
        }
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if let Some(idx) = self.index(x, y) {
            self.pixels[idx] = color;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_starts_far() {
        let mut depth = DepthBuffer::new(4, 3);
        assert_eq!(depth.get(3, 2), Some(f32::NEG_INFINITY));
        assert_eq!(depth.get(4, 0), None);

        assert!(depth.test_and_set(1, 1, -100.0));
        assert!(!depth.test_and_set(1, 1, -100.0)); // ties lose
        assert!(!depth.test_and_set(1, 1, -200.0));
        assert!(depth.test_and_set(1, 1, 0.5));
        assert_eq!(depth.get(1, 1), Some(0.5));
        assert!(!depth.test_and_set(9, 9, 1.0));

        depth.clear();
        assert_eq!(depth.get(1, 1), Some(f32::NEG_INFINITY));
    }

    #[test]
    fn test_flip_vertically() {
        let mut fb = Framebuffer::new(2, 3, PixelFormat::Rgb);
        fb.set_pixel(0, 0, Color::RED);
        fb.set_pixel(1, 1, Color::WHITE);
        fb.set_pixel(1, 2, Color::BLUE);
        fb.flip_vertically();
        assert_eq!(fb.get_pixel(0, 2), Color::RED);
        assert_eq!(fb.get_pixel(1, 1), Color::WHITE);
        assert_eq!(fb.get_pixel(1, 0), Color::BLUE);
        assert_eq!(fb.get_pixel(0, 0), Color::BLACK);
    }

    #[test]
    fn test_to_image_keeps_format() {
        let mut fb = Framebuffer::new(3, 2, PixelFormat::Rgb);
        fb.clear(Color::new(10, 20, 30));
        fb.set_pixel(2, 1, Color::RED);

        let img = fb.to_image().to_rgb8();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(0, 0).0, [10, 20, 30]);
        assert_eq!(img.get_pixel(2, 1).0, [255, 0, 0]);

        fb.format = PixelFormat::Grayscale;
        assert!(matches!(fb.to_image(), DynamicImage::ImageLuma8(_)));
        fb.format = PixelFormat::Rgba;
        assert!(matches!(fb.to_image(), DynamicImage::ImageRgba8(_)));
    }

    #[test]
    fn test_bands_cover_frame_without_overlap() {
        let mut fb = Framebuffer::new(5, 7, PixelFormat::Rgb);
        let mut depth = DepthBuffer::new(5, 7);
        let mut bands = Band::split(&mut fb, &mut depth, 3);
        assert_eq!(bands.len(), 3);
        assert_eq!(bands[0].rows(), 0..3);
        assert_eq!(bands[2].rows(), 6..7);

        // Each band only accepts its own rows
        assert!(bands[1].test_and_set_depth(4, 3, 1.0));
        assert!(!bands[0].test_and_set_depth(4, 3, 1.0));
        bands[1].set_pixel(4, 3, Color::RED);
        bands[2].set_pixel(0, 6, Color::BLUE);
        bands[2].set_pixel(0, 5, Color::WHITE); // ignored, not band 2's row
        drop(bands);

        assert_eq!(fb.get_pixel(4, 3), Color::RED);
        assert_eq!(fb.get_pixel(0, 6), Color::BLUE);
        assert_eq!(fb.get_pixel(0, 5), Color::BLACK);
        assert_eq!(depth.get(4, 3), Some(1.0));
    }
}
