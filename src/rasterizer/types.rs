//! Core types for the rasterizer

use serde::{Serialize, Deserialize};
use super::math::{Vec2, Vec3};

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };
    pub const MAGENTA: Color = Color { r: 255, g: 0, b: 255, a: 255 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Scale RGB by a light intensity. Channels are rounded and clamped to
    /// 0-255, alpha is forced opaque.
    pub fn shade(self, intensity: f32) -> Self {
        let scale = |c: u8| (c as f32 * intensity).round().clamp(0.0, 255.0) as u8;
        Self {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
            a: 255,
        }
    }

    /// Encode as raw pixel bytes (RGB order; grayscale uses Rec.601 luma)
    pub fn to_bytes(self, format: PixelFormat) -> Vec<u8> {
        match format {
            PixelFormat::Grayscale => {
                let luma = 0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32;
                vec![luma.round().clamp(0.0, 255.0) as u8]
            }
            PixelFormat::Rgb => vec![self.r, self.g, self.b],
            PixelFormat::Rgba => vec![self.r, self.g, self.b, self.a],
        }
    }

    /// Decode one pixel from a raw buffer. Missing alpha reads as opaque.
    pub fn from_bytes(bytes: &[u8], format: PixelFormat) -> Self {
        match format {
            PixelFormat::Grayscale => Self::new(bytes[0], bytes[0], bytes[0]),
            PixelFormat::Rgb => Self::new(bytes[0], bytes[1], bytes[2]),
            PixelFormat::Rgba => Self::with_alpha(bytes[0], bytes[1], bytes[2], bytes[3]),
        }
    }
}

/// Raw pixel layout; the discriminant is the byte count per pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Grayscale = 1,
    Rgb = 3,
    Rgba = 4,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        self as usize
    }
}

/// Sampling source for textured shading
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Color>,
    pub name: String,
}

impl Texture {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::WHITE; width * height],
            name: String::new(),
        }
    }

    /// Load texture from an image file (TGA, PNG, ...).
    /// Rows are flipped so that v = 0 addresses the bottom of the image.
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, image::ImageError> {
        let path = path.as_ref();
        let mut rgba = image::open(path)?.to_rgba8();
        image::imageops::flip_vertical_in_place(&mut rgba);

        let (width, height) = rgba.dimensions();
        let pixels: Vec<Color> = rgba
            .pixels()
            .map(|p| Color::from_bytes(&p.0, PixelFormat::Rgba))
            .collect();

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self {
            width: width as usize,
            height: height as usize,
            pixels,
            name,
        })
    }

    /// Create a checkerboard test texture
    pub fn checkerboard(width: usize, height: usize, color1: Color, color2: Color) -> Self {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let checker = ((x / 4) + (y / 4)) % 2 == 0;
                pixels.push(if checker { color1 } else { color2 });
            }
        }
        Self { width, height, pixels, name: "checkerboard".to_string() }
    }

    /// Nearest texel for a UV in [0, 1], no filtering.
    /// Out-of-range UVs clamp to the edge texel.
    pub fn sample(&self, uv: Vec2) -> Color {
        if self.width == 0 || self.height == 0 {
            return Color::BLACK;
        }
        let tx = (uv.x * self.width as f32).round().clamp(0.0, (self.width - 1) as f32) as usize;
        let ty = (uv.y * self.height as f32).round().clamp(0.0, (self.height - 1) as f32) as usize;
        self.pixels[ty * self.width + tx]
    }

    /// Get pixel at x,y coordinates
    pub fn get_pixel(&self, x: usize, y: usize) -> Color {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x]
        } else {
            Color::BLACK
        }
    }
}

/// Shading mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShadingMode {
    Flat,     // One light calculation per face
    Gouraud,  // Interpolate vertex intensities
    Phong,    // Interpolate normals, light per pixel
    Textured, // Unlit texture lookup
}

/// Reference direction for backface culling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CullMode {
    /// Skip faces turned away from the light (also drops unlit faces)
    Light,
    /// Skip faces turned away from the viewer
    View,
    None,
}

/// Phong lighting coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhongParams {
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub shininess: f32,
    pub view_dir: Vec3,
}

impl Default for PhongParams {
    fn default() -> Self {
        Self {
            ambient: 0.2,
            diffuse: 0.7,
            specular: 0.5,
            shininess: 10.0,
            view_dir: Vec3::new(0.0, 0.0, -1.0),
        }
    }
}

/// Rasterizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Output image width in pixels
    pub width: usize,
    /// Output image height in pixels
    pub height: usize,
    /// Shading mode
    pub shading: ShadingMode,
    /// Base color for flat, Gouraud and Phong shading
    pub material: Color,
    /// Light direction (for shading)
    pub light_dir: Vec3,
    pub phong: PhongParams,
    /// Backface culling
    pub cull: CullMode,
    /// Render horizontal bands on the rayon thread pool
    pub parallel: bool,
    /// Pixel layout of the written image
    pub format: PixelFormat,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            shading: ShadingMode::Textured,
            material: Color::new(139, 69, 19),
            light_dir: Vec3::new(0.0, 0.0, -1.0),
            phong: PhongParams::default(),
            cull: CullMode::Light,
            parallel: true,
            format: PixelFormat::Rgb,
        }
    }
}

impl RenderSettings {
    /// Direction faces must point along to survive culling
    pub fn cull_dir(&self) -> Option<Vec3> {
        match self.cull {
            CullMode::Light => Some(self.light_dir),
            CullMode::View => Some(self.phong.view_dir),
            CullMode::None => None,
        }
    }
}
