//! Software triangle rasterizer
//!
//! Features:
//! - Barycentric rasterization over a clamped bounding box
//! - Z-buffer with closer-wins (larger z) depth test
//! - Flat, Gouraud, Phong and textured shading
//! - Orthographic [-1, 1] to screen mapping
//! - Optional row-band parallel rendering

mod math;
mod types;
mod framebuffer;
mod render;

pub use math::*;
pub use types::*;
pub use framebuffer::*;
pub use render::*;
