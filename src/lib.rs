//! softshade: software triangle rasterizer
//!
//! Loads an OBJ mesh, maps it orthographically onto the screen and fills
//! every triangle into a z-buffered color image using one of four shading
//! strategies: flat, Gouraud, Phong or textured.

pub mod mesh;
pub mod rasterizer;
pub mod scene;
