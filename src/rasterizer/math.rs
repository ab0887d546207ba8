//! Vector math for the rasterizer
//!
//! Plain `f32` value types plus the two screen-space helpers every
//! triangle goes through: barycentric weights and the orthographic
//! world-to-screen remap.

use std::ops::{Add, Mul, Sub};
use serde::{Serialize, Deserialize};

/// 3D Vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn len(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction; the zero vector stays zero
    pub fn normalize(self) -> Vec3 {
        let l = self.len();
        if l == 0.0 {
            return Vec3::ZERO;
        }
        Vec3 {
            x: self.x / l,
            y: self.y / l,
            z: self.z / l,
        }
    }

    pub fn scale(self, s: f32) -> Vec3 {
        Vec3 {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f32) -> Vec3 {
        self.scale(s)
    }
}

/// 2D Vector (for texture coordinates)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, s: f32) -> Vec2 {
        Vec2::new(self.x * s, self.y * s)
    }
}

/// Triangles whose doubled screen area is below this are treated as degenerate
const DEGENERATE_EPSILON: f32 = 1e-2;

/// Weights returned for a degenerate triangle. The negative component makes
/// every pixel fail the inside test.
pub const DEGENERATE_BARYCENTRIC: Vec3 = Vec3 { x: -1.0, y: 1.0, z: 1.0 };

/// Calculate barycentric coordinates for point p in triangle (a, b, c).
/// Only x and y are used. Returns (u, v, w) with p = u*a + v*b + w*c;
/// any negative component means p lies outside the triangle.
pub fn barycentric(a: Vec3, b: Vec3, c: Vec3, p: Vec3) -> Vec3 {
    let s0 = Vec3::new(c.x - a.x, b.x - a.x, a.x - p.x);
    let s1 = Vec3::new(c.y - a.y, b.y - a.y, a.y - p.y);
    let u = s0.cross(s1);

    if u.z.abs() > DEGENERATE_EPSILON {
        Vec3::new(1.0 - (u.x + u.y) / u.z, u.y / u.z, u.x / u.z)
    } else {
        DEGENERATE_BARYCENTRIC
    }
}

/// Map a model-space vertex in [-1, 1] to pixel coordinates.
/// Orthographic: x and y are remapped and rounded, z passes through.
pub fn world_to_screen(v: Vec3, width: usize, height: usize) -> Vec3 {
    Vec3 {
        x: ((v.x + 1.0) * width as f32 / 2.0).round(),
        y: ((v.y + 1.0) * height as f32 / 2.0).round(),
        z: v.z,
    }
}
