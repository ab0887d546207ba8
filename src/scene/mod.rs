//! Scene description
//!
//! What to render and how: mesh and texture paths, output path, and the
//! render settings. Loaded from RON (Rusty Object Notation) files or built
//! from a bare mesh path with defaults.

mod loader;

pub use loader::*;

use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};
use crate::rasterizer::RenderSettings;

/// Mesh rendered when no argument is given
pub const DEFAULT_MESH: &str = "assets/models/diablo3_pose.obj";

/// Where outputs go when the scene does not name one
pub const OUTPUT_DIR: &str = "assets/outputs";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub mesh: PathBuf,
    /// Defaults to `<mesh stem>_diffuse.tga` next to the mesh
    #[serde(default)]
    pub texture: Option<PathBuf>,
    /// Defaults to `assets/outputs/<mesh stem>_output.tga`
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub settings: RenderSettings,
}

impl Scene {
    /// Scene for a mesh with default settings and derived paths
    pub fn from_mesh<P: Into<PathBuf>>(mesh: P) -> Self {
        Self {
            mesh: mesh.into(),
            texture: None,
            output: None,
            settings: RenderSettings::default(),
        }
    }

    fn mesh_stem(&self) -> String {
        self.mesh
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "model".to_string())
    }

    pub fn texture_path(&self) -> PathBuf {
        match &self.texture {
            Some(path) => path.clone(),
            None => self.mesh.with_file_name(format!("{}_diffuse.tga", self.mesh_stem())),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => Path::new(OUTPUT_DIR).join(format!("{}_output.tga", self.mesh_stem())),
        }
    }

    /// Make relative paths relative to `dir` (the scene file's folder)
    pub fn resolve_relative_to(&mut self, dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = dir.join(&*p);
            }
        };
        resolve(&mut self.mesh);
        if let Some(texture) = self.texture.as_mut() {
            resolve(texture);
        }
        if let Some(output) = self.output.as_mut() {
            resolve(output);
        }
    }
}
