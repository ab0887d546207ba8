//! softshade: render an OBJ mesh to an image file
//!
//! Usage: `softshade [mesh.obj | scene.ron]`
//!
//! With no argument the default model is rendered with default settings.
//! A `.ron` argument is a scene file naming the mesh, texture, output and
//! render settings. Set `RUST_LOG` to change log verbosity.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use softshade::mesh::{load_mesh, MeshError};
use softshade::rasterizer::{render_mesh, Color, DepthBuffer, Framebuffer, ShadingMode, Texture};
use softshade::scene::{load_scene, Scene, SceneError, DEFAULT_MESH};

/// Anything that stops a frame from being written
#[derive(Debug)]
enum AppError {
    Scene(SceneError),
    Mesh(MeshError),
    Output(image::ImageError),
    Io(std::io::Error),
}

impl From<SceneError> for AppError {
    fn from(e: SceneError) -> Self {
        AppError::Scene(e)
    }
}

impl From<MeshError> for AppError {
    fn from(e: MeshError) -> Self {
        AppError::Mesh(e)
    }
}

impl From<image::ImageError> for AppError {
    fn from(e: image::ImageError) -> Self {
        AppError::Output(e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Scene(e) => write!(f, "Failed to load scene: {}", e),
            AppError::Mesh(e) => write!(f, "Failed to load mesh: {}", e),
            AppError::Output(e) => write!(f, "Failed to write image: {}", e),
            AppError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

/// Scene from the single optional positional argument
fn scene_from_args() -> Result<Scene, AppError> {
    let Some(arg) = std::env::args_os().nth(1) else {
        return Ok(Scene::from_mesh(DEFAULT_MESH));
    };

    let path = PathBuf::from(arg);
    let is_scene = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("ron"))
        .unwrap_or(false);

    if is_scene {
        info!("Loading scene {}", path.display());
        Ok(load_scene(&path)?)
    } else {
        Ok(Scene::from_mesh(path))
    }
}

/// Load the texture, or a checkerboard if it cannot be read
fn load_texture(path: &Path) -> Texture {
    match Texture::from_file(path) {
        Ok(tex) => {
            info!("Loaded texture {} ({}x{})", tex.name, tex.width, tex.height);
            tex
        }
        Err(e) => {
            warn!("Failed to load texture {}: {}, using checkerboard", path.display(), e);
            Texture::checkerboard(64, 64, Color::WHITE, Color::MAGENTA)
        }
    }
}

fn run() -> Result<(), AppError> {
    let scene = scene_from_args()?;
    let settings = &scene.settings;

    // Fails on a missing, malformed or face-less mesh before anything is drawn
    let mesh = load_mesh(&scene.mesh)?;

    let texture = match settings.shading {
        ShadingMode::Textured => Some(load_texture(&scene.texture_path())),
        ShadingMode::Flat | ShadingMode::Gouraud | ShadingMode::Phong => None,
    };

    let mut fb = Framebuffer::new(settings.width, settings.height, settings.format);
    let mut depth = DepthBuffer::new(settings.width, settings.height);

    let progress = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len}") {
        progress.set_style(style);
    }

    let start = Instant::now();
    let stats = render_mesh(&mut fb, &mut depth, &mesh, texture.as_ref(), settings, &progress);
    progress.finish_and_clear();

    info!(
        "Rendered {:?} {}x{} in {:.1?}: {} faces drawn, {} culled, {} pixels",
        settings.shading,
        settings.width,
        settings.height,
        start.elapsed(),
        stats.faces_drawn,
        stats.faces_culled,
        stats.pixels_written
    );

    // Rasterized with +y up; image files store the top row first
    fb.flip_vertically();

    let output = scene.output_path();
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fb.save(&output)?;
    info!("Wrote {}", output.display());

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("=== softshade v{} ===", VERSION);

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
