//! Core rendering functions
//! Triangle rasterization with a z-buffer and four shading strategies

use indicatif::ProgressBar;
use log::{debug, warn};
use rayon::prelude::*;
use crate::mesh::Mesh;
use super::framebuffer::{Band, DepthBuffer, Framebuffer};
use super::math::{barycentric, world_to_screen, Vec2, Vec3};
use super::types::{Color, PhongParams, RenderSettings, ShadingMode, Texture};

/// Inclusive pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: usize,
    pub max_x: usize,
    pub min_y: usize,
    pub max_y: usize,
}

/// Screen bounding box of a triangle clamped to the image.
/// None when the triangle lies entirely outside.
pub fn bounding_box(v0: Vec3, v1: Vec3, v2: Vec3, width: usize, height: usize) -> Option<BoundingBox> {
    let min_x = v0.x.min(v1.x).min(v2.x).max(0.0) as i64;
    let min_y = v0.y.min(v1.y).min(v2.y).max(0.0) as i64;
    let max_x = (v0.x.max(v1.x).max(v2.x) as i64).min(width as i64 - 1);
    let max_y = (v0.y.max(v1.y).max(v2.y) as i64).min(height as i64 - 1);

    if min_x > max_x || min_y > max_y {
        return None;
    }

    Some(BoundingBox {
        min_x: min_x as usize,
        max_x: max_x as usize,
        min_y: min_y as usize,
        max_y: max_y as usize,
    })
}

/// Per-pixel color rule for one triangle
#[derive(Debug, Clone, Copy)]
pub enum Shader<'a> {
    /// Constant color, lighting already applied by the caller
    Flat { color: Color },
    /// Per-vertex light intensities
    Gouraud { base: Color, intensities: [f32; 3] },
    /// Per-vertex unit normals, lit per pixel
    Phong {
        base: Color,
        normals: [Vec3; 3],
        light_dir: Vec3,
        params: PhongParams,
    },
    /// Per-vertex UVs into an unlit texture
    Textured { uvs: [Vec2; 3], texture: &'a Texture },
}

impl Shader<'_> {
    /// Color at barycentric weights `bc` = (u, v, w)
    pub fn shade(&self, bc: Vec3) -> Color {
        match *self {
            Shader::Flat { color } => color,
            Shader::Gouraud { base, intensities: [i0, i1, i2] } => {
                base.shade(bc.x * i0 + bc.y * i1 + bc.z * i2)
            }
            Shader::Phong { base, normals: [n0, n1, n2], light_dir, params } => {
                let n = (n0 * bc.x + n1 * bc.y + n2 * bc.z).normalize();
                base.shade(phong_intensity(n, light_dir, &params))
            }
            Shader::Textured { uvs: [uv0, uv1, uv2], texture } => {
                texture.sample(uv0 * bc.x + uv1 * bc.y + uv2 * bc.z)
            }
        }
    }
}

/// Ambient + diffuse + specular for a unit normal, capped at 1
fn phong_intensity(n: Vec3, light_dir: Vec3, params: &PhongParams) -> f32 {
    let n_dot_l = n.dot(light_dir).max(0.0);
    let diffuse = n_dot_l * params.diffuse;
    let reflect = (n * (2.0 * n_dot_l) - light_dir).normalize();
    let specular = reflect.dot(params.view_dir).max(0.0).powf(params.shininess) * params.specular;
    (params.ambient + diffuse + specular).min(1.0)
}

/// Rasterize a single screen-space triangle into the whole frame.
/// Returns the number of pixels that passed the depth test.
pub fn rasterize_triangle(
    fb: &mut Framebuffer,
    depth: &mut DepthBuffer,
    tri: [Vec3; 3],
    shader: &Shader,
) -> usize {
    let mut band = Band::full(fb, depth);
    rasterize_in_band(&mut band, tri, shader)
}

/// Rasterize the part of a triangle that falls inside `band`
pub fn rasterize_in_band(band: &mut Band, tri: [Vec3; 3], shader: &Shader) -> usize {
    let [t0, t1, t2] = tri;
    let Some(bbox) = bounding_box(t0, t1, t2, band.width(), band.height()) else {
        return 0;
    };

    let rows = band.rows();
    let min_y = bbox.min_y.max(rows.start);
    let max_y = bbox.max_y.min(rows.end.saturating_sub(1));
    if rows.is_empty() || min_y > max_y {
        return 0;
    }

    let mut written = 0;
    for y in min_y..=max_y {
        for x in bbox.min_x..=bbox.max_x {
            let p = Vec3::new(x as f32, y as f32, 0.0);
            let bc = barycentric(t0, t1, t2, p);
            if bc.x < 0.0 || bc.y < 0.0 || bc.z < 0.0 {
                continue;
            }

            let z = t0.z * bc.x + t1.z * bc.y + t2.z * bc.z;
            if band.test_and_set_depth(x, y, z) {
                band.set_pixel(x, y, shader.shade(bc));
                written += 1;
            }
        }
    }
    written
}

/// Unnormalized face normal; outward for this mesh convention
pub fn face_normal(v0: Vec3, v1: Vec3, v2: Vec3) -> Vec3 {
    (v2 - v0).cross(v1 - v0)
}

/// Smooth per-vertex normals: the normalized sum of the unit normals of
/// every face touching the vertex. Unused vertices get the zero vector.
pub fn vertex_normals(mesh: &Mesh) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; mesh.vertex_count()];

    for i in 0..mesh.face_count() {
        let [v0, v1, v2] = mesh.face_positions(i);
        let n = face_normal(v0, v1, v2).normalize();
        for idx in mesh.face_vertex_indices(i) {
            normals[idx] = normals[idx] + n;
        }
    }

    for n in &mut normals {
        *n = n.normalize();
    }
    normals
}

/// A face that survived culling, ready for rasterization
struct Surface<'a> {
    screen: [Vec3; 3],
    shader: Shader<'a>,
}

/// Counters for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub faces_drawn: usize,
    pub faces_culled: usize,
    pub pixels_written: usize,
}

/// Cull, project and pick a shader for every face
fn build_surfaces<'a>(
    mesh: &Mesh,
    texture: Option<&'a Texture>,
    settings: &RenderSettings,
) -> (Vec<Surface<'a>>, usize) {
    let (width, height) = (settings.width, settings.height);
    let light_dir = settings.light_dir;
    let cull_dir = settings.cull_dir();

    let normals = match settings.shading {
        ShadingMode::Gouraud | ShadingMode::Phong => vertex_normals(mesh),
        ShadingMode::Flat | ShadingMode::Textured => Vec::new(),
    };

    if settings.shading == ShadingMode::Textured && texture.is_none() {
        warn!("Textured shading without a texture, drawing unlit material color");
    }

    let mut surfaces = Vec::with_capacity(mesh.face_count());
    let mut culled = 0;

    for i in 0..mesh.face_count() {
        let [v0, v1, v2] = mesh.face_positions(i);
        let normal = face_normal(v0, v1, v2).normalize();

        if let Some(dir) = cull_dir {
            if normal.dot(dir) <= 0.0 {
                culled += 1;
                continue;
            }
        }

        let [a, b, c] = mesh.face_vertex_indices(i);
        let shader = match settings.shading {
            ShadingMode::Flat => Shader::Flat {
                color: settings.material.shade(normal.dot(light_dir).max(0.0)),
            },
            ShadingMode::Gouraud => Shader::Gouraud {
                base: settings.material,
                intensities: [
                    normals[a].dot(light_dir).max(0.0),
                    normals[b].dot(light_dir).max(0.0),
                    normals[c].dot(light_dir).max(0.0),
                ],
            },
            ShadingMode::Phong => Shader::Phong {
                base: settings.material,
                normals: [normals[a], normals[b], normals[c]],
                light_dir,
                params: settings.phong,
            },
            ShadingMode::Textured => match texture {
                Some(texture) => {
                    let [ta, tb, tc] = mesh.face_tex_coord_indices(i);
                    Shader::Textured {
                        uvs: [mesh.tex_coord(ta), mesh.tex_coord(tb), mesh.tex_coord(tc)],
                        texture,
                    }
                }
                None => Shader::Flat { color: settings.material },
            },
        };

        surfaces.push(Surface {
            screen: [
                world_to_screen(v0, width, height),
                world_to_screen(v1, width, height),
                world_to_screen(v2, width, height),
            ],
            shader,
        });
    }

    (surfaces, culled)
}

/// Render a mesh into the frame.
/// `fb` and `depth` must match `settings.width` x `settings.height`.
/// With `settings.parallel` the frame is split into row bands rendered on
/// the rayon pool; the result is identical to the sequential path.
pub fn render_mesh(
    fb: &mut Framebuffer,
    depth: &mut DepthBuffer,
    mesh: &Mesh,
    texture: Option<&Texture>,
    settings: &RenderSettings,
    progress: &ProgressBar,
) -> RenderStats {
    let (surfaces, faces_culled) = build_surfaces(mesh, texture, settings);
    debug!("{} faces to draw, {} culled", surfaces.len(), faces_culled);

    let pixels_written = if settings.parallel {
        let bands_wanted = rayon::current_num_threads() * 4;
        let rows = settings.height.div_ceil(bands_wanted).max(1);
        let mut bands = Band::split(fb, depth, rows);
        progress.set_length(bands.len() as u64);

        bands
            .par_iter_mut()
            .map(|band| {
                let written: usize = surfaces
                    .iter()
                    .map(|s| rasterize_in_band(band, s.screen, &s.shader))
                    .sum();
                progress.inc(1);
                written
            })
            .sum::<usize>()
    } else {
        let mut band = Band::full(fb, depth);
        progress.set_length(surfaces.len() as u64);

        let mut written = 0;
        for s in &surfaces {
            written += rasterize_in_band(&mut band, s.screen, &s.shader);
            progress.inc(1);
        }
        written
    };

    RenderStats {
        faces_drawn: surfaces.len(),
        faces_culled,
        pixels_written,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Face;
    use crate::rasterizer::{CullMode, PixelFormat};

    const EPS: f32 = 1e-4;

    fn targets(w: usize, h: usize) -> (Framebuffer, DepthBuffer) {
        (Framebuffer::new(w, h, PixelFormat::Rgba), DepthBuffer::new(w, h))
    }

    fn flat(color: Color) -> Shader<'static> {
        Shader::Flat { color }
    }

    /// Right triangle from the origin with legs of 10 pixels
    fn corner_triangle(z: f32) -> [Vec3; 3] {
        [Vec3::new(0.0, 0.0, z), Vec3::new(10.0, 0.0, z), Vec3::new(0.0, 10.0, z)]
    }

    #[test]
    fn test_bounding_box_clamps() {
        let bb = bounding_box(
            Vec3::new(-5.0, 2.7, 0.0),
            Vec3::new(30.2, 4.0, 0.0),
            Vec3::new(3.0, 99.0, 0.0),
            20,
            10,
        );
        assert_eq!(bb, Some(BoundingBox { min_x: 0, max_x: 19, min_y: 2, max_y: 9 }));

        let offscreen = bounding_box(
            Vec3::new(25.0, 0.0, 0.0),
            Vec3::new(30.0, 0.0, 0.0),
            Vec3::new(28.0, 5.0, 0.0),
            20,
            10,
        );
        assert_eq!(offscreen, None);
    }

    #[test]
    fn test_single_triangle_scenario() {
        let (mut fb, mut depth) = targets(20, 20);
        let written = rasterize_triangle(&mut fb, &mut depth, corner_triangle(0.0), &flat(Color::RED));

        assert!(written > 0);
        assert_eq!(fb.get_pixel(1, 1), Color::with_alpha(255, 0, 0, 255));
        assert_eq!(depth.get(1, 1), Some(0.0));
        // outside the hypotenuse
        assert_eq!(fb.get_pixel(9, 9), Color::BLACK);
        assert_eq!(depth.get(9, 9), Some(f32::NEG_INFINITY));
    }

    #[test]
    fn test_covered_pixels_satisfy_barycentric_identity() {
        let tri = [Vec3::new(2.0, 3.0, 0.0), Vec3::new(17.0, 6.0, 0.0), Vec3::new(8.0, 15.0, 0.0)];
        let (mut fb, mut depth) = targets(20, 20);
        let written = rasterize_triangle(&mut fb, &mut depth, tri, &flat(Color::WHITE));

        let mut covered = 0;
        for y in 0..20 {
            for x in 0..20 {
                if fb.get_pixel(x, y) != Color::WHITE {
                    continue;
                }
                covered += 1;
                let bc = barycentric(tri[0], tri[1], tri[2], Vec3::new(x as f32, y as f32, 0.0));
                assert!((bc.x + bc.y + bc.z - 1.0).abs() < EPS);
                let px = bc.x * tri[0].x + bc.y * tri[1].x + bc.z * tri[2].x;
                let py = bc.x * tri[0].y + bc.y * tri[1].y + bc.z * tri[2].y;
                assert!((px - x as f32).abs() < EPS && (py - y as f32).abs() < EPS);
            }
        }
        assert_eq!(covered, written);
    }

    #[test]
    fn test_degenerate_triangle_writes_nothing() {
        let (mut fb, mut depth) = targets(20, 20);
        let line = [Vec3::new(0.0, 0.0, 1.0), Vec3::new(5.0, 5.0, 1.0), Vec3::new(10.0, 10.0, 1.0)];
        assert_eq!(rasterize_triangle(&mut fb, &mut depth, line, &flat(Color::RED)), 0);

        let p = Vec3::new(4.0, 4.0, 1.0);
        assert_eq!(rasterize_triangle(&mut fb, &mut depth, [p, p, p], &flat(Color::RED)), 0);
        assert!(fb.pixels.iter().all(|&c| c == Color::BLACK));
    }

    #[test]
    fn test_depth_order_independent() {
        let red_far = corner_triangle(0.5);
        let blue_near = [Vec3::new(2.0, 2.0, 0.9), Vec3::new(12.0, 2.0, 0.9), Vec3::new(2.0, 12.0, 0.9)];

        let (mut fb_a, mut depth_a) = targets(16, 16);
        rasterize_triangle(&mut fb_a, &mut depth_a, red_far, &flat(Color::RED));
        rasterize_triangle(&mut fb_a, &mut depth_a, blue_near, &flat(Color::BLUE));

        let (mut fb_b, mut depth_b) = targets(16, 16);
        rasterize_triangle(&mut fb_b, &mut depth_b, blue_near, &flat(Color::BLUE));
        rasterize_triangle(&mut fb_b, &mut depth_b, red_far, &flat(Color::RED));

        assert_eq!(fb_a.get_pixel(5, 5), Color::BLUE);
        assert_eq!(fb_b.get_pixel(5, 5), Color::BLUE);
        assert!((depth_a.get(5, 5).unwrap() - 0.9).abs() < EPS);
        assert!((depth_b.get(5, 5).unwrap() - 0.9).abs() < EPS);
        assert_eq!(fb_a.pixels, fb_b.pixels);
    }

    #[test]
    fn test_flat_intensity_extremes() {
        let base = Color::new(139, 69, 19);
        let (mut fb, mut depth) = targets(12, 12);
        rasterize_triangle(&mut fb, &mut depth, corner_triangle(0.0), &flat(base.shade(0.0)));
        assert_eq!(fb.get_pixel(2, 2), Color::with_alpha(0, 0, 0, 255));

        let (mut fb, mut depth) = targets(12, 12);
        rasterize_triangle(&mut fb, &mut depth, corner_triangle(0.0), &flat(base.shade(1.0)));
        assert_eq!(fb.get_pixel(2, 2), base);
    }

    #[test]
    fn test_gouraud_constant_matches_flat() {
        let base = Color::new(200, 100, 40);
        let tri = [Vec3::new(1.0, 1.0, 0.0), Vec3::new(18.0, 3.0, 0.0), Vec3::new(6.0, 17.0, 0.0)];

        for k in [0.0, 0.5, 1.0] {
            let (mut fb_flat, mut depth_flat) = targets(20, 20);
            rasterize_triangle(&mut fb_flat, &mut depth_flat, tri, &flat(base.shade(k)));

            let (mut fb_g, mut depth_g) = targets(20, 20);
            let gouraud = Shader::Gouraud { base, intensities: [k, k, k] };
            rasterize_triangle(&mut fb_g, &mut depth_g, tri, &gouraud);

            assert_eq!(fb_flat.pixels, fb_g.pixels, "intensity {}", k);
        }
    }

    #[test]
    fn test_gouraud_interpolates_toward_bright_vertex() {
        let base = Color::WHITE;
        let shader = Shader::Gouraud { base, intensities: [0.0, 1.0, 0.0] };
        assert_eq!(shader.shade(Vec3::new(0.0, 1.0, 0.0)), Color::WHITE);
        assert_eq!(shader.shade(Vec3::new(1.0, 0.0, 0.0)), Color::BLACK);
        assert_eq!(shader.shade(Vec3::new(0.5, 0.5, 0.0)), Color::new(128, 128, 128));
    }

    #[test]
    fn test_textured_zero_uv_samples_origin_texel() {
        let mut tex = Texture::checkerboard(8, 8, Color::WHITE, Color::BLACK);
        tex.pixels[0] = Color::MAGENTA;
        let shader = Shader::Textured { uvs: [Vec2::default(); 3], texture: &tex };

        let (mut fb, mut depth) = targets(12, 12);
        let written = rasterize_triangle(&mut fb, &mut depth, corner_triangle(0.0), &shader);
        let magenta = fb.pixels.iter().filter(|&&c| c == Color::MAGENTA).count();
        assert_eq!(magenta, written);
    }

    #[test]
    fn test_phong_intensity() {
        let params = PhongParams::default();
        let light = Vec3::new(0.0, 0.0, -1.0);

        // facing the light and the viewer: ambient + diffuse + full specular, capped
        assert!((phong_intensity(light, light, &params) - 1.0).abs() < EPS);

        // perpendicular normal: ambient only (reflection points away from viewer)
        let side = phong_intensity(Vec3::new(1.0, 0.0, 0.0), light, &params);
        assert!((side - params.ambient).abs() < EPS);

        let dim = PhongParams { specular: 0.0, ..params };
        let tilted = Vec3::new(0.0, 0.6, -0.8);
        assert!((phong_intensity(tilted, light, &dim) - (0.2 + 0.8 * 0.7)).abs() < EPS);
    }

    #[test]
    fn test_phong_shader_renormalizes() {
        let base = Color::new(100, 100, 100);
        let n = Vec3::new(0.0, 0.0, -1.0);
        let shader = Shader::Phong {
            base,
            normals: [n, n * 3.0, n * 0.25],
            light_dir: n,
            params: PhongParams::default(),
        };
        assert_eq!(shader.shade(Vec3::new(0.2, 0.3, 0.5)), base);
    }

    #[test]
    fn test_vertex_normals_are_unit_and_averaged() {
        let cube = Mesh::test_cube();
        let normals = vertex_normals(&cube);
        assert_eq!(normals.len(), cube.vertex_count());
        for (i, n) in normals.iter().enumerate() {
            assert!((n.len() - 1.0).abs() < EPS);
            // corner normals point away from the centre, along the corner diagonal
            let corner = cube.vertex(i).normalize();
            assert!(n.dot(corner) > 0.5, "vertex {} normal {:?}", i, n);
        }
    }

    #[test]
    fn test_vertex_normals_unused_vertex_is_zero() {
        let mesh = Mesh::from_parts(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(5.0, 5.0, 5.0),
            ],
            vec![Vec2::default()],
            vec![Face::new([0, 1, 2], [0, 0, 0])],
        );
        let normals = vertex_normals(&mesh);
        // (v2 - v0) x (v1 - v0) = (1,0,0) x (0,1,0)
        for n in &normals[..3] {
            assert!((n.z - 1.0).abs() < EPS);
        }
        assert_eq!(normals[3], Vec3::ZERO);
    }

    fn facing_quad_mesh() -> Mesh {
        // Two triangles covering the frame; normals along -Z face the default light
        let vertices = vec![
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
            // behind, facing away from the light
            Vec3::new(-1.0, -1.0, -0.5),
            Vec3::new(-1.0, 1.0, -0.5),
            Vec3::new(1.0, 1.0, -0.5),
        ];
        let faces = vec![
            Face::new([0, 1, 2], [0, 0, 0]),
            Face::new([0, 2, 3], [0, 0, 0]),
            Face::new([4, 5, 6], [0, 0, 0]),
        ];
        Mesh::from_parts(vertices, vec![Vec2::default()], faces)
    }

    #[test]
    fn test_render_mesh_culls_by_light() {
        let mesh = facing_quad_mesh();
        let settings = RenderSettings {
            width: 16,
            height: 16,
            shading: ShadingMode::Flat,
            material: Color::new(200, 100, 50),
            parallel: false,
            ..Default::default()
        };
        let (mut fb, mut depth) = targets(16, 16);
        let stats = render_mesh(&mut fb, &mut depth, &mesh, None, &settings, &ProgressBar::hidden());

        assert_eq!(stats.faces_drawn, 2);
        assert_eq!(stats.faces_culled, 1);
        assert_eq!(fb.get_pixel(8, 8), settings.material);
        assert_eq!(depth.get(8, 8), Some(0.0));

        let settings = RenderSettings { cull: CullMode::None, ..settings };
        let (mut fb, mut depth) = targets(16, 16);
        let stats = render_mesh(&mut fb, &mut depth, &mesh, None, &settings, &ProgressBar::hidden());
        assert_eq!(stats.faces_culled, 0);
        assert_eq!(stats.faces_drawn, 3);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mesh = Mesh::test_cube();
        let tex = Texture::checkerboard(16, 16, Color::WHITE, Color::RED);

        for shading in [ShadingMode::Flat, ShadingMode::Gouraud, ShadingMode::Phong, ShadingMode::Textured] {
            let base = RenderSettings {
                width: 64,
                height: 48,
                shading,
                light_dir: Vec3::new(0.3, 0.4, -1.0).normalize(),
                cull: CullMode::None,
                ..Default::default()
            };

            let (mut fb_seq, mut depth_seq) = targets(64, 48);
            let seq = RenderSettings { parallel: false, ..base.clone() };
            let stats_seq = render_mesh(&mut fb_seq, &mut depth_seq, &mesh, Some(&tex), &seq, &ProgressBar::hidden());

            let (mut fb_par, mut depth_par) = targets(64, 48);
            let par = RenderSettings { parallel: true, ..base };
            let stats_par = render_mesh(&mut fb_par, &mut depth_par, &mesh, Some(&tex), &par, &ProgressBar::hidden());

            assert_eq!(stats_seq, stats_par, "{:?}", shading);
            assert!(stats_seq.pixels_written > 0);
            assert_eq!(fb_seq.pixels, fb_par.pixels, "{:?}", shading);
        }
    }

    #[test]
    fn test_textured_without_texture_draws_material() {
        let mesh = facing_quad_mesh();
        let settings = RenderSettings {
            width: 8,
            height: 8,
            shading: ShadingMode::Textured,
            parallel: false,
            ..Default::default()
        };
        let (mut fb, mut depth) = targets(8, 8);
        render_mesh(&mut fb, &mut depth, &mesh, None, &settings, &ProgressBar::hidden());
        assert_eq!(fb.get_pixel(4, 4), settings.material);
    }
}
