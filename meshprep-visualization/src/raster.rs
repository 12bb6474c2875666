//! CPU triangle rasterizer
//!
//! Renders a mesh into an RGBA image with a depth buffer and a headlight.
//! Used for the still captures and for every frame of the interactive viewer,
//! so both always show the same picture.

use crate::camera::Camera;
use crate::renderer::RenderOptions;
use image::{Rgba, RgbaImage};
use meshprep_core::{Point3d, TriangleMesh, Vector3d};
use nalgebra::Matrix4;

const AMBIENT: f64 = 0.25;

/// Side length in pixels of the square drawn for each vertex of a mesh
/// without faces.
const POINT_SIZE: i64 = 3;

/// A vertex after projection: pixel coordinates plus NDC depth
#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    x: f64,
    y: f64,
    depth: f64,
}

/// Render `mesh` as seen from `camera`.
pub fn rasterize(mesh: &TriangleMesh, camera: &Camera, options: &RenderOptions) -> RgbaImage {
    let (width, height) = (options.width.max(1), options.height.max(1));
    let mut image = RgbaImage::from_pixel(width, height, to_rgba(options.background));
    let mut depth = vec![f64::INFINITY; width as usize * height as usize];

    let view_proj = camera.view_projection();
    let screen: Vec<Option<ScreenVertex>> = mesh
        .vertices
        .iter()
        .map(|v| project(&view_proj, v, width, height))
        .collect();

    if mesh.faces.is_empty() {
        let color = to_rgba(options.mesh_color);
        for vertex in screen.iter().flatten() {
            splat(&mut image, &mut depth, vertex, color);
        }
        return image;
    }

    let light = -camera.view_direction();

    for face in &mesh.faces {
        let (Some(a), Some(b), Some(c)) = (
            screen.get(face[0]).copied().flatten(),
            screen.get(face[1]).copied().flatten(),
            screen.get(face[2]).copied().flatten(),
        ) else {
            continue;
        };

        let [p0, p1, p2] = face.map(|i| mesh.vertices[i]);
        let Some(normal) = (p1 - p0).cross(&(p2 - p0)).try_normalize(f64::EPSILON) else {
            continue;
        };

        let facing = normal.dot(&(camera.position - p0));
        if facing < 0.0 && !options.show_back_faces {
            continue;
        }

        let shade = if options.lighting {
            AMBIENT + (1.0 - AMBIENT) * normal.dot(&light).abs()
        } else {
            1.0
        };
        let color = to_rgba(options.mesh_color.map(|c| c * shade as f32));

        fill_triangle(&mut image, &mut depth, [a, b, c], color);
    }

    image
}

fn project(view_proj: &Matrix4<f64>, vertex: &Point3d, width: u32, height: u32) -> Option<ScreenVertex> {
    let clip = view_proj * vertex.to_homogeneous();
    if !(clip.w > f64::EPSILON) {
        return None;
    }

    let ndc = Vector3d::new(clip.x, clip.y, clip.z) / clip.w;
    if !(-1.0..=1.0).contains(&ndc.z) {
        return None;
    }

    Some(ScreenVertex {
        x: (ndc.x + 1.0) * 0.5 * width as f64,
        y: (1.0 - ndc.y) * 0.5 * height as f64,
        depth: ndc.z,
    })
}

fn edge(a: &ScreenVertex, b: &ScreenVertex, px: f64, py: f64) -> f64 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

fn fill_triangle(image: &mut RgbaImage, depth: &mut [f64], tri: [ScreenVertex; 3], color: Rgba<u8>) {
    let [a, b, c] = tri;
    let area = edge(&a, &b, c.x, c.y);
    if area == 0.0 || !area.is_finite() {
        return;
    }

    let (width, height) = image.dimensions();
    let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as u32;
    let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as u32;
    let max_x = a.x.max(b.x).max(c.x).ceil().min(width as f64 - 1.0);
    let max_y = a.y.max(b.y).max(c.y).ceil().min(height as f64 - 1.0);
    if max_x < 0.0 || max_y < 0.0 {
        return;
    }
    let (max_x, max_y) = (max_x as u32, max_y as u32);

    for py in min_y..=max_y {
        for px in min_x..=max_x {
            let (sx, sy) = (px as f64 + 0.5, py as f64 + 0.5);

            let w0 = edge(&b, &c, sx, sy) / area;
            let w1 = edge(&c, &a, sx, sy) / area;
            let w2 = edge(&a, &b, sx, sy) / area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }

            let z = w0 * a.depth + w1 * b.depth + w2 * c.depth;
            let idx = py as usize * width as usize + px as usize;
            if z < depth[idx] {
                depth[idx] = z;
                image.put_pixel(px, py, color);
            }
        }
    }
}

fn splat(image: &mut RgbaImage, depth: &mut [f64], vertex: &ScreenVertex, color: Rgba<u8>) {
    let (width, height) = image.dimensions();
    let cx = vertex.x.floor() as i64;
    let cy = vertex.y.floor() as i64;
    let half = POINT_SIZE / 2;

    for py in (cy - half)..=(cy + half) {
        for px in (cx - half)..=(cx + half) {
            if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                continue;
            }
            let idx = py as usize * width as usize + px as usize;
            if vertex.depth < depth[idx] {
                depth[idx] = vertex.depth;
                image.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

/// Convert a linear 0..1 color to 8-bit RGBA
pub(crate) fn to_rgba(color: [f32; 3]) -> Rgba<u8> {
    let [r, g, b] = color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    Rgba([r, g, b, 255])
}
