//! CPU-side frame preparation: uniforms, shadow projections, and draw
//! batches built from a scene and render flags.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use offrender_render::{RenderError, RenderFlags};
use offrender_scene::{DirectionalLight, IntrinsicsCamera, Primitive, PrimitiveMode, Scene};

pub const MAX_LIGHTS: usize = 8;
pub const MAX_SHADOW_MAPS: usize = 4;

/// Normal lines are this fraction of the primitive's bounding diagonal.
const NORMAL_LINE_SCALE: f32 = 0.05;
const NORMAL_LINE_COLOR: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct LightUniform {
    pub direction: [f32; 4],
    pub radiance: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct GlobalsUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub ambient: [f32; 4],
    pub viewport: [f32; 4],
    pub lights: [LightUniform; MAX_LIGHTS],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct DrawUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub base_color: [f32; 4],
    pub params: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct ShadowUniform {
    pub view_proj: [[f32; 4]; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    Triangles,
    Lines,
    Points,
}

/// One draw call's worth of geometry.
#[derive(Debug, Clone)]
pub struct DrawBatch {
    pub kind: DrawKind,
    pub vertices: Vec<GpuVertex>,
    /// Empty for points.
    pub indices: Vec<u32>,
    pub uniform: DrawUniform,
    pub casts_shadow: bool,
}

/// Per-frame camera and light state.
#[derive(Debug, Clone)]
pub struct FrameSetup {
    pub camera: IntrinsicsCamera,
    pub globals: GlobalsUniform,
    /// `(layer, light view-projection)` for every shadow map to render.
    pub shadow_passes: Vec<(u32, Mat4)>,
}

/// Camera, lights, and shadow projections for one frame.
pub fn frame_setup(
    scene: &Scene,
    width: u32,
    height: u32,
    point_size: f32,
    flags: RenderFlags,
) -> Result<FrameSetup, RenderError> {
    let (camera, cam_pose) = scene.main_camera().ok_or(RenderError::NoCamera)?;
    let view = cam_pose.inverse();
    let proj = camera.projection_matrix(width, height);

    let bounds = scene.bounds();
    let shadows = flags.contains(RenderFlags::SHADOWS_DIRECTIONAL) && bounds.is_some();

    let mut lights = [LightUniform::zeroed(); MAX_LIGHTS];
    let mut shadow_passes = Vec::new();
    let mut count = 0;
    for (i, (light, pose)) in scene.directional_lights().enumerate() {
        if i >= MAX_LIGHTS {
            tracing::warn!(max = MAX_LIGHTS, "too many directional lights; extras ignored");
            break;
        }
        let dir = DirectionalLight::direction(pose);
        let mut layer = -1.0;
        let mut view_proj = Mat4::IDENTITY;
        if let Some(b) = bounds.filter(|_| shadows && i < MAX_SHADOW_MAPS) {
            view_proj = light_view_proj(dir, b);
            layer = i as f32;
            shadow_passes.push((i as u32, view_proj));
        }
        lights[i] = LightUniform {
            direction: dir.extend(layer).to_array(),
            radiance: light.radiance().extend(1.0).to_array(),
            view_proj: view_proj.to_cols_array_2d(),
        };
        count = i + 1;
    }

    let globals = GlobalsUniform {
        view_proj: (proj * view).to_cols_array_2d(),
        camera_pos: cam_pose.w_axis.truncate().extend(1.0).to_array(),
        ambient: scene.ambient_light.to_array(),
        viewport: [width as f32, height as f32, point_size, count as f32],
        lights,
    };
    Ok(FrameSetup {
        camera: *camera,
        globals,
        shadow_passes,
    })
}

/// Orthographic projection from a directional light covering `bounds`.
pub fn light_view_proj(direction: Vec3, bounds: (Vec3, Vec3)) -> Mat4 {
    let (lo, hi) = bounds;
    let center = (lo + hi) * 0.5;
    let radius = ((hi - lo).length() * 0.5).max(1e-3);
    let dir = direction.normalize_or(Vec3::NEG_Y);
    let up = if dir.cross(Vec3::Y).length_squared() < 1e-6 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let eye = center - dir * (2.0 * radius);
    let view = Mat4::look_at_rh(eye, center, up);
    let proj = Mat4::orthographic_rh(-radius, radius, -radius, radius, 0.0, 4.0 * radius);
    proj * view
}

/// Draw batches for every mesh node in the scene.
pub fn build_batches(scene: &Scene, flags: RenderFlags) -> Vec<DrawBatch> {
    let mut batches = Vec::new();
    for (_, mesh, pose) in scene.meshes() {
        let normal_matrix = pose.inverse().transpose();
        for prim in &mesh.primitives {
            if prim.positions.is_empty() {
                continue;
            }
            let uniform = DrawUniform {
                model: pose.to_cols_array_2d(),
                normal_matrix: normal_matrix.to_cols_array_2d(),
                base_color: prim.material.base_color_factor.to_array(),
                params: [
                    prim.material.metallic_factor,
                    prim.material.roughness_factor,
                    0.0,
                    0.0,
                ],
            };
            batches.extend(primitive_batches(prim, uniform, flags));
        }
    }
    batches
}

fn primitive_batches(prim: &Primitive, uniform: DrawUniform, flags: RenderFlags) -> Vec<DrawBatch> {
    let vertices: Vec<GpuVertex> = prim
        .positions
        .iter()
        .zip(&prim.normals)
        .zip(&prim.colors)
        .map(|((p, n), c)| GpuVertex {
            position: p.to_array(),
            normal: n.to_array(),
            color: c.to_array(),
        })
        .collect();

    let unlit = DrawUniform {
        params: [0.0, 1.0, 1.0, 0.0],
        base_color: [1.0; 4],
        ..uniform
    };

    if prim.mode == PrimitiveMode::Points {
        return vec![DrawBatch {
            kind: DrawKind::Points,
            vertices,
            indices: Vec::new(),
            uniform: DrawUniform {
                base_color: uniform.base_color,
                ..unlit
            },
            casts_shadow: false,
        }];
    }

    let mut out = Vec::new();
    if prim.indices.is_empty() {
        return out;
    }
    if flags.resolve_wireframe(prim.material.wireframe) {
        out.push(DrawBatch {
            kind: DrawKind::Lines,
            vertices,
            indices: prim.edges().into_iter().flatten().collect(),
            uniform,
            casts_shadow: false,
        });
    } else {
        out.push(DrawBatch {
            kind: DrawKind::Triangles,
            vertices,
            indices: prim.indices.iter().flatten().copied().collect(),
            uniform,
            casts_shadow: true,
        });
    }

    let length = prim
        .bounds()
        .map(|(lo, hi)| (hi - lo).length() * NORMAL_LINE_SCALE)
        .unwrap_or(0.0);
    if flags.contains(RenderFlags::VERTEX_NORMALS) {
        let segments = prim.positions.iter().zip(&prim.normals).map(|(p, n)| (*p, *n));
        out.push(normal_lines(segments, length, unlit));
    }
    if flags.contains(RenderFlags::FACE_NORMALS) {
        out.push(normal_lines(prim.face_centers_and_normals().into_iter(), length, unlit));
    }
    out
}

fn normal_lines(
    segments: impl Iterator<Item = (Vec3, Vec3)>,
    length: f32,
    uniform: DrawUniform,
) -> DrawBatch {
    let vertices: Vec<GpuVertex> = segments
        .flat_map(|(origin, normal)| [origin, origin + normal * length])
        .map(|p| GpuVertex {
            position: p.to_array(),
            normal: [0.0; 3],
            color: NORMAL_LINE_COLOR.to_array(),
        })
        .collect();
    let indices = (0..vertices.len() as u32).collect();
    DrawBatch {
        kind: DrawKind::Lines,
        vertices,
        indices,
        uniform,
        casts_shadow: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offrender_common::{location, rotation_x};
    use offrender_scene::{Material, Mesh, TriMesh};

    fn tri_scene(material: Material) -> Scene {
        let tri = TriMesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![[0, 1, 2]]).unwrap();
        let mut scene = Scene::new(Vec4::splat(0.5));
        scene.add(Mesh::from_trimesh(&tri, true, Some(material)), Mat4::IDENTITY);
        scene.add(IntrinsicsCamera::new(100.0, 100.0, 32.0, 32.0), location(0.0, 0.0, 5.0));
        scene
    }

    #[test]
    fn uniform_sizes_are_aligned() {
        assert_eq!(std::mem::size_of::<GpuVertex>(), 40);
        assert_eq!(std::mem::size_of::<LightUniform>(), 96);
        assert_eq!(std::mem::size_of::<GlobalsUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<DrawUniform>(), 160);
    }

    #[test]
    fn solid_triangle_batch() {
        let batches = build_batches(&tri_scene(Material::default()), RenderFlags::NONE);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].kind, DrawKind::Triangles);
        assert_eq!(batches[0].indices, vec![0, 1, 2]);
        assert!(batches[0].casts_shadow);
    }

    #[test]
    fn wireframe_material_draws_edges() {
        let mat = Material {
            wireframe: true,
            ..Material::default()
        };
        let batches = build_batches(&tri_scene(mat), RenderFlags::NONE);
        assert_eq!(batches[0].kind, DrawKind::Lines);
        assert_eq!(batches[0].indices.len(), 6);

        let solid = build_batches(&tri_scene(mat), RenderFlags::FLIP_WIREFRAME);
        assert_eq!(solid[0].kind, DrawKind::Triangles);
    }

    #[test]
    fn normal_visualization_adds_unlit_lines() {
        let flags = RenderFlags::VERTEX_NORMALS | RenderFlags::FACE_NORMALS;
        let batches = build_batches(&tri_scene(Material::default()), flags);
        assert_eq!(batches.len(), 3);
        let vertex_lines = &batches[1];
        assert_eq!(vertex_lines.kind, DrawKind::Lines);
        assert_eq!(vertex_lines.vertices.len(), 6);
        assert_eq!(vertex_lines.uniform.params[2], 1.0);
        assert_eq!(batches[2].vertices.len(), 2);
        assert_eq!(batches[2].vertices[0].color, [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn points_become_point_batch() {
        let mut scene = Scene::default();
        scene.add(Mesh::from_points(&[Vec3::ZERO, Vec3::X], None).unwrap(), Mat4::IDENTITY);
        let batches = build_batches(&scene, RenderFlags::ALL_WIREFRAME);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].kind, DrawKind::Points);
        assert!(batches[0].indices.is_empty());
    }

    #[test]
    fn frame_setup_requires_camera() {
        let scene = Scene::default();
        let err = frame_setup(&scene, 8, 8, 1.0, RenderFlags::NONE).unwrap_err();
        assert!(matches!(err, RenderError::NoCamera));
    }

    #[test]
    fn shadow_passes_only_with_flag() {
        let mut scene = tri_scene(Material::default());
        scene.add(DirectionalLight::default(), rotation_x(45.0));
        scene.add(DirectionalLight::new(Vec3::ONE, 0.5), rotation_x(-10.0));

        let plain = frame_setup(&scene, 64, 64, 1.0, RenderFlags::NONE).unwrap();
        assert!(plain.shadow_passes.is_empty());
        assert_eq!(plain.globals.viewport[3], 2.0);
        assert_eq!(plain.globals.lights[0].direction[3], -1.0);

        let lit = frame_setup(&scene, 64, 64, 1.0, RenderFlags::SHADOWS_DIRECTIONAL).unwrap();
        assert_eq!(lit.shadow_passes.len(), 2);
        assert_eq!(lit.globals.lights[1].direction[3], 1.0);
    }

    #[test]
    fn light_projection_contains_bounds() {
        let bounds = (Vec3::splat(-1.0), Vec3::splat(1.0));
        let vp = light_view_proj(Vec3::NEG_Y, bounds);
        for corner in [bounds.0, bounds.1, Vec3::new(-1.0, 1.0, 1.0)] {
            let p = vp.project_point3(corner);
            assert!(p.x.abs() <= 1.0 + 1e-4 && p.y.abs() <= 1.0 + 1e-4);
            assert!((0.0..=1.0).contains(&p.z));
        }
    }
}
