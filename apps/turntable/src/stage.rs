//! The turntable set: subject mesh, floor, four directional lights, and a
//! fixed camera looking down -Z from ten units away.

use crate::presets::Preset;
use glam::{Mat4, Vec3, Vec4};
use offrender_common::{Rgb, location, rotation_x, rotation_y};
use offrender_scene::{
    DirectionalLight, IntrinsicsCamera, Material, Mesh, NodeId, Scene, SceneError, TriMesh,
};

const FLOOR_HALF_SIZE: f32 = 4.0;
/// Keeps the floor from z-fighting with the lowest vertices.
const FLOOR_OFFSET: f32 = 0.005;
const CAMERA_DISTANCE: f32 = 10.0;

/// `(yaw, pitch)` in degrees of each key light.
const KEY_LIGHTS: [(f32, f32); 3] = [(30.0, 45.0), (-30.0, 45.0), (-180.0, 45.0)];
/// Low front fill light, dimmer than the key lights.
const FILL_LIGHT: (f32, f32) = (0.0, -10.0);
const FILL_LIGHT_FALLOFF: f32 = 0.5;

fn light_pose((yaw, pitch): (f32, f32)) -> Mat4 {
    rotation_y(yaw) * rotation_x(pitch)
}

/// Scene state carried across turntable steps.
pub struct Stage {
    pub scene: Scene,
    subject: TriMesh,
    material: Option<Material>,
    subject_node: NodeId,
    floor_node: NodeId,
}

impl Stage {
    /// Build the stage around `subject`.
    ///
    /// `colors`, when given, replaces the subject's vertex colors: one row is
    /// broadcast, otherwise there must be one row per vertex.
    pub fn new(
        mut subject: TriMesh,
        colors: Option<&[Rgb]>,
        preset: &Preset,
        resolution: u32,
        focal: f32,
    ) -> Result<Self, SceneError> {
        if let Some(colors) = colors {
            subject.assign_colors(colors)?;
        }
        let material = preset.material();
        let a = preset.ambient_light;
        let mut scene = Scene::new(Vec4::new(a, a, a, 1.0));

        let subject_node = scene.add(
            Mesh::from_trimesh(&subject, true, material).with_name("subject"),
            Mat4::IDENTITY,
        );

        let floor = floor_mesh(subject.min_y().unwrap_or(0.0) + FLOOR_OFFSET, preset.floor_gray)?;
        let floor_node = scene.add(
            Mesh::from_trimesh(&floor, false, None).with_name("floor"),
            Mat4::IDENTITY,
        );

        for pose in KEY_LIGHTS {
            scene.add(
                DirectionalLight::new(Vec3::ONE, preset.directional_light),
                light_pose(pose),
            );
        }
        scene.add(
            DirectionalLight::new(Vec3::ONE, preset.directional_light - FILL_LIGHT_FALLOFF),
            light_pose(FILL_LIGHT),
        );

        let c = resolution as f32 / 2.0;
        scene.add(
            IntrinsicsCamera::new(focal, focal, c, c),
            location(0.0, 0.0, CAMERA_DISTANCE),
        );

        tracing::debug!(
            vertices = subject.vertex_count(),
            faces = subject.face_count(),
            nodes = scene.len(),
            "stage built"
        );
        Ok(Self {
            scene,
            subject,
            material,
            subject_node,
            floor_node,
        })
    }

    pub fn subject(&self) -> &TriMesh {
        &self.subject
    }

    pub fn subject_node(&self) -> NodeId {
        self.subject_node
    }

    pub fn floor_node(&self) -> NodeId {
        self.floor_node
    }

    /// Rotate the subject's vertices about +Y and return the rebuilt mesh.
    /// The scene keeps showing the previous mesh until [`Stage::swap_subject`].
    pub fn rotate_subject(&mut self, degrees: f32) -> Mesh {
        self.subject.rotate_y(degrees);
        Mesh::from_trimesh(&self.subject, true, self.material).with_name("subject")
    }

    /// Replace the subject node with `mesh`.
    pub fn swap_subject(&mut self, mesh: Mesh) {
        self.scene.remove_node(self.subject_node);
        self.subject_node = self.scene.add(mesh, Mat4::IDENTITY);
    }
}

/// Square floor at height `y`, two triangles facing +Y.
fn floor_mesh(y: f32, gray: f32) -> Result<TriMesh, SceneError> {
    let s = FLOOR_HALF_SIZE;
    let vertices = vec![
        Vec3::new(s, y, s),
        Vec3::new(s, y, -s),
        Vec3::new(-s, y, s),
        Vec3::new(-s, y, -s),
    ];
    TriMesh::new(vertices, vec![[0, 1, 2], [2, 1, 3]])?.with_colors(&[Vec3::splat(gray)])
}
